//! Sample application: two middleware, a `user` route group and a route per
//! method on `/` and `/:id`.
//!
//! ```shell
//! cargo run --example server
//! curl -i 'http://127.0.0.1:3000/?page=1'
//! curl -i -X POST -d '{"name":"mart"}' http://127.0.0.1:3000/
//! curl -i http://127.0.0.1:3000/user/7
//! ```

use http::Response;
use nano_web::router::RouteGroup;
use nano_web::{Dispatcher, RequestContext, ResponseBody, ResponseContext, Server, handler_fn, middleware_fn};
use serde_json::json;
use std::error::Error;
use tracing::info;

#[derive(Debug, Clone)]
struct User(String);

fn current_user(req: &RequestContext) -> Option<&str> {
    req.extensions().get::<User>().map(|user| user.0.as_str())
}

async fn unauthorized(req: RequestContext, res: ResponseContext) -> Response<ResponseBody> {
    info!(user = ?current_user(&req), query = ?req.query(), "GET /");
    res.code(401).send(&json!({ "data": { "user": current_user(&req) }, "error": "Unauthorized" }))
}

async fn show(req: RequestContext, res: ResponseContext) -> Response<ResponseBody> {
    info!(params = ?req.params(), "GET /:id");
    res.code(200).send(&json!({ "id": req.param("id") }))
}

async fn create(req: RequestContext, res: ResponseContext) -> Response<ResponseBody> {
    res.code(200).send(&json!({ "Created": req.body().as_json() }))
}

fn user_routes() -> RouteGroup {
    RouteGroup::new("user", |routes| {
        routes
            .get(
                "/",
                handler_fn(|req: RequestContext, res: ResponseContext| async move {
                    res.send(&json!({ "users": [current_user(&req)] }))
                }),
            )?
            .get("/:id", handler_fn(show))?;
        Ok(())
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let mut builder = Dispatcher::builder();
    builder
        .use_middleware(middleware_fn(|req, _res, next| {
            info!("this is middleware 1");
            req.extensions_mut().insert(User("mart".into()));
            next.proceed()
        }))
        .use_middleware(middleware_fn(|req, _res, next| {
            info!(user = ?current_user(req), "this is middleware 2");
            next.proceed()
        }))
        .register_group(user_routes())?
        .get("/", handler_fn(unauthorized))?
        .get("/:id", handler_fn(show))?
        .post("/", handler_fn(create))?
        .put("/", handler_fn(|_req, res: ResponseContext| async move { res.send(&json!({ "msg": "Modified" })) }))?
        .patch("/", handler_fn(|_req, res: ResponseContext| async move { res.code(200).send(&json!({ "msg": "Updated" })) }))?
        .delete("/", handler_fn(|_req, res: ResponseContext| async move { res.code(200).send("Ok") }))?;

    Server::builder().address("127.0.0.1:3000").dispatcher(builder.build()).build()?.start().await?;
    Ok(())
}
