//! A minimal async request dispatch engine on top of `nano-http`.
//!
//! Requests go through a fixed lifecycle: the body is read in full and
//! parsed, the middleware pipeline runs, the target is normalized and split
//! into path and query, and the first registered route whose method and
//! path template match gets to answer. Unknown routes get a JSON 404.
//!
//! # Example
//!
//! ```no_run
//! use nano_web::{Dispatcher, RequestContext, ResponseContext, Server, handler_fn, middleware_fn};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let mut builder = Dispatcher::builder();
//!     builder
//!         .use_middleware(middleware_fn(|_req, res, next| {
//!             res.headers_mut().insert("x-powered-by", http::HeaderValue::from_static("nano-web"));
//!             next.proceed()
//!         }))
//!         .get("/user/:id", handler_fn(|req: RequestContext, res: ResponseContext| async move {
//!             res.code(200).send(&serde_json::json!({ "id": req.param("id") }))
//!         }))?;
//!
//!     Server::builder().address("127.0.0.1:3000").dispatcher(builder.build()).build()?.start().await?;
//!     Ok(())
//! }
//! ```

mod body;
mod dispatcher;
mod handler;
mod pattern;
mod query;
mod request;
mod response;
mod server;

pub mod middleware;
pub mod router;

pub use body::BodyError;
pub use body::RequestBody;
pub use body::ResponseBody;
pub use body::read_body;
pub use dispatcher::DispatchConfig;
pub use dispatcher::DispatchError;
pub use dispatcher::Dispatcher;
pub use dispatcher::DispatcherBuilder;
pub use dispatcher::UrlCase;
pub use handler::FnHandler;
pub use handler::RouteHandler;
pub use handler::handler_fn;
pub use middleware::Middleware;
pub use middleware::middleware_fn;
pub use pattern::PathPattern;
pub use pattern::PatternError;
pub use query::Query;
pub use request::PathParams;
pub use request::RequestContext;
pub use response::ResponseContext;
pub use router::RouteGroup;
pub use server::Server;
pub use server::ServerBuilder;
pub use server::ServerError;
