//! The seam between a connection and the application.
//!
//! [`Handler`] is the `Send` variant of [`LocalHandler`], generated by
//! `trait_variant`; a connection only ever needs the former. Plain async
//! functions become handlers through [`make_handler`].

use std::error::Error;

use http::{Request, Response};
use http_body::Body;

#[trait_variant::make(Handler: Send)]
pub trait LocalHandler<ReqBody> {
    type RespBody: Body;
    type Error: Into<Box<dyn Error + Send + Sync>>;

    async fn call(&self, req: Request<ReqBody>) -> Result<Response<Self::RespBody>, Self::Error>;
}

/// A [`Handler`] backed by an async function, see [`make_handler`].
#[derive(Debug)]
pub struct HandlerFn<F> {
    f: F,
}

impl<ReqBody, RespBody, Err, F, Fut> Handler<ReqBody> for HandlerFn<F>
where
    RespBody: Body,
    ReqBody: Send,
    F: Fn(Request<ReqBody>) -> Fut + Send + Sync,
    Err: Into<Box<dyn Error + Send + Sync>>,
    Fut: Future<Output = Result<Response<RespBody>, Err>> + Send,
{
    type RespBody = RespBody;
    type Error = Err;

    async fn call(&self, req: Request<ReqBody>) -> Result<Response<Self::RespBody>, Self::Error> {
        (self.f)(req).await
    }
}

pub fn make_handler<F, ReqBody, RespBody, Err, Ret>(f: F) -> HandlerFn<F>
where
    RespBody: Body,
    Err: Into<Box<dyn Error + Send + Sync>>,
    Ret: Future<Output = Result<Response<RespBody>, Err>>,
    F: Fn(Request<ReqBody>) -> Ret,
{
    HandlerFn { f }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use std::convert::Infallible;

    #[tokio::test]
    async fn function_handler() {
        let handler = make_handler(|req: Request<String>| async move {
            Ok::<_, Infallible>(Response::builder().status(StatusCode::ACCEPTED).body(req.into_body()).unwrap())
        });

        let response = Handler::call(&handler, Request::new("ping".to_string())).await.unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(response.body(), "ping");
    }

    #[tokio::test]
    async fn spawned_on_runtime() {
        let handler = std::sync::Arc::new(make_handler(|req: Request<String>| async move {
            Ok::<_, Infallible>(Response::new(req.into_body().to_uppercase()))
        }));

        let response = tokio::spawn(async move { Handler::call(handler.as_ref(), Request::new("ping".to_string())).await })
            .await
            .unwrap()
            .unwrap();

        assert_eq!(response.body(), "PING");
    }
}
