use crate::body::ResponseBody;
use crate::{RequestContext, ResponseContext};
use async_trait::async_trait;
use http::Response;
use std::future::Future;

/// The application code invoked when a route matches.
///
/// A handler owns both contexts; it completes the request by returning
/// the response built from the [`ResponseContext`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RouteHandler: Send + Sync {
    async fn call(&self, req: RequestContext, res: ResponseContext) -> Response<ResponseBody>;
}

/// A [`RouteHandler`] backed by an async function or closure.
#[derive(Debug)]
pub struct FnHandler<F> {
    f: F,
}

pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(RequestContext, ResponseContext) -> Fut + Send + Sync,
    Fut: Future<Output = Response<ResponseBody>> + Send,
{
    FnHandler { f }
}

#[async_trait]
impl<F, Fut> RouteHandler for FnHandler<F>
where
    F: Fn(RequestContext, ResponseContext) -> Fut + Send + Sync,
    Fut: Future<Output = Response<ResponseBody>> + Send,
{
    async fn call(&self, req: RequestContext, res: ResponseContext) -> Response<ResponseBody> {
        (self.f)(req, res).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::RequestBody;
    use http::{HeaderMap, Method, StatusCode, Uri, Version};

    fn assert_is_handler<T: RouteHandler>(_handler: &T) {
        // no op
    }

    fn request() -> RequestContext {
        RequestContext::new(Method::GET, Uri::from_static("/"), Version::HTTP_11, HeaderMap::new(), RequestBody::empty())
    }

    #[tokio::test]
    async fn closure_handler() {
        let handler = handler_fn(|req: RequestContext, res: ResponseContext| async move {
            res.with_status(StatusCode::ACCEPTED).send(req.path())
        });
        assert_is_handler(&handler);

        let response = handler.call(request(), ResponseContext::new()).await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn async_fn_handler() {
        async fn teapot(_req: RequestContext, res: ResponseContext) -> Response<ResponseBody> {
            res.code(418).end()
        }

        let response = handler_fn(teapot).call(request(), ResponseContext::new()).await;
        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
    }
}
