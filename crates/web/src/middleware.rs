//! The middleware pipeline.
//!
//! Middleware run one after another, in registration order, before the
//! route is resolved. Each one receives a [`Next`] token and must return the
//! [`Proceed`] it produces: [`Next::proceed`] hands the request to the next
//! middleware, [`Next::fail`] stops the pipeline with an error.

use crate::{RequestContext, ResponseContext};
use async_trait::async_trait;
use std::error::Error;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::trace;

pub type BoxError = Box<dyn Error + Send + Sync>;

#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(&self, req: &mut RequestContext, res: &mut ResponseContext, next: Next) -> Proceed;
}

/// The continuation given to a middleware, consumed by exactly one of its methods.
#[derive(Debug)]
pub struct Next(());

impl Next {
    pub fn proceed(self) -> Proceed {
        Proceed { result: Ok(()) }
    }

    pub fn fail(self, error: impl Into<BoxError>) -> Proceed {
        Proceed { result: Err(error.into()) }
    }
}

/// What a middleware decided, see [`Next`].
#[must_use = "a middleware must return the `Proceed` produced by its `Next`"]
#[derive(Debug)]
pub struct Proceed {
    result: Result<(), BoxError>,
}

impl Proceed {
    pub fn is_proceed(&self) -> bool {
        self.result.is_ok()
    }
}

#[derive(Error, Debug)]
pub enum MiddlewareError {
    #[error("middleware #{index} failed: {source}")]
    Failed { index: usize, source: BoxError },

    #[error("middleware pipeline did not finish within {0:?}")]
    Timeout(Duration),
}

/// A [`Middleware`] backed by a synchronous closure, see [`middleware_fn`].
#[derive(Debug)]
pub struct FnMiddleware<F> {
    f: F,
}

pub fn middleware_fn<F>(f: F) -> FnMiddleware<F>
where
    F: Fn(&mut RequestContext, &mut ResponseContext, Next) -> Proceed + Send + Sync,
{
    FnMiddleware { f }
}

#[async_trait]
impl<F> Middleware for FnMiddleware<F>
where
    F: Fn(&mut RequestContext, &mut ResponseContext, Next) -> Proceed + Send + Sync,
{
    async fn handle(&self, req: &mut RequestContext, res: &mut ResponseContext, next: Next) -> Proceed {
        (self.f)(req, res, next)
    }
}

#[derive(Default)]
pub struct Pipeline {
    middlewares: Vec<Box<dyn Middleware>>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline").field("len", &self.middlewares.len()).finish()
    }
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<M: Middleware + 'static>(&mut self, middleware: M) {
        self.middlewares.push(Box::new(middleware));
    }

    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Runs every middleware in order, stopping at the first failure.
    pub async fn run(&self, req: &mut RequestContext, res: &mut ResponseContext) -> Result<(), MiddlewareError> {
        for (index, middleware) in self.middlewares.iter().enumerate() {
            trace!(index = index, "run middleware");
            let proceed = middleware.handle(req, res, Next(())).await;
            proceed.result.map_err(|source| MiddlewareError::Failed { index, source })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::RequestBody;
    use http::{HeaderMap, Method, Uri, Version};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq)]
    struct User(String);

    fn request() -> RequestContext {
        RequestContext::new(Method::GET, Uri::from_static("/"), Version::HTTP_11, HeaderMap::new(), RequestBody::empty())
    }

    struct CountingMiddleware {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Middleware for CountingMiddleware {
        async fn handle(&self, _req: &mut RequestContext, _res: &mut ResponseContext, next: Next) -> Proceed {
            self.calls.fetch_add(1, Ordering::SeqCst);
            next.proceed()
        }
    }

    #[tokio::test]
    async fn all_proceed() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut pipeline = Pipeline::new();
        pipeline.push(CountingMiddleware { calls: Arc::clone(&calls) });
        pipeline.push(CountingMiddleware { calls: Arc::clone(&calls) });

        pipeline.run(&mut request(), &mut ResponseContext::new()).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn empty_pipeline() {
        assert!(Pipeline::new().run(&mut request(), &mut ResponseContext::new()).await.is_ok());
    }

    #[tokio::test]
    async fn failure_halts_pipeline() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut pipeline = Pipeline::new();
        pipeline.push(CountingMiddleware { calls: Arc::clone(&calls) });
        pipeline.push(middleware_fn(|_req, _res, next| next.fail("no user")));
        pipeline.push(CountingMiddleware { calls: Arc::clone(&calls) });

        let error = pipeline.run(&mut request(), &mut ResponseContext::new()).await.unwrap_err();

        assert!(matches!(error, MiddlewareError::Failed { index: 1, .. }));
        assert_eq!(error.to_string(), "middleware #1 failed: no user");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn mutation_is_visible_downstream() {
        let mut pipeline = Pipeline::new();
        pipeline.push(middleware_fn(|req, _res, next| {
            req.extensions_mut().insert(User("mart".into()));
            next.proceed()
        }));
        pipeline.push(middleware_fn(|req, _res, next| match req.extensions().get::<User>() {
            Some(_) => next.proceed(),
            None => next.fail("user is missing"),
        }));

        let mut req = request();
        pipeline.run(&mut req, &mut ResponseContext::new()).await.unwrap();

        assert_eq!(req.extensions().get::<User>(), Some(&User("mart".into())));
    }
}
