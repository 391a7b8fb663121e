//! The request lifecycle.
//!
//! A [`Dispatcher`] is built once with a [`DispatcherBuilder`] and is then
//! frozen: it has no registration methods, so routes and middleware can't
//! change while requests are served. For every request it
//!
//! 1. reads the whole body,
//! 2. runs the middleware pipeline, answering 500 on failure,
//! 3. normalizes method and target with the configured [`UrlCase`],
//! 4. splits the target on the first `?` and parses the query,
//! 5. resolves the route and calls its handler, or answers 404.

use crate::body::{BodyError, ResponseBody, read_body};
use crate::middleware::{BoxError, Middleware, MiddlewareError, Pipeline};
use crate::router::{RegistrationError, RouteGroup, RouteOptions, Router, method_routes};
use crate::{Query, RequestContext, ResponseContext, RouteHandler};
use bytes::Bytes;
use http::{Method, Request, Response, StatusCode};
use http_body::Body;
use nano_http::handler::Handler;
use serde::{Deserialize, Deserializer, Serialize};
use std::borrow::Cow;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, warn};

const MIDDLEWARE_FAILURE_BODY: &str = "Something went wrong";
const BODY_TIMEOUT_BODY: &str = "Request Timeout";

/// How method and request target are normalized before route resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrlCase {
    /// Lowercase the method and the whole target, query included.
    ///
    /// Route templates are not lowercased, so a template with an uppercase
    /// literal never matches under this policy.
    #[default]
    Lowercase,
    /// Keep method and target as received.
    Preserve,
}

impl UrlCase {
    pub fn apply<'a>(&self, value: &'a str) -> Cow<'a, str> {
        match self {
            UrlCase::Lowercase => Cow::Owned(value.to_ascii_lowercase()),
            UrlCase::Preserve => Cow::Borrowed(value),
        }
    }
}

/// Dispatch settings. Timeouts are disabled by default.
///
/// ```
/// use nano_web::{DispatchConfig, UrlCase};
///
/// let config: DispatchConfig = serde_json::from_str(r#"{"url_case": "preserve", "body_timeout_ms": 500}"#).unwrap();
/// assert_eq!(config.url_case, UrlCase::Preserve);
/// assert_eq!(config.body_timeout, Some(std::time::Duration::from_millis(500)));
/// assert_eq!(config.middleware_timeout, None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub url_case: UrlCase,

    /// Bound on reading the request body, answered with 408 when elapsed.
    #[serde(rename = "body_timeout_ms", deserialize_with = "millis")]
    pub body_timeout: Option<Duration>,

    /// Bound on the whole middleware pipeline, answered with 500 when elapsed.
    #[serde(rename = "middleware_timeout_ms", deserialize_with = "millis")]
    pub middleware_timeout: Option<Duration>,
}

fn millis<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
    Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
}

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error(transparent)]
    Body(#[from] BodyError),
}

#[derive(Debug, Serialize)]
struct NotFound<'a> {
    url: &'a str,
    method: &'a str,
    msg: &'static str,
    #[serde(rename = "statusCode")]
    status_code: u16,
}

/// Collects routes, middleware and configuration, then freezes them into a
/// [`Dispatcher`].
#[derive(Debug, Default)]
pub struct DispatcherBuilder {
    router: Router,
    pipeline: Pipeline,
    config: DispatchConfig,
}

impl DispatcherBuilder {
    fn new() -> Self {
        Self::default()
    }

    pub fn route<H: RouteHandler + 'static>(
        &mut self,
        method: Method,
        template: &str,
        handler: H,
        options: RouteOptions,
    ) -> Result<&mut Self, RegistrationError> {
        self.router.insert(method, template, handler, options)?;
        Ok(self)
    }

    method_routes! {
        get => GET,
        post => POST,
        put => PUT,
        patch => PATCH,
        delete => DELETE,
    }

    /// Appends a middleware; middleware run in the order they are added.
    pub fn use_middleware<M: Middleware + 'static>(&mut self, middleware: M) -> &mut Self {
        self.pipeline.push(middleware);
        self
    }

    pub fn register_group(&mut self, group: RouteGroup) -> Result<&mut Self, RegistrationError> {
        group.register(&mut self.router)?;
        Ok(self)
    }

    pub fn register_groups(&mut self, groups: impl IntoIterator<Item = RouteGroup>) -> Result<&mut Self, RegistrationError> {
        for group in groups {
            group.register(&mut self.router)?;
        }
        Ok(self)
    }

    pub fn config(&mut self, config: DispatchConfig) -> &mut Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Dispatcher {
        debug!(routes = self.router.len(), middlewares = self.pipeline.len(), "dispatcher built");
        Dispatcher { router: self.router, pipeline: self.pipeline, config: self.config }
    }
}

/// Routes requests through the middleware pipeline to their handler.
#[derive(Debug)]
pub struct Dispatcher {
    router: Router,
    pipeline: Pipeline,
    config: DispatchConfig,
}

impl Dispatcher {
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Runs the full lifecycle of one request.
    ///
    /// Only a broken request body stream is an error; every other outcome,
    /// including middleware failures and unknown routes, is a response.
    pub async fn dispatch<B>(&self, request: Request<B>) -> Result<Response<ResponseBody>, DispatchError>
    where
        B: Body<Data = Bytes>,
        B::Error: Into<BoxError>,
    {
        let (parts, body) = request.into_parts();

        let body = match self.config.body_timeout {
            Some(limit) => match tokio::time::timeout(limit, read_body(body)).await {
                Ok(body) => body?,
                Err(elapsed) => {
                    warn!(cause = %elapsed, uri = %parts.uri, "reading request body timed out");
                    return Ok(ResponseContext::new()
                        .with_status(StatusCode::REQUEST_TIMEOUT)
                        .send_raw(BODY_TIMEOUT_BODY, mime::TEXT_PLAIN.as_ref()));
                }
            },
            None => read_body(body).await?,
        };

        let mut req = RequestContext::new(parts.method, parts.uri, parts.version, parts.headers, body);
        let mut res = ResponseContext::new();

        if let Err(e) = self.run_middlewares(&mut req, &mut res).await {
            error!(cause = %e, uri = %req.uri(), "middleware failed");
            return Ok(res
                .with_status(StatusCode::INTERNAL_SERVER_ERROR)
                .send_raw(MIDDLEWARE_FAILURE_BODY, mime::TEXT_PLAIN.as_ref()));
        }

        let url_case = self.config.url_case;
        let method = url_case.apply(req.method().as_str()).into_owned();
        let target = url_case.apply(req.uri().path_and_query().map_or("/", |target| target.as_str())).into_owned();
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path.to_owned(), Query::parse(query)),
            None => (target, Query::default()),
        };
        req.set_location(path, query);

        match self.router.resolve(&method, req.path()) {
            Some(resolved) => {
                let (entry, params) = resolved.into_parts();
                debug!(method = %method, path = req.path(), template = entry.pattern().template(), "dispatch to handler");
                req.set_params(params);
                Ok(entry.handler().call(req, res).await)
            }
            None => {
                debug!(method = %method, path = req.path(), "route not found");
                let url = req.uri().to_string();
                let not_found = NotFound {
                    url: &url,
                    method: req.method().as_str(),
                    msg: "Route not found",
                    status_code: StatusCode::NOT_FOUND.as_u16(),
                };
                Ok(res.with_status(StatusCode::NOT_FOUND).send(&not_found))
            }
        }
    }

    async fn run_middlewares(&self, req: &mut RequestContext, res: &mut ResponseContext) -> Result<(), MiddlewareError> {
        match self.config.middleware_timeout {
            Some(limit) => tokio::time::timeout(limit, self.pipeline.run(req, res))
                .await
                .unwrap_or(Err(MiddlewareError::Timeout(limit))),
            None => self.pipeline.run(req, res).await,
        }
    }
}

impl<B> Handler<B> for Dispatcher
where
    B: Body<Data = Bytes> + Send,
    B::Error: Into<BoxError>,
{
    type RespBody = ResponseBody;
    type Error = DispatchError;

    async fn call(&self, req: Request<B>) -> Result<Response<Self::RespBody>, Self::Error> {
        self.dispatch(req).await
    }
}
