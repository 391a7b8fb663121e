//! The route table and its resolver.
//!
//! Routes are kept in registration order and resolution returns the first
//! entry whose method and pattern both match. There is no specificity
//! ranking: with `/a/:x` registered before `/a/b`, a request for `/a/b`
//! resolves to `/a/:x`.

use crate::pattern::{PathPattern, PatternError};
use crate::{PathParams, RouteHandler};
use http::Method;
use std::fmt;
use thiserror::Error;
use tracing::{debug, trace};

/// Free-form options attached to a route at registration.
///
/// Dispatch never reads them; they travel with the [`RouteEntry`].
pub type RouteOptions = serde_json::Map<String, serde_json::Value>;

/// A route template was rejected at registration.
#[derive(Error, Debug)]
#[error("failed to register {method} '{template}': {source}")]
pub struct RegistrationError {
    method: Method,
    template: String,
    #[source]
    source: PatternError,
}

impl RegistrationError {
    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn pattern_error(&self) -> &PatternError {
        &self.source
    }
}

pub struct RouteEntry {
    method: Method,
    pattern: PathPattern,
    handler: Box<dyn RouteHandler>,
    options: RouteOptions,
}

impl fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteEntry")
            .field("method", &self.method)
            .field("pattern", &self.pattern.template())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl RouteEntry {
    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    pub fn handler(&self) -> &dyn RouteHandler {
        self.handler.as_ref()
    }

    pub fn options(&self) -> &RouteOptions {
        &self.options
    }
}

/// The result of a successful [`Router::resolve`].
#[derive(Debug)]
pub struct Resolved<'router> {
    entry: &'router RouteEntry,
    params: PathParams,
}

impl<'router> Resolved<'router> {
    pub fn entry(&self) -> &'router RouteEntry {
        self.entry
    }

    pub fn params(&self) -> &PathParams {
        &self.params
    }

    pub fn into_parts(self) -> (&'router RouteEntry, PathParams) {
        (self.entry, self.params)
    }
}

/// Append-only, ordered route table.
#[derive(Debug, Default)]
pub struct Router {
    entries: Vec<RouteEntry>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiles and appends a route.
    ///
    /// A single trailing `/` is stripped from `template` unless the template
    /// is exactly `/`.
    pub fn insert<H: RouteHandler + 'static>(
        &mut self,
        method: Method,
        template: &str,
        handler: H,
        options: RouteOptions,
    ) -> Result<(), RegistrationError> {
        let template = normalize_template(template);
        let pattern = PathPattern::compile(template)
            .map_err(|source| RegistrationError { method: method.clone(), template: template.to_owned(), source })?;

        debug!(method = %method, template = template, "register route");
        self.entries.push(RouteEntry { method, pattern, handler: Box::new(handler), options });
        Ok(())
    }

    /// Finds the first entry matching `method` (ASCII case-insensitive) and `path`.
    pub fn resolve(&self, method: &str, path: &str) -> Option<Resolved<'_>> {
        let resolved = self.entries.iter().find_map(|entry| {
            if !entry.method.as_str().eq_ignore_ascii_case(method) {
                return None;
            }
            entry.pattern.matches(path).map(|params| Resolved { entry, params })
        });

        match &resolved {
            Some(resolved) => trace!(method = method, path = path, template = resolved.entry.pattern.template(), "route resolved"),
            None => trace!(method = method, path = path, "no route matched"),
        }
        resolved
    }

    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn normalize_template(template: &str) -> &str {
    if template.len() > 1 { template.strip_suffix('/').unwrap_or(template) } else { template }
}

/// Generates the per-method shorthands over a `route` method.
macro_rules! method_routes {
    ($($name:ident => $method:ident),* $(,)?) => {
        $(
            #[doc = concat!("Registers a `", stringify!($method), "` route with empty options.")]
            pub fn $name<H: $crate::RouteHandler + 'static>(
                &mut self,
                template: &str,
                handler: H,
            ) -> Result<&mut Self, $crate::router::RegistrationError> {
                self.route(::http::Method::$method, template, handler, $crate::router::RouteOptions::new())
            }
        )*
    };
}
pub(crate) use method_routes;

type GroupBuilder = Box<dyn FnOnce(&mut GroupRoutes<'_>) -> Result<(), RegistrationError>>;

/// Routes sharing a path prefix.
///
/// ```
/// use nano_web::router::RouteGroup;
/// use nano_web::{RequestContext, ResponseContext, handler_fn};
///
/// let group = RouteGroup::new("user", |routes| {
///     routes.get("/:id", handler_fn(|req: RequestContext, res: ResponseContext| async move {
///         res.send(&req.param("id"))
///     }))?;
///     Ok(())
/// });
/// assert_eq!(group.prefix(), "user");
/// ```
pub struct RouteGroup {
    prefix: String,
    builder: GroupBuilder,
}

impl fmt::Debug for RouteGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteGroup").field("prefix", &self.prefix).finish_non_exhaustive()
    }
}

impl RouteGroup {
    pub fn new<F>(prefix: impl Into<String>, builder: F) -> Self
    where
        F: FnOnce(&mut GroupRoutes<'_>) -> Result<(), RegistrationError> + 'static,
    {
        Self { prefix: prefix.into(), builder: Box::new(builder) }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub(crate) fn register(self, router: &mut Router) -> Result<(), RegistrationError> {
        let prefix = self.prefix.trim_matches('/');
        debug!(prefix = prefix, "register route group");
        let mut routes = GroupRoutes { router, prefix };
        (self.builder)(&mut routes)
    }
}

/// The registration surface handed to a [`RouteGroup`] builder.
///
/// Every template is stored as `/` + prefix + template.
pub struct GroupRoutes<'a> {
    router: &'a mut Router,
    prefix: &'a str,
}

impl fmt::Debug for GroupRoutes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupRoutes").field("prefix", &self.prefix).finish_non_exhaustive()
    }
}

impl GroupRoutes<'_> {
    pub fn route<H: RouteHandler + 'static>(
        &mut self,
        method: Method,
        template: &str,
        handler: H,
        options: RouteOptions,
    ) -> Result<&mut Self, RegistrationError> {
        let template = if self.prefix.is_empty() || !(template.is_empty() || template.starts_with('/')) {
            // a relative template is left to fail compilation
            template.to_owned()
        } else {
            format!("/{}{template}", self.prefix)
        };

        self.router.insert(method, &template, handler, options)?;
        Ok(self)
    }

    method_routes! {
        get => GET,
        post => POST,
        put => PUT,
        patch => PATCH,
        delete => DELETE,
    }
}
