//! The per-request context handed to middleware and handlers.

use crate::Query;
use crate::body::RequestBody;
use http::{Extensions, HeaderMap, Method, Uri, Version};

/// Everything known about a request by the time it reaches a handler.
///
/// The body has already been read in full. Middleware receive the context
/// through `&mut` and may attach typed data to [`extensions`](Self::extensions),
/// which every later middleware and the handler observe.
#[derive(Debug)]
pub struct RequestContext {
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    path: String,
    query: Query,
    params: PathParams,
    body: RequestBody,
    extensions: Extensions,
}

impl RequestContext {
    pub fn new(method: Method, uri: Uri, version: Version, headers: HeaderMap, body: RequestBody) -> Self {
        let path = uri.path().to_owned();
        let query = uri.query().map(Query::parse).unwrap_or_default();
        Self {
            method,
            uri,
            version,
            headers,
            path,
            query,
            params: PathParams::new(),
            body,
            extensions: Extensions::new(),
        }
    }

    /// The method as received, before normalization.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The request target as received, before normalization.
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The normalized path used for route resolution.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Parameters bound by the matched route, empty until a route matches.
    pub fn params(&self) -> &PathParams {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    pub fn body(&self) -> &RequestBody {
        &self.body
    }

    pub fn into_body(self) -> RequestBody {
        self.body
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    pub(crate) fn set_location(&mut self, path: String, query: Query) {
        self.path = path;
        self.query = query;
    }

    pub(crate) fn set_params(&mut self, params: PathParams) {
        self.params = params;
    }
}

/// Named path parameters, in the order they appear in the route template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    inner: Vec<(String, String)>,
}

impl PathParams {
    #[inline]
    pub fn new() -> Self {
        Self { inner: Vec::new() }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Gets the value of a path parameter by its name
    #[inline]
    pub fn get(&self, name: impl AsRef<str>) -> Option<&str> {
        let name = name.as_ref();
        self.inner.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub(crate) fn insert(&mut self, name: String, value: String) {
        self.inner.push((name, value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_from_parts() {
        let uri: Uri = "/user/7?a=1&b=two".parse().unwrap();
        let context = RequestContext::new(Method::GET, uri, Version::HTTP_11, HeaderMap::new(), RequestBody::empty());

        assert_eq!(context.path(), "/user/7");
        assert_eq!(context.query().get("b"), Some("two"));
        assert!(context.params().is_empty());
        assert!(context.param("id").is_none());
    }

    #[test]
    fn extensions_carry_typed_data() {
        #[derive(Debug, Clone, PartialEq)]
        struct User(&'static str);

        let mut context =
            RequestContext::new(Method::GET, Uri::from_static("/"), Version::HTTP_11, HeaderMap::new(), RequestBody::empty());
        context.extensions_mut().insert(User("mart"));

        assert_eq!(context.extensions().get::<User>(), Some(&User("mart")));
    }
}
