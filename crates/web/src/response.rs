//! The response helper handed to middleware and handlers.

use crate::body::ResponseBody;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderName, HeaderValue, Response, StatusCode};
use serde::Serialize;
use std::fmt::Debug;
use tracing::warn;

/// Builds the response of one request.
///
/// `code` and `header` are chainable; `send`, `send_with`, `send_raw` and
/// `end` consume the context, so a response is completed exactly once.
#[derive(Debug, Clone)]
pub struct ResponseContext {
    status: StatusCode,
    headers: HeaderMap,
}

impl Default for ResponseContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseContext {
    pub fn new() -> Self {
        Self { status: StatusCode::OK, headers: HeaderMap::new() }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Sets the status through a reference, for middleware.
    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// Sets the status code. A number that is not a valid status code is
    /// logged and ignored.
    pub fn code(mut self, code: u16) -> Self {
        match StatusCode::from_u16(code) {
            Ok(status) => self.status = status,
            Err(e) => warn!(cause = %e, code = code, "ignore invalid status code"),
        }
        self
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Adds a header. An invalid name or value is logged and ignored.
    pub fn header<K, V>(mut self, name: K, value: V) -> Self
    where
        HeaderName: TryFrom<K>,
        <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
    {
        let name = HeaderName::try_from(name).map_err(Into::<http::Error>::into);
        let value = HeaderValue::try_from(value).map_err(Into::<http::Error>::into);
        match name.and_then(|name| value.map(|value| (name, value))) {
            Ok((name, value)) => {
                self.headers.append(name, value);
            }
            Err(e) => warn!(cause = %e, "ignore invalid header"),
        }
        self
    }

    /// Sends `payload` as JSON, or its debug rendering as `text/plain` when
    /// it can't be serialized.
    pub fn send<T>(self, payload: &T) -> Response<ResponseBody>
    where
        T: Serialize + Debug + ?Sized,
    {
        self.send_with(payload, mime::TEXT_PLAIN.as_ref())
    }

    /// Like [`send`](Self::send), with `content_type` for the fallback.
    pub fn send_with<T>(self, payload: &T, content_type: &str) -> Response<ResponseBody>
    where
        T: Serialize + Debug + ?Sized,
    {
        match serde_json::to_vec(payload) {
            Ok(json) => self.send_raw(json, mime::APPLICATION_JSON.as_ref()),
            Err(e) => {
                warn!(cause = %e, content_type = content_type, "payload is not serializable to json");
                self.send_raw(format!("{payload:?}"), content_type)
            }
        }
    }

    /// Sends `body` as is.
    pub fn send_raw(mut self, body: impl Into<ResponseBody>, content_type: &str) -> Response<ResponseBody> {
        match HeaderValue::from_str(content_type) {
            Ok(value) => {
                self.headers.insert(CONTENT_TYPE, value);
            }
            Err(e) => warn!(cause = %e, content_type = content_type, "ignore invalid content type"),
        }
        self.into_response(body.into())
    }

    /// Completes the response without a body.
    pub fn end(self) -> Response<ResponseBody> {
        self.into_response(ResponseBody::empty())
    }

    fn into_response(self, body: ResponseBody) -> Response<ResponseBody> {
        let mut response = Response::new(body);
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}
