//! Request and response bodies.
//!
//! A request body is read in full before middleware run and exposed as a
//! [`RequestBody`]: parsed JSON when the bytes are valid JSON, text
//! otherwise. A [`ResponseBody`] is a single buffer written in one go.

use bytes::Bytes;
use http_body::Body as HttpBody;
use http_body::{Frame, SizeHint};
use http_body_util::BodyExt;
use std::convert::Infallible;
use std::error::Error;
use std::pin::Pin;
use std::task::{Context, Poll};
use thiserror::Error;
use tracing::trace;

/// A fully read request body.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(serde_json::Value),
    Text(String),
}

impl RequestBody {
    pub fn empty() -> Self {
        RequestBody::Text(String::new())
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            RequestBody::Json(value) => Some(value),
            RequestBody::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            RequestBody::Json(_) => None,
            RequestBody::Text(text) => Some(text),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, RequestBody::Text(text) if text.is_empty())
    }

    fn from_bytes(bytes: &[u8]) -> Self {
        if bytes.is_empty() {
            return Self::empty();
        }

        match serde_json::from_slice(bytes) {
            Ok(value) => RequestBody::Json(value),
            Err(e) => {
                trace!(cause = %e, "request body is not json, keep it as text");
                RequestBody::Text(String::from_utf8_lossy(bytes).into_owned())
            }
        }
    }
}

/// The request body stream broke before it was complete.
#[derive(Error, Debug)]
#[error("failed to read request body: {source}")]
pub struct BodyError {
    source: Box<dyn Error + Send + Sync>,
}

/// Collects every frame of `body`, then parses the bytes.
///
/// Parsing never fails: bytes that are not JSON become
/// [`RequestBody::Text`]. Only a broken stream is an error.
pub async fn read_body<B>(body: B) -> Result<RequestBody, BodyError>
where
    B: HttpBody<Data = Bytes>,
    B::Error: Into<Box<dyn Error + Send + Sync>>,
{
    let bytes = body.collect().await.map_err(|e| BodyError { source: e.into() })?.to_bytes();
    trace!(size = bytes.len(), "read request body");
    Ok(RequestBody::from_bytes(&bytes))
}

#[derive(Debug, Default)]
pub struct ResponseBody {
    inner: Option<Bytes>,
}

impl ResponseBody {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn once(bytes: Bytes) -> Self {
        Self { inner: Some(bytes) }
    }
}

impl From<String> for ResponseBody {
    fn from(value: String) -> Self {
        Self::from(Bytes::from(value))
    }
}

impl From<Vec<u8>> for ResponseBody {
    fn from(value: Vec<u8>) -> Self {
        Self::from(Bytes::from(value))
    }
}

impl From<Bytes> for ResponseBody {
    fn from(bytes: Bytes) -> Self {
        if bytes.is_empty() { Self::empty() } else { Self::once(bytes) }
    }
}

impl From<&'static str> for ResponseBody {
    fn from(value: &'static str) -> Self {
        Self::from(Bytes::from_static(value.as_bytes()))
    }
}

impl HttpBody for ResponseBody {
    type Data = Bytes;
    type Error = Infallible;

    fn poll_frame(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        Poll::Ready(self.get_mut().inner.take().map(|bytes| Ok(Frame::data(bytes))))
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_none()
    }

    fn size_hint(&self) -> SizeHint {
        SizeHint::with_exact(self.inner.as_ref().map_or(0, |bytes| bytes.len() as u64))
    }
}
