//! Response head encoding.

use crate::protocol::{PayloadSize, ResponseHead, SendError};

use bytes::{BufMut, BytesMut};
use http::{HeaderValue, Version, header};
use std::io::Write;
use tokio_util::codec::Encoder;
use tracing::error;

/// Initial buffer size reserved for the head
const INIT_HEADER_SIZE: usize = 1024;

/// Writes the status line and headers of a response.
///
/// The framing header always reflects `PayloadSize`: `Content-Length` for
/// fixed and empty payloads, `Transfer-Encoding: chunked` otherwise.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeaderEncoder;

impl Encoder<(ResponseHead, PayloadSize)> for HeaderEncoder {
    type Error = SendError;

    fn encode(&mut self, item: (ResponseHead, PayloadSize), dst: &mut BytesMut) -> Result<(), Self::Error> {
        let (mut head, payload_size) = item;

        // HTTP/1.0 peers get an HTTP/1.1 status line, which they must accept
        if head.version() > Version::HTTP_11 {
            error!(http_version = ?head.version(), "unsupported http version");
            return Err(SendError::UnsupportedVersion(head.version()));
        }

        dst.reserve(INIT_HEADER_SIZE);
        let status = head.status();
        write!(dst.writer(), "HTTP/1.1 {} {}\r\n", status.as_str(), status.canonical_reason().unwrap_or(""))?;

        let headers = head.headers_mut();
        match payload_size {
            PayloadSize::Length(n) => {
                headers.remove(header::TRANSFER_ENCODING);
                headers.insert(header::CONTENT_LENGTH, HeaderValue::from(n));
            }
            PayloadSize::Chunked => {
                headers.remove(header::CONTENT_LENGTH);
                headers.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
            }
            PayloadSize::Empty => {
                headers.remove(header::TRANSFER_ENCODING);
                headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("0"));
            }
        }

        for (name, value) in headers.iter() {
            dst.put_slice(name.as_ref());
            dst.put_slice(b": ");
            dst.put_slice(value.as_bytes());
            dst.put_slice(b"\r\n");
        }
        dst.put_slice(b"\r\n");
        Ok(())
    }
}
