use crate::protocol::{PayloadItem, PayloadSize, SendError};
use bytes::{Buf, BufMut, BytesMut};
use std::io::Write;
use tokio_util::codec::Encoder;
use tracing::warn;

/// Encodes a response payload with the framing written into its head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadEncoder {
    kind: Kind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Kind {
    /// bytes still allowed by `Content-Length`
    Length(u64),
    Chunked { eof: bool },
    NoBody,
}

impl PayloadEncoder {
    pub fn empty() -> Self {
        Self { kind: Kind::NoBody }
    }

    pub fn chunked() -> Self {
        Self { kind: Kind::Chunked { eof: false } }
    }

    pub fn fix_length(size: u64) -> Self {
        Self { kind: Kind::Length(size) }
    }

    /// Whether the whole payload has been written.
    pub fn is_finish(&self) -> bool {
        match self.kind {
            Kind::Length(remaining) => remaining == 0,
            Kind::Chunked { eof } => eof,
            Kind::NoBody => true,
        }
    }
}

impl From<PayloadSize> for PayloadEncoder {
    fn from(payload_size: PayloadSize) -> Self {
        match payload_size {
            PayloadSize::Length(size) => PayloadEncoder::fix_length(size),
            PayloadSize::Chunked => PayloadEncoder::chunked(),
            PayloadSize::Empty => PayloadEncoder::empty(),
        }
    }
}

impl<D: Buf> Encoder<PayloadItem<D>> for PayloadEncoder {
    type Error = SendError;

    fn encode(&mut self, item: PayloadItem<D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match (&mut self.kind, item) {
            (Kind::Length(remaining), PayloadItem::Chunk(mut bytes)) => {
                let size = bytes.remaining() as u64;
                if size > *remaining {
                    warn!(size = size, remaining = *remaining, "response body exceeds its content-length");
                    return Err(SendError::invalid_body("response body exceeds its content-length"));
                }
                *remaining -= size;
                dst.put(&mut bytes);
                Ok(())
            }
            (Kind::Length(remaining), PayloadItem::Eof) => {
                if *remaining > 0 {
                    return Err(SendError::invalid_body(format!("response body is {remaining} bytes short")));
                }
                Ok(())
            }

            (Kind::Chunked { eof: true }, _) => Ok(()),
            (Kind::Chunked { .. }, PayloadItem::Chunk(mut bytes)) => {
                if !bytes.has_remaining() {
                    return Ok(());
                }
                write!(dst.writer(), "{:X}\r\n", bytes.remaining())?;
                dst.put(&mut bytes);
                dst.put_slice(b"\r\n");
                Ok(())
            }
            (Kind::Chunked { eof }, PayloadItem::Eof) => {
                *eof = true;
                dst.put_slice(b"0\r\n\r\n");
                Ok(())
            }

            (Kind::NoBody, _) => Ok(()),
        }
    }
}
