//! `Transfer-Encoding: chunked` payloads, RFC 9112 §7.1.
//!
//! Chunk size lines (including extensions) are parsed with
//! `httparse::parse_chunk_size`; trailer fields are read and discarded.

use crate::protocol::{ParseError, PayloadItem};
use bytes::{Buf, BytesMut};
use httparse::Status;
use tokio_util::codec::Decoder;
use tracing::trace;

/// Upper bound for a single buffered trailer line
const MAX_TRAILER_LINE: usize = 8 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkedDecoder {
    state: ChunkedState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkedState {
    /// expecting a chunk size line
    Size,
    /// inside chunk data, with the bytes still to read
    Data(u64),
    /// expecting the CRLF closing a chunk
    DataEnd,
    /// reading trailer fields after the last chunk
    Trailer,
    /// the final CRLF has been read
    End,
}

impl ChunkedDecoder {
    pub fn new() -> Self {
        Self { state: ChunkedState::Size }
    }
}

impl Default for ChunkedDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for ChunkedDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            match self.state {
                ChunkedState::Size => match httparse::parse_chunk_size(src.as_ref()) {
                    Ok(Status::Complete((consumed, 0))) => {
                        src.advance(consumed);
                        self.state = ChunkedState::Trailer;
                    }
                    Ok(Status::Complete((consumed, size))) => {
                        src.advance(consumed);
                        trace!(size = size, "read chunk size");
                        self.state = ChunkedState::Data(size);
                    }
                    Ok(Status::Partial) => return Ok(None),
                    Err(_) => return Err(ParseError::invalid_body("invalid chunk size line")),
                },

                ChunkedState::Data(remaining) => {
                    if src.is_empty() {
                        return Ok(None);
                    }

                    let len = usize::try_from(remaining).map_or(src.len(), |remaining| remaining.min(src.len()));
                    let bytes = src.split_to(len).freeze();
                    let remaining = remaining - len as u64;

                    self.state = if remaining == 0 { ChunkedState::DataEnd } else { ChunkedState::Data(remaining) };
                    return Ok(Some(PayloadItem::Chunk(bytes)));
                }

                ChunkedState::DataEnd => {
                    if src.len() < 2 {
                        return Ok(None);
                    }
                    if !src.starts_with(b"\r\n") {
                        return Err(ParseError::invalid_body("chunk data is not terminated by CRLF"));
                    }
                    src.advance(2);
                    self.state = ChunkedState::Size;
                }

                ChunkedState::Trailer => {
                    let Some(line_end) = src.windows(2).position(|window| window == b"\r\n") else {
                        if src.len() > MAX_TRAILER_LINE {
                            return Err(ParseError::invalid_body("chunked trailer too large"));
                        }
                        return Ok(None);
                    };

                    src.advance(line_end + 2);
                    if line_end == 0 {
                        self.state = ChunkedState::End;
                    }
                }

                ChunkedState::End => return Ok(Some(PayloadItem::Eof)),
            }
        }
    }
}
