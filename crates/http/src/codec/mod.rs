//! `tokio_util` codecs for HTTP/1.1.
//!
//! A connection reads with [`RequestDecoder`], which yields a
//! [`Message::Header`](crate::protocol::Message::Header) followed by the
//! payload items of that request, and writes with [`ResponseEncoder`],
//! which expects the same shape.
//!
//! ```
//! use bytes::BytesMut;
//! use nano_http::codec::RequestDecoder;
//! use nano_http::protocol::{Message, PayloadItem};
//! use tokio_util::codec::Decoder;
//!
//! let mut buffer = BytesMut::from(&b"POST /user HTTP/1.1\r\nContent-Length: 2\r\n\r\nhi"[..]);
//! let mut decoder = RequestDecoder::new();
//!
//! let Some(Message::Header((header, _))) = decoder.decode(&mut buffer).unwrap() else { panic!() };
//! assert_eq!(header.uri().path(), "/user");
//!
//! let Some(Message::Payload(PayloadItem::Chunk(bytes))) = decoder.decode(&mut buffer).unwrap() else { panic!() };
//! assert_eq!(&bytes[..], b"hi");
//! ```

mod body;
mod header;
mod request_decoder;
mod response_encoder;

pub use request_decoder::RequestDecoder;
pub use response_encoder::ResponseEncoder;
