//! Payload codecs.
//!
//! Requests are decoded by [`PayloadDecoder`], which delegates to a
//! content-length or a chunked decoder. Responses are encoded by
//! [`PayloadEncoder`] with the same two framings.

mod chunked_decoder;
mod length_decoder;
mod payload_decoder;
mod payload_encoder;

pub use payload_decoder::PayloadDecoder;
pub use payload_encoder::PayloadEncoder;
