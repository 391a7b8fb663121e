//! Head codecs: [`HeaderDecoder`] for requests, [`HeaderEncoder`] for responses.

mod header_decoder;
mod header_encoder;

pub use header_decoder::HeaderDecoder;
pub use header_encoder::HeaderEncoder;
