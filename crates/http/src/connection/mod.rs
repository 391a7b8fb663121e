//! Per-connection request loop.
//!
//! [`HttpConnection`] reads requests one after another from the same
//! stream (keep-alive and pipelining), hands each one to a
//! [`Handler`](crate::handler::Handler) and writes the response before
//! reading the next request.

mod http_connection;

pub use http_connection::HttpConnection;
