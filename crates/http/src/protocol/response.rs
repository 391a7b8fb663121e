use http::Response;

/// The head of an outbound response; the body is streamed separately as
/// [`PayloadItem`](crate::protocol::PayloadItem)s.
pub type ResponseHead = Response<()>;
