//! Request body streaming.
//!
//! A connection owns the decoded message stream, while the handler owns the
//! request. [`body_channel`] bridges the two: the handler polls a [`ReqBody`],
//! each poll asks the connection side ([`BodySender`]) for exactly one more
//! payload item. Once the handler returns, the connection discards whatever
//! it left unread, so the next request on a keep-alive connection starts at a
//! message boundary.

mod body_channel;

pub use body_channel::BodySender;
pub use body_channel::ReqBody;
pub use body_channel::body_channel;
