//! Protocol types shared by the codec and connection layers.
//!
//! - [`Message`], [`PayloadItem`], [`PayloadSize`]: the units the codec produces and consumes
//! - [`RequestHeader`]: a parsed request head without body
//! - [`ResponseHead`]: a response head without body
//! - [`body::ReqBody`]: the streaming request body handed to handlers
//! - [`HttpError`], [`ParseError`], [`SendError`]: connection level errors

mod message;
pub use message::Message;
pub use message::PayloadItem;
pub use message::PayloadSize;

mod request;
pub use request::RequestHeader;

mod response;
pub use response::ResponseHead;

mod error;
pub use error::HttpError;
pub use error::ParseError;
pub use error::SendError;

pub mod body;
