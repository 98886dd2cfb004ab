//! Core HTTP protocol types shared by the codec, the connection and the listener phases.
//!
//! - **Messages** ([`http_message`]): the mutable request and response being exchanged
//!   - [`HttpMessage`]: head, body chunks and a [`Properties`] bag
//!   - [`RequestMessage`] / [`ResponseMessage`]: the two concrete message kinds
//!
//! - **Payload** ([`message`]): body chunk events
//!   - [`PayloadItem`]: a chunk of data or the terminal EOF marker
//!   - [`PayloadSize`]: how a body is framed on the wire
//!
//! - **Heads** ([`request`], [`response`]): [`RequestHeader`] and [`ResponseHead`]
//!
//! - **Completion** ([`completion`]): [`CompletionHandle`], the single-fire result used
//!   for write tokens and for [`ResponseStatus`]
//!
//! - **Errors** ([`error`]): [`ExchangeError`], [`PhaseError`], [`ChannelError`],
//!   [`SendError`] and [`ConfigError`]

mod message;
pub use message::PayloadItem;
pub use message::PayloadSize;

mod request;
pub use request::ConnectionOption;
pub use request::RequestHeader;

mod response;
pub use response::ResponseHead;

mod completion;
pub use completion::CompletionHandle;

mod http_message;
pub use http_message::HttpMessage;
pub use http_message::MessageHead;
pub use http_message::Properties;
pub use http_message::RequestMessage;
pub use http_message::ResponseMessage;
pub use http_message::ResponseStatus;

mod error;
pub use error::ChannelError;
pub use error::ConfigError;
pub use error::ExchangeError;
pub use error::PeerClosedReason;
pub use error::PhaseError;
pub use error::SendError;
