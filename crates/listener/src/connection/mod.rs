//! The connection seen from the listener
//!
//! The listener never touches sockets directly. It writes frames through a [`Channel`]
//! and observes each write through the returned [`WriteToken`]; the transport reports
//! idle timeouts and abrupt closures as [`ChannelEvent`]s.
//!
//! # Components
//!
//! - [`Channel`]: ordered, asynchronously completing frame writes
//! - [`FramedChannel`] / [`ChannelWriter`]: the tokio implementation over any `AsyncWrite`
//! - [`ChannelEvent`]: connection level events delivered to the active exchange

mod channel;
mod framed_channel;

pub use channel::{Channel, ChannelEvent, WriteToken};
pub use framed_channel::{ChannelWriter, FramedChannel};

#[cfg(test)]
pub(crate) mod mock;
