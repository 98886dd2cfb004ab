use std::sync::Arc;

use bytes::Bytes;

use crate::protocol::{ChannelError, CompletionHandle};

/// Resolves once the frame it was returned for has been written, or has failed.
pub type WriteToken = CompletionHandle<(), ChannelError>;

/// The connection as seen by the listener phases.
///
/// Writes are issued in order and complete asynchronously; implementations must
/// preserve that order and resolve every returned token exactly once.
pub trait Channel {
    fn write(&self, frame: Bytes) -> WriteToken;

    /// Shuts the connection down once every frame written before it has been flushed.
    fn close(&self);
}

impl<C: Channel + ?Sized> Channel for Arc<C> {
    fn write(&self, frame: Bytes) -> WriteToken {
        (**self).write(frame)
    }

    fn close(&self) {
        (**self).close();
    }
}

impl<C: Channel + ?Sized> Channel for &C {
    fn write(&self, frame: Bytes) -> WriteToken {
        (**self).write(frame)
    }

    fn close(&self) {
        (**self).close();
    }
}

/// Connection level events reported by the transport to the active exchange.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// No traffic within the configured inactivity threshold.
    IdleTimeout,
    /// The peer went away without an orderly shutdown.
    AbruptClosure,
}
