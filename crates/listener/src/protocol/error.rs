use std::fmt;
use std::io;
use std::sync::Arc;

use thiserror::Error;

use crate::listener::{Operation, PhaseKind};

/// The terminal failure delivered through a response [`CompletionHandle`](crate::protocol::CompletionHandle).
///
/// Cloneable so the stored result can be replayed to observers registered after completion.
#[derive(Debug, Clone, Error)]
pub enum ExchangeError {
    #[error("protocol violation: {operation} is not allowed in phase {phase}")]
    ProtocolViolation { phase: PhaseKind, operation: Operation },

    #[error("{0}")]
    PeerClosed(PeerClosedReason),

    #[error("io error: {source}")]
    Io { source: Arc<io::Error> },

    #[error("invalid response: {reason}")]
    InvalidResponse { reason: String },

    #[error("idle timeout triggered in phase {phase}")]
    IdleTimeout { phase: PhaseKind },

    #[error("connection closed abruptly in phase {phase}")]
    AbruptClosure { phase: PhaseKind },
}

impl ExchangeError {
    pub fn peer_closed(reason: PeerClosedReason) -> Self {
        Self::PeerClosed(reason)
    }

    pub fn invalid_response<S: ToString>(str: S) -> Self {
        Self::InvalidResponse { reason: str.to_string() }
    }

    /// Translates a low-level write failure, turning a closed channel into [`ExchangeError::PeerClosed`].
    pub fn from_write_failure(cause: ChannelError, reason: PeerClosedReason) -> Self {
        match cause {
            ChannelError::Closed => Self::PeerClosed(reason),
            ChannelError::Io { source } => Self::Io { source },
        }
    }
}

/// Where the exchange was when the remote client went away.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PeerClosedReason {
    BeforeRequestCompleted,
    While100Continue,
    BeforeResponseStarted,
    WhileSendingResponse,
}

impl fmt::Display for PeerClosedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            PeerClosedReason::BeforeRequestCompleted => {
                "remote client closed the connection before completing the inbound request"
            }
            PeerClosedReason::While100Continue => {
                "remote client closed the connection while writing 100 continue response"
            }
            PeerClosedReason::BeforeResponseStarted => {
                "remote client closed the connection before initiating outbound response"
            }
            PeerClosedReason::WhileSendingResponse => {
                "remote client closed the connection while writing outbound response"
            }
        };
        f.write_str(reason)
    }
}

/// Low-level outcome of a failed [`Channel::write`](crate::connection::Channel::write).
#[derive(Debug, Clone, Error)]
pub enum ChannelError {
    #[error("channel already closed")]
    Closed,

    #[error("io error: {source}")]
    Io { source: Arc<io::Error> },
}

impl From<io::Error> for ChannelError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
            | io::ErrorKind::UnexpectedEof => ChannelError::Closed,
            _ => ChannelError::Io { source: Arc::new(e) },
        }
    }
}

/// Errors returned synchronously by [`PhaseContext`](crate::listener::PhaseContext) operations.
#[derive(Debug, Error)]
pub enum PhaseError {
    #[error("protocol violation: {operation} is not allowed in phase {phase}")]
    ProtocolViolation { phase: PhaseKind, operation: Operation },

    #[error("invalid response body: {reason}")]
    InvalidBody { reason: String },
}

impl PhaseError {
    pub fn violation(phase: PhaseKind, operation: Operation) -> Self {
        Self::ProtocolViolation { phase, operation }
    }

    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }
}

impl From<&PhaseError> for ExchangeError {
    fn from(e: &PhaseError) -> Self {
        match e {
            PhaseError::ProtocolViolation { phase, operation } => {
                ExchangeError::ProtocolViolation { phase: *phase, operation: *operation }
            }
            PhaseError::InvalidBody { reason } => ExchangeError::invalid_response(reason),
        }
    }
}

#[derive(Error, Debug)]
pub enum SendError {
    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("unsupported http version: {version:?}")]
    UnsupportedVersion { version: http::Version },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }
}

impl From<SendError> for ExchangeError {
    fn from(e: SendError) -> Self {
        ExchangeError::invalid_response(e)
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid server name: {reason}")]
    InvalidServerName { reason: String },
}
