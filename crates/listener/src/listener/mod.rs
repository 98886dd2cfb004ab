//! The protocol phase engine of one connection.
//!
//! Each connection owns a [`PhaseContext`], which holds the current [`Phase`] of the
//! active exchange and the request being answered. The transport feeds it inbound
//! events (request headers, body chunks) and channel events (idle timeout, abrupt
//! closure); the handler's response reaches the same phase through
//! [`PhaseContext::send_response`] or [`PhaseContext::send_body`].
//!
//! # Phases
//!
//! - [`AwaitingRequestHeaders`]: enters [`ReceivingEntityBody`], [`AwaitingResponse`] when
//!   no body follows, or [`Response100ContinueSent`] after writing `100 Continue`
//! - [`ReceivingEntityBody`]: enters [`AwaitingResponse`] at the end of the body, or
//!   [`SendingHeaders`] for an early response
//! - [`Response100ContinueSent`]: hands body data to [`ReceivingEntityBody`]; the first
//!   response body write enters [`SendingEntityBody`] or [`ResponseCompleted`]
//! - [`SendingHeaders`]: enters [`SendingEntityBody`] when chunked, otherwise
//!   [`ResponseCompleted`] once the buffered body is written
//! - [`ResponseCompleted`]: the next request on a persistent connection restarts at
//!   [`AwaitingRequestHeaders`]; otherwise the exchange ends in [`Phase::Closed`]
//!
//! Every phase handles every event. Events a phase does not expect are either
//! explicit no-ops or rejected with [`PhaseError::ProtocolViolation`], and in both
//! cases the exchange is left untouched.
//!
//! # Completion
//!
//! The request's [`ResponseStatus`] fires exactly once: with a snapshot of the
//! request when the last frame of its response has been written, or with the first
//! failure. A write failing on a closed channel is reported as
//! [`ExchangeError::PeerClosed`]. Once a response has been requested the context
//! itself fails the status on idle timeout and abrupt closure, so the phases that
//! write the response only log those events.
//!
//! [`PhaseError::ProtocolViolation`]: crate::protocol::PhaseError::ProtocolViolation
//! [`ResponseStatus`]: crate::protocol::ResponseStatus
//! [`ExchangeError::PeerClosed`]: crate::protocol::ExchangeError::PeerClosed

mod context;
mod dispatcher;
mod phase;
mod write_status;

pub use context::PhaseContext;
pub use dispatcher::{CHUNKING_CONFIG, ChunkConfig, DispatcherBuilder, ResponseDispatcher};
pub use phase::{
    AwaitingRequestHeaders, AwaitingResponse, CleanupAction, Operation, Phase, PhaseKind, ReceivingEntityBody,
    Response100ContinueSent, ResponseCompleted, SendingEntityBody, SendingHeaders,
};
