//! The listener phases.
//!
//! [`Phase`] is a closed enum: every event is matched exhaustively against every
//! variant below, so the table of which phase accepts, ignores or rejects which
//! operation is spelled out in one place. A handler never turns one variant into
//! another; it returns a [`Transition`] and the [`PhaseContext`](super::PhaseContext)
//! installs the replacement.

use std::fmt;

use bytes::Bytes;
use tracing::{error, trace};

use crate::listener::context::PhaseCx;
use crate::protocol::{
    ExchangeError, PayloadItem, PayloadSize, PhaseError, RequestHeader, ResponseMessage, ResponseStatus, SendError,
};

mod awaiting_request_headers;
mod awaiting_response;
mod receiving_entity_body;
mod response_100_continue_sent;
mod response_completed;
mod sending_entity_body;
mod sending_headers;

pub use awaiting_request_headers::AwaitingRequestHeaders;
pub use awaiting_response::AwaitingResponse;
pub use receiving_entity_body::ReceivingEntityBody;
pub use response_100_continue_sent::Response100ContinueSent;
pub use response_completed::ResponseCompleted;
pub use sending_entity_body::SendingEntityBody;
pub use sending_headers::SendingHeaders;

/// What the phase asks the context to do once its handler returns.
#[derive(Debug)]
pub(crate) enum Transition<E = ()> {
    Stay,
    Enter(Phase),
    /// Install the phase, then hand it the same event again.
    Redeliver(Phase, E),
}

pub(crate) type InboundHeaders = (RequestHeader, PayloadSize);

/// Follow-up the transport should perform after an idle timeout.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CleanupAction {
    Close,
    /// Write a bodyless response with this status, then close.
    RespondThenClose(http::StatusCode),
}

/// The event families a phase handles.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Operation {
    InboundHeaders,
    InboundBody,
    OutboundHeaders,
    OutboundBody,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::InboundHeaders => "reading inbound request headers",
            Operation::InboundBody => "reading inbound request body",
            Operation::OutboundHeaders => "writing outbound response headers",
            Operation::OutboundBody => "writing outbound response body",
        };
        f.write_str(name)
    }
}

/// Field-less mirror of [`Phase`], used in errors and logs.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    AwaitingRequestHeaders,
    ReceivingEntityBody,
    AwaitingResponse,
    Response100ContinueSent,
    SendingHeaders,
    SendingEntityBody,
    ResponseCompleted,
    Closed,
}

impl fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// The protocol phase of a connection's active exchange.
#[derive(Debug)]
pub enum Phase {
    AwaitingRequestHeaders(AwaitingRequestHeaders),
    /// Request headers are in and body chunks are still arriving.
    ReceivingEntityBody(ReceivingEntityBody),
    /// The request is complete; nothing has been asked of the outbound side yet.
    AwaitingResponse(AwaitingResponse),
    Response100ContinueSent(Response100ContinueSent),
    SendingHeaders(SendingHeaders),
    SendingEntityBody(SendingEntityBody),
    ResponseCompleted(ResponseCompleted),
    Closed,
}

impl Default for Phase {
    fn default() -> Self {
        Phase::AwaitingRequestHeaders(AwaitingRequestHeaders)
    }
}

impl Phase {
    pub fn kind(&self) -> PhaseKind {
        match self {
            Phase::AwaitingRequestHeaders(_) => PhaseKind::AwaitingRequestHeaders,
            Phase::ReceivingEntityBody(_) => PhaseKind::ReceivingEntityBody,
            Phase::AwaitingResponse(_) => PhaseKind::AwaitingResponse,
            Phase::Response100ContinueSent(_) => PhaseKind::Response100ContinueSent,
            Phase::SendingHeaders(_) => PhaseKind::SendingHeaders,
            Phase::SendingEntityBody(_) => PhaseKind::SendingEntityBody,
            Phase::ResponseCompleted(_) => PhaseKind::ResponseCompleted,
            Phase::Closed => PhaseKind::Closed,
        }
    }

    pub(crate) fn on_inbound_headers(
        &mut self,
        cx: &mut PhaseCx<'_>,
        event: InboundHeaders,
    ) -> Result<Transition<InboundHeaders>, PhaseError> {
        match self {
            Phase::AwaitingRequestHeaders(phase) => phase.on_inbound_headers(cx, event),
            Phase::ReceivingEntityBody(phase) => phase.on_inbound_headers(cx, event),
            Phase::AwaitingResponse(phase) => phase.on_inbound_headers(cx, event),
            Phase::Response100ContinueSent(phase) => phase.on_inbound_headers(cx, event),
            Phase::SendingHeaders(phase) => phase.on_inbound_headers(cx, event),
            Phase::SendingEntityBody(phase) => phase.on_inbound_headers(cx, event),
            Phase::ResponseCompleted(phase) => phase.on_inbound_headers(cx, event),
            Phase::Closed => closed_no_op(Operation::InboundHeaders),
        }
    }

    pub(crate) fn on_inbound_body_chunk(
        &mut self,
        cx: &mut PhaseCx<'_>,
        item: PayloadItem,
    ) -> Result<Transition<PayloadItem>, PhaseError> {
        match self {
            Phase::AwaitingRequestHeaders(phase) => phase.on_inbound_body_chunk(cx, item),
            Phase::ReceivingEntityBody(phase) => phase.on_inbound_body_chunk(cx, item),
            Phase::AwaitingResponse(phase) => phase.on_inbound_body_chunk(cx, item),
            Phase::Response100ContinueSent(phase) => phase.on_inbound_body_chunk(cx, item),
            Phase::SendingHeaders(phase) => phase.on_inbound_body_chunk(cx, item),
            Phase::SendingEntityBody(phase) => phase.on_inbound_body_chunk(cx, item),
            Phase::ResponseCompleted(phase) => phase.on_inbound_body_chunk(cx, item),
            Phase::Closed => closed_no_op(Operation::InboundBody),
        }
    }

    pub(crate) fn on_outbound_headers(
        &mut self,
        cx: &mut PhaseCx<'_>,
        response: &mut ResponseMessage,
        first: Option<&Bytes>,
    ) -> Result<Transition, PhaseError> {
        match self {
            Phase::AwaitingRequestHeaders(phase) => phase.on_outbound_headers(cx, response, first),
            Phase::ReceivingEntityBody(phase) => phase.on_outbound_headers(cx, response, first),
            Phase::AwaitingResponse(phase) => phase.on_outbound_headers(cx, response, first),
            Phase::Response100ContinueSent(phase) => phase.on_outbound_headers(cx, response, first),
            Phase::SendingHeaders(phase) => phase.on_outbound_headers(cx, response, first),
            Phase::SendingEntityBody(phase) => phase.on_outbound_headers(cx, response, first),
            Phase::ResponseCompleted(phase) => phase.on_outbound_headers(cx, response, first),
            Phase::Closed => closed_no_op(Operation::OutboundHeaders),
        }
    }

    pub(crate) fn on_outbound_body_chunk(
        &mut self,
        cx: &mut PhaseCx<'_>,
        response: &mut ResponseMessage,
        item: PayloadItem,
    ) -> Result<Transition<PayloadItem>, PhaseError> {
        match self {
            Phase::AwaitingRequestHeaders(phase) => phase.on_outbound_body_chunk(cx, response, item),
            Phase::ReceivingEntityBody(phase) => phase.on_outbound_body_chunk(cx, response, item),
            Phase::AwaitingResponse(phase) => phase.on_outbound_body_chunk(cx, response, item),
            Phase::Response100ContinueSent(phase) => phase.on_outbound_body_chunk(cx, response, item),
            Phase::SendingHeaders(phase) => phase.on_outbound_body_chunk(cx, response, item),
            Phase::SendingEntityBody(phase) => phase.on_outbound_body_chunk(cx, response, item),
            Phase::ResponseCompleted(phase) => phase.on_outbound_body_chunk(cx, response, item),
            Phase::Closed => closed_no_op(Operation::OutboundBody),
        }
    }

    pub(crate) fn on_abrupt_closure(&mut self, cx: &mut PhaseCx<'_>) {
        match self {
            Phase::AwaitingRequestHeaders(phase) => phase.on_abrupt_closure(cx),
            Phase::ReceivingEntityBody(phase) => phase.on_abrupt_closure(cx),
            Phase::AwaitingResponse(phase) => phase.on_abrupt_closure(cx),
            Phase::Response100ContinueSent(phase) => phase.on_abrupt_closure(cx),
            Phase::SendingHeaders(phase) => phase.on_abrupt_closure(cx),
            Phase::SendingEntityBody(phase) => phase.on_abrupt_closure(cx),
            Phase::ResponseCompleted(phase) => phase.on_abrupt_closure(cx),
            Phase::Closed => trace!("channel closure after the exchange was closed"),
        }
    }

    pub(crate) fn on_idle_timeout(&mut self, cx: &mut PhaseCx<'_>) -> Option<CleanupAction> {
        match self {
            Phase::AwaitingRequestHeaders(phase) => phase.on_idle_timeout(cx),
            Phase::ReceivingEntityBody(phase) => phase.on_idle_timeout(cx),
            Phase::AwaitingResponse(phase) => phase.on_idle_timeout(cx),
            Phase::Response100ContinueSent(phase) => phase.on_idle_timeout(cx),
            Phase::SendingHeaders(phase) => phase.on_idle_timeout(cx),
            Phase::SendingEntityBody(phase) => phase.on_idle_timeout(cx),
            Phase::ResponseCompleted(phase) => phase.on_idle_timeout(cx),
            Phase::Closed => None,
        }
    }
}

fn closed_no_op<E>(operation: Operation) -> Result<Transition<E>, PhaseError> {
    trace!(%operation, "exchange already closed, ignore");
    Ok(Transition::Stay)
}

/// Rejects an operation the phase does not support.
pub(crate) fn violation<E>(phase: PhaseKind, operation: Operation) -> Result<Transition<E>, PhaseError> {
    error!(%phase, %operation, "protocol violation");
    Err(PhaseError::violation(phase, operation))
}

/// A response that cannot be serialized is failed and ends the exchange.
pub(crate) fn response_encode_failure<E>(cx: &mut PhaseCx<'_>, status: &ResponseStatus, e: SendError) -> Transition<E> {
    error!(cause = %e, "failed to encode response");
    status.fail(ExchangeError::from(e));
    cx.exchange.keep_alive = false;
    Transition::Enter(Phase::ResponseCompleted(ResponseCompleted))
}

/// Shared by the outbound phases: the peer may still be uploading while the response goes out.
pub(crate) fn receive_late_body<E>(
    cx: &mut PhaseCx<'_>,
    phase: PhaseKind,
    item: PayloadItem,
) -> Result<Transition<E>, PhaseError> {
    let Some(request) = cx.exchange.request.as_mut() else {
        return violation(phase, Operation::InboundBody);
    };

    if request.is_body_complete() {
        return match item {
            // a repeated terminal marker is harmless
            PayloadItem::Eof => Ok(Transition::Stay),
            PayloadItem::Chunk(_) => violation(phase, Operation::InboundBody),
        };
    }

    match item {
        PayloadItem::Chunk(bytes) => request.push_chunk(bytes),
        PayloadItem::Eof => request.mark_body_complete(),
    }
    Ok(Transition::Stay)
}
