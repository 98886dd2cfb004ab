use bytes::Bytes;
use http::StatusCode;
use tracing::{error, warn};

use crate::listener::context::{Outbound, PhaseCx};
use crate::listener::phase::{
    CleanupAction, InboundHeaders, Operation, Phase, PhaseKind, SendingHeaders, Transition, violation,
};
use crate::protocol::{ExchangeError, PayloadItem, PeerClosedReason, PhaseError, ResponseMessage};

const KIND: PhaseKind = PhaseKind::AwaitingResponse;

/// The request is complete and the handler has not started its response.
#[derive(Debug, Default)]
pub struct AwaitingResponse;

impl AwaitingResponse {
    pub(crate) fn on_inbound_headers(
        &mut self,
        _cx: &mut PhaseCx<'_>,
        _event: InboundHeaders,
    ) -> Result<Transition<InboundHeaders>, PhaseError> {
        violation(KIND, Operation::InboundHeaders)
    }

    pub(crate) fn on_inbound_body_chunk(
        &mut self,
        _cx: &mut PhaseCx<'_>,
        item: PayloadItem,
    ) -> Result<Transition<PayloadItem>, PhaseError> {
        match item {
            PayloadItem::Eof => Ok(Transition::Stay),
            PayloadItem::Chunk(_) => violation(KIND, Operation::InboundBody),
        }
    }

    pub(crate) fn on_outbound_headers(
        &mut self,
        _cx: &mut PhaseCx<'_>,
        _response: &mut ResponseMessage,
        _first: Option<&Bytes>,
    ) -> Result<Transition, PhaseError> {
        Ok(Transition::Redeliver(Phase::SendingHeaders(SendingHeaders::new()), ()))
    }

    /// Only valid when the headers were requested while the interim 100 response was out.
    pub(crate) fn on_outbound_body_chunk(
        &mut self,
        cx: &mut PhaseCx<'_>,
        _response: &mut ResponseMessage,
        item: PayloadItem,
    ) -> Result<Transition<PayloadItem>, PhaseError> {
        if cx.exchange.outbound != Outbound::Requested {
            return violation(KIND, Operation::OutboundBody);
        }
        Ok(Transition::Redeliver(Phase::SendingHeaders(SendingHeaders::new()), item))
    }

    pub(crate) fn on_abrupt_closure(&mut self, cx: &mut PhaseCx<'_>) {
        error!("connection closed before the response was started");
        cx.exchange.fail_response(ExchangeError::peer_closed(PeerClosedReason::BeforeResponseStarted));
    }

    pub(crate) fn on_idle_timeout(&mut self, cx: &mut PhaseCx<'_>) -> Option<CleanupAction> {
        warn!("no response within the idle timeout, answer with 504");
        cx.exchange.fail_response(ExchangeError::IdleTimeout { phase: KIND });
        cx.exchange.keep_alive = false;
        Some(CleanupAction::RespondThenClose(StatusCode::GATEWAY_TIMEOUT))
    }
}
