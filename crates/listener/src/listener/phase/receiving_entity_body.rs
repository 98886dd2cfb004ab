use bytes::Bytes;
use http::StatusCode;
use tracing::{error, trace, warn};

use crate::listener::context::{Outbound, PhaseCx};
use crate::listener::phase::{
    AwaitingResponse, CleanupAction, InboundHeaders, Operation, Phase, PhaseKind, SendingHeaders, Transition,
    violation,
};
use crate::protocol::{ExchangeError, PayloadItem, PeerClosedReason, PhaseError, ResponseMessage};

const KIND: PhaseKind = PhaseKind::ReceivingEntityBody;

/// The request head is in and its body is still arriving.
#[derive(Debug, Default)]
pub struct ReceivingEntityBody;

impl ReceivingEntityBody {
    pub(crate) fn on_inbound_headers(
        &mut self,
        _cx: &mut PhaseCx<'_>,
        _event: InboundHeaders,
    ) -> Result<Transition<InboundHeaders>, PhaseError> {
        violation(KIND, Operation::InboundHeaders)
    }

    pub(crate) fn on_inbound_body_chunk(
        &mut self,
        cx: &mut PhaseCx<'_>,
        item: PayloadItem,
    ) -> Result<Transition<PayloadItem>, PhaseError> {
        let Some(request) = cx.exchange.request.as_mut() else {
            return violation(KIND, Operation::InboundBody);
        };

        match item {
            PayloadItem::Chunk(bytes) => {
                trace!(len = bytes.len(), "request body chunk received");
                request.push_chunk(bytes);
                Ok(Transition::Stay)
            }
            PayloadItem::Eof => {
                trace!(len = request.body_len(), "request body complete");
                request.mark_body_complete();
                Ok(Transition::Enter(Phase::AwaitingResponse(AwaitingResponse)))
            }
        }
    }

    /// The handler answers before the upload finished.
    pub(crate) fn on_outbound_headers(
        &mut self,
        _cx: &mut PhaseCx<'_>,
        _response: &mut ResponseMessage,
        _first: Option<&Bytes>,
    ) -> Result<Transition, PhaseError> {
        trace!("early response while the request body is still arriving");
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
        error!("connection closed before the request body was complete");
        cx.exchange.fail_response(ExchangeError::peer_closed(PeerClosedReason::BeforeRequestCompleted));
        cx.reporter.report(ExchangeError::AbruptClosure { phase: KIND });
    }

    pub(crate) fn on_idle_timeout(&mut self, cx: &mut PhaseCx<'_>) -> Option<CleanupAction> {
        warn!("request body stalled, answer with 408");
        cx.exchange.fail_response(ExchangeError::IdleTimeout { phase: KIND });
        cx.exchange.keep_alive = false;
        Some(CleanupAction::RespondThenClose(StatusCode::REQUEST_TIMEOUT))
    }
}
