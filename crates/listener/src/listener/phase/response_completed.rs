use bytes::Bytes;
use tracing::{debug, trace};

use crate::listener::context::PhaseCx;
use crate::listener::phase::{
    AwaitingRequestHeaders, CleanupAction, InboundHeaders, Operation, Phase, PhaseKind, Transition,
    receive_late_body, violation,
};
use crate::protocol::{PayloadItem, PhaseError, ResponseMessage};

const KIND: PhaseKind = PhaseKind::ResponseCompleted;

/// The whole response has been handed to the channel.
#[derive(Debug, Default)]
pub struct ResponseCompleted;

impl ResponseCompleted {
    /// Starts the next exchange on a persistent connection.
    pub(crate) fn on_inbound_headers(
        &mut self,
        cx: &mut PhaseCx<'_>,
        event: InboundHeaders,
    ) -> Result<Transition<InboundHeaders>, PhaseError> {
        let body_complete = cx.exchange.request.as_ref().is_none_or(|request| request.is_body_complete());
        if !cx.exchange.keep_alive || !body_complete {
            return violation(KIND, Operation::InboundHeaders);
        }

        trace!("next request on the persistent connection");
        Ok(Transition::Redeliver(Phase::AwaitingRequestHeaders(AwaitingRequestHeaders), event))
    }

    pub(crate) fn on_inbound_body_chunk(
        &mut self,
        cx: &mut PhaseCx<'_>,
        item: PayloadItem,
    ) -> Result<Transition<PayloadItem>, PhaseError> {
        receive_late_body(cx, KIND, item)
    }

    pub(crate) fn on_outbound_headers(
        &mut self,
        _cx: &mut PhaseCx<'_>,
        _response: &mut ResponseMessage,
        _first: Option<&Bytes>,
    ) -> Result<Transition, PhaseError> {
        violation(KIND, Operation::OutboundHeaders)
    }

    pub(crate) fn on_outbound_body_chunk(
        &mut self,
        _cx: &mut PhaseCx<'_>,
        _response: &mut ResponseMessage,
        item: PayloadItem,
    ) -> Result<Transition<PayloadItem>, PhaseError> {
        match item {
            // the end of a body that was already sent as one frame
            PayloadItem::Eof => Ok(Transition::Stay),
            PayloadItem::Chunk(_) => violation(KIND, Operation::OutboundBody),
        }
    }

    pub(crate) fn on_abrupt_closure(&mut self, _cx: &mut PhaseCx<'_>) {
        debug!("connection closed after the response completed");
    }

    pub(crate) fn on_idle_timeout(&mut self, _cx: &mut PhaseCx<'_>) -> Option<CleanupAction> {
        debug!("persistent connection idle, close it");
        Some(CleanupAction::Close)
    }
}
