use bytes::Bytes;
use tracing::{info, trace, warn};

use crate::codec::ResponseCodec;
use crate::listener::context::{Outbound, PhaseCx};
use crate::listener::phase::{
    AwaitingResponse, CleanupAction, InboundHeaders, Operation, Phase, PhaseKind, ReceivingEntityBody,
    Response100ContinueSent, Transition, violation,
};
use crate::listener::write_status::notify_if_write_failure;
use crate::protocol::{
    ExchangeError, PayloadItem, PayloadSize, PeerClosedReason, PhaseError, RequestMessage, ResponseMessage,
};

const KIND: PhaseKind = PhaseKind::AwaitingRequestHeaders;

/// Idle connection: no request of the current exchange has been seen yet.
#[derive(Debug, Default)]
pub struct AwaitingRequestHeaders;

impl AwaitingRequestHeaders {
    pub(crate) fn on_inbound_headers(
        &mut self,
        cx: &mut PhaseCx<'_>,
        (head, payload_size): InboundHeaders,
    ) -> Result<Transition<InboundHeaders>, PhaseError> {
        let exchange = &mut *cx.exchange;
        exchange.version = head.version();
        exchange.keep_alive = cx.dispatcher.is_keep_alive(&head);
        exchange.chunk_config = cx.dispatcher.chunk_config();
        exchange.outbound = Outbound::Idle;

        let expects_continue = head.expects_continue();
        trace!(method = %head.method(), uri = %head.uri(), ?payload_size, "request headers received");
        let mut request = RequestMessage::new(head);

        if matches!(payload_size, PayloadSize::Empty | PayloadSize::Length(0)) {
            request.mark_body_complete();
            exchange.request = Some(request);
            return Ok(Transition::Enter(Phase::AwaitingResponse(AwaitingResponse)));
        }

        let status = request.response_status().cloned();
        exchange.request = Some(request);

        if !expects_continue {
            return Ok(Transition::Enter(Phase::ReceivingEntityBody(ReceivingEntityBody)));
        }

        info!("client expects 100-continue, send interim response");
        let token = cx.channel.write(ResponseCodec::continue_frame());
        if let Some(status) = status {
            notify_if_write_failure(&status, &token, PeerClosedReason::While100Continue);
        }
        Ok(Transition::Enter(Phase::Response100ContinueSent(Response100ContinueSent)))
    }

    pub(crate) fn on_inbound_body_chunk(
        &mut self,
        _cx: &mut PhaseCx<'_>,
        _item: PayloadItem,
    ) -> Result<Transition<PayloadItem>, PhaseError> {
        violation(KIND, Operation::InboundBody)
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
        _item: PayloadItem,
    ) -> Result<Transition<PayloadItem>, PhaseError> {
        violation(KIND, Operation::OutboundBody)
    }

    pub(crate) fn on_abrupt_closure(&mut self, cx: &mut PhaseCx<'_>) {
        warn!("connection closed while waiting for request headers");
        cx.reporter.report(ExchangeError::AbruptClosure { phase: KIND });
    }

    pub(crate) fn on_idle_timeout(&mut self, cx: &mut PhaseCx<'_>) -> Option<CleanupAction> {
        info!("no request within the idle timeout, close the connection");
        cx.reporter.report(ExchangeError::IdleTimeout { phase: KIND });
        Some(CleanupAction::Close)
    }
}
