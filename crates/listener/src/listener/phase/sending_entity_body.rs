use bytes::{Bytes, BytesMut};
use tokio_util::codec::Encoder;
use tracing::{info, warn};

use crate::codec::PayloadEncoder;
use crate::listener::context::PhaseCx;
use crate::listener::phase::{
    CleanupAction, InboundHeaders, Operation, Phase, PhaseKind, ResponseCompleted, Transition, receive_late_body,
    response_encode_failure, violation,
};
use crate::listener::write_status::{check_for_response_write_status, notify_if_write_failure};
use crate::protocol::{PayloadItem, PeerClosedReason, PhaseError, ResponseMessage};

const KIND: PhaseKind = PhaseKind::SendingEntityBody;

/// Headers are out; the body follows as chunk frames.
#[derive(Debug)]
pub struct SendingEntityBody {
    encoder: PayloadEncoder,
}

impl Default for SendingEntityBody {
    fn default() -> Self {
        Self::new()
    }
}

impl SendingEntityBody {
    pub fn new() -> Self {
        Self { encoder: PayloadEncoder::chunked() }
    }

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
        cx: &mut PhaseCx<'_>,
        _response: &mut ResponseMessage,
        item: PayloadItem,
    ) -> Result<Transition<PayloadItem>, PhaseError> {
        let Some(status) = cx.exchange.response_status() else {
            return violation(KIND, Operation::OutboundBody);
        };

        let last = matches!(item, PayloadItem::Eof);
        let mut dst = BytesMut::new();
        if let Err(e) = self.encoder.encode(item, &mut dst) {
            return Ok(response_encode_failure(cx, &status, e));
        }

        // empty chunks produce no frame
        if dst.is_empty() {
            return Ok(Transition::Stay);
        }

        let token = cx.channel.write(dst.freeze());
        if !last {
            notify_if_write_failure(&status, &token, PeerClosedReason::WhileSendingResponse);
            return Ok(Transition::Stay);
        }

        if let Some(request) = cx.exchange.request_snapshot() {
            check_for_response_write_status(request, &status, &token, PeerClosedReason::WhileSendingResponse);
        }
        Ok(Transition::Enter(Phase::ResponseCompleted(ResponseCompleted)))
    }

    pub(crate) fn on_abrupt_closure(&mut self, _cx: &mut PhaseCx<'_>) {
        warn!("connection closed while writing the response body");
    }

    pub(crate) fn on_idle_timeout(&mut self, _cx: &mut PhaseCx<'_>) -> Option<CleanupAction> {
        info!("idle timeout while writing the response body");
        Some(CleanupAction::Close)
    }
}
