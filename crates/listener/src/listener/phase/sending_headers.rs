use std::mem;

use bytes::{Bytes, BytesMut};
use tracing::{info, trace, warn};

use crate::codec::ResponseCodec;
use crate::listener::context::{Outbound, PhaseCx};
use crate::listener::phase::{
    CleanupAction, InboundHeaders, Operation, Phase, PhaseKind, ResponseCompleted, SendingEntityBody, Transition,
    receive_late_body, response_encode_failure, violation,
};
use crate::listener::write_status::{check_for_response_write_status, notify_if_write_failure};
use crate::protocol::{PayloadItem, PeerClosedReason, PhaseError, ResponseMessage};

const KIND: PhaseKind = PhaseKind::SendingHeaders;

/// The handler asked for a response; nothing of it has been written yet.
///
/// Without chunked framing the body is buffered here until its end, then written
/// together with the headers.
#[derive(Debug, Default)]
pub struct SendingHeaders {
    chunked: Option<bool>,
    buffered: BytesMut,
}

impl SendingHeaders {
    pub fn new() -> Self {
        Self::default()
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
        cx: &mut PhaseCx<'_>,
        response: &mut ResponseMessage,
        _first: Option<&Bytes>,
    ) -> Result<Transition, PhaseError> {
        trace!(status = %response.status(), "response requested");
        cx.exchange.outbound = Outbound::Requested;
        Ok(Transition::Stay)
    }

    pub(crate) fn on_outbound_body_chunk(
        &mut self,
        cx: &mut PhaseCx<'_>,
        response: &mut ResponseMessage,
        item: PayloadItem,
    ) -> Result<Transition<PayloadItem>, PhaseError> {
        let Some(status) = cx.exchange.response_status() else {
            return violation(KIND, Operation::OutboundBody);
        };

        let dispatcher = cx.dispatcher;
        let version = cx.exchange.version;
        let keep_alive = cx.exchange.keep_alive;

        let chunked = match self.chunked {
            Some(chunked) => chunked,
            None => {
                let config = dispatcher.effective_chunk_config(cx.exchange.chunk_config, response);
                cx.exchange.chunk_config = config;
                let chunked = dispatcher.use_chunking(config, response, version);
                self.chunked = Some(chunked);
                chunked
            }
        };

        if chunked {
            let server_name = dispatcher.server_name();
            let frame = match ResponseCodec::encode_headers_only(response, version, server_name, keep_alive) {
                Ok(frame) => frame,
                Err(e) => return Ok(response_encode_failure(cx, &status, e)),
            };

            let token = cx.channel.write(frame);
            cx.exchange.outbound = Outbound::Writing;
            notify_if_write_failure(&status, &token, PeerClosedReason::BeforeResponseStarted);
            return Ok(Transition::Redeliver(Phase::SendingEntityBody(SendingEntityBody::new()), item));
        }

        let PayloadItem::Chunk(bytes) = item else {
            let body = mem::take(&mut self.buffered).freeze();
            let server_name = dispatcher.server_name();
            let frame = match ResponseCodec::encode_full_response(response, version, server_name, keep_alive, body) {
                Ok(frame) => frame,
                Err(e) => return Ok(response_encode_failure(cx, &status, e)),
            };

            let token = cx.channel.write(frame);
            cx.exchange.outbound = Outbound::Writing;
            if let Some(request) = cx.exchange.request_snapshot() {
                check_for_response_write_status(request, &status, &token, PeerClosedReason::BeforeResponseStarted);
            }
            return Ok(Transition::Enter(Phase::ResponseCompleted(ResponseCompleted)));
        };

        self.buffered.extend_from_slice(&bytes);
        Ok(Transition::Stay)
    }

    pub(crate) fn on_abrupt_closure(&mut self, _cx: &mut PhaseCx<'_>) {
        warn!(buffered = self.buffered.len(), "connection closed before the response headers were written");
    }

    pub(crate) fn on_idle_timeout(&mut self, _cx: &mut PhaseCx<'_>) -> Option<CleanupAction> {
        info!("idle timeout while the response is being prepared");
        Some(CleanupAction::Close)
    }
}
