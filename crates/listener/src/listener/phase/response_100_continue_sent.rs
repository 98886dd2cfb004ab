use bytes::Bytes;
use tracing::{info, trace, warn};

use crate::codec::ResponseCodec;
use crate::listener::context::{Outbound, PhaseCx};
use crate::listener::phase::{
    CleanupAction, InboundHeaders, Operation, Phase, PhaseKind, ReceivingEntityBody, ResponseCompleted,
    SendingEntityBody, Transition, response_encode_failure, violation,
};
use crate::listener::write_status::{check_for_response_write_status, notify_if_write_failure};
use crate::protocol::{PayloadItem, PeerClosedReason, PhaseError, ResponseMessage};

const KIND: PhaseKind = PhaseKind::Response100ContinueSent;

/// The interim `100 Continue` went out and the client may now upload its body.
///
/// The interim response used up the status line written ahead of the final one, so a
/// request to write response headers is already satisfied here. The first outbound
/// body write assembles the final response. Only [`ChunkConfig::Always`] on HTTP/1.1
/// gives a headers-only frame followed by chunks; any other policy, `Auto` included,
/// gives one complete frame holding exactly the content passed with that write.
/// Callers must therefore hand over the whole body in one write, which
/// [`PhaseContext::send_response`] and [`PhaseContext::send_body`] do.
///
/// Inbound body data is handed to [`ReceivingEntityBody`] instead of being rejected.
///
/// [`ChunkConfig::Always`]: crate::listener::ChunkConfig::Always
/// [`PhaseContext::send_response`]: crate::listener::PhaseContext::send_response
/// [`PhaseContext::send_body`]: crate::listener::PhaseContext::send_body
#[derive(Debug, Default)]
pub struct Response100ContinueSent;

impl Response100ContinueSent {
    pub(crate) fn on_inbound_headers(
        &mut self,
        _cx: &mut PhaseCx<'_>,
        _event: InboundHeaders,
    ) -> Result<Transition<InboundHeaders>, PhaseError> {
        trace!("request headers already received, ignore");
        Ok(Transition::Stay)
    }

    pub(crate) fn on_inbound_body_chunk(
        &mut self,
        _cx: &mut PhaseCx<'_>,
        item: PayloadItem,
    ) -> Result<Transition<PayloadItem>, PhaseError> {
        Ok(Transition::Redeliver(Phase::ReceivingEntityBody(ReceivingEntityBody), item))
    }

    pub(crate) fn on_outbound_headers(
        &mut self,
        cx: &mut PhaseCx<'_>,
        _response: &mut ResponseMessage,
        _first: Option<&Bytes>,
    ) -> Result<Transition, PhaseError> {
        trace!("status line already sent with the interim response, defer headers to the first body write");
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
        let config = dispatcher.effective_chunk_config(cx.exchange.chunk_config, response);
        cx.exchange.chunk_config = config;
        let version = cx.exchange.version;
        let keep_alive = cx.exchange.keep_alive;

        if dispatcher.use_chunking_after_continue(config, version) {
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

        let body = item.into_bytes().unwrap_or_default();
        let frame = match ResponseCodec::encode_full_response(
            response,
            version,
            dispatcher.server_name(),
            keep_alive,
            body,
        ) {
            Ok(frame) => frame,
            Err(e) => return Ok(response_encode_failure(cx, &status, e)),
        };

        let token = cx.channel.write(frame);
        cx.exchange.outbound = Outbound::Writing;
        if let Some(request) = cx.exchange.request_snapshot() {
            check_for_response_write_status(request, &status, &token, PeerClosedReason::BeforeResponseStarted);
        }
        Ok(Transition::Enter(Phase::ResponseCompleted(ResponseCompleted)))
    }

    pub(crate) fn on_abrupt_closure(&mut self, _cx: &mut PhaseCx<'_>) {
        warn!("connection closed after the interim 100 response");
    }

    pub(crate) fn on_idle_timeout(&mut self, _cx: &mut PhaseCx<'_>) -> Option<CleanupAction> {
        info!("idle timeout after the interim 100 response");
        None
    }
}
