use std::sync::Arc;

use bytes::Bytes;
use futures::channel::mpsc;
use http::Version;
use tracing::{error, info, trace, warn};

use crate::codec::ResponseCodec;
use crate::connection::{Channel, ChannelEvent};
use crate::listener::phase::{CleanupAction, Phase, Transition};
use crate::listener::{ChunkConfig, ResponseDispatcher};
use crate::protocol::{
    ExchangeError, PayloadItem, PayloadSize, PeerClosedReason, PhaseError, RequestHeader, RequestMessage,
    ResponseMessage, ResponseStatus,
};

/// How far the outbound side of the exchange has got.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub(crate) enum Outbound {
    #[default]
    Idle,
    /// A response was requested but no frame has been written yet.
    Requested,
    Writing,
}

/// Per-exchange state shared by the phases.
#[derive(Debug)]
pub(crate) struct Exchange {
    pub(crate) request: Option<RequestMessage>,
    pub(crate) version: Version,
    pub(crate) keep_alive: bool,
    pub(crate) chunk_config: ChunkConfig,
    pub(crate) outbound: Outbound,
}

impl Exchange {
    pub(crate) fn new(chunk_config: ChunkConfig) -> Self {
        Self { request: None, version: Version::HTTP_11, keep_alive: true, chunk_config, outbound: Outbound::Idle }
    }

    pub(crate) fn response_status(&self) -> Option<ResponseStatus> {
        self.request.as_ref().and_then(RequestMessage::response_status).cloned()
    }

    pub(crate) fn request_snapshot(&self) -> Option<RequestMessage> {
        self.request.as_ref().map(RequestMessage::snapshot)
    }

    pub(crate) fn fail_response(&self, cause: ExchangeError) {
        if let Some(status) = self.response_status() {
            status.fail(cause);
        }
    }
}

/// Forwards connection level failures to whoever embeds the listener.
#[derive(Debug, Default)]
pub(crate) struct ErrorReporter {
    sink: Option<mpsc::UnboundedSender<ExchangeError>>,
}

impl ErrorReporter {
    pub(crate) fn report(&self, error: ExchangeError) {
        let Some(sink) = &self.sink else {
            trace!(cause = %error, "no error sink registered");
            return;
        };
        if sink.unbounded_send(error).is_err() {
            trace!("error sink dropped");
        }
    }
}

/// What a phase may touch while handling one event.
pub(crate) struct PhaseCx<'a> {
    pub(crate) exchange: &'a mut Exchange,
    pub(crate) channel: &'a dyn Channel,
    pub(crate) dispatcher: &'a ResponseDispatcher,
    pub(crate) reporter: &'a ErrorReporter,
}

/// Holds the current [`Phase`] of a connection's active exchange and routes every event through it.
///
/// The context is the only place a phase transition is applied. It is driven by one
/// caller at a time (every entry point takes `&mut self`), which is what keeps the
/// inbound and outbound directions from interleaving halfway through an event.
///
/// Besides the phases, the context subscribes the outbound side to channel events:
/// once a response has been requested, it is the authoritative notifier of the
/// response status when the channel times out or goes away. Phases that are busy
/// writing the response therefore only log those events.
#[derive(Debug)]
pub struct PhaseContext<C> {
    phase: Phase,
    exchange: Exchange,
    channel: C,
    dispatcher: Arc<ResponseDispatcher>,
    reporter: ErrorReporter,
}

impl<C: Channel> PhaseContext<C> {
    pub fn new(channel: C, dispatcher: Arc<ResponseDispatcher>) -> Self {
        Self {
            phase: Phase::default(),
            exchange: Exchange::new(dispatcher.chunk_config()),
            channel,
            dispatcher,
            reporter: ErrorReporter::default(),
        }
    }

    /// Reports closures and timeouts that no response status is waiting for to `sink`.
    #[must_use]
    pub fn with_error_sink(mut self, sink: mpsc::UnboundedSender<ExchangeError>) -> Self {
        self.reporter = ErrorReporter { sink: Some(sink) };
        self
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    /// Installs `phase` immediately.
    pub fn set_phase(&mut self, phase: Phase) {
        trace!(from = %self.phase.kind(), to = %phase.kind(), "phase transition");
        self.phase = phase;
    }

    pub fn request(&self) -> Option<&RequestMessage> {
        self.exchange.request.as_ref()
    }

    pub fn response_status(&self) -> Option<ResponseStatus> {
        self.exchange.response_status()
    }

    pub fn version(&self) -> Version {
        self.exchange.version
    }

    pub fn keep_alive(&self) -> bool {
        self.exchange.keep_alive
    }

    pub fn dispatcher(&self) -> &ResponseDispatcher {
        &self.dispatcher
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    fn split(&mut self) -> (&mut Phase, PhaseCx<'_>) {
        (
            &mut self.phase,
            PhaseCx {
                exchange: &mut self.exchange,
                channel: &self.channel,
                dispatcher: &self.dispatcher,
                reporter: &self.reporter,
            },
        )
    }

    /// Applies a transition and hands back the event when it has to be redelivered.
    fn apply<E>(&mut self, transition: Transition<E>) -> Option<E> {
        match transition {
            Transition::Stay => None,
            Transition::Enter(next) => {
                self.set_phase(next);
                None
            }
            Transition::Redeliver(next, event) => {
                self.set_phase(next);
                Some(event)
            }
        }
    }

    pub fn on_inbound_headers(&mut self, head: RequestHeader, payload_size: PayloadSize) -> Result<(), PhaseError> {
        let mut event = (head, payload_size);
        loop {
            let (phase, mut cx) = self.split();
            let transition = phase.on_inbound_headers(&mut cx, event)?;
            match self.apply(transition) {
                Some(redelivered) => event = redelivered,
                None => return Ok(()),
            }
        }
    }

    pub fn on_inbound_body_chunk(&mut self, item: PayloadItem) -> Result<(), PhaseError> {
        let mut item = item;
        loop {
            let (phase, mut cx) = self.split();
            let transition = phase.on_inbound_body_chunk(&mut cx, item)?;
            match self.apply(transition) {
                Some(redelivered) => item = redelivered,
                None => return Ok(()),
            }
        }
    }

    pub fn on_outbound_headers(
        &mut self,
        response: &mut ResponseMessage,
        first: Option<&Bytes>,
    ) -> Result<(), PhaseError> {
        loop {
            let (phase, mut cx) = self.split();
            let transition = phase.on_outbound_headers(&mut cx, response, first)?;
            if self.apply(transition).is_none() {
                break;
            }
        }
        self.finish_if_completed();
        Ok(())
    }

    pub fn on_outbound_body_chunk(
        &mut self,
        response: &mut ResponseMessage,
        item: PayloadItem,
    ) -> Result<(), PhaseError> {
        let mut item = item;
        loop {
            let (phase, mut cx) = self.split();
            let transition = phase.on_outbound_body_chunk(&mut cx, response, item)?;
            match self.apply(transition) {
                Some(redelivered) => item = redelivered,
                None => break,
            }
        }
        self.finish_if_completed();
        Ok(())
    }

    /// The peer went away. Later writes fail with a closed channel.
    pub fn on_abrupt_closure(&mut self) {
        let (phase, mut cx) = self.split();
        phase.on_abrupt_closure(&mut cx);

        let reason = match self.exchange.outbound {
            Outbound::Idle => None,
            Outbound::Requested => Some(PeerClosedReason::BeforeResponseStarted),
            Outbound::Writing => Some(PeerClosedReason::WhileSendingResponse),
        };
        if let Some(reason) = reason {
            self.fail_started_response(ExchangeError::peer_closed(reason));
        }
        self.channel.close();
    }

    /// Lets the current phase react to inactivity and returns the cleanup it asks for.
    pub fn on_idle_timeout(&mut self) -> Option<CleanupAction> {
        let phase_kind = self.phase.kind();
        let (phase, mut cx) = self.split();
        let action = phase.on_idle_timeout(&mut cx);

        if self.exchange.outbound != Outbound::Idle {
            self.fail_started_response(ExchangeError::IdleTimeout { phase: phase_kind });
        }
        action
    }

    /// Entry point for the transport: handles the event and performs any cleanup it requires.
    pub fn on_channel_event(&mut self, event: ChannelEvent) {
        match event {
            ChannelEvent::AbruptClosure => self.on_abrupt_closure(),
            ChannelEvent::IdleTimeout => {
                if let Some(action) = self.on_idle_timeout() {
                    self.apply_cleanup(action);
                }
            }
        }
    }

    /// Performs a cleanup requested by [`on_idle_timeout`](Self::on_idle_timeout) and closes the exchange.
    pub fn apply_cleanup(&mut self, action: CleanupAction) {
        if let CleanupAction::RespondThenClose(status) = action {
            match ResponseCodec::encode_status_only(status, self.exchange.version, self.dispatcher.server_name()) {
                Ok(frame) => {
                    let token = self.channel.write(frame);
                    token.on_complete(move |result| {
                        if let Err(e) = result {
                            warn!(cause = %e, %status, "failed to write timeout response");
                        }
                    });
                }
                Err(e) => error!(cause = %e, %status, "failed to encode timeout response"),
            }
        }

        self.channel.close();
        self.set_phase(Phase::Closed);
    }

    fn fail_started_response(&self, cause: ExchangeError) {
        if let Some(status) = self.exchange.response_status()
            && !status.is_done()
        {
            info!(cause = %cause, "fail the outbound response from the channel event");
            status.fail(cause);
        }
    }

    fn finish_if_completed(&mut self) {
        if matches!(self.phase, Phase::ResponseCompleted(_)) && !self.exchange.keep_alive {
            trace!("response completed on a non persistent connection, close it");
            self.channel.close();
            self.set_phase(Phase::Closed);
        }
    }

    /// Aborts the response being produced: fails its status and tears the connection down.
    pub(crate) fn abort_response(&mut self, status: &ResponseStatus, error: &PhaseError) {
        error!(cause = %error, "abort outbound response");
        status.fail(ExchangeError::from(error));
        self.exchange.keep_alive = false;
        self.channel.close();
        self.set_phase(Phase::Closed);
    }

    pub(crate) fn chunk_config(&self) -> ChunkConfig {
        self.exchange.chunk_config
    }
}
