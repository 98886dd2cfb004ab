//! Response policy and the driver that feeds a response through the phases.

use std::fmt::Display;

use bytes::{Bytes, BytesMut};
use http::header::CONTENT_LENGTH;
use http::{HeaderValue, Version};
use http_body::Body;
use http_body_util::BodyExt;
use tracing::{error, trace};

use crate::connection::Channel;
use crate::ensure;
use crate::listener::PhaseContext;
use crate::listener::phase::{Operation, Phase};
use crate::protocol::{
    ConfigError, ConnectionOption, PayloadItem, PhaseError, RequestHeader, ResponseMessage, ResponseStatus,
};

/// Property key under which a response may carry a [`ChunkConfig`] overriding the configured one.
pub const CHUNKING_CONFIG: &str = "micro_http.chunking_config";

/// When a response body goes out with `Transfer-Encoding: chunked`.
///
/// Chunking is only ever used on HTTP/1.1 connections.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum ChunkConfig {
    Always,
    Never,
    /// Chunk unless the response declares its `Content-Length`.
    #[default]
    Auto,
}

/// Stateless response policy consulted by the phases.
#[derive(Debug, Clone)]
pub struct ResponseDispatcher {
    chunk_config: ChunkConfig,
    server_name: Option<HeaderValue>,
    keep_alive: bool,
}

impl Default for ResponseDispatcher {
    fn default() -> Self {
        Self { chunk_config: ChunkConfig::Auto, server_name: None, keep_alive: true }
    }
}

impl ResponseDispatcher {
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    pub fn chunk_config(&self) -> ChunkConfig {
        self.chunk_config
    }

    pub fn server_name(&self) -> Option<&HeaderValue> {
        self.server_name.as_ref()
    }

    /// The configuration that applies to `response`: its own override if it carries one, else `current`.
    pub fn effective_chunk_config(&self, current: ChunkConfig, response: &ResponseMessage) -> ChunkConfig {
        response.properties().get::<ChunkConfig>(CHUNKING_CONFIG).copied().unwrap_or(current)
    }

    /// Whether `response` is framed with chunked transfer encoding under `config`.
    pub fn use_chunking(&self, config: ChunkConfig, response: &ResponseMessage, version: Version) -> bool {
        if version != Version::HTTP_11 {
            return false;
        }

        match config {
            ChunkConfig::Always => true,
            ChunkConfig::Never => false,
            ChunkConfig::Auto => !response.headers().contains_key(CONTENT_LENGTH),
        }
    }

    /// Whether a response written right after the interim `100 Continue` is chunked.
    ///
    /// Only [`ChunkConfig::Always`] chunks it; every other policy, [`ChunkConfig::Auto`]
    /// included, sends the content of that write as one complete response.
    pub fn use_chunking_after_continue(&self, config: ChunkConfig, version: Version) -> bool {
        config == ChunkConfig::Always && version == Version::HTTP_11
    }

    /// Whether the connection stays open once the response to `request` is complete.
    pub fn is_keep_alive(&self, request: &RequestHeader) -> bool {
        if !self.keep_alive {
            return false;
        }

        match (request.version(), request.connection_option()) {
            (Version::HTTP_11, Some(ConnectionOption::Close)) => false,
            (Version::HTTP_11, _) => true,
            (Version::HTTP_10, Some(ConnectionOption::KeepAlive)) => true,
            _ => false,
        }
    }
}

/// Builds a [`ResponseDispatcher`].
#[derive(Debug)]
pub struct DispatcherBuilder {
    chunk_config: ChunkConfig,
    server_name: Option<String>,
    keep_alive: bool,
}

impl DispatcherBuilder {
    fn new() -> Self {
        Self { chunk_config: ChunkConfig::Auto, server_name: None, keep_alive: true }
    }

    pub fn chunk_config(mut self, chunk_config: ChunkConfig) -> Self {
        self.chunk_config = chunk_config;
        self
    }

    /// Value of the `Server` header added to responses that don't set one.
    pub fn server_name(mut self, server_name: impl Into<String>) -> Self {
        self.server_name = Some(server_name.into());
        self
    }

    pub fn keep_alive(mut self, keep_alive: bool) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    pub fn build(self) -> Result<ResponseDispatcher, ConfigError> {
        let server_name = match self.server_name {
            Some(name) => {
                ensure!(
                    !name.trim().is_empty(),
                    ConfigError::InvalidServerName { reason: "server name is empty".to_string() }
                );
                let value =
                    HeaderValue::try_from(name).map_err(|e| ConfigError::InvalidServerName { reason: e.to_string() })?;
                Some(value)
            }
            None => None,
        };

        Ok(ResponseDispatcher { chunk_config: self.chunk_config, server_name, keep_alive: self.keep_alive })
    }
}

impl<C: Channel> PhaseContext<C> {
    fn uses_chunking(&self, response: &ResponseMessage) -> bool {
        let dispatcher = self.dispatcher();
        let config = dispatcher.effective_chunk_config(self.chunk_config(), response);
        if matches!(self.phase(), Phase::Response100ContinueSent(_)) {
            return dispatcher.use_chunking_after_continue(config, self.version());
        }
        dispatcher.use_chunking(config, response, self.version())
    }

    fn pending_status(&self, operation: Operation) -> Result<ResponseStatus, PhaseError> {
        self.response_status().ok_or_else(|| {
            error!(phase = %self.phase().kind(), "no request to respond to");
            PhaseError::violation(self.phase().kind(), operation)
        })
    }

    /// Drives `response`, with the body chunks it holds, through the current phase.
    ///
    /// The body is fully known, so the response declares its `Content-Length` unless it
    /// already does; only [`ChunkConfig::Always`] then chunks it. Without chunked framing
    /// the body is joined into a single chunk first, so it leaves in one complete frame
    /// whatever phase the exchange is in. Write failures are only reported through the
    /// returned status.
    pub fn send_response(&mut self, mut response: ResponseMessage) -> Result<ResponseStatus, PhaseError> {
        let status = self.pending_status(Operation::OutboundHeaders)?;
        if !response.headers().contains_key(CONTENT_LENGTH) {
            response.set_header(CONTENT_LENGTH, HeaderValue::from(response.body_len()));
        }

        let first = response.body().first().cloned();
        self.on_outbound_headers(&mut response, first.as_ref())?;

        if self.uses_chunking(&response) {
            let chunks = response.body().to_vec();
            for chunk in chunks {
                self.on_outbound_body_chunk(&mut response, PayloadItem::Chunk(chunk))?;
            }
        } else {
            let body = response.body_bytes();
            trace!(len = body.len(), "send buffered response body");
            if !body.is_empty() {
                self.on_outbound_body_chunk(&mut response, PayloadItem::Chunk(body))?;
            }
        }

        self.on_outbound_body_chunk(&mut response, PayloadItem::Eof)?;
        Ok(status)
    }

    /// Streams `body` as the body of `response`.
    ///
    /// A body with an exact size hint declares it as `Content-Length` unless the response
    /// already does. A failing body aborts the exchange and closes the connection.
    pub async fn send_body<B>(&mut self, mut response: ResponseMessage, body: B) -> Result<ResponseStatus, PhaseError>
    where
        B: Body<Data = Bytes> + Unpin,
        B::Error: Display,
    {
        let status = self.pending_status(Operation::OutboundHeaders)?;
        let mut body = body;

        if let Some(length) = body.size_hint().exact()
            && !response.headers().contains_key(CONTENT_LENGTH)
        {
            response.set_header(CONTENT_LENGTH, HeaderValue::from(length));
        }

        self.on_outbound_headers(&mut response, None)?;
        let chunked = self.uses_chunking(&response);
        let mut buffered = BytesMut::new();

        loop {
            match body.frame().await {
                Some(Ok(frame)) => {
                    // trailers are not sent
                    let Ok(data) = frame.into_data() else { continue };
                    if chunked {
                        self.on_outbound_body_chunk(&mut response, PayloadItem::Chunk(data))?;
                    } else {
                        buffered.extend_from_slice(&data);
                    }
                }
                Some(Err(e)) => {
                    let error = PhaseError::invalid_body(format!("resolve response body error: {e}"));
                    self.abort_response(&status, &error);
                    return Err(error);
                }
                None => break,
            }
        }

        if !buffered.is_empty() {
            self.on_outbound_body_chunk(&mut response, PayloadItem::Chunk(buffered.freeze()))?;
        }
        self.on_outbound_body_chunk(&mut response, PayloadItem::Eof)?;
        Ok(status)
    }
}
