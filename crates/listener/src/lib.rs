//! The server side protocol phase engine of the micro HTTP transport
//!
//! This crate tracks, for one HTTP/1.1 connection, what the peer and the local endpoint
//! are allowed to do next: read more request data, write an interim or final response,
//! write body content, or tear down. Inbound request events and outbound response writes
//! are routed through one state machine, so the two directions never break HTTP framing
//! even though they are driven by interleaved asynchronous events.
//!
//! Request parsing and socket reads stay with the transport in front of the listener;
//! the listener only needs parsed request heads, body chunks, and a [`Channel`] to
//! write frames to.
//!
//! # Features
//!
//! - Exhaustively matched protocol phases with explicit no-ops and protocol violations
//! - Automatic `100 Continue` interim responses
//! - Chunked or buffered response framing, configurable per connection and per response
//! - Keep-alive aware `Connection` handling
//! - A single-fire, replay-safe completion handle per response
//! - Peer closures reported as such, whichever write or event detects them
//!
//! # Example
//!
//! ```no_run
//! use std::error::Error;
//! use std::sync::Arc;
//!
//! use bytes::Bytes;
//! use http::{Method, Request, StatusCode};
//! use micro_http_listener::connection::FramedChannel;
//! use micro_http_listener::listener::{ChunkConfig, PhaseContext, ResponseDispatcher};
//! use micro_http_listener::protocol::{PayloadItem, PayloadSize, RequestHeader, ResponseMessage};
//! use tokio::net::TcpStream;
//! use tracing::{error, info};
//!
//! async fn serve(stream: TcpStream) -> Result<(), Box<dyn Error + Send + Sync>> {
//!     let (_reader, writer) = stream.into_split();
//!     let (channel, _writer_task) = FramedChannel::spawn(writer);
//!
//!     let dispatcher = ResponseDispatcher::builder()
//!         .chunk_config(ChunkConfig::Auto)
//!         .server_name("micro-http")
//!         .build()?;
//!     let mut cx = PhaseContext::new(channel, Arc::new(dispatcher));
//!
//!     // parsed by the transport
//!     let head: RequestHeader = Request::builder()
//!         .method(Method::POST)
//!         .uri("/upload")
//!         .header("Expect", "100-continue")
//!         .body(())?
//!         .into();
//!     cx.on_inbound_headers(head, PayloadSize::Length(5))?;
//!     cx.on_inbound_body_chunk(PayloadItem::Chunk(Bytes::from_static(b"hello")))?;
//!     cx.on_inbound_body_chunk(PayloadItem::Eof)?;
//!
//!     let mut response = ResponseMessage::with_status(StatusCode::OK);
//!     response.push_chunk(Bytes::from_static(b"received"));
//!     let status = cx.send_response(response)?;
//!
//!     match status.wait().await {
//!         Some(Ok(request)) => info!(uri = %request.head().uri(), "response sent"),
//!         Some(Err(e)) => error!(cause = %e, "response failed"),
//!         None => error!("response abandoned"),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - [`listener`]: [`PhaseContext`](listener::PhaseContext), the phases and the response dispatcher
//! - [`protocol`]: messages, payload items, the completion handle and the error types
//! - [`codec`]: response encoding
//! - [`connection`]: the [`Channel`] abstraction and its tokio implementation
//!
//! # Error Handling
//!
//! - [`protocol::PhaseError`]: returned synchronously when an operation is not allowed
//! - [`protocol::ExchangeError`]: delivered through the response status
//! - [`protocol::ChannelError`]: the outcome of a single failed write
//! - [`protocol::ConfigError`]: invalid dispatcher configuration
//!
//! # Limitations
//!
//! - HTTP/1.0 and HTTP/1.1 only
//! - One exchange at a time per connection, no pipelining
//!
//! [`Channel`]: connection::Channel

pub mod codec;
pub mod connection;
pub mod listener;
pub mod protocol;

mod utils;
pub(crate) use utils::ensure;
