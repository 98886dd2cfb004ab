//! HTTP body framing for outbound responses
//!
//! - [`ChunkedEncoder`]: chunked transfer encoding (RFC 7230 section 4.1)
//! - [`LengthEncoder`]: payloads declared by `Content-Length`
//! - [`PayloadEncoder`]: picks one of the above from a [`PayloadSize`](crate::protocol::PayloadSize)

mod chunked_encoder;
mod length_encoder;
mod payload_encoder;

pub use payload_encoder::PayloadEncoder;
