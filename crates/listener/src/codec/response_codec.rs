//! Turns a [`ResponseMessage`] plus the listener's decisions into wire frames.
//!
//! Two shapes of final response exist:
//!
//! - a complete frame: status line, headers with `Content-Length`, and the whole body
//! - a headers-only frame announcing `Transfer-Encoding: chunked`, followed by body
//!   frames produced with a chunked [`PayloadEncoder`]

use bytes::{Bytes, BytesMut};
use http::{HeaderValue, StatusCode, Version};
use tokio_util::codec::Encoder;

use crate::codec::body::PayloadEncoder;
use crate::codec::header::{HeadFrame, HeaderEncoder};
use crate::protocol::{PayloadItem, PayloadSize, ResponseHead, ResponseMessage, SendError};

/// The interim response written when a client sends `Expect: 100-continue`.
pub const CONTINUE_FRAME: &[u8] = b"HTTP/1.1 100 Continue\r\n\r\n";

/// Stateless header codec used by the listener phases.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseCodec;

impl ResponseCodec {
    /// Encodes status line, headers and `body` as one self-contained response.
    pub fn encode_full_response(
        response: &ResponseMessage,
        version: Version,
        server_name: Option<&HeaderValue>,
        keep_alive: bool,
        body: Bytes,
    ) -> Result<Bytes, SendError> {
        let payload_size = PayloadSize::of(body.len());
        let mut dst = BytesMut::with_capacity(body.len());

        let frame = HeadFrame { head: response.head(), version, payload_size, keep_alive, server_name };
        HeaderEncoder.encode(frame, &mut dst)?;

        let mut payload_encoder = PayloadEncoder::from(payload_size);
        payload_encoder.encode(PayloadItem::Chunk(body), &mut dst)?;
        payload_encoder.encode(PayloadItem::<Bytes>::Eof, &mut dst)?;

        Ok(dst.freeze())
    }

    /// Encodes the header section of a chunked response; the body follows in chunk frames.
    pub fn encode_headers_only(
        response: &ResponseMessage,
        version: Version,
        server_name: Option<&HeaderValue>,
        keep_alive: bool,
    ) -> Result<Bytes, SendError> {
        let mut dst = BytesMut::new();
        HeaderEncoder.encode(
            HeadFrame { head: response.head(), version, payload_size: PayloadSize::Chunked, keep_alive, server_name },
            &mut dst,
        )?;
        Ok(dst.freeze())
    }

    /// A bodyless response that also tells the client the connection is going away.
    pub fn encode_status_only(
        status: StatusCode,
        version: Version,
        server_name: Option<&HeaderValue>,
    ) -> Result<Bytes, SendError> {
        let mut head = ResponseHead::new(());
        *head.status_mut() = status;
        Self::encode_full_response(&ResponseMessage::new(head), version, server_name, false, Bytes::new())
    }

    pub fn continue_frame() -> Bytes {
        Bytes::from_static(CONTINUE_FRAME)
    }
}
