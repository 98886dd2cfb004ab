//! HTTP header encoder implementation for serializing HTTP response headers
//!
//! This module serializes a response head into the status line and header section.
//! The protocol version written is the one negotiated with the request rather than
//! whatever the handler left in the response head, and the framing headers
//! (`Content-Length` / `Transfer-Encoding`) and `Connection` are rewritten to agree
//! with the decisions made by the listener.

use crate::protocol::{PayloadSize, ResponseHead, SendError};

use bytes::{BufMut, BytesMut};

use http::{HeaderValue, Version, header};
use std::io;
use std::io::Write;
use tokio_util::codec::Encoder;
use tracing::error;

/// Initial buffer size allocated for header serialization
const INIT_HEADER_SIZE: usize = 4 * 1024;

const CHUNKED: HeaderValue = HeaderValue::from_static("chunked");
const KEEP_ALIVE: HeaderValue = HeaderValue::from_static("keep-alive");
const CLOSE: HeaderValue = HeaderValue::from_static("close");

/// Everything needed to serialize the header section of one response.
#[derive(Debug)]
pub struct HeadFrame<'a> {
    pub head: &'a ResponseHead,
    pub version: Version,
    pub payload_size: PayloadSize,
    pub keep_alive: bool,
    pub server_name: Option<&'a HeaderValue>,
}

/// Encoder for HTTP response headers implementing the [`Encoder`] trait.
#[derive(Debug)]
pub struct HeaderEncoder;

impl Encoder<HeadFrame<'_>> for HeaderEncoder {
    type Error = SendError;

    /// Encodes the status line and headers into `dst`.
    ///
    /// # Errors
    ///
    /// Returns [`SendError::UnsupportedVersion`] for anything but HTTP/1.0 and HTTP/1.1.
    fn encode(&mut self, item: HeadFrame<'_>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let HeadFrame { head, version, payload_size, keep_alive, server_name } = item;

        let version_str = match version {
            Version::HTTP_11 => "HTTP/1.1",
            Version::HTTP_10 => "HTTP/1.0",
            v => {
                error!(http_version = ?v, "unsupported http version");
                return Err(SendError::UnsupportedVersion { version: v });
            }
        };

        dst.reserve(INIT_HEADER_SIZE);
        let status = head.status();
        write!(FastWrite(dst), "{} {} {}\r\n", version_str, status.as_str(), status.canonical_reason().unwrap_or(""))?;

        let mut headers = head.headers().clone();

        // Set appropriate content length or transfer encoding header
        match payload_size {
            PayloadSize::Length(n) => {
                headers.remove(header::TRANSFER_ENCODING);
                headers.insert(header::CONTENT_LENGTH, n.into());
            }
            PayloadSize::Chunked => {
                headers.remove(header::CONTENT_LENGTH);
                headers.insert(header::TRANSFER_ENCODING, CHUNKED);
            }
            PayloadSize::Empty => {
                headers.remove(header::TRANSFER_ENCODING);
                const ZERO_VALUE: HeaderValue = HeaderValue::from_static("0");
                headers.insert(header::CONTENT_LENGTH, ZERO_VALUE);
            }
        }

        // HTTP/1.1 is persistent by default, HTTP/1.0 must ask for it
        match (version, keep_alive) {
            (Version::HTTP_11, true) => {
                headers.remove(header::CONNECTION);
            }
            (_, true) => {
                headers.insert(header::CONNECTION, KEEP_ALIVE);
            }
            (_, false) => {
                headers.insert(header::CONNECTION, CLOSE);
            }
        }

        if let Some(server_name) = server_name
            && !headers.contains_key(header::SERVER)
        {
            headers.insert(header::SERVER, server_name.clone());
        }

        // Write all headers
        for (header_name, header_value) in &headers {
            dst.put_slice(header_name.as_ref());
            dst.put_slice(b": ");
            dst.put_slice(header_value.as_ref());
            dst.put_slice(b"\r\n");
        }
        dst.put_slice(b"\r\n");
        Ok(())
    }
}

/// Fast writer implementation for writing to BytesMut.
///
/// Avoids bounds checking when writing to the bytes buffer, since we've already
/// reserved enough space.
struct FastWrite<'a>(&'a mut BytesMut);

impl Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Response, StatusCode};

    fn encode(head: &ResponseHead, version: Version, payload_size: PayloadSize, keep_alive: bool) -> String {
        let mut dst = BytesMut::new();
        HeaderEncoder
            .encode(HeadFrame { head, version, payload_size, keep_alive, server_name: None }, &mut dst)
            .unwrap();
        String::from_utf8(dst.to_vec()).unwrap()
    }

    #[test]
    fn length_replaces_transfer_encoding() {
        let head = Response::builder().status(StatusCode::OK).header("Transfer-Encoding", "chunked").body(()).unwrap();

        let text = encode(&head, Version::HTTP_11, PayloadSize::Length(5), true);
        assert_eq!(text, "HTTP/1.1 200 OK\r\ncontent-length: 5\r\n\r\n");
    }

    #[test]
    fn chunked_replaces_content_length() {
        let head = Response::builder().status(StatusCode::CREATED).header("Content-Length", "10").body(()).unwrap();

        let text = encode(&head, Version::HTTP_11, PayloadSize::Chunked, false);
        assert!(text.starts_with("HTTP/1.1 201 Created\r\n"));
        assert!(text.contains("transfer-encoding: chunked\r\n"));
        assert!(text.contains("connection: close\r\n"));
        assert!(!text.contains("content-length"));
    }

    #[test]
    fn http10_keep_alive_is_explicit() {
        let head = Response::builder().status(StatusCode::OK).body(()).unwrap();

        let text = encode(&head, Version::HTTP_10, PayloadSize::Empty, true);
        assert!(text.starts_with("HTTP/1.0 200 OK\r\n"));
        assert!(text.contains("connection: keep-alive\r\n"));
        assert!(text.contains("content-length: 0\r\n"));
    }

    #[test]
    fn server_name_does_not_override_handler_value() {
        let head = Response::builder().status(StatusCode::OK).header("Server", "custom").body(()).unwrap();
        let server_name = HeaderValue::from_static("micro-http");

        let mut dst = BytesMut::new();
        HeaderEncoder
            .encode(
                HeadFrame {
                    head: &head,
                    version: Version::HTTP_11,
                    payload_size: PayloadSize::Empty,
                    keep_alive: true,
                    server_name: Some(&server_name),
                },
                &mut dst,
            )
            .unwrap();
        let text = String::from_utf8(dst.to_vec()).unwrap();
        assert!(text.contains("server: custom\r\n"));
        assert!(!text.contains("micro-http"));
    }

    #[test]
    fn http2_is_rejected() {
        let head = Response::builder().status(StatusCode::OK).body(()).unwrap();
        let mut dst = BytesMut::new();
        let result = HeaderEncoder.encode(
            HeadFrame {
                head: &head,
                version: Version::HTTP_2,
                payload_size: PayloadSize::Empty,
                keep_alive: true,
                server_name: None,
            },
            &mut dst,
        );
        assert!(matches!(result, Err(SendError::UnsupportedVersion { .. })));
        assert!(dst.is_empty());
    }
}
