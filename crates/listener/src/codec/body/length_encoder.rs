use crate::protocol::{PayloadItem, SendError};
use bytes::{Buf, BytesMut};
use tokio_util::codec::Encoder;
use tracing::warn;

/// Copies body bytes through until the declared `Content-Length` is reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthEncoder {
    length: u64,
}

impl LengthEncoder {
    pub fn new(length: u64) -> Self {
        Self { length }
    }
}

impl<D: Buf> Encoder<PayloadItem<D>> for LengthEncoder {
    type Error = SendError;

    fn encode(&mut self, item: PayloadItem<D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            PayloadItem::Chunk(bytes) => {
                if !bytes.has_remaining() {
                    return Ok(());
                }
                if self.length == 0 {
                    warn!("encode payload_item but no need to encode anymore");
                    return Ok(());
                }
                let remaining = bytes.remaining() as u64;
                if remaining > self.length {
                    return Err(SendError::invalid_body(format!(
                        "body exceeds declared content-length by {} bytes",
                        remaining - self.length
                    )));
                }
                dst.extend_from_slice(bytes.chunk());
                self.length -= remaining;
                Ok(())
            }
            PayloadItem::Eof if self.length > 0 => {
                let reason = format!("body ended {} bytes short of declared content-length", self.length);
                Err(SendError::invalid_body(reason))
            }
            PayloadItem::Eof => Ok(()),
        }
    }
}
