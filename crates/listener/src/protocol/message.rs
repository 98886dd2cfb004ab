use bytes::{Buf, Bytes};

/// Represents an item in an HTTP message payload stream.
///
/// Inbound, the transport hands the listener one `PayloadItem` per decoded body
/// chunk; outbound, the dispatcher feeds the response body to the current phase
/// the same way. [`PayloadItem::Eof`] is the terminal chunk in both directions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadItem<Data: Buf = Bytes> {
    /// A chunk of payload data
    Chunk(Data),
    /// Marks the end of the payload stream
    Eof,
}

/// Represents the size information of an HTTP payload.
///
/// - Known length: exact number of bytes
/// - Chunked: chunked transfer encoding
/// - Empty: no payload
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PayloadSize {
    /// Payload with known length in bytes
    Length(u64),
    /// Payload using chunked transfer encoding
    Chunked,
    /// Empty payload (no body)
    Empty,
}

impl PayloadSize {
    /// Size of a fully buffered body.
    pub fn of(len: usize) -> Self {
        match len {
            0 => PayloadSize::Empty,
            n => PayloadSize::Length(n as u64),
        }
    }
}

impl PayloadItem {
    /// Consumes the PayloadItem and returns the contained bytes if this is a Chunk
    pub fn into_bytes(self) -> Option<Bytes> {
        match self {
            PayloadItem::Chunk(bytes) => Some(bytes),
            PayloadItem::Eof => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_size_of_buffered_body() {
        assert_eq!(PayloadSize::of(0), PayloadSize::Empty);
        assert_eq!(PayloadSize::of(12), PayloadSize::Length(12));
    }

    #[test]
    fn eof_has_no_bytes() {
        assert_eq!(PayloadItem::Eof.into_bytes(), None);
        assert_eq!(PayloadItem::Chunk(Bytes::from_static(b"abc")).into_bytes(), Some(Bytes::from_static(b"abc")));
    }
}
