//! HTTP response header encoding
//!
//! - [`HeaderEncoder`]: serializes a [`HeadFrame`] (status line plus headers)
//!   - Writes the negotiated protocol version
//!   - Rewrites `Content-Length` / `Transfer-Encoding` from the payload size
//!   - Emits `Connection` and `Server` headers from the listener's decisions

mod header_encoder;

pub use header_encoder::HeadFrame;
pub use header_encoder::HeaderEncoder;
