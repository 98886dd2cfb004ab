//! Response encoding for the listener
//!
//! Request parsing belongs to the transport in front of the listener; this module only
//! covers what the listener itself puts on the wire.
//!
//! - [`ResponseCodec`]: complete frames, chunked header frames and status-only frames
//! - [`CONTINUE_FRAME`]: the interim `100 Continue` response
//! - Header encoding via the [`header`] module, body framing via the [`body`] module
//!   ([`PayloadEncoder`] for chunk frames)

mod body;
mod header;
mod response_codec;

pub use body::PayloadEncoder;
pub use header::{HeadFrame, HeaderEncoder};
pub use response_codec::{CONTINUE_FRAME, ResponseCodec};
