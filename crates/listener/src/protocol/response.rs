//! HTTP response header handling.
//!
//! The header portion of a response is a plain `http::Response<()>`; the body
//! travels separately, chunk by chunk, through the listener phases.

use http::Response;

/// Type alias for HTTP response headers.
pub type ResponseHead = Response<()>;
