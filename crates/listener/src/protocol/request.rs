//! HTTP request header handling.
//!
//! Wraps `http::Request<()>` with the helpers the listener phases need while
//! deciding what the peer is allowed to do next: whether it expects an interim
//! `100 Continue` and whether the connection should be kept alive.

use http::header::{CONNECTION, EXPECT};
use http::{HeaderMap, Method, Request, Uri, Version};

/// Represents an HTTP request header.
#[derive(Debug, Clone)]
pub struct RequestHeader {
    inner: Request<()>,
}

impl RequestHeader {
    /// Returns a reference to the request's HTTP method.
    pub fn method(&self) -> &Method {
        self.inner.method()
    }

    /// Returns a reference to the request's URI.
    pub fn uri(&self) -> &Uri {
        self.inner.uri()
    }

    /// Returns the request's HTTP version.
    pub fn version(&self) -> Version {
        self.inner.version()
    }

    /// Returns a reference to the request's headers.
    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        self.inner.headers_mut()
    }

    /// Returns true if the request carries `Expect: 100-continue`.
    ///
    /// Only HTTP/1.1 clients may wait for an interim response.
    pub fn expects_continue(&self) -> bool {
        if self.version() != Version::HTTP_11 {
            return false;
        }

        self.headers()
            .get(EXPECT)
            .map(|value| value.as_bytes())
            .is_some_and(|slice| slice.len() >= 4 && slice[0..4].eq_ignore_ascii_case(b"100-"))
    }

    /// Returns the connection option the client sent, if it is `close` or `keep-alive`.
    pub fn connection_option(&self) -> Option<ConnectionOption> {
        let value = self.headers().get(CONNECTION)?.to_str().ok()?;
        value.split(',').map(str::trim).find_map(|token| {
            if token.eq_ignore_ascii_case("close") {
                Some(ConnectionOption::Close)
            } else if token.eq_ignore_ascii_case("keep-alive") {
                Some(ConnectionOption::KeepAlive)
            } else {
                None
            }
        })
    }
}

/// The persistence tokens of the `Connection` header.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConnectionOption {
    Close,
    KeepAlive,
}

/// Converts a bodyless request into a RequestHeader.
impl From<Request<()>> for RequestHeader {
    #[inline]
    fn from(inner: Request<()>) -> Self {
        Self { inner }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(version: Version, headers: &[(&str, &str)]) -> RequestHeader {
        let mut builder = Request::builder().method(Method::POST).uri("/upload").version(version);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into()
    }

    #[test]
    fn expect_continue_is_detected() {
        assert!(header(Version::HTTP_11, &[("Expect", "100-continue")]).expects_continue());
        assert!(header(Version::HTTP_11, &[("expect", "100-Continue")]).expects_continue());
        assert!(!header(Version::HTTP_11, &[]).expects_continue());
        assert!(!header(Version::HTTP_10, &[("Expect", "100-continue")]).expects_continue());
    }

    #[test]
    fn connection_option_tokens() {
        assert_eq!(
            header(Version::HTTP_11, &[("Connection", "close")]).connection_option(),
            Some(ConnectionOption::Close)
        );
        assert_eq!(
            header(Version::HTTP_10, &[("Connection", "Upgrade, Keep-Alive")]).connection_option(),
            Some(ConnectionOption::KeepAlive)
        );
        assert_eq!(header(Version::HTTP_11, &[("Connection", "upgrade")]).connection_option(), None);
        assert_eq!(header(Version::HTTP_11, &[]).connection_option(), None);
    }
}
