//! The in-flight representation of one request or one response.
//!
//! An [`HttpMessage`] owns a head (request line or status line plus headers), the body
//! chunks seen so far and a string-keyed [`Properties`] bag. A request message is also
//! linked to the [`ResponseStatus`] handle that fires once the response written for it
//! has been fully sent or has failed.
//!
//! Messages are cheap to clone: body chunks are reference counted [`Bytes`] and property
//! values are shared.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Response, StatusCode, Version};

use crate::protocol::{CompletionHandle, ExchangeError, RequestHeader, ResponseHead};

/// Fires with a snapshot of the request once its response is written, or with the failure.
pub type ResponseStatus = CompletionHandle<RequestMessage, ExchangeError>;

pub type RequestMessage = HttpMessage<RequestHeader>;
pub type ResponseMessage = HttpMessage<ResponseHead>;

/// Access to the header section shared by request and response heads.
pub trait MessageHead {
    fn headers(&self) -> &HeaderMap;
    fn headers_mut(&mut self) -> &mut HeaderMap;
    fn version(&self) -> Version;
}

impl MessageHead for RequestHeader {
    fn headers(&self) -> &HeaderMap {
        RequestHeader::headers(self)
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        RequestHeader::headers_mut(self)
    }

    fn version(&self) -> Version {
        RequestHeader::version(self)
    }
}

impl MessageHead for ResponseHead {
    fn headers(&self) -> &HeaderMap {
        Response::headers(self)
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        Response::headers_mut(self)
    }

    fn version(&self) -> Version {
        Response::version(self)
    }
}

#[derive(Clone)]
pub struct HttpMessage<H> {
    head: H,
    body: Vec<Bytes>,
    body_complete: bool,
    properties: Properties,
    response_status: Option<ResponseStatus>,
}

impl<H: MessageHead> HttpMessage<H> {
    pub fn head(&self) -> &H {
        &self.head
    }

    pub fn head_mut(&mut self) -> &mut H {
        &mut self.head
    }

    pub fn headers(&self) -> &HeaderMap {
        self.head.headers()
    }

    /// Sets a header, replacing every value previously stored under the same name.
    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.head.headers_mut().insert(name, value);
    }

    /// Adds a value without removing existing ones, for headers that are multi-valued by definition.
    pub fn append_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.head.headers_mut().append(name, value);
    }

    pub fn remove_header(&mut self, name: &HeaderName) -> Option<HeaderValue> {
        self.head.headers_mut().remove(name)
    }

    pub fn body(&self) -> &[Bytes] {
        &self.body
    }

    /// Appends a body chunk; empty chunks are dropped.
    pub fn push_chunk(&mut self, chunk: Bytes) {
        if !chunk.is_empty() {
            self.body.push(chunk);
        }
    }

    pub fn mark_body_complete(&mut self) {
        self.body_complete = true;
    }

    pub fn is_body_complete(&self) -> bool {
        self.body_complete
    }

    pub fn body_len(&self) -> usize {
        self.body.iter().map(Bytes::len).sum()
    }

    /// Copies every body chunk received so far into one buffer.
    pub fn body_bytes(&self) -> Bytes {
        match self.body.as_slice() {
            [] => Bytes::new(),
            [single] => single.clone(),
            chunks => {
                let mut buf = BytesMut::with_capacity(self.body_len());
                for chunk in chunks {
                    buf.extend_from_slice(chunk);
                }
                buf.freeze()
            }
        }
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn properties_mut(&mut self) -> &mut Properties {
        &mut self.properties
    }
}

impl RequestMessage {
    /// Creates the message for a freshly received request head, linked to a new response status.
    pub fn new(head: RequestHeader) -> Self {
        Self {
            head,
            body: Vec::new(),
            body_complete: false,
            properties: Properties::default(),
            response_status: Some(ResponseStatus::new()),
        }
    }

    /// The handle notified when the response to this request completes.
    pub fn response_status(&self) -> Option<&ResponseStatus> {
        self.response_status.as_ref()
    }

    /// A copy of the request without its response status link.
    ///
    /// This is the payload a successful [`ResponseStatus`] carries; keeping the link
    /// would make the handle own itself.
    pub fn snapshot(&self) -> Self {
        Self {
            head: self.head.clone(),
            body: self.body.clone(),
            body_complete: self.body_complete,
            properties: self.properties.clone(),
            response_status: None,
        }
    }
}

impl ResponseMessage {
    pub fn new(head: ResponseHead) -> Self {
        Self { head, body: Vec::new(), body_complete: false, properties: Properties::default(), response_status: None }
    }

    /// A response with the given status and no headers.
    pub fn with_status(status: StatusCode) -> Self {
        let mut head = ResponseHead::new(());
        *head.status_mut() = status;
        Self::new(head)
    }

    pub fn status(&self) -> StatusCode {
        self.head.status()
    }
}

impl From<ResponseHead> for ResponseMessage {
    fn from(head: ResponseHead) -> Self {
        Self::new(head)
    }
}

impl<H: fmt::Debug> fmt::Debug for HttpMessage<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpMessage")
            .field("head", &self.head)
            .field("body_chunks", &self.body.len())
            .field("body_complete", &self.body_complete)
            .field("properties", &self.properties)
            .finish_non_exhaustive()
    }
}

/// String-keyed bag of arbitrary values carried alongside a message.
#[derive(Clone, Default)]
pub struct Properties {
    values: HashMap<&'static str, Arc<dyn Any + Send + Sync>>,
}

impl Properties {
    /// Stores `value` under `key`, replacing any previous value.
    pub fn insert<T: Any + Send + Sync>(&mut self, key: &'static str, value: T) {
        self.values.insert(key, Arc::new(value));
    }

    /// Returns the value under `key` if it exists and has type `T`.
    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Option<&T> {
        self.values.get(key).and_then(|value| value.downcast_ref::<T>())
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.values.remove(key).is_some()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for Properties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.values.keys()).finish()
    }
}
