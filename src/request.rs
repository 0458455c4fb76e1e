//! Buffered outgoing request.

use http::{HeaderMap, HeaderValue};
use url::Url;

/// A fully buffered POST request.
///
/// The body is held in memory so the transport can replay it unchanged on
/// every retry attempt.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// The absolute URL to POST to.
    pub url: Url,

    /// Headers for this request.
    pub headers: HeaderMap,

    /// The serialized request body. Empty means no body is sent.
    pub body: Vec<u8>,
}

impl HttpRequest {
    /// Creates a new `HttpRequest` with no headers and an empty body.
    pub fn new(url: Url) -> Self {
        Self {
            url,
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }

    /// Sets a JSON body and the matching `Content-Type` header.
    pub fn with_json_body(mut self, body: Vec<u8>) -> Self {
        self.headers.insert(
            http::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        self.body = body;
        self
    }
}
