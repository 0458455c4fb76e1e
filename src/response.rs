//! Unclassified response returned by the transport.
//!
//! [`HttpResponse`] holds everything the transport saw for the attempt that
//! succeeded: status, headers, the complete body, and how long it took across
//! retries. No status or `errorCode` inspection has happened yet.

use http::{HeaderMap, StatusCode};
use std::time::Duration;

/// A response whose body has been read to completion.
///
/// # Examples
///
/// ```no_run
/// use fxiaoke::Client;
///
/// # async fn example() -> Result<(), fxiaoke::Error> {
/// let client = Client::new("app", "secret", "code", "user", "corp")?;
///
/// let response = client.post_raw("/cgi/user/get", None, true).await?;
/// println!("Status: {}", response.status);
/// println!("Took {:?} over {} attempts", response.latency, response.attempts);
/// println!("Body: {}", response.body);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// The HTTP status code of the response.
    pub status: StatusCode,

    /// The response headers.
    pub headers: HeaderMap,

    /// The raw response body.
    pub body: String,

    /// The total latency of the call, including all retry attempts and waits.
    pub latency: Duration,

    /// The number of attempts made. `1` when the first attempt succeeded.
    pub attempts: usize,
}

impl HttpResponse {
    /// Creates a response for a single attempt.
    ///
    /// Senders build it this way; the transport fills in the final latency and
    /// attempt count.
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<String>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
            latency: Duration::ZERO,
            attempts: 1,
        }
    }

    /// Returns `true` if the request required retries.
    ///
    /// # Examples
    ///
    /// ```
    /// # use fxiaoke::HttpResponse;
    /// # use http::{HeaderMap, StatusCode};
    /// let mut response = HttpResponse::new(StatusCode::OK, HeaderMap::new(), "{}");
    /// assert!(!response.was_retried());
    ///
    /// response.attempts = 3;
    /// assert!(response.was_retried());
    /// ```
    pub fn was_retried(&self) -> bool {
        self.attempts > 1
    }

    /// Returns a reference to a header value by name.
    ///
    /// # Examples
    ///
    /// ```
    /// # use fxiaoke::HttpResponse;
    /// # use http::{HeaderMap, HeaderValue, StatusCode};
    /// let mut headers = HeaderMap::new();
    /// headers.insert("content-type", HeaderValue::from_static("application/json"));
    ///
    /// let response = HttpResponse::new(StatusCode::OK, headers, "{}");
    /// assert_eq!(response.header("content-type"), Some("application/json"));
    /// ```
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }
}
