//! HTTP senders and the retrying transport wrapped around them.
//!
//! [`HttpSend`] is the seam for the underlying HTTP client: one attempt in,
//! one fully read response out. [`RetryingTransport`] replays a buffered
//! [`HttpRequest`] through a sender until it succeeds or the
//! [`ExponentialBackoff`] budget runs out.

use crate::{
    retry::{ExponentialBackoff, Notify},
    Error, HttpRequest, HttpResponse, Result,
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Sends a single request attempt.
///
/// Implementations must read the full response body before returning. Any
/// HTTP status, including 5xx, is a successful send; only failures to complete
/// the exchange are errors.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use fxiaoke::{HttpRequest, HttpResponse, HttpSend, Result};
/// use http::{HeaderMap, StatusCode};
///
/// struct AlwaysOk;
///
/// #[async_trait]
/// impl HttpSend for AlwaysOk {
///     async fn send(&self, _request: &HttpRequest) -> Result<HttpResponse> {
///         Ok(HttpResponse::new(StatusCode::OK, HeaderMap::new(), r#"{"errorCode":0}"#))
///     }
/// }
/// ```
#[async_trait]
pub trait HttpSend: Send + Sync {
    /// Performs one attempt.
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

/// The default sender, backed by `reqwest`.
///
/// Each attempt is bounded by its own timeout, independent of the retry budget.
#[derive(Debug, Clone)]
pub struct ReqwestSender {
    http_client: reqwest::Client,
    timeout: Duration,
}

impl ReqwestSender {
    /// Creates a sender whose attempts time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder().build().map_err(|e| {
            Error::Configuration(format!("Failed to build HTTP client: {}", e))
        })?;

        Ok(Self {
            http_client,
            timeout,
        })
    }
}

#[async_trait]
impl HttpSend for ReqwestSender {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let mut builder = self
            .http_client
            .post(request.url.clone())
            .headers(request.headers.clone())
            .timeout(self.timeout);

        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let response = builder.send().await.map_err(classify_reqwest)?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await.map_err(classify_reqwest)?;

        Ok(HttpResponse::new(status, headers, body))
    }
}

fn classify_reqwest(error: reqwest::Error) -> Error {
    if error.is_timeout() {
        Error::Timeout
    } else {
        Error::Network(error)
    }
}

/// Replays requests through a sender with exponential backoff.
///
/// Only retryable errors (see [`Error::is_retryable`]) trigger another
/// attempt. Once the elapsed budget is spent, the last error is returned
/// wrapped in [`Error::Transport`].
#[derive(Clone)]
pub struct RetryingTransport {
    sender: Arc<dyn HttpSend>,
    backoff: ExponentialBackoff,
    notify: Option<Notify>,
}

impl RetryingTransport {
    /// Creates a transport that retries `sender` according to `backoff`.
    pub fn new(sender: Arc<dyn HttpSend>, backoff: ExponentialBackoff) -> Self {
        Self {
            sender,
            backoff,
            notify: None,
        }
    }

    /// Sets a callback fired before each retry with the error and the wait.
    pub fn with_notify(mut self, notify: Notify) -> Self {
        self.notify = Some(notify);
        self
    }

    /// Sends `request`, retrying transient failures.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] when retries are exhausted, or the
    /// sender's error unchanged if it is not retryable.
    pub async fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let start_time = Instant::now();
        let mut attempt = 0;

        loop {
            attempt += 1;

            tracing::debug!(url = %request.url, attempt = attempt, "Executing HTTP request");

            let error = match self.sender.send(request).await {
                Ok(mut response) => {
                    response.latency = start_time.elapsed();
                    response.attempts = attempt;

                    tracing::debug!(
                        status = response.status.as_u16(),
                        latency_ms = response.latency.as_millis(),
                        attempts = attempt,
                        "Received HTTP response"
                    );
                    return Ok(response);
                }
                Err(e) => e,
            };

            if !error.is_retryable() {
                return Err(error);
            }

            let Some(delay) = self.backoff.next_delay(attempt, start_time.elapsed()) else {
                tracing::warn!(
                    error = %error,
                    attempts = attempt,
                    elapsed_ms = start_time.elapsed().as_millis(),
                    "Retry budget exhausted"
                );
                return Err(Error::Transport {
                    attempts: attempt,
                    last_error: Box::new(error),
                });
            };

            tracing::warn!(
                error = %error,
                attempt = attempt,
                delay_ms = delay.as_millis(),
                "Request failed, retrying after delay"
            );

            if let Some(notify) = &self.notify {
                notify(&error, delay);
            }

            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{HeaderMap, StatusCode};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Fails with a timeout `failures` times, then answers 200.
    struct FlakySender {
        failures: usize,
        calls: AtomicUsize,
        bodies: Mutex<Vec<Vec<u8>>>,
    }

    impl FlakySender {
        fn new(failures: usize) -> Self {
            Self {
                failures,
                calls: AtomicUsize::new(0),
                bodies: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl HttpSend for FlakySender {
        async fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
            self.bodies.lock().unwrap().push(request.body.clone());
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(Error::Timeout)
            } else {
                Ok(HttpResponse::new(StatusCode::OK, HeaderMap::new(), "ok"))
            }
        }
    }

    struct BrokenSender;

    #[async_trait]
    impl HttpSend for BrokenSender {
        async fn send(&self, _request: &HttpRequest) -> Result<HttpResponse> {
            Err(Error::Configuration("bad header".to_string()))
        }
    }

    fn request() -> HttpRequest {
        HttpRequest::new("https://open.fxiaoke.com/cgi/user/get".parse().unwrap())
            .with_json_body(br#"{"openUserId":"FSUID_1"}"#.to_vec())
    }

    fn recording_notify() -> (Notify, Arc<Mutex<Vec<Duration>>>) {
        let delays = Arc::new(Mutex::new(Vec::new()));
        let sink = delays.clone();
        let notify: Notify = Arc::new(move |_error: &Error, delay: Duration| {
            sink.lock().unwrap().push(delay);
        });
        (notify, delays)
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_failures() {
        let sender = Arc::new(FlakySender::new(3));
        let backoff = ExponentialBackoff {
            randomization_factor: 0.0,
            ..ExponentialBackoff::default()
        };
        let (notify, delays) = recording_notify();
        let transport = RetryingTransport::new(sender.clone(), backoff).with_notify(notify);

        let response = transport.send(&request()).await.unwrap();

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.attempts, 4);
        assert!(response.was_retried());
        assert_eq!(sender.calls.load(Ordering::SeqCst), 4);

        let delays = delays.lock().unwrap();
        assert_eq!(
            *delays,
            vec![
                Duration::from_millis(200),
                Duration::from_millis(300),
                Duration::from_millis(450),
            ]
        );
        assert!(delays.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_replays_identical_body() {
        let sender = Arc::new(FlakySender::new(2));
        let transport = RetryingTransport::new(sender.clone(), ExponentialBackoff::default());

        transport.send(&request()).await.unwrap();

        let bodies = sender.bodies.lock().unwrap();
        assert_eq!(bodies.len(), 3);
        assert!(bodies.iter().all(|b| b == br#"{"openUserId":"FSUID_1"}"#));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_once_budget_spent() {
        let sender = Arc::new(FlakySender::new(usize::MAX));
        let (notify, delays) = recording_notify();
        let transport =
            RetryingTransport::new(sender.clone(), ExponentialBackoff::default()).with_notify(notify);

        let start = Instant::now();
        let result = transport.send(&request()).await;
        let elapsed = start.elapsed();

        match result {
            Err(Error::Transport {
                attempts,
                last_error,
            }) => {
                assert_eq!(attempts, sender.calls.load(Ordering::SeqCst));
                assert_eq!(attempts, delays.lock().unwrap().len() + 1);
                assert!(matches!(*last_error, Error::Timeout));
            }
            other => panic!("Expected Transport error, got {:?}", other),
        }

        assert!(elapsed >= Duration::from_secs(20));
        assert!(elapsed < Duration::from_secs(26));
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_error_returned_immediately() {
        let (notify, delays) = recording_notify();
        let transport = RetryingTransport::new(Arc::new(BrokenSender), ExponentialBackoff::default())
            .with_notify(notify);

        let result = transport.send(&request()).await;

        assert!(matches!(result, Err(Error::Configuration(_))));
        assert!(delays.lock().unwrap().is_empty());
    }
}
