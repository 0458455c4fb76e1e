//! Error types for Fxiaoke API calls.
//!
//! Every failure surfaces as a single [`Error`] enum. Variants are structured so
//! callers can branch on the kind of failure and still get at the endpoint,
//! HTTP status and raw response body for diagnosis.

use http::StatusCode;

/// The main error type for Fxiaoke API calls.
///
/// # Examples
///
/// ```no_run
/// use fxiaoke::{Client, Error};
///
/// # async fn example() -> Result<(), Error> {
/// let client = Client::new("app", "secret", "code", "user", "corp")?;
///
/// match client.describe_object("AccountObj", false).await {
///     Ok(describe) => println!("Describe: {describe}"),
///     Err(Error::Request { endpoint, error_code, raw_response, .. }) => {
///         eprintln!("{endpoint} failed with errorCode {error_code:?}: {raw_response}");
///     }
///     Err(Error::Auth(cause)) => eprintln!("Could not obtain access token: {cause}"),
///     Err(e) => eprintln!("Other error: {e}"),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A required value was empty or malformed.
    ///
    /// Always detected locally, before any network call is made.
    #[error("Invalid {field}: {reason}")]
    Validation {
        /// The name of the offending field or argument
        field: &'static str,
        /// What was wrong with it
        reason: String,
    },

    /// A network-level error occurred (connection failed, DNS lookup failed, etc.).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A single attempt exceeded the per-attempt timeout.
    #[error("Request timed out")]
    Timeout,

    /// The retry budget was exhausted without a successful attempt.
    ///
    /// # Fields
    ///
    /// * `attempts` - The number of attempts made
    /// * `last_error` - The error returned by the final attempt
    #[error("Transport failed after {attempts} attempts: {last_error}")]
    Transport {
        /// The number of attempts made
        attempts: usize,
        /// The last error encountered
        #[source]
        last_error: Box<Error>,
    },

    /// Obtaining a corporate access token failed.
    ///
    /// Wraps whatever went wrong during the refresh call. The cached token,
    /// if any, is left untouched.
    #[error("Failed to refresh access token: {0}")]
    Auth(#[source] Box<Error>),

    /// The platform rejected the request.
    ///
    /// Produced when the HTTP status is not 200, or the body carries a
    /// non-zero `errorCode`.
    ///
    /// # Fields
    ///
    /// * `endpoint` - The endpoint path that was called
    /// * `status` - The HTTP status code
    /// * `error_code` - The `errorCode` from the body, if it could be read
    /// * `error_message` - The `errorMessage` from the body, if present
    /// * `raw_response` - The raw response body
    #[error("Request to {endpoint} failed (status {status}, errorCode {error_code:?}): {raw_response}")]
    Request {
        /// The endpoint path that was called
        endpoint: String,
        /// The HTTP status code
        status: StatusCode,
        /// The application-level error code
        error_code: Option<i64>,
        /// The application-level error message
        error_message: Option<String>,
        /// The raw response body
        raw_response: String,
    },

    /// A response body did not have the expected shape.
    ///
    /// Preserves the raw body and the serde message.
    #[error("Failed to decode response from {endpoint}: {serde_error}")]
    Decode {
        /// The endpoint path that was called
        endpoint: String,
        /// The raw body (or embedded fragment) that failed to decode
        raw_response: String,
        /// The serde error message
        serde_error: String,
    },

    /// Failed to serialize the request body.
    #[error("Failed to serialize request: {0}")]
    Serialization(String),

    /// Invalid client configuration, such as a bad header or HTTP client setup.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// An invalid URL was provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl Error {
    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Error::Validation {
            field,
            reason: reason.into(),
        }
    }

    pub(crate) fn empty(field: &'static str) -> Self {
        Error::validation(field, "cannot be empty")
    }

    pub(crate) fn decode(
        endpoint: impl Into<String>,
        raw_response: impl Into<String>,
        serde_error: impl ToString,
    ) -> Self {
        Error::Decode {
            endpoint: endpoint.into(),
            raw_response: raw_response.into(),
            serde_error: serde_error.to_string(),
        }
    }

    /// Returns `true` if this error is retried by the transport.
    ///
    /// Only network failures and per-attempt timeouts qualify. HTTP statuses and
    /// application error codes are never retried.
    ///
    /// # Examples
    ///
    /// ```
    /// use fxiaoke::Error;
    /// use http::StatusCode;
    ///
    /// assert!(Error::Timeout.is_retryable());
    ///
    /// let err = Error::Request {
    ///     endpoint: "/cgi/user/get".to_string(),
    ///     status: StatusCode::INTERNAL_SERVER_ERROR,
    ///     error_code: None,
    ///     error_message: None,
    ///     raw_response: "Server error".to_string(),
    /// };
    /// assert!(!err.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Network(_) => true,
            Error::Timeout => true,
            Error::Validation { .. } => false,
            Error::Transport { .. } => false,
            Error::Auth(_) => false,
            Error::Request { .. } => false,
            Error::Decode { .. } => false,
            Error::Serialization(_) => false,
            Error::Configuration(_) => false,
            Error::InvalidUrl(_) => false,
        }
    }

    /// Returns the HTTP status code if this error has one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Request { status, .. } => Some(*status),
            Error::Auth(cause) => cause.status(),
            _ => None,
        }
    }

    /// Returns the application-level `errorCode` if this error has one.
    pub fn error_code(&self) -> Option<i64> {
        match self {
            Error::Request { error_code, .. } => *error_code,
            Error::Auth(cause) => cause.error_code(),
            _ => None,
        }
    }

    /// Returns the endpoint path the failing call was made against.
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            Error::Request { endpoint, .. } => Some(endpoint),
            Error::Decode { endpoint, .. } => Some(endpoint),
            Error::Auth(cause) => cause.endpoint(),
            _ => None,
        }
    }

    /// Returns the raw response body if this error has one.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Error::Request { raw_response, .. } => Some(raw_response),
            Error::Decode { raw_response, .. } => Some(raw_response),
            Error::Auth(cause) => cause.raw_response(),
            _ => None,
        }
    }
}

/// A specialized `Result` type for Fxiaoke API calls.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors_see_through_auth() {
        let err = Error::Auth(Box::new(Error::Request {
            endpoint: "/cgi/corpAccessToken/get/V2".to_string(),
            status: StatusCode::OK,
            error_code: Some(20016),
            error_message: Some("permanent code invalid".to_string()),
            raw_response: r#"{"errorCode":20016}"#.to_string(),
        }));

        assert_eq!(err.status(), Some(StatusCode::OK));
        assert_eq!(err.error_code(), Some(20016));
        assert_eq!(err.endpoint(), Some("/cgi/corpAccessToken/get/V2"));
        assert_eq!(err.raw_response(), Some(r#"{"errorCode":20016}"#));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_source_chain_reaches_root_cause() {
        use std::error::Error as _;

        let err = Error::Auth(Box::new(Error::Transport {
            attempts: 3,
            last_error: Box::new(Error::Timeout),
        }));

        let transport = err.source().unwrap();
        assert!(transport.to_string().starts_with("Transport failed after 3 attempts"));
        let root = transport.source().unwrap();
        assert_eq!(root.to_string(), Error::Timeout.to_string());
        assert!(root.source().is_none());
    }

    #[test]
    fn test_validation_message_names_field() {
        let err = Error::empty("app_secret");
        assert_eq!(err.to_string(), "Invalid app_secret: cannot be empty");
    }
}
