//! Authenticated client for the Fxiaoke open platform.
//!
//! The [`Client`] type owns the credentials, the retrying transport and the
//! cached access token. Use [`ClientBuilder`] to configure and create clients.

use crate::{
    endpoint::{BASE_URL, TOKEN_ENDPOINT},
    retry::{ExponentialBackoff, Notify},
    token::{TokenGrant, TokenManager, TokenState},
    transport::{HttpSend, ReqwestSender, RetryingTransport},
    Error, HttpRequest, HttpResponse, Payload, Result,
};
use http::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Per-attempt timeout applied by the default sender.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// The five values identifying an application installed in a corporation.
///
/// Secrets are redacted from the `Debug` output.
///
/// # Examples
///
/// ```
/// use fxiaoke::Credentials;
///
/// let credentials: Credentials = serde_json::from_str(r#"{
///     "app_id": "FSAID_1",
///     "app_secret": "s3cr3t-value",
///     "permanent_code": "p3rm-code",
///     "user_id": "FSUID_1",
///     "corp_id": "FSCID_1"
/// }"#).unwrap();
///
/// assert_eq!(credentials.app_id, "FSAID_1");
/// let debug = format!("{:?}", credentials);
/// assert!(!debug.contains("s3cr3t-value"));
/// assert!(!debug.contains("p3rm-code"));
/// ```
#[derive(Clone, Default, Deserialize)]
pub struct Credentials {
    /// Application id.
    pub app_id: String,
    /// Application secret.
    pub app_secret: String,
    /// Long-lived code used only to mint access tokens.
    pub permanent_code: String,
    /// Open user id every authenticated call acts as.
    pub user_id: String,
    /// Corporation id.
    pub corp_id: String,
}

impl Credentials {
    /// Creates credentials from their five parts.
    pub fn new(
        app_id: impl Into<String>,
        app_secret: impl Into<String>,
        permanent_code: impl Into<String>,
        user_id: impl Into<String>,
        corp_id: impl Into<String>,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            app_secret: app_secret.into(),
            permanent_code: permanent_code.into(),
            user_id: user_id.into(),
            corp_id: corp_id.into(),
        }
    }

    /// Reads credentials from `FXIAOKE_APP_ID`, `FXIAOKE_APP_SECRET`,
    /// `FXIAOKE_PERMANENT_CODE`, `FXIAOKE_USER_ID` and `FXIAOKE_CORP_ID`.
    ///
    /// Unset variables are left empty and rejected when the client is built.
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).unwrap_or_default();
        Self {
            app_id: var("FXIAOKE_APP_ID"),
            app_secret: var("FXIAOKE_APP_SECRET"),
            permanent_code: var("FXIAOKE_PERMANENT_CODE"),
            user_id: var("FXIAOKE_USER_ID"),
            corp_id: var("FXIAOKE_CORP_ID"),
        }
    }

    /// Fails with [`Error::Validation`] naming the first empty field.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("app_id", &self.app_id),
            ("app_secret", &self.app_secret),
            ("permanent_code", &self.permanent_code),
            ("user_id", &self.user_id),
            ("corp_id", &self.corp_id),
        ];
        for (name, value) in fields {
            if value.is_empty() {
                return Err(Error::empty(name));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("app_id", &self.app_id)
            .field("app_secret", &"<redacted>")
            .field("permanent_code", &"<redacted>")
            .field("user_id", &self.user_id)
            .field("corp_id", &self.corp_id)
            .finish()
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(rename = "corpAccessToken")]
    corp_access_token: String,
    #[serde(rename = "expiresIn")]
    expires_in: i64,
}

/// A client for the Fxiaoke open platform.
///
/// The client is cheap to clone; clones share the transport and the cached
/// access token, which is fetched on the first authenticated call and
/// refreshed whenever it expires.
///
/// # Examples
///
/// ```no_run
/// use fxiaoke::{Client, Payload};
///
/// # async fn example() -> Result<(), fxiaoke::Error> {
/// let client = Client::builder()
///     .app_id("FSAID_1")
///     .app_secret("secret")
///     .permanent_code("code")
///     .user_id("FSUID_1")
///     .corp_id("FSCID_1")
///     .build()?;
///
/// let body = Payload::new().with("openUserId", "FSUID_2")?;
/// let raw = client.post("/cgi/user/get", Some(body), true).await?;
/// println!("{raw}");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    transport: RetryingTransport,
    base_url: Url,
    credentials: Credentials,
    tokens: TokenManager,
}

impl Client {
    /// Creates a new `ClientBuilder` for configuring a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Creates a client with default transport settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] naming the first empty argument.
    pub fn new(
        app_id: impl Into<String>,
        app_secret: impl Into<String>,
        permanent_code: impl Into<String>,
        user_id: impl Into<String>,
        corp_id: impl Into<String>,
    ) -> Result<Self> {
        ClientBuilder::new()
            .credentials(Credentials::new(
                app_id,
                app_secret,
                permanent_code,
                user_id,
                corp_id,
            ))
            .build()
    }

    /// Returns the cached token state, if a token has been fetched.
    pub async fn token_state(&self) -> Option<TokenState> {
        self.inner.tokens.current().await
    }

    /// Returns a valid access token, refreshing it first if it is missing or
    /// expired.
    ///
    /// Concurrent callers wait on a single refresh.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Auth`] if the refresh fails.
    pub async fn ensure_valid_token(&self) -> Result<String> {
        self.inner
            .tokens
            .ensure_valid(|| self.fetch_token())
            .await
            .map_err(|e| Error::Auth(Box::new(e)))
    }

    /// Fetches a new access token even if the cached one is still valid.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Auth`] if the refresh fails.
    pub async fn refresh_access_token(&self) -> Result<String> {
        self.inner
            .tokens
            .force_refresh(|| self.fetch_token())
            .await
            .map_err(|e| Error::Auth(Box::new(e)))
    }

    /// POSTs `body` to `endpoint` and returns the raw body of a successful
    /// response.
    ///
    /// When `auth` is set, `corpId`, `currentOpenUserId` and `corpAccessToken`
    /// are added to the body after the token has been confirmed valid. A
    /// response is successful when the status is 200 and the body's
    /// `errorCode` is 0 (a missing `errorCode` counts as 0).
    ///
    /// # Errors
    ///
    /// * [`Error::Validation`] if `endpoint` is empty
    /// * [`Error::Auth`] if a token could not be obtained
    /// * [`Error::Transport`] if retries were exhausted
    /// * [`Error::Request`] for a non-200 status or non-zero `errorCode`
    /// * [`Error::Decode`] for a 200 response whose body is not JSON
    pub async fn post(&self, endpoint: &str, body: Option<Payload>, auth: bool) -> Result<String> {
        let response = self.post_raw(endpoint, body, auth).await?;
        classify(endpoint, response)
    }

    /// Like [`Client::post`], but returns the response without inspecting its
    /// status or `errorCode`.
    pub async fn post_raw(
        &self,
        endpoint: &str,
        body: Option<Payload>,
        auth: bool,
    ) -> Result<HttpResponse> {
        if endpoint.is_empty() {
            return Err(Error::empty("endpoint"));
        }

        let body = if auth {
            Some(self.authenticate(body).await?)
        } else {
            body
        };

        self.dispatch(endpoint, body.as_ref()).await
    }

    async fn authenticate(&self, body: Option<Payload>) -> Result<Payload> {
        let token = self.ensure_valid_token().await?;

        let credentials = &self.inner.credentials;
        let mut body = body.unwrap_or_default();
        body.insert_value("corpId", Value::String(credentials.corp_id.clone()));
        body.insert_value(
            "currentOpenUserId",
            Value::String(credentials.user_id.clone()),
        );
        body.insert_value("corpAccessToken", Value::String(token));
        Ok(body)
    }

    async fn dispatch(&self, endpoint: &str, body: Option<&Payload>) -> Result<HttpResponse> {
        let mut url = self.inner.base_url.clone();
        url.set_path(endpoint);

        let bytes = match body {
            Some(body) => body.to_vec()?,
            None => Vec::new(),
        };
        let request = HttpRequest::new(url).with_json_body(bytes);

        self.inner.transport.send(&request).await
    }

    async fn fetch_token(&self) -> Result<TokenGrant> {
        let credentials = &self.inner.credentials;
        let body = Payload::new()
            .with("appId", &credentials.app_id)?
            .with("appSecret", &credentials.app_secret)?
            .with("permanentCode", &credentials.permanent_code)?;

        let response = self.dispatch(TOKEN_ENDPOINT, Some(&body)).await?;
        let raw = classify(TOKEN_ENDPOINT, response)?;
        let parsed: TokenResponse = serde_json::from_str(&raw)
            .map_err(|e| Error::decode(TOKEN_ENDPOINT, raw.as_str(), e))?;

        tracing::info!(
            corp_id = %credentials.corp_id,
            expires_in = parsed.expires_in,
            "Refreshed corporate access token"
        );

        Ok(TokenGrant {
            token: parsed.corp_access_token,
            expires_in: parsed.expires_in,
        })
    }
}

/// Applies the success rule to a transport response.
fn classify(endpoint: &str, response: HttpResponse) -> Result<String> {
    let status = response.status;
    let envelope = serde_json::from_str::<Value>(&response.body);
    let raw_code = envelope
        .as_ref()
        .ok()
        .and_then(|v| v.get("errorCode"))
        .filter(|v| !v.is_null());
    let error_code = raw_code.and_then(read_error_code);
    let rejected = raw_code.is_some() && error_code != Some(0);

    if status != StatusCode::OK || rejected {
        let error_message = envelope
            .as_ref()
            .ok()
            .and_then(|v| v.get("errorMessage"))
            .and_then(Value::as_str)
            .map(str::to_string);

        tracing::error!(
            endpoint = endpoint,
            status = status.as_u16(),
            error_code = ?error_code,
            error_message = ?error_message,
            "Request rejected"
        );

        return Err(Error::Request {
            endpoint: endpoint.to_string(),
            status,
            error_code,
            error_message,
            raw_response: response.body,
        });
    }

    if let Err(e) = envelope {
        return Err(Error::decode(endpoint, response.body, e));
    }

    Ok(response.body)
}

/// Reads an `errorCode` given as an integer, a float or a numeric string.
/// Fractional parts are truncated.
fn read_error_code(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f as i64))
        }
        _ => None,
    }
}

/// Builder for configuring and creating a [`Client`].
///
/// # Examples
///
/// ```no_run
/// use fxiaoke::{ClientBuilder, Credentials, retry::ExponentialBackoff};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # fn example() -> Result<(), fxiaoke::Error> {
/// let client = ClientBuilder::new()
///     .credentials(Credentials::from_env())
///     .timeout(Duration::from_secs(5))
///     .backoff(ExponentialBackoff {
///         max_elapsed_time: Duration::from_secs(60),
///         ..ExponentialBackoff::default()
///     })
///     .notify(Arc::new(|error: &fxiaoke::Error, wait: Duration| {
///         eprintln!("retrying in {wait:?} after {error}");
///     }))
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    credentials: Credentials,
    base_url: Option<Url>,
    timeout: Duration,
    backoff: ExponentialBackoff,
    notify: Option<Notify>,
    sender: Option<Arc<dyn HttpSend>>,
}

impl ClientBuilder {
    /// Creates a new `ClientBuilder` with default settings.
    pub fn new() -> Self {
        Self {
            credentials: Credentials::default(),
            base_url: None,
            timeout: DEFAULT_TIMEOUT,
            backoff: ExponentialBackoff::default(),
            notify: None,
            sender: None,
        }
    }

    /// Sets all five credentials at once.
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Sets the application id.
    pub fn app_id(mut self, app_id: impl Into<String>) -> Self {
        self.credentials.app_id = app_id.into();
        self
    }

    /// Sets the application secret.
    pub fn app_secret(mut self, app_secret: impl Into<String>) -> Self {
        self.credentials.app_secret = app_secret.into();
        self
    }

    /// Sets the permanent code.
    pub fn permanent_code(mut self, permanent_code: impl Into<String>) -> Self {
        self.credentials.permanent_code = permanent_code.into();
        self
    }

    /// Sets the open user id calls act as.
    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.credentials.user_id = user_id.into();
        self
    }

    /// Sets the corporation id.
    pub fn corp_id(mut self, corp_id: impl Into<String>) -> Self {
        self.credentials.corp_id = corp_id.into();
        self
    }

    /// Overrides the platform origin. Defaults to [`BASE_URL`].
    ///
    /// Endpoint paths replace the URL's path, so any path prefix in `url`
    /// is dropped; only the scheme, host and port are used.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn base_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        self.base_url = Some(Url::parse(url.as_ref())?);
        Ok(self)
    }

    /// Sets the per-attempt timeout of the default sender.
    ///
    /// Ignored when a custom sender is supplied.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the retry backoff.
    pub fn backoff(mut self, backoff: ExponentialBackoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Sets a callback fired before each retry.
    pub fn notify(mut self, notify: Notify) -> Self {
        self.notify = Some(notify);
        self
    }

    /// Replaces the default `reqwest` sender.
    pub fn sender(mut self, sender: Arc<dyn HttpSend>) -> Self {
        self.sender = Some(sender);
        self
    }

    /// Builds the configured `Client`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] naming the first empty credential, or an
    /// error if the HTTP client cannot be created.
    pub fn build(self) -> Result<Client> {
        self.credentials.validate()?;

        let base_url = match self.base_url {
            Some(url) => url,
            None => Url::parse(BASE_URL)?,
        };

        let sender = match self.sender {
            Some(sender) => sender,
            None => Arc::new(ReqwestSender::new(self.timeout)?),
        };

        let mut transport = RetryingTransport::new(sender, self.backoff);
        if let Some(notify) = self.notify {
            transport = transport.with_notify(notify);
        }

        Ok(Client {
            inner: Arc::new(ClientInner {
                transport,
                base_url,
                credentials: self.credentials,
                tokens: TokenManager::new(),
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use http::HeaderMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSender {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl HttpSend for CountingSender {
        async fn send(&self, _request: &HttpRequest) -> Result<HttpResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(HttpResponse::new(
                StatusCode::OK,
                HeaderMap::new(),
                r#"{"errorCode":0}"#,
            ))
        }
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse::new(StatusCode::from_u16(status).unwrap(), HeaderMap::new(), body)
    }

    #[test]
    fn test_build_rejects_each_empty_credential() {
        let full = Credentials::new("app", "secret", "code", "user", "corp");
        let cases: [(&str, fn(&mut Credentials)); 5] = [
            ("app_id", |c| c.app_id.clear()),
            ("app_secret", |c| c.app_secret.clear()),
            ("permanent_code", |c| c.permanent_code.clear()),
            ("user_id", |c| c.user_id.clear()),
            ("corp_id", |c| c.corp_id.clear()),
        ];

        for (expected, clear) in cases {
            let mut credentials = full.clone();
            clear(&mut credentials);

            match Client::builder().credentials(credentials).build() {
                Err(Error::Validation { field, .. }) => assert_eq!(field, expected),
                Err(e) => panic!("Expected Validation error for {expected}, got {e:?}"),
                Ok(_) => panic!("Expected Validation error for {expected}"),
            }
        }
    }

    #[test]
    fn test_classify_success() {
        let body = r#"{"errorCode":0,"data":{"total":0}}"#;
        assert_eq!(classify("/x", response(200, body)).unwrap(), body);
    }

    #[test]
    fn test_classify_missing_error_code_is_success() {
        assert!(classify("/x", response(200, r#"{"name":"Alice"}"#)).is_ok());
    }

    #[test]
    fn test_classify_application_error() {
        let body = r#"{"errorCode":1,"errorMessage":"system error"}"#;
        match classify("/x", response(200, body)) {
            Err(Error::Request {
                endpoint,
                status,
                error_code,
                error_message,
                raw_response,
            }) => {
                assert_eq!(endpoint, "/x");
                assert_eq!(status, StatusCode::OK);
                assert_eq!(error_code, Some(1));
                assert_eq!(error_message.as_deref(), Some("system error"));
                assert_eq!(raw_response, body);
            }
            other => panic!("Expected Request error, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_error_code_in_other_forms() {
        let cases = [
            (r#"{"errorCode":1.0}"#, Some(1)),
            (r#"{"errorCode":"20016"}"#, Some(20016)),
            (r#"{"errorCode":"20016.0"}"#, Some(20016)),
            (r#"{"errorCode":"busy"}"#, None),
            (r#"{"errorCode":true}"#, None),
        ];

        for (body, expected) in cases {
            match classify("/x", response(200, body)) {
                Err(Error::Request { error_code, .. }) => assert_eq!(error_code, expected, "{body}"),
                other => panic!("Expected Request error for {body}, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_classify_zero_error_code_in_other_forms() {
        for body in [
            r#"{"errorCode":0.0}"#,
            r#"{"errorCode":"0"}"#,
            r#"{"errorCode":null}"#,
        ] {
            assert!(classify("/x", response(200, body)).is_ok(), "{body}");
        }
    }

    #[test]
    fn test_classify_http_error_regardless_of_body() {
        let err = classify("/x", response(500, r#"{"errorCode":0}"#)).unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));

        let err = classify("/x", response(502, "<html>bad gateway</html>")).unwrap_err();
        assert!(matches!(err, Error::Request { error_code: None, .. }));
    }

    #[test]
    fn test_classify_non_json_success_is_decode_error() {
        let err = classify("/x", response(200, "not json")).unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
        assert_eq!(err.raw_response(), Some("not json"));
    }

    #[tokio::test]
    async fn test_empty_endpoint_makes_no_call() {
        let sender = Arc::new(CountingSender {
            calls: AtomicUsize::new(0),
        });
        let client = Client::builder()
            .credentials(Credentials::new("app", "secret", "code", "user", "corp"))
            .sender(sender.clone())
            .build()
            .unwrap();

        let result = client.post("", None, true).await;

        match result {
            Err(Error::Validation { field, .. }) => assert_eq!(field, "endpoint"),
            other => panic!("Expected Validation error, got {:?}", other),
        }
        assert_eq!(sender.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_token_response_without_token_is_auth_error() {
        let sender = Arc::new(CountingSender {
            calls: AtomicUsize::new(0),
        });
        let client = Client::builder()
            .credentials(Credentials::new("app", "secret", "code", "user", "corp"))
            .sender(sender.clone())
            .build()
            .unwrap();

        let err = client.ensure_valid_token().await.unwrap_err();

        match err {
            Error::Auth(cause) => assert!(matches!(*cause, Error::Decode { .. })),
            other => panic!("Expected Auth error, got {:?}", other),
        }
        assert!(client.token_state().await.is_none());
        assert_eq!(sender.calls.load(Ordering::SeqCst), 1);
    }
}
