//! Corporate access token caching.
//!
//! [`TokenManager`] owns the only copy of the current token. Every
//! authenticated call goes through [`TokenManager::ensure_valid`], which
//! refreshes lazily when the cached token is missing or expired.

use crate::Result;
use std::future::Future;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;

/// A token and the window in which it is valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenState {
    /// The corporate access token.
    pub token: String,
    /// Lifetime of the token in seconds, as reported by the platform.
    pub expires_in: i64,
    /// Unix time (seconds) at which the token was obtained.
    pub refreshed_at: i64,
}

impl TokenState {
    /// Returns `true` while `now - refreshed_at < expires_in`.
    pub fn is_valid_at(&self, now: i64) -> bool {
        now.saturating_sub(self.refreshed_at) < self.expires_in
    }
}

/// A freshly issued token, before it is stamped with the refresh time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    /// The corporate access token.
    pub token: String,
    /// Lifetime of the token in seconds.
    pub expires_in: i64,
}

/// Caches the access token and coalesces refreshes.
///
/// The lock is held across the validity check and the refresh, so concurrent
/// callers that find the token expired wait on a single refresh and then
/// share its result.
#[derive(Debug, Default)]
pub struct TokenManager {
    state: Mutex<Option<TokenState>>,
}

impl TokenManager {
    /// Creates a manager with no token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a valid token, calling `refresh` first if needed.
    ///
    /// The new token's lifetime counts from when the refresh started.
    ///
    /// On failure the previous state, valid or not, is kept as it was.
    ///
    /// # Errors
    ///
    /// Returns whatever `refresh` returned.
    pub async fn ensure_valid<F, Fut>(&self, refresh: F) -> Result<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<TokenGrant>>,
    {
        let mut state = self.state.lock().await;

        if let Some(current) = state.as_ref() {
            if current.is_valid_at(unix_now()) {
                return Ok(current.token.clone());
            }
        }

        let requested_at = unix_now();
        let grant = refresh().await?;
        let refreshed = TokenState {
            token: grant.token,
            expires_in: grant.expires_in,
            refreshed_at: requested_at,
        };
        let token = refreshed.token.clone();
        *state = Some(refreshed);

        Ok(token)
    }

    /// Replaces the state with the result of `refresh`, regardless of validity.
    pub async fn force_refresh<F, Fut>(&self, refresh: F) -> Result<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<TokenGrant>>,
    {
        let mut state = self.state.lock().await;

        let requested_at = unix_now();
        let grant = refresh().await?;
        let token = grant.token.clone();
        *state = Some(TokenState {
            token: grant.token,
            expires_in: grant.expires_in,
            refreshed_at: requested_at,
        });

        Ok(token)
    }

    /// Returns a copy of the cached state, if any.
    pub async fn current(&self) -> Option<TokenState> {
        self.state.lock().await.clone()
    }

    /// Drops the cached token so the next call refreshes.
    pub async fn invalidate(&self) {
        *self.state.lock().await = None;
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}
