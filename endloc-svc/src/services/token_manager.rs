//! Upstream credential lifecycle
//!
//! Acquires, caches, and invalidates the bearer token for the upstream
//! inventory API. The cached credential lives for a TTL shorter than the
//! upstream token's real expiry, so proactive refresh happens before the
//! upstream would start rejecting calls. A downstream 401 additionally
//! forces `invalidate()` followed by one retry (owned by the query client).

use serde_json::Value;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;

/// Token manager errors
#[derive(Debug, Error)]
pub enum TokenError {
    /// Transport-level failure (timeout, DNS, connection refused)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Login rejected by the upstream (non-200)
    #[error("Authentication failed ({0}): {1}")]
    Authentication(u16, String),

    /// Login succeeded but the token could not be extracted
    #[error("Token parse error: {0}")]
    Parse(String),
}

/// A cached bearer credential
#[derive(Debug, Clone)]
pub struct Credential {
    pub token: String,
    pub acquired_at: Instant,
}

/// Credential lifecycle states (derived from the cache slot + TTL)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    /// No credential has been acquired (or the last one was invalidated)
    Unauthenticated,
    /// A cached credential exists and is within its TTL
    Valid,
    /// A cached credential exists but its TTL has elapsed
    Expired,
}

/// Acquires and caches the upstream bearer credential
pub struct TokenManager {
    http_client: reqwest::Client,
    login_url: String,
    login: String,
    senha: String,
    ttl: Duration,
    cached: Mutex<Option<Credential>>,
}

impl TokenManager {
    pub fn new(
        http_client: reqwest::Client,
        login_url: String,
        login: String,
        senha: String,
        ttl: Duration,
    ) -> Self {
        Self {
            http_client,
            login_url,
            login,
            senha,
            ttl,
            cached: Mutex::new(None),
        }
    }

    /// Return the cached token, performing a fresh login when the cache is
    /// empty, invalidated, or older than the TTL.
    pub async fn acquire(&self) -> Result<String, TokenError> {
        let mut slot = self.cached.lock().await;

        if let Some(credential) = slot.as_ref() {
            if credential.acquired_at.elapsed() < self.ttl {
                return Ok(credential.token.clone());
            }
            tracing::debug!("Cached credential past TTL, re-authenticating");
        }

        let token = self.login().await?;
        *slot = Some(Credential {
            token: token.clone(),
            acquired_at: Instant::now(),
        });

        Ok(token)
    }

    /// Drop the cached credential; the next `acquire()` forces a re-login.
    pub async fn invalidate(&self) {
        let mut slot = self.cached.lock().await;
        if slot.take().is_some() {
            tracing::info!("Upstream credential invalidated");
        }
    }

    /// Current lifecycle state of the cached credential
    pub async fn state(&self) -> TokenState {
        match self.cached.lock().await.as_ref() {
            None => TokenState::Unauthenticated,
            Some(credential) if credential.acquired_at.elapsed() < self.ttl => TokenState::Valid,
            Some(_) => TokenState::Expired,
        }
    }

    /// Perform the login exchange against the upstream endpoint.
    ///
    /// The upstream answers either a raw token string or `{"token": "..."}`.
    async fn login(&self) -> Result<String, TokenError> {
        tracing::debug!(url = %self.login_url, login = %self.login, "Logging in to upstream API");

        let response = self
            .http_client
            .post(&self.login_url)
            .query(&[("login", self.login.as_str()), ("senha", self.senha.as_str())])
            .send()
            .await
            .map_err(|e| TokenError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TokenError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(TokenError::Authentication(status.as_u16(), body));
        }

        let token = extract_token(&body)?;
        tracing::info!("Upstream login successful");

        Ok(token)
    }
}

/// Extract the bearer token from a login response body.
///
/// Accepts `{"token": "..."}`, a JSON string literal, or a raw token string.
fn extract_token(body: &str) -> Result<String, TokenError> {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        match value {
            Value::Object(map) => {
                if let Some(Value::String(token)) = map.get("token") {
                    if !token.trim().is_empty() {
                        return Ok(token.trim().to_string());
                    }
                }
                return Err(TokenError::Parse(
                    "Login response object has no usable token field".to_string(),
                ));
            }
            Value::String(token) if !token.trim().is_empty() => {
                return Ok(token.trim().to_string());
            }
            _ => {}
        }
    }

    let raw = body.trim().trim_matches('"');
    if raw.is_empty() {
        return Err(TokenError::Parse("Empty login response".to_string()));
    }

    Ok(raw.to_string())
}
