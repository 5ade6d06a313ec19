//! Bearer token cache and exchange.

use std::fmt;
use std::time::{Duration, Instant};

use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};
use url::Url;

use super::{AuthError, DEFAULT_ASSERTION_LIFETIME, sign_assertion};
use crate::api::{ErrorBody, endpoint};

/// Local token lifetime (4 minutes), deliberately shorter than the server's.
pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(240);

/// OAuth grant type for JWT bearer assertions (RFC 7523).
pub const JWT_BEARER_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// API credential: username plus the shared signing secret.
#[derive(Clone)]
pub struct Credential {
    username: String,
    secret: String,
}

impl Credential {
    /// Creates a credential.
    pub fn new(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            secret: secret.into(),
        }
    }

    /// Returns the username (assertion subject).
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    pub(crate) fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Opaque bearer token with a process-local expiry estimate.
#[derive(Clone)]
pub struct AccessToken {
    value: String,
    issued_at: Instant,
    expires_at: Instant,
}

impl AccessToken {
    /// Creates a token issued now that the client treats as valid for `lifetime`.
    pub fn new(value: impl Into<String>, lifetime: Duration) -> Self {
        let issued_at = Instant::now();
        Self {
            value: value.into(),
            issued_at,
            expires_at: issued_at.checked_add(lifetime).unwrap_or(issued_at),
        }
    }

    /// Returns the raw token for the `Authorization` header.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Returns when the token was obtained.
    #[must_use]
    pub fn issued_at(&self) -> Instant {
        self.issued_at
    }

    /// Returns the local expiry estimate.
    #[must_use]
    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    /// Returns true once the local clock has reached the expiry estimate.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"<redacted>")
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

/// Obtains and caches bearer tokens.
///
/// The cache lives behind an async mutex that is held across the exchange,
/// so concurrent callers wait for one in-flight refresh instead of each
/// exchanging their own assertion.
///
/// # Example
///
/// ```no_run
/// use qbench_sync_core::auth::{Credential, TokenManager};
/// use url::Url;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let base = Url::parse("https://lims.example.com/api/")?;
/// let tokens = TokenManager::new(reqwest::Client::new(), &base, Credential::new("bot", "secret"));
/// let token = tokens.get_valid_token().await?;
/// println!("token valid until {:?}", token.expires_at());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct TokenManager {
    client: Client,
    token_url: Url,
    credential: Credential,
    assertion_lifetime: Duration,
    token_lifetime: Duration,
    cached: Mutex<Option<AccessToken>>,
}

impl TokenManager {
    /// Creates a manager exchanging tokens at `{base_url}/auth/token`.
    #[must_use]
    pub fn new(client: Client, base_url: &Url, credential: Credential) -> Self {
        Self {
            client,
            token_url: endpoint(base_url, &["auth", "token"]),
            credential,
            assertion_lifetime: DEFAULT_ASSERTION_LIFETIME,
            token_lifetime: DEFAULT_TOKEN_LIFETIME,
            cached: Mutex::new(None),
        }
    }

    /// Overrides the assertion and local token lifetimes.
    #[must_use]
    pub fn with_lifetimes(mut self, assertion_lifetime: Duration, token_lifetime: Duration) -> Self {
        self.assertion_lifetime = assertion_lifetime;
        self.token_lifetime = token_lifetime;
        self
    }

    /// Returns the token endpoint URL.
    #[must_use]
    pub fn token_url(&self) -> &Url {
        &self.token_url
    }

    /// Returns a token the local clock still considers valid, exchanging a
    /// fresh assertion when the cache is empty or expired.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] when signing or the exchange fails.
    #[instrument(skip(self), fields(user = %self.credential.username()))]
    pub async fn get_valid_token(&self) -> Result<AccessToken, AuthError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref()
            && !token.is_expired()
        {
            return Ok(token.clone());
        }

        if cached.is_some() {
            debug!("cached token reached local expiry; refreshing");
        }
        let token = self.exchange().await?;
        *cached = Some(token.clone());
        Ok(token)
    }

    /// Drops the cached token so the next call re-exchanges.
    pub async fn invalidate(&self) {
        let mut cached = self.cached.lock().await;
        if cached.take().is_some() {
            debug!("cached token invalidated");
        }
    }

    async fn exchange(&self) -> Result<AccessToken, AuthError> {
        let assertion = sign_assertion(&self.credential, self.assertion_lifetime)?;
        let url = self.token_url.to_string();

        let response = self
            .client
            .post(self.token_url.clone())
            .form(&[
                ("grant_type", JWT_BEARER_GRANT_TYPE),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await
            .map_err(|source| AuthError::Network {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AuthError::Rejected {
                url,
                status: status.as_u16(),
                detail: ErrorBody::parse(&text).to_string(),
            });
        }

        let bytes = response.bytes().await.map_err(|source| AuthError::Network {
            url: url.clone(),
            source,
        })?;
        let value = serde_json::from_slice::<TokenResponse>(&bytes)
            .ok()
            .and_then(|body| body.access_token)
            .filter(|token| !token.trim().is_empty())
            .ok_or(AuthError::MissingToken { url })?;

        info!(
            lifetime_secs = self.token_lifetime.as_secs(),
            "obtained access token"
        );
        Ok(AccessToken::new(value, self.token_lifetime))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_access_token_fresh_is_not_expired() {
        let token = AccessToken::new("abc", DEFAULT_TOKEN_LIFETIME);
        assert!(!token.is_expired());
        assert_eq!(token.value(), "abc");
    }

    #[test]
    fn test_access_token_zero_lifetime_is_expired() {
        let token = AccessToken::new("abc", Duration::ZERO);
        assert!(token.is_expired());
    }

    #[test]
    fn test_access_token_debug_redacts_value() {
        let token = AccessToken::new("super-secret-token", DEFAULT_TOKEN_LIFETIME);
        let debug = format!("{token:?}");
        assert!(!debug.contains("super-secret-token"));
        assert!(debug.contains("redacted"));
    }

    #[test]
    fn test_credential_debug_redacts_secret() {
        let credential = Credential::new("lab-bot", "hunter2");
        let debug = format!("{credential:?}");
        assert!(debug.contains("lab-bot"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_token_url_joins_base_path() {
        let base = Url::parse("https://lims.example.com/qbench/api/v1").unwrap();
        let manager = TokenManager::new(Client::new(), &base, Credential::new("u", "s"));
        assert_eq!(
            manager.token_url().as_str(),
            "https://lims.example.com/qbench/api/v1/auth/token"
        );
    }

    #[tokio::test]
    async fn test_invalidate_on_empty_cache_is_noop() {
        let base = Url::parse("https://lims.example.com/").unwrap();
        let manager = TokenManager::new(Client::new(), &base, Credential::new("u", "s"));
        manager.invalidate().await;
        assert!(manager.cached.lock().await.is_none());
    }
}
