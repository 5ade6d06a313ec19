//! Error types for API requests.

use thiserror::Error;

use super::ErrorBody;
use crate::auth::AuthError;

/// Errors returned by [`RequestExecutor`](super::RequestExecutor) and the
/// report endpoints built on it.
///
/// Expired tokens and rate limiting are recovered inside the executor and
/// only surface here when a retry ceiling is hit.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No token could be obtained.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error requesting {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout requesting {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// Non-success response that is neither token expiry nor rate limiting.
    #[error("HTTP {status} from {url}: {body}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
        /// Parsed server error body.
        body: ErrorBody,
    },

    /// The server kept reporting an expired token right after re-authentication.
    #[error("re-authentication failed {attempts} times in a row for {url}")]
    ReauthExhausted {
        /// The URL being requested.
        url: String,
        /// Number of expired-token responses seen for this call.
        attempts: u32,
    },

    /// The configured rate-limit retry ceiling was reached.
    #[error("rate limited {attempts} times for {url}; giving up")]
    RateLimitExhausted {
        /// The URL being requested.
        url: String,
        /// Number of rate-limit responses seen for this call.
        attempts: u32,
    },

    /// Response body was not the JSON shape the endpoint promises.
    #[error("failed to decode response from {url}: {source}")]
    Decode {
        /// The URL whose response failed to decode.
        url: String,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Response decoded but violates the endpoint contract.
    #[error("protocol error from {url}: {reason}")]
    Protocol {
        /// The URL whose response violated the contract.
        url: String,
        /// What was wrong with it.
        reason: String,
    },
}

impl ApiError {
    /// Creates a network error, promoting timeouts to [`ApiError::Timeout`].
    pub fn from_reqwest(url: impl Into<String>, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout { url: url.into() }
        } else {
            Self::Network {
                url: url.into(),
                source,
            }
        }
    }

    /// Creates a protocol error.
    pub fn protocol(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Protocol {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Returns true when no further request can succeed in this run
    /// (authentication is broken).
    #[must_use]
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Auth(_) | Self::ReauthExhausted { .. })
    }
}
