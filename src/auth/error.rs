//! Error types for the token exchange.

use thiserror::Error;

/// Errors that can occur while obtaining a bearer token.
///
/// All variants are fatal for the run: the exchange is never retried at this
/// layer.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The JWT assertion could not be signed with the shared secret.
    #[error("failed to sign token assertion: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),

    /// Network-level failure talking to the token endpoint.
    #[error("network error requesting token from {url}: {source}")]
    Network {
        /// Token endpoint URL.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// The token endpoint answered with a non-success status.
    #[error("token exchange rejected by {url} (HTTP {status}): {detail}")]
    Rejected {
        /// Token endpoint URL.
        url: String,
        /// The HTTP status code.
        status: u16,
        /// Server-provided error description, if any.
        detail: String,
    },

    /// The token endpoint answered 2xx without a usable `access_token`.
    #[error("token response from {url} did not contain an access token")]
    MissingToken {
        /// Token endpoint URL.
        url: String,
    },
}
