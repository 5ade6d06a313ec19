//! Shared HTTP client construction.
//!
//! One `reqwest::Client` is built per run and shared by the token exchange,
//! the API executor, and the artifact downloader so they reuse pooled
//! connections and agree on timeouts and User-Agent. Proxies come from
//! reqwest's own environment lookup (`HTTPS_PROXY`, `NO_PROXY`, ...).

use std::time::Duration;

use reqwest::Client;
use tracing::debug;

use crate::user_agent;

/// Builds the shared HTTP client with the given timeouts.
///
/// `read_timeout_secs` bounds a whole request including body streaming.
///
/// # Errors
///
/// Returns the underlying [`reqwest::Error`] when the client cannot be built
/// (for example, a TLS backend failing to initialize).
pub fn build_http_client(
    connect_timeout_secs: u64,
    read_timeout_secs: u64,
) -> Result<Client, reqwest::Error> {
    debug!(connect_timeout_secs, read_timeout_secs, "building HTTP client");
    Client::builder()
        .connect_timeout(Duration::from_secs(connect_timeout_secs))
        .timeout(Duration::from_secs(read_timeout_secs))
        .gzip(true)
        .user_agent(user_agent::default_user_agent())
        .build()
}
