//! The resilient request executor.

use reqwest::header::RETRY_AFTER;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::retry::{FailureType, RetryPolicy, classify_failure};
use super::{ApiError, ErrorBody};
use crate::auth::TokenManager;

/// A logical API request that can be re-sent verbatim on retry.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    url: Url,
    query: Vec<(String, String)>,
}

impl ApiRequest {
    /// Creates a GET request.
    #[must_use]
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            query: Vec::new(),
        }
    }

    /// Appends a query parameter.
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Returns the request URL (without query parameters).
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    fn build(&self, client: &Client) -> RequestBuilder {
        client
            .request(self.method.clone(), self.url.clone())
            .query(&self.query)
    }
}

/// Executes authenticated API requests with transparent re-authentication
/// and rate-limit backoff.
///
/// # Example
///
/// ```no_run
/// use qbench_sync_core::api::{ApiRequest, RequestExecutor, RetryPolicy, endpoint};
/// use qbench_sync_core::auth::{Credential, TokenManager};
/// use url::Url;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = reqwest::Client::new();
/// let base = Url::parse("https://lims.example.com/api/")?;
/// let tokens = TokenManager::new(client.clone(), &base, Credential::new("bot", "secret"));
/// let executor = RequestExecutor::new(client, tokens, RetryPolicy::default());
///
/// let request = ApiRequest::get(endpoint(&base, &["reports", "42"]));
/// let detail: serde_json::Value = executor.get_json(&request).await?;
/// println!("{detail}");
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct RequestExecutor {
    client: Client,
    tokens: TokenManager,
    policy: RetryPolicy,
}

impl RequestExecutor {
    /// Creates an executor.
    #[must_use]
    pub fn new(client: Client, tokens: TokenManager, policy: RetryPolicy) -> Self {
        Self {
            client,
            tokens,
            policy,
        }
    }

    /// Returns the token manager.
    #[must_use]
    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    /// Returns the retry policy.
    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Sends `request` with a bearer token, retrying on token expiry and rate
    /// limiting until it succeeds or fails for another reason.
    ///
    /// # Errors
    ///
    /// - [`ApiError::Auth`] when no token can be obtained
    /// - [`ApiError::ReauthExhausted`] after `max_reauth_attempts` expired-token responses
    /// - [`ApiError::RateLimitExhausted`] when the optional rate-limit ceiling is hit
    /// - [`ApiError::HttpStatus`] for any other non-success response
    /// - [`ApiError::Network`] / [`ApiError::Timeout`] for transport failures
    #[instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    pub async fn execute(&self, request: &ApiRequest) -> Result<Response, ApiError> {
        let url = request.url.to_string();
        let mut expired_responses = 0u32;
        let mut rate_limited_responses = 0u32;

        loop {
            let token = self.tokens.get_valid_token().await?;

            let response = request
                .build(&self.client)
                .bearer_auth(token.value())
                .send()
                .await
                .map_err(|e| ApiError::from_reqwest(&url, e))?;

            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }

            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(std::string::ToString::to_string);
            let body = ErrorBody::parse(&response.text().await.unwrap_or_default());

            match classify_failure(status.as_u16(), &body, retry_after.as_deref()) {
                FailureType::TokenExpired => {
                    expired_responses += 1;
                    if expired_responses >= self.policy.max_reauth_attempts() {
                        warn!(
                            attempts = expired_responses,
                            "token still rejected as expired after re-authentication"
                        );
                        return Err(ApiError::ReauthExhausted {
                            url,
                            attempts: expired_responses,
                        });
                    }
                    info!(attempt = expired_responses, "access token expired; re-authenticating");
                    self.tokens.invalidate().await;
                }
                FailureType::RateLimited { wait } => {
                    rate_limited_responses += 1;
                    if let Some(max) = self.policy.max_rate_limit_retries()
                        && rate_limited_responses > max
                    {
                        return Err(ApiError::RateLimitExhausted {
                            url,
                            attempts: rate_limited_responses,
                        });
                    }
                    let delay = self.policy.rate_limit_delay(wait);
                    info!(
                        attempt = rate_limited_responses,
                        delay_ms = delay.as_millis(),
                        using_server_hint = wait.is_some(),
                        "rate limited; backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                FailureType::Fatal => {
                    debug!(status = status.as_u16(), %body, "request failed");
                    return Err(ApiError::HttpStatus {
                        url,
                        status: status.as_u16(),
                        body,
                    });
                }
            }
        }
    }

    /// Executes `request` and decodes the JSON response body.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`execute`](Self::execute), plus
    /// [`ApiError::Decode`] when the body is not the expected JSON.
    pub async fn get_json<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<T, ApiError> {
        let response = self.execute(request).await?;
        let url = request.url.to_string();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::from_reqwest(&url, e))?;
        serde_json::from_slice(&bytes).map_err(|source| ApiError::Decode { url, source })
    }
}
