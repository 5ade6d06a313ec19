//! Failure classification and backoff for API requests.
//!
//! When an API call fails, the status and error body are classified into a
//! [`FailureType`]:
//! - [`FailureType::TokenExpired`] - re-authenticate and retry immediately
//! - [`FailureType::RateLimited`] - sleep for the server's suggested wait, then retry
//! - [`FailureType::Fatal`] - hand the error to the caller
//!
//! [`RetryPolicy`] holds the ceilings and wait defaults the executor applies.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use qbench_sync_core::api::{ErrorBody, FailureType, classify_failure};
//!
//! let body = ErrorBody::parse(
//!     r#"{"error_type":"RateLimitError","error_description":"Too many requests, retry in 5 seconds"}"#,
//! );
//! assert_eq!(
//!     classify_failure(429, &body, None),
//!     FailureType::RateLimited { wait: Some(Duration::from_secs(5)) }
//! );
//! ```

use std::sync::LazyLock;
use std::time::Duration;

use rand::Rng;
use regex::Regex;
use tracing::{debug, instrument, warn};

use super::ErrorBody;

/// Default ceiling on expired-token responses per call.
pub const DEFAULT_MAX_REAUTH_ATTEMPTS: u32 = 3;

/// Wait used when a rate-limit response carries no usable hint.
pub const DEFAULT_RATE_LIMIT_WAIT: Duration = Duration::from_secs(10);

/// Maximum honored wait (1 hour) to prevent excessive delays.
const MAX_RATE_LIMIT_WAIT: Duration = Duration::from_secs(3600);

/// Maximum jitter added to rate-limit waits (500ms).
const MAX_JITTER: Duration = Duration::from_millis(500);

#[allow(clippy::expect_used)]
static RETRY_IN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)retry\s+in\s+(\d+)\s*sec").expect("retry-in regex is valid") // Static pattern, safe to panic
});

/// Classification of a failed API response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// The bearer token was rejected as expired.
    TokenExpired,

    /// The server is rate limiting the client.
    RateLimited {
        /// Server-suggested wait, when one could be parsed.
        wait: Option<Duration>,
    },

    /// Anything else: not retried.
    Fatal,
}

/// Retry ceilings and wait defaults for [`RequestExecutor`](super::RequestExecutor).
///
/// # Default Values
///
/// - `max_reauth_attempts`: 3
/// - `default_rate_limit_wait`: 10 seconds
/// - `max_rate_limit_retries`: unbounded
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Expired-token responses tolerated per call before giving up.
    max_reauth_attempts: u32,

    /// Wait applied when a rate-limit response has no hint.
    default_rate_limit_wait: Duration,

    /// Optional ceiling on rate-limit retries per call.
    max_rate_limit_retries: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_reauth_attempts: DEFAULT_MAX_REAUTH_ATTEMPTS,
            default_rate_limit_wait: DEFAULT_RATE_LIMIT_WAIT,
            max_rate_limit_retries: None,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with custom settings.
    ///
    /// `max_reauth_attempts` is clamped to at least 1.
    #[must_use]
    pub fn new(
        max_reauth_attempts: u32,
        default_rate_limit_wait: Duration,
        max_rate_limit_retries: Option<u32>,
    ) -> Self {
        Self {
            max_reauth_attempts: max_reauth_attempts.max(1),
            default_rate_limit_wait,
            max_rate_limit_retries,
        }
    }

    /// Returns the expired-token ceiling.
    #[must_use]
    pub fn max_reauth_attempts(&self) -> u32 {
        self.max_reauth_attempts
    }

    /// Returns the rate-limit retry ceiling, if any.
    #[must_use]
    pub fn max_rate_limit_retries(&self) -> Option<u32> {
        self.max_rate_limit_retries
    }

    /// Returns the wait used when the server gives no hint.
    #[must_use]
    pub fn default_rate_limit_wait(&self) -> Duration {
        self.default_rate_limit_wait
    }

    /// Computes how long to sleep before retrying a rate-limited call.
    ///
    /// Formula: `min(hint.unwrap_or(default), 1h) + jitter`, so the result is
    /// never shorter than the server's hint.
    #[must_use]
    pub fn rate_limit_delay(&self, hint: Option<Duration>) -> Duration {
        let base = hint.unwrap_or(self.default_rate_limit_wait);
        let capped = if base > MAX_RATE_LIMIT_WAIT {
            warn!(
                wait_secs = base.as_secs(),
                max_secs = MAX_RATE_LIMIT_WAIT.as_secs(),
                "rate-limit wait exceeds maximum, capping at 1 hour"
            );
            MAX_RATE_LIMIT_WAIT
        } else {
            base
        };
        capped + calculate_jitter()
    }
}

/// Generates random jitter between 0 and `MAX_JITTER`.
#[allow(clippy::cast_possible_truncation)]
fn calculate_jitter() -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_ms = rng.gen_range(0..=MAX_JITTER.as_millis() as u64);
    Duration::from_millis(jitter_ms)
}

/// Classifies a non-success response.
///
/// | Signal | Type |
/// |--------|------|
/// | description mentions "token has expired" / "token expired" | `TokenExpired` |
/// | `error_type` is `RateLimitError` | `RateLimited` |
/// | description mentions "ratelimit" / "rate limit" / "retry in N seconds" | `RateLimited` |
/// | HTTP 429 | `RateLimited` |
/// | anything else | `Fatal` |
///
/// For rate limiting, the wait comes from "retry in N seconds" in the
/// description, then from the `Retry-After` header.
#[instrument(skip(body), fields(error_type = ?body.error_type))]
pub fn classify_failure(status: u16, body: &ErrorBody, retry_after: Option<&str>) -> FailureType {
    let description = body.description().to_lowercase();

    if description.contains("token has expired") || description.contains("token expired") {
        return FailureType::TokenExpired;
    }

    let hinted_wait = parse_retry_in(&description);
    let rate_limited = body
        .error_type
        .as_deref()
        .is_some_and(|kind| kind.eq_ignore_ascii_case("RateLimitError"))
        || description.contains("ratelimit")
        || description.contains("rate limit")
        || hinted_wait.is_some()
        || status == 429;

    if rate_limited {
        let wait = hinted_wait.or_else(|| retry_after.and_then(parse_retry_after));
        debug!(status, wait_secs = wait.map(|w| w.as_secs()), "rate limited");
        return FailureType::RateLimited { wait };
    }

    FailureType::Fatal
}

/// Extracts the wait from messages like "Rate limit exceeded, retry in 5 seconds".
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use qbench_sync_core::api::parse_retry_in;
///
/// assert_eq!(parse_retry_in("retry in 5 seconds"), Some(Duration::from_secs(5)));
/// assert_eq!(parse_retry_in("Please Retry In 1 second."), Some(Duration::from_secs(1)));
/// assert_eq!(parse_retry_in("slow down"), None);
/// ```
#[must_use]
pub fn parse_retry_in(message: &str) -> Option<Duration> {
    let captures = RETRY_IN_PATTERN.captures(message)?;
    let seconds = captures.get(1)?.as_str().parse::<u64>().ok()?;
    Some(Duration::from_secs(seconds))
}

/// Parses a Retry-After header value into a Duration.
///
/// Supports two formats as per RFC 7231:
/// - Integer seconds: `Retry-After: 120`
/// - HTTP-date: `Retry-After: Wed, 21 Oct 2025 07:28:00 GMT`
///
/// Returns `None` if the value cannot be parsed.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use qbench_sync_core::api::parse_retry_after;
///
/// assert_eq!(parse_retry_after("120"), Some(Duration::from_secs(120)));
/// assert_eq!(parse_retry_after("0"), Some(Duration::ZERO));
/// assert_eq!(parse_retry_after("invalid"), None);
/// ```
#[must_use]
pub fn parse_retry_after(header_value: &str) -> Option<Duration> {
    let header_value = header_value.trim();

    if let Ok(seconds) = header_value.parse::<i64>() {
        let Ok(seconds) = u64::try_from(seconds) else {
            debug!(seconds, "negative Retry-After value, ignoring");
            return None;
        };
        return Some(Duration::from_secs(seconds));
    }

    let Ok(datetime) = httpdate::parse_http_date(header_value) else {
        debug!(header_value, "unparseable Retry-After value");
        return None;
    };
    // A date in the past means "retry now".
    Some(
        datetime
            .duration_since(std::time::SystemTime::now())
            .unwrap_or(Duration::ZERO),
    )
}
