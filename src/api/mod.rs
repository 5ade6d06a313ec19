//! Authenticated request execution against the report API.
//!
//! [`RequestExecutor`] is the only place server-side failures are
//! interpreted. Every call gets a bearer token from the
//! [`TokenManager`](crate::auth::TokenManager) and is retried when:
//!
//! - the server says the token has expired: the token is invalidated and the
//!   request is re-sent immediately, up to [`RetryPolicy::max_reauth_attempts`]
//! - the server rate limits the client: the executor sleeps for the wait the
//!   server suggested ("retry in N seconds", or `Retry-After`), falling back
//!   to 10 seconds, then re-sends
//!
//! Everything else is returned to the caller as an [`ApiError`].

mod body;
mod error;
mod executor;
mod retry;

use url::Url;

pub use body::ErrorBody;
pub use error::ApiError;
pub use executor::{ApiRequest, RequestExecutor};
pub use retry::{
    DEFAULT_MAX_REAUTH_ATTEMPTS, DEFAULT_RATE_LIMIT_WAIT, FailureType, RetryPolicy,
    classify_failure, parse_retry_after, parse_retry_in,
};

/// Appends path segments to `base`, percent-encoding each segment.
///
/// A trailing slash on `base` is ignored, so `https://h/api` and
/// `https://h/api/` both yield `https://h/api/<segments...>`.
#[must_use]
pub fn endpoint(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    url.set_query(None);
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_without_trailing_slash() {
        let base = Url::parse("https://lims.example.com/api").unwrap();
        assert_eq!(
            endpoint(&base, &["reports"]).as_str(),
            "https://lims.example.com/api/reports"
        );
    }

    #[test]
    fn test_endpoint_with_trailing_slash() {
        let base = Url::parse("https://lims.example.com/api/").unwrap();
        assert_eq!(
            endpoint(&base, &["reports", "42"]).as_str(),
            "https://lims.example.com/api/reports/42"
        );
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let base = Url::parse("https://lims.example.com/").unwrap();
        assert_eq!(
            endpoint(&base, &["reports", "a/b"]).as_str(),
            "https://lims.example.com/reports/a%2Fb"
        );
    }
}
