//! Short-lived JWT assertions used for the token exchange.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};

use super::{AuthError, Credential};

/// Default assertion lifetime (5 minutes).
pub const DEFAULT_ASSERTION_LIFETIME: Duration = Duration::from_secs(300);

/// Claims carried by the signed assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionClaims {
    /// Subject: the API username.
    pub sub: String,
    /// Issued at (Unix timestamp).
    pub iat: i64,
    /// Expiration (Unix timestamp).
    pub exp: i64,
}

/// Signs an HS256 assertion for `credential`, valid for `lifetime` from now.
///
/// # Errors
///
/// Returns [`AuthError::Signing`] if encoding fails.
pub fn sign_assertion(credential: &Credential, lifetime: Duration) -> Result<String, AuthError> {
    let issued_at = Utc::now().timestamp();
    let lifetime_secs = i64::try_from(lifetime.as_secs()).unwrap_or(i64::MAX);
    let claims = AssertionClaims {
        sub: credential.username().to_string(),
        iat: issued_at,
        exp: issued_at.saturating_add(lifetime_secs),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(credential.secret().as_bytes()),
    )
    .map_err(AuthError::Signing)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use jsonwebtoken::{DecodingKey, Validation, decode};

    use super::*;

    fn decode_claims(token: &str, secret: &str) -> AssertionClaims {
        let validation = Validation::new(Algorithm::HS256);
        decode::<AssertionClaims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &validation,
        )
        .unwrap()
        .claims
    }

    #[test]
    fn test_sign_assertion_subject_is_username() {
        let credential = Credential::new("lab-bot", "s3cret");
        let token = sign_assertion(&credential, DEFAULT_ASSERTION_LIFETIME).unwrap();

        let claims = decode_claims(&token, "s3cret");
        assert_eq!(claims.sub, "lab-bot");
    }

    #[test]
    fn test_sign_assertion_expires_after_lifetime() {
        let credential = Credential::new("lab-bot", "s3cret");
        let token = sign_assertion(&credential, DEFAULT_ASSERTION_LIFETIME).unwrap();

        let claims = decode_claims(&token, "s3cret");
        assert_eq!(claims.exp - claims.iat, 300);
    }

    #[test]
    fn test_sign_assertion_rejected_with_wrong_secret() {
        let credential = Credential::new("lab-bot", "s3cret");
        let token = sign_assertion(&credential, DEFAULT_ASSERTION_LIFETIME).unwrap();

        let result = decode::<AssertionClaims>(
            &token,
            &DecodingKey::from_secret(b"other"),
            &Validation::new(Algorithm::HS256),
        );
        assert!(result.is_err());
    }
}
