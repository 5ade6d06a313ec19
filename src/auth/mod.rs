//! Credentials, signed assertions, and bearer token lifecycle.
//!
//! The API does not support interactive login. Instead the client signs a
//! short-lived JWT assertion with the shared secret and exchanges it for an
//! opaque bearer token (`grant_type=urn:ietf:params:oauth:grant-type:jwt-bearer`).
//! [`TokenManager`] caches that token and re-exchanges it before the server
//! would reject it, or immediately after [`TokenManager::invalidate`].

mod assertion;
mod error;
mod token;

pub use assertion::{AssertionClaims, DEFAULT_ASSERTION_LIFETIME, sign_assertion};
pub use error::AuthError;
pub use token::{
    AccessToken, Credential, DEFAULT_TOKEN_LIFETIME, JWT_BEARER_GRANT_TYPE, TokenManager,
};
