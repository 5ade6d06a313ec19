//! Server error bodies.

use std::fmt;

use serde::Deserialize;

/// Error payload returned by the API on non-success responses.
///
/// The API reports failures as `{"error_type": ..., "error_description": ...}`.
/// Bodies that are not JSON are kept as a plain description so the text
/// still reaches the logs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable error class, e.g. `RateLimitError`.
    #[serde(default)]
    pub error_type: Option<String>,
    /// Human-readable description.
    #[serde(default)]
    pub error_description: Option<String>,
}

impl ErrorBody {
    /// Parses a response body, falling back to the raw text.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        if let Ok(body) = serde_json::from_str::<Self>(text) {
            return body;
        }
        let trimmed = text.trim();
        Self {
            error_type: None,
            error_description: (!trimmed.is_empty()).then(|| trimmed.to_string()),
        }
    }

    /// Returns the description, or an empty string.
    #[must_use]
    pub fn description(&self) -> &str {
        self.error_description.as_deref().unwrap_or_default()
    }
}

impl fmt::Display for ErrorBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.error_type, &self.error_description) {
            (Some(kind), Some(description)) => write!(f, "{kind}: {description}"),
            (Some(kind), None) => write!(f, "{kind}"),
            (None, Some(description)) => write!(f, "{description}"),
            (None, None) => write!(f, "no error details"),
        }
    }
}
