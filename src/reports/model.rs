//! Report data types.

use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Report identifier.
///
/// The API sends ids as JSON numbers, but they are only ever used as opaque
/// keys (ledger keys, filenames, URL segments), so both numbers and strings
/// are accepted and kept in their textual form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReportId(String);

impl ReportId {
    /// Creates an id from its textual form.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the textual form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for ReportId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for ReportId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl Serialize for ReportId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ReportId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ReportIdVisitor;

        impl Visitor<'_> for ReportIdVisitor {
            type Value = ReportId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a report id as a string or integer")
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<ReportId, E> {
                Ok(ReportId(value.to_string()))
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<ReportId, E> {
                Ok(ReportId(value.to_string()))
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<ReportId, E> {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    return Err(E::invalid_value(de::Unexpected::Str(value), &self));
                }
                Ok(ReportId(trimmed.to_string()))
            }
        }

        deserializer.deserialize_any(ReportIdVisitor)
    }
}

/// A report as returned by the listing endpoint.
///
/// Only `id` is interpreted; the remaining fields are kept for logging.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Report {
    /// Report id.
    pub id: ReportId,
    /// All other listing fields.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Report {
    /// Creates a listing record with no extra fields.
    pub fn new(id: impl Into<ReportId>) -> Self {
        Self {
            id: id.into(),
            fields: Map::new(),
        }
    }
}

/// Full report detail; only the artifact URL matters here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportDetail {
    /// Report id the detail was fetched for.
    pub id: ReportId,
    /// `data.url`, if the report has an artifact yet.
    pub url: Option<String>,
}

impl ReportDetail {
    /// Returns the artifact URL, treating a blank string as absent.
    #[must_use]
    pub fn artifact_url(&self) -> Option<&str> {
        self.url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

/// One page of the report listing.
#[derive(Debug, Clone, PartialEq)]
pub struct PageResult {
    /// Records in server order.
    pub records: Vec<Report>,
    /// Page number as reported by the server (or as requested, if omitted).
    pub page_number: u32,
    /// Total page count, if reported.
    pub total_pages: Option<u32>,
    /// Total record count, if reported.
    pub total_count: Option<u64>,
}
