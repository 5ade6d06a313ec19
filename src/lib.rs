//! qbench-sync Core Library
//!
//! This library authenticates against a laboratory-information REST API,
//! walks the recently created reports page by page, and downloads each
//! report's artifact into a local directory, skipping artifacts whose
//! content is already on disk.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`auth`] - Signed assertions and the cached bearer token
//! - [`api`] - Request execution with re-authentication and rate-limit backoff
//! - [`reports`] - Report listing pages, report detail, pagination policy
//! - [`download`] - Streaming artifact download with content hashing
//! - [`ledger`] - Persisted record of completed downloads
//! - [`processor`] - Per-report detail → download → ledger update
//! - [`sweep`] - One full pagination sweep
//! - [`config`] - Environment configuration

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod auth;
pub mod config;
pub mod download;
mod http_client;
pub mod ledger;
pub mod processor;
pub mod reports;
pub mod sweep;
#[cfg(test)]
pub(crate) mod test_support;
mod user_agent;

// Re-export commonly used types
pub use api::{ApiError, ApiRequest, RequestExecutor, RetryPolicy};
pub use auth::{AccessToken, AuthError, Credential, TokenManager};
pub use config::{Config, ConfigError};
pub use download::{ArtifactDownloader, ContentHash, DownloadError, TempArtifact};
pub use http_client::build_http_client;
pub use ledger::{Ledger, LedgerEntry, LedgerError};
pub use processor::{ProcessOutcome, RecordError, ReportProcessor};
pub use reports::{PAGE_SIZE, PageResult, Report, ReportDetail, ReportId, ReportsApi, next_page};
pub use sweep::{SkipPolicy, Sweep, SweepError, SweepStats};
