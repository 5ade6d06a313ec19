//! One full pagination sweep.
//!
//! A sweep loads the ledger, walks every listing page from page 1, hands
//! each record to the [`ReportProcessor`], and saves the ledger after every
//! page that recorded a download. Failures of a single record are logged
//! and counted. Failures that would break every later request end the sweep
//! after a best-effort ledger flush.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use crate::api::{ApiError, RequestExecutor, RetryPolicy};
use crate::auth::TokenManager;
use crate::config::Config;
use crate::download::ArtifactDownloader;
use crate::http_client::build_http_client;
use crate::ledger::{Ledger, LedgerError};
use crate::processor::{ProcessOutcome, RecordError, ReportProcessor};
use crate::reports::{PageResult, ReportsApi, next_page};

/// How a sweep decides a listed report is already handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SkipPolicy {
    /// Every report goes through the full check: ledger entry, file on disk
    /// and matching hash. Deleted or modified files are downloaded again.
    #[default]
    Verify,
    /// Any report with a ledger entry is skipped without a detail request
    /// or re-hash.
    LedgerOnly,
}

impl FromStr for SkipPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "verify" => Ok(Self::Verify),
            "ledger" | "ledger-only" | "ledger_only" => Ok(Self::LedgerOnly),
            other => Err(format!("unknown skip policy '{other}' (expected 'verify' or 'ledger')")),
        }
    }
}

impl fmt::Display for SkipPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Verify => f.write_str("verify"),
            Self::LedgerOnly => f.write_str("ledger"),
        }
    }
}

/// Counters for one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    /// Pages fetched.
    pub pages: u32,
    /// Records listed.
    pub records: u64,
    /// Artifacts written.
    pub downloaded: u64,
    /// Records whose artifact was verified unchanged.
    pub unchanged: u64,
    /// Records skipped by ledger membership alone.
    pub skipped: u64,
    /// Records without an artifact URL.
    pub no_artifact: u64,
    /// Records that failed.
    pub failed: u64,
}

impl SweepStats {
    /// Records that were attempted and did not fail.
    #[must_use]
    pub fn succeeded(&self) -> u64 {
        self.downloaded + self.unchanged + self.no_artifact
    }

    fn record(&mut self, outcome: &ProcessOutcome) {
        match outcome {
            ProcessOutcome::Downloaded { .. } => self.downloaded += 1,
            ProcessOutcome::Unchanged => self.unchanged += 1,
            ProcessOutcome::NoArtifact => self.no_artifact += 1,
        }
    }
}

/// Errors that end a sweep early.
#[derive(Debug, Error)]
pub enum SweepError {
    /// The shared HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    /// The ledger could not be loaded or saved.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// A listing page could not be fetched.
    #[error("failed to fetch page {page}: {source}")]
    Page {
        /// Requested page number.
        page: u32,
        /// Underlying API error.
        #[source]
        source: ApiError,
    },

    /// A record failed in a way no later record can recover from.
    #[error("aborting sweep: {0}")]
    Record(#[source] RecordError),
}

/// One configured pagination sweep.
#[derive(Debug)]
pub struct Sweep {
    reports: ReportsApi,
    processor: ReportProcessor,
    ledger_path: PathBuf,
    date_from: NaiveDate,
    skip_policy: SkipPolicy,
}

impl Sweep {
    /// Assembles a sweep from its parts.
    #[must_use]
    pub fn new(
        reports: ReportsApi,
        processor: ReportProcessor,
        ledger_path: PathBuf,
        date_from: NaiveDate,
        skip_policy: SkipPolicy,
    ) -> Self {
        Self {
            reports,
            processor,
            ledger_path,
            date_from,
            skip_policy,
        }
    }

    /// Wires the HTTP client, token manager, executor, report API and
    /// downloader from `config`, listing reports created since
    /// `today - days_back`.
    ///
    /// # Errors
    ///
    /// Returns [`SweepError::HttpClient`] when the HTTP client cannot be built.
    pub fn from_config(config: &Config, today: NaiveDate) -> Result<Self, SweepError> {
        let client = build_http_client(config.connect_timeout_secs, config.read_timeout_secs)
            .map_err(SweepError::HttpClient)?;
        let tokens = TokenManager::new(client.clone(), &config.base_url, config.credential.clone());
        let executor = Arc::new(RequestExecutor::new(
            client.clone(),
            tokens,
            RetryPolicy::default(),
        ));
        let reports = ReportsApi::new(executor, config.base_url.clone());
        let processor = ReportProcessor::new(
            reports.clone(),
            ArtifactDownloader::new(client),
            config.download_dir.clone(),
        );
        Ok(Self::new(
            reports,
            processor,
            config.ledger_path(),
            config.date_from(today),
            config.skip_policy,
        ))
    }

    /// Runs the sweep to completion.
    ///
    /// # Errors
    ///
    /// Returns [`SweepError`] for ledger load/save failures, page fetch
    /// failures, and fatal record failures. Entries completed before a fatal
    /// failure are flushed to the ledger first.
    #[instrument(skip(self), fields(date_from = %self.date_from, policy = %self.skip_policy))]
    pub async fn run(&self) -> Result<SweepStats, SweepError> {
        let mut ledger = Ledger::load(&self.ledger_path).await?;
        let mut stats = SweepStats::default();
        let mut page_number = 1;

        loop {
            let page = self
                .reports
                .fetch_page(self.date_from, page_number)
                .await
                .map_err(|source| SweepError::Page {
                    page: page_number,
                    source,
                })?;
            stats.pages += 1;
            info!(
                page = page.page_number,
                total_pages = ?page.total_pages,
                records = page.records.len(),
                "processing page"
            );

            let downloaded_before = stats.downloaded;
            let result = self.process_page(&page, &mut ledger, &mut stats).await;
            let ledger_changed = stats.downloaded > downloaded_before;
            if let Err(error) = result {
                if ledger_changed
                    && let Err(save_error) = ledger.save(&self.ledger_path).await
                {
                    warn!(error = %save_error, "could not flush ledger before aborting");
                }
                return Err(error);
            }
            if ledger_changed {
                ledger.save(&self.ledger_path).await?;
            }

            match next_page(&page) {
                Some(next) if next > page_number => page_number = next,
                Some(next) => {
                    warn!(requested = page_number, next, "server page number did not advance; stopping");
                    break;
                }
                None => break,
            }
        }

        info!(
            pages = stats.pages,
            records = stats.records,
            downloaded = stats.downloaded,
            unchanged = stats.unchanged,
            skipped = stats.skipped,
            no_artifact = stats.no_artifact,
            failed = stats.failed,
            ledger_entries = ledger.len(),
            "sweep complete"
        );
        Ok(stats)
    }

    async fn process_page(
        &self,
        page: &PageResult,
        ledger: &mut Ledger,
        stats: &mut SweepStats,
    ) -> Result<(), SweepError> {
        for report in &page.records {
            stats.records += 1;

            if self.skip_policy == SkipPolicy::LedgerOnly && ledger.contains(&report.id) {
                debug!(report_id = %report.id, "in ledger; skipping");
                stats.skipped += 1;
                continue;
            }

            match self.processor.process(report, ledger).await {
                Ok(outcome) => stats.record(&outcome),
                Err(failure) if failure.is_fatal() => {
                    stats.failed += 1;
                    error!(report_id = %failure.id(), error = %failure, "fatal error; aborting sweep");
                    return Err(SweepError::Record(failure));
                }
                Err(failure) => {
                    stats.failed += 1;
                    warn!(report_id = %failure.id(), error = %failure, "report failed; continuing");
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_policy_parse() {
        assert_eq!("verify".parse::<SkipPolicy>(), Ok(SkipPolicy::Verify));
        assert_eq!(" Ledger ".parse::<SkipPolicy>(), Ok(SkipPolicy::LedgerOnly));
        assert_eq!("ledger-only".parse::<SkipPolicy>(), Ok(SkipPolicy::LedgerOnly));
        assert!("always".parse::<SkipPolicy>().is_err());
    }

    #[test]
    fn test_skip_policy_display_round_trips() {
        for policy in [SkipPolicy::Verify, SkipPolicy::LedgerOnly] {
            assert_eq!(policy.to_string().parse::<SkipPolicy>(), Ok(policy));
        }
        assert_eq!(SkipPolicy::default(), SkipPolicy::Verify);
    }

    #[test]
    fn test_stats_record_outcomes() {
        let mut stats = SweepStats::default();
        stats.record(&ProcessOutcome::Unchanged);
        stats.record(&ProcessOutcome::NoArtifact);
        stats.record(&ProcessOutcome::Downloaded {
            path: PathBuf::from("/data/report_1.pdf"),
            hash: crate::download::ContentHash::of_bytes(b"x"),
        });
        assert_eq!(stats.downloaded, 1);
        assert_eq!(stats.unchanged, 1);
        assert_eq!(stats.no_artifact, 1);
        assert_eq!(stats.succeeded(), 3);
    }
}
