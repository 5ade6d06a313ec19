//! Per-report processing: detail, download, ledger update.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::api::ApiError;
use crate::download::{
    ArtifactDownloader, ContentHash, DownloadError, artifact_filename, remove_if_present,
};
use crate::ledger::{EntryStatus, Ledger, LedgerEntry, LedgerError};
use crate::reports::{Report, ReportId, ReportsApi};

/// What happened to one report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// A new or replacement artifact was saved and recorded.
    Downloaded {
        /// Final artifact path.
        path: PathBuf,
        /// Hash recorded in the ledger.
        hash: ContentHash,
    },
    /// The ledger entry, file and hash all agreed; nothing was fetched.
    Unchanged,
    /// The report has no artifact URL yet.
    NoArtifact,
}

impl ProcessOutcome {
    /// Returns true when an artifact was written.
    #[must_use]
    pub fn downloaded(&self) -> bool {
        matches!(self, Self::Downloaded { .. })
    }
}

/// A failure confined to one report.
#[derive(Debug, Error)]
pub enum RecordError {
    /// Fetching the report detail failed.
    #[error("report {id}: detail request failed: {source}")]
    Detail {
        /// Report id.
        id: ReportId,
        /// Underlying API error.
        #[source]
        source: ApiError,
    },

    /// Downloading or saving the artifact failed.
    #[error("report {id}: download failed: {source}")]
    Download {
        /// Report id.
        id: ReportId,
        /// Underlying download error.
        #[source]
        source: DownloadError,
    },

    /// The existing file could not be read for verification.
    #[error("report {id}: could not verify existing file: {source}")]
    Verify {
        /// Report id.
        id: ReportId,
        /// Underlying ledger error.
        #[source]
        source: LedgerError,
    },
}

impl RecordError {
    /// Returns the report id the failure belongs to.
    #[must_use]
    pub fn id(&self) -> &ReportId {
        match self {
            Self::Detail { id, .. } | Self::Download { id, .. } | Self::Verify { id, .. } => id,
        }
    }

    /// Returns true when the failure means the rest of the sweep cannot
    /// succeed either: broken authentication or a response shape the
    /// client does not understand.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Detail { source, .. } => {
                source.is_auth_failure()
                    || matches!(source, ApiError::Protocol { .. } | ApiError::Decode { .. })
            }
            Self::Download { .. } | Self::Verify { .. } => false,
        }
    }
}

/// Turns one listed report into a downloaded, recorded artifact.
#[derive(Debug, Clone)]
pub struct ReportProcessor {
    reports: ReportsApi,
    downloader: ArtifactDownloader,
    download_dir: PathBuf,
}

impl ReportProcessor {
    /// Creates a processor writing into `download_dir`.
    #[must_use]
    pub fn new(reports: ReportsApi, downloader: ArtifactDownloader, download_dir: PathBuf) -> Self {
        Self {
            reports,
            downloader,
            download_dir,
        }
    }

    /// Returns the download directory.
    #[must_use]
    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Fetches the detail for `report`, downloads its artifact unless the
    /// ledger and disk already agree on it, and records the new entry.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError`] carrying the report id when the detail fetch,
    /// verification, download or rename fails. The ledger is only updated
    /// after the artifact is in place.
    #[instrument(skip_all, fields(report_id = %report.id))]
    pub async fn process(
        &self,
        report: &Report,
        ledger: &mut Ledger,
    ) -> Result<ProcessOutcome, RecordError> {
        let id = &report.id;
        let detail = self
            .reports
            .fetch_detail(id)
            .await
            .map_err(|source| RecordError::Detail {
                id: id.clone(),
                source,
            })?;

        let Some(url) = detail.artifact_url() else {
            warn!("report has no artifact URL; skipping");
            return Ok(ProcessOutcome::NoArtifact);
        };

        let status = ledger
            .check(id, &self.download_dir)
            .await
            .map_err(|source| RecordError::Verify {
                id: id.clone(),
                source,
            })?;
        match status {
            EntryStatus::Unchanged => {
                debug!("already downloaded and unchanged");
                return Ok(ProcessOutcome::Unchanged);
            }
            EntryStatus::FileMissing | EntryStatus::HashMismatch => {
                info!(?status, "local copy invalid; re-downloading");
            }
            EntryStatus::Missing => {}
        }

        let filename = artifact_filename(id, url);
        let final_path = self.download_dir.join(&filename);
        let download_error = |source| RecordError::Download {
            id: id.clone(),
            source,
        };
        let artifact = self
            .downloader
            .download(url, &final_path)
            .await
            .map_err(download_error)?;
        let hash = artifact.persist(&final_path).await.map_err(download_error)?;

        let stale_path = ledger
            .get(id)
            .filter(|previous| previous.filename != filename)
            .and_then(|previous| previous.path_in(&self.download_dir));
        if let Some(stale_path) = stale_path {
            debug!(stale = %stale_path.display(), "removing file recorded under the previous name");
            remove_if_present(&stale_path).await;
        }

        ledger.set(id.clone(), LedgerEntry::now(filename, hash.clone()));
        Ok(ProcessOutcome::Downloaded {
            path: final_path,
            hash,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_downloaded_flag() {
        let downloaded = ProcessOutcome::Downloaded {
            path: PathBuf::from("/data/report_1.pdf"),
            hash: ContentHash::of_bytes(b"x"),
        };
        assert!(downloaded.downloaded());
        assert!(!ProcessOutcome::Unchanged.downloaded());
        assert!(!ProcessOutcome::NoArtifact.downloaded());
    }

    #[test]
    fn test_detail_auth_failure_is_fatal() {
        let error = RecordError::Detail {
            id: ReportId::from(1),
            source: ApiError::ReauthExhausted {
                url: "https://lims.example.com/reports/1".to_string(),
                attempts: 3,
            },
        };
        assert!(error.is_fatal());
        assert_eq!(error.id(), &ReportId::from(1));
    }

    #[test]
    fn test_detail_protocol_error_is_fatal() {
        let error = RecordError::Detail {
            id: ReportId::from(2),
            source: ApiError::protocol("https://lims.example.com/reports/2", "no data"),
        };
        assert!(error.is_fatal());
    }

    #[test]
    fn test_detail_http_status_is_not_fatal() {
        let error = RecordError::Detail {
            id: ReportId::from(3),
            source: ApiError::HttpStatus {
                url: "https://lims.example.com/reports/3".to_string(),
                status: 404,
                body: crate::api::ErrorBody::default(),
            },
        };
        assert!(!error.is_fatal());
        assert!(error.to_string().contains("report 3"));
    }

    #[test]
    fn test_download_error_is_not_fatal() {
        let error = RecordError::Download {
            id: ReportId::from(4),
            source: DownloadError::http_status("https://files.example.com/4.pdf", 500),
        };
        assert!(!error.is_fatal());
    }
}
