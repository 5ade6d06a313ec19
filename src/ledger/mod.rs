//! Persisted record of completed downloads.
//!
//! The ledger is a single JSON object mapping report id to
//! `{filename, hash, downloaded_at}`, stored at
//! `<download_dir>/download_log.json`. It is loaded once per run, mutated
//! in memory, and rewritten in full after every page that changed it.

mod error;

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

pub use error::LedgerError;

use crate::download::{ContentHash, hash_file, remove_if_present, temp_path_for};
use crate::reports::ReportId;

/// Ledger file name inside the download directory.
pub const LEDGER_FILE_NAME: &str = "download_log.json";

/// One successfully downloaded and verified artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// File name relative to the download directory.
    pub filename: String,
    /// SHA-256 of the file as downloaded.
    pub hash: ContentHash,
    /// When the download completed.
    pub downloaded_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Creates an entry stamped with the current time.
    pub fn now(filename: impl Into<String>, hash: ContentHash) -> Self {
        Self {
            filename: filename.into(),
            hash,
            downloaded_at: Utc::now(),
        }
    }

    /// Resolves the recorded file inside `download_dir`.
    ///
    /// Returns `None` when the stored name is not a single plain file name,
    /// so a hand-edited ledger cannot point outside the directory.
    #[must_use]
    pub fn path_in(&self, download_dir: &Path) -> Option<PathBuf> {
        let mut components = Path::new(&self.filename).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) => Some(download_dir.join(name)),
            _ => None,
        }
    }
}

/// Result of checking a report against the ledger and the disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    /// No ledger entry for the id.
    Missing,
    /// Entry exists but the file is gone.
    FileMissing,
    /// Entry and file exist but the file's hash changed.
    HashMismatch,
    /// Entry, file and hash all agree.
    Unchanged,
}

impl EntryStatus {
    /// Returns true when the artifact must be (re-)downloaded.
    #[must_use]
    pub fn needs_download(self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

/// In-memory ledger; keys serialize in sorted order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ledger {
    entries: BTreeMap<ReportId, LedgerEntry>,
}

impl Ledger {
    /// Returns the ledger path for a download directory.
    #[must_use]
    pub fn path_in(download_dir: &Path) -> PathBuf {
        download_dir.join(LEDGER_FILE_NAME)
    }

    /// Loads the ledger from `path`; a missing file is an empty ledger.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Malformed`] when the file exists but does not
    /// parse, and [`LedgerError::Io`] when it cannot be read.
    #[instrument(skip(path), fields(path = %path.display()))]
    pub async fn load(path: &Path) -> Result<Self, LedgerError> {
        let raw = match tokio::fs::read(path).await {
            Ok(raw) => raw,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                info!("no ledger yet; starting empty");
                return Ok(Self::default());
            }
            Err(error) => return Err(LedgerError::io(path, error)),
        };
        let ledger: Self = serde_json::from_slice(&raw).map_err(|source| LedgerError::Malformed {
            path: path.to_path_buf(),
            source,
        })?;
        info!(entries = ledger.len(), "ledger loaded");
        Ok(ledger)
    }

    /// Writes the whole ledger to `path` through a temp file and rename.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Io`] when the directory, temp file or rename
    /// fails.
    #[instrument(skip(self, path), fields(path = %path.display(), entries = self.len()))]
    pub async fn save(&self, path: &Path) -> Result<(), LedgerError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| LedgerError::io(parent, e))?;
        }
        let mut json = serde_json::to_vec_pretty(self).map_err(|source| {
            LedgerError::io(path, std::io::Error::new(std::io::ErrorKind::InvalidData, source))
        })?;
        json.push(b'\n');

        let temp = temp_path_for(path);
        if let Err(error) = tokio::fs::write(&temp, &json).await {
            remove_if_present(&temp).await;
            return Err(LedgerError::io(&temp, error));
        }
        tokio::fs::rename(&temp, path)
            .await
            .map_err(|e| LedgerError::io(path, e))?;
        debug!("ledger saved");
        Ok(())
    }

    /// Returns the entry for `id`.
    #[must_use]
    pub fn get(&self, id: &ReportId) -> Option<&LedgerEntry> {
        self.entries.get(id)
    }

    /// Records `entry` for `id`, replacing any previous entry.
    pub fn set(&mut self, id: ReportId, entry: LedgerEntry) {
        self.entries.insert(id, entry);
    }

    /// Returns true when `id` has an entry.
    #[must_use]
    pub fn contains(&self, id: &ReportId) -> bool {
        self.entries.contains_key(id)
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when the ledger has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&ReportId, &LedgerEntry)> {
        self.entries.iter()
    }

    /// Checks whether `id`'s recorded artifact is still in `download_dir`
    /// and unchanged, re-hashing the file named by the entry.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Io`] when the file exists but cannot be read.
    pub async fn check(
        &self,
        id: &ReportId,
        download_dir: &Path,
    ) -> Result<EntryStatus, LedgerError> {
        let Some(entry) = self.entries.get(id) else {
            return Ok(EntryStatus::Missing);
        };
        let Some(final_path) = entry.path_in(download_dir) else {
            warn!(report_id = %id, filename = %entry.filename, "ledger filename is not a plain file name");
            return Ok(EntryStatus::FileMissing);
        };
        let current = match hash_file(&final_path).await {
            Ok(hash) => hash,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Ok(EntryStatus::FileMissing);
            }
            Err(error) => return Err(LedgerError::io(final_path, error)),
        };
        if current == entry.hash {
            Ok(EntryStatus::Unchanged)
        } else {
            debug!(report_id = %id, stored = %entry.hash, %current, "artifact hash changed on disk");
            Ok(EntryStatus::HashMismatch)
        }
    }
}
