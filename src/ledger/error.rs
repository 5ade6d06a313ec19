//! Error types for the download ledger.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur loading, saving or verifying the ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Filesystem error reading or writing the ledger or an artifact.
    #[error("ledger IO error at {path}: {source}")]
    Io {
        /// The path that failed.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The ledger file exists but is not a valid ledger.
    ///
    /// Never recovered automatically: the file is left as is for the
    /// operator to inspect.
    #[error("ledger file {path} is malformed: {source}")]
    Malformed {
        /// The ledger path.
        path: PathBuf,
        /// The JSON error.
        #[source]
        source: serde_json::Error,
    },
}

impl LedgerError {
    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
