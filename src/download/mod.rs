//! Streaming artifact download with content hashing.
//!
//! Artifacts are streamed to a temporary sibling of their final path
//! (`<final>.part`) while a SHA-256 digest is folded over the same bytes.
//! The caller decides whether to keep the result and then
//! [`persist`](TempArtifact::persist)s it with an atomic rename, so an
//! interrupted transfer never clobbers a previously good file.
//!
//! # Example
//!
//! ```no_run
//! use qbench_sync_core::download::{ArtifactDownloader, artifact_filename};
//! use qbench_sync_core::reports::ReportId;
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let downloader = ArtifactDownloader::new(reqwest::Client::new());
//! let url = "https://files.example.com/reports/2002.pdf";
//! let final_path = Path::new("./downloads").join(artifact_filename(&ReportId::from(2002), url));
//!
//! let artifact = downloader.download(url, &final_path).await?;
//! println!("sha256 {}", artifact.hash());
//! artifact.persist(&final_path).await?;
//! # Ok(())
//! # }
//! ```

mod client;
pub mod constants;
mod error;
mod filename;
mod hash;

pub use client::{ArtifactDownloader, TempArtifact};
pub(crate) use client::remove_if_present;
pub use error::DownloadError;
pub use filename::{artifact_filename, temp_path_for};
pub use hash::{ContentHash, hash_file};

// Note: we do NOT define module-local Result aliases.
// Use `Result<T, DownloadError>` explicitly in function signatures.
