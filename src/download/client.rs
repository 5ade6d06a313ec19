//! Streaming artifact downloader.
//!
//! Artifact URLs are typically pre-signed storage links, so downloads are
//! plain GETs with no bearer token.

use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use reqwest::Client;
use sha2::{Digest, Sha256};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::error::DownloadError;
use super::filename::temp_path_for;
use super::hash::ContentHash;

/// Downloads artifacts into temp files next to their final destination.
///
/// Created once per run and shared; cloning is cheap.
#[derive(Debug, Clone)]
pub struct ArtifactDownloader {
    client: Client,
}

impl ArtifactDownloader {
    /// Creates a downloader over a shared HTTP client.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Streams `url` to `<final_path>.part`, hashing the bytes as they are
    /// written.
    ///
    /// The final path is not touched; call [`TempArtifact::persist`] to move
    /// the download into place. The parent directory is created if absent.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError`] for an invalid URL, a non-2xx status, a
    /// network failure mid-stream, or a filesystem failure. The partial temp
    /// file is removed on every error path.
    #[instrument(skip(self, final_path), fields(path = %final_path.display()))]
    pub async fn download(
        &self,
        url: &str,
        final_path: &Path,
    ) -> Result<TempArtifact, DownloadError> {
        let parsed = Url::parse(url).map_err(|_| DownloadError::invalid_url(url))?;

        if let Some(parent) = final_path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DownloadError::io(parent, e))?;
        }

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| DownloadError::network(url, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::http_status(url, status.as_u16()));
        }

        let temp_path = temp_path_for(final_path);
        let mut file = File::create(&temp_path)
            .await
            .map_err(|e| DownloadError::io(&temp_path, e))?;

        match stream_to_file(&mut file, response, url, &temp_path).await {
            Ok((bytes, hash)) => {
                debug!(bytes, hash = %hash, temp = %temp_path.display(), "artifact streamed");
                Ok(TempArtifact {
                    path: temp_path,
                    hash,
                    bytes,
                    persisted: false,
                })
            }
            Err(error) => {
                drop(file);
                debug!(temp = %temp_path.display(), "cleaning up partial file after error");
                remove_if_present(&temp_path).await;
                Err(error)
            }
        }
    }
}

/// Removes `path`, logging any failure other than the file already being gone.
pub(crate) async fn remove_if_present(path: &Path) {
    if let Err(error) = tokio::fs::remove_file(path).await
        && error.kind() != std::io::ErrorKind::NotFound
    {
        warn!(path = %path.display(), %error, "failed to remove file");
    }
}

/// Streams the response body to `file`, returning bytes written and their hash.
async fn stream_to_file(
    file: &mut File,
    response: reqwest::Response,
    url: &str,
    file_path: &Path,
) -> Result<(u64, ContentHash), DownloadError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut hasher = Sha256::new();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| DownloadError::network(url, e))?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| DownloadError::io(file_path, e))?;
        hasher.update(&chunk);

        bytes_written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| DownloadError::io(file_path, e))?;

    Ok((bytes_written, ContentHash::from_hasher(hasher)))
}

/// A fully downloaded artifact still sitting at its temp path.
///
/// Dropping it without calling [`persist`](Self::persist) deletes the temp
/// file.
#[derive(Debug)]
pub struct TempArtifact {
    path: PathBuf,
    hash: ContentHash,
    bytes: u64,
    persisted: bool,
}

impl TempArtifact {
    /// Returns the temp file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the SHA-256 of the downloaded bytes.
    #[must_use]
    pub fn hash(&self) -> &ContentHash {
        &self.hash
    }

    /// Returns the number of bytes downloaded.
    #[must_use]
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Atomically renames the temp file over `final_path` and returns the hash.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Io`] when the rename fails; the temp file is
    /// then removed.
    pub async fn persist(mut self, final_path: &Path) -> Result<ContentHash, DownloadError> {
        tokio::fs::rename(&self.path, final_path)
            .await
            .map_err(|e| DownloadError::io(final_path, e))?;
        self.persisted = true;
        info!(
            path = %final_path.display(),
            bytes = self.bytes,
            "artifact saved"
        );
        Ok(self.hash.clone())
    }
}

impl Drop for TempArtifact {
    fn drop(&mut self) {
        if self.persisted {
            return;
        }
        if let Err(error) = std::fs::remove_file(&self.path)
            && error.kind() != std::io::ErrorKind::NotFound
        {
            warn!(path = %self.path.display(), %error, "failed to remove temp artifact");
        }
    }
}
