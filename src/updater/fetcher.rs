//! Archive download into a temporary file.

use crate::core::SyncError;
use crate::github::{SourceError, SourceProvider};
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// A downloaded archive. The file is deleted when this value is dropped.
#[derive(Debug)]
pub struct FetchedArchive {
    file: NamedTempFile,
    /// `sha256:<hex>` of the archive bytes.
    pub sha256: String,
    /// Size in bytes.
    pub size: u64,
}

impl FetchedArchive {
    #[must_use]
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

pub struct ArchiveFetcher {
    source: Arc<dyn SourceProvider>,
    work_dir: PathBuf,
}

impl ArchiveFetcher {
    pub fn new(source: Arc<dyn SourceProvider>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            source,
            work_dir: work_dir.into(),
        }
    }

    /// Download `url` to a fresh temporary file under the work directory.
    ///
    /// Credentials are attached by the source provider.
    pub async fn fetch(&self, url: &str) -> Result<FetchedArchive, SyncError> {
        debug!(url, "Downloading archive");
        let bytes = self
            .source
            .download_archive(url)
            .await
            .map_err(|e| download_error(url, e))?;

        let work_dir = self.work_dir.clone();
        let archive = tokio::task::spawn_blocking(move || write_archive(&work_dir, &bytes))
            .await
            .map_err(|e| SyncError::Other {
                message: format!("archive write task failed: {e}"),
            })??;

        info!(url, size = archive.size, checksum = %archive.sha256, "Downloaded archive");
        Ok(archive)
    }
}

fn write_archive(work_dir: &Path, bytes: &[u8]) -> Result<FetchedArchive, SyncError> {
    std::fs::create_dir_all(work_dir).map_err(|e| SyncError::io("create work directory", work_dir, e))?;

    let mut file = tempfile::Builder::new()
        .prefix("archive-")
        .suffix(".zip")
        .tempfile_in(work_dir)
        .map_err(|e| SyncError::io("create temporary archive in", work_dir, e))?;
    file.write_all(bytes)
        .and_then(|()| file.as_file().sync_all())
        .map_err(|e| SyncError::io("write archive", file.path(), e))?;

    Ok(FetchedArchive {
        sha256: format!("sha256:{}", hex::encode(Sha256::digest(bytes))),
        size: bytes.len() as u64,
        file,
    })
}

fn download_error(url: &str, error: SourceError) -> SyncError {
    match error {
        SourceError::Transport(message) => SyncError::Transport {
            url: url.to_string(),
            message,
        },
        other => match other.status() {
            Some(status) => SyncError::DownloadFailed {
                url: url.to_string(),
                status,
            },
            None => SyncError::Transport {
                url: url.to_string(),
                message: other.to_string(),
            },
        },
    }
}
