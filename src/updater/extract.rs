//! Archive unpacking and artifact root discovery.

use crate::core::{ItemKind, SyncError};
use crate::updater::manifest::ArtifactValidator;
use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};
use zip::ZipArchive;

/// Unix file type bits of a symlink entry.
const S_IFLNK: u32 = 0o120000;
const S_IFMT: u32 = 0o170000;

/// Unpack the zip at `archive` into `dest`.
///
/// Entries with unsafe names (absolute, `..`) and symlinks are skipped.
pub fn unpack_zip(archive: &Path, dest: &Path) -> Result<(), SyncError> {
    let extraction = |reason: String| SyncError::Extraction {
        archive: archive.to_path_buf(),
        reason,
    };

    fs::create_dir_all(dest).map_err(|e| SyncError::io("create extraction directory", dest, e))?;
    let file = File::open(archive).map_err(|e| SyncError::io("open archive", archive, e))?;
    let mut zip = ZipArchive::new(file).map_err(|e| extraction(e.to_string()))?;

    for i in 0..zip.len() {
        let mut entry = zip
            .by_index(i)
            .map_err(|e| extraction(format!("entry {i}: {e}")))?;

        let Some(relative) = entry.enclosed_name() else {
            debug!(name = entry.name(), "Skipping unsafe zip entry");
            continue;
        };
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            debug!(name = entry.name(), "Skipping zip entry with non-normal components");
            continue;
        }
        if entry.unix_mode().is_some_and(|mode| mode & S_IFMT == S_IFLNK) {
            debug!(name = entry.name(), "Skipping symlink in archive");
            continue;
        }

        let target = dest.join(&relative);
        if entry.is_dir() {
            fs::create_dir_all(&target).map_err(|e| SyncError::io("create directory", &target, e))?;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| SyncError::io("create directory", parent, e))?;
        }
        let mut out = File::create(&target).map_err(|e| SyncError::io("create file", &target, e))?;
        io::copy(&mut entry, &mut out).map_err(|e| SyncError::io("write file", &target, e))?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            // Keep permission bits only; never restore setuid/setgid from an archive.
            let perms = fs::Permissions::from_mode(mode & 0o777);
            fs::set_permissions(&target, perms)
                .map_err(|e| SyncError::io("set permissions on", &target, e))?;
        }
    }

    Ok(())
}

/// An unpacked archive and the directory identified as the artifact root.
///
/// The extraction workspace is deleted when this value is dropped.
#[derive(Debug)]
pub struct ExtractedArtifact {
    /// Directory to install.
    pub root: PathBuf,
    workspace: TempDir,
}

impl ExtractedArtifact {
    /// Directory the archive was unpacked into.
    #[must_use]
    pub fn workspace(&self) -> &Path {
        self.workspace.path()
    }
}

/// Pick the artifact root inside an extracted archive.
///
/// Search order: each top-level directory, then the extraction root itself,
/// then (best effort) the first top-level directory.
pub fn locate_root(
    extracted: &Path,
    archive: &Path,
    kind: ItemKind,
    slug: &str,
    validator: &dyn ArtifactValidator,
) -> Result<PathBuf, SyncError> {
    let mut dirs: Vec<PathBuf> = fs::read_dir(extracted)
        .map_err(|e| SyncError::io("read extraction directory", extracted, e))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort();

    if dirs.is_empty() {
        return Err(SyncError::ArtifactNotFound {
            archive: archive.to_path_buf(),
        });
    }

    if let Some(dir) = dirs
        .iter()
        .find(|dir| validator.locate_manifest(dir, kind, slug).is_some())
    {
        debug!(root = %dir.display(), "Found artifact root");
        return Ok(dir.clone());
    }

    if validator.locate_manifest(extracted, kind, slug).is_some() {
        debug!("Artifact root is the archive root");
        return Ok(extracted.to_path_buf());
    }

    let fallback = dirs.swap_remove(0);
    warn!(
        kind = %kind,
        root = %fallback.display(),
        "No {} header found in archive, using first directory",
        kind.manifest_header()
    );
    Ok(fallback)
}

/// Unpack `archive` into a fresh directory under `work_dir` and locate the artifact root.
pub async fn extract_and_locate(
    archive: &Path,
    work_dir: &Path,
    kind: ItemKind,
    slug: &str,
    validator: std::sync::Arc<dyn ArtifactValidator>,
) -> Result<ExtractedArtifact, SyncError> {
    tokio::fs::create_dir_all(work_dir)
        .await
        .map_err(|e| SyncError::io("create work directory", work_dir, e))?;

    let workspace = tempfile::Builder::new()
        .prefix("extract-")
        .tempdir_in(work_dir)
        .map_err(|e| SyncError::io("create extraction directory in", work_dir, e))?;

    let archive = archive.to_path_buf();
    let dest = workspace.path().to_path_buf();
    let slug = slug.to_string();

    let root = tokio::task::spawn_blocking(move || {
        unpack_zip(&archive, &dest)?;
        locate_root(&dest, &archive, kind, &slug, validator.as_ref())
    })
    .await
    .map_err(|e| SyncError::Other {
        message: format!("extraction task failed: {e}"),
    })??;

    Ok(ExtractedArtifact { root, workspace })
}
