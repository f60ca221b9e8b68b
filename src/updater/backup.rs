//! Pre-swap snapshots of installed artifacts.

use crate::core::SyncError;
use crate::updater::extract::unpack_zip;
use crate::updater::fs::Filesystem;
use chrono::Local;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;
use zip::CompressionMethod;
use zip::write::{SimpleFileOptions, ZipWriter};

/// A zip snapshot of an installed directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backup {
    /// Archive location inside the backup directory.
    pub path: PathBuf,
    /// Directory the snapshot was taken from.
    pub source: PathBuf,
}

/// Creates, restores and discards backups of installed artifacts.
///
/// A backup is a zip archive named `{dir}-{YYYY-mm-dd-HH-MM-SS}.zip` whose
/// entries are rooted at the directory's own name, so restoring is "remove
/// the install path, unpack into its parent".
///
/// # Lifecycle
///
/// - [`create`](Self::create) runs before the installer touches the install
///   path. It returns `None` when nothing is installed yet; callers must then
///   skip restore-on-failure.
/// - [`restore`](Self::restore) runs when a later step fails. Its failure is
///   reported as [`SyncError::RestoreFailed`] and the archive is left in place.
/// - [`discard`](Self::discard) runs after a committed install or a
///   successful restore. It never fails.
pub struct BackupManager {
    backup_dir: PathBuf,
    fs: Arc<dyn Filesystem>,
}

impl BackupManager {
    pub fn new(backup_dir: impl Into<PathBuf>, fs: Arc<dyn Filesystem>) -> Self {
        Self {
            backup_dir: backup_dir.into(),
            fs,
        }
    }

    #[must_use]
    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Snapshot `install_path`. `Ok(None)` when it does not exist.
    pub async fn create(&self, install_path: &Path) -> Result<Option<Backup>, SyncError> {
        if !self.fs.exists(install_path) {
            debug!(path = %install_path.display(), "Nothing installed, skipping backup");
            return Ok(None);
        }

        let backup_dir = self.backup_dir.clone();
        let source = install_path.to_path_buf();
        let backup = tokio::task::spawn_blocking(move || write_backup(&backup_dir, &source))
            .await
            .map_err(|e| SyncError::BackupFailed {
                path: install_path.to_path_buf(),
                reason: format!("backup task failed: {e}"),
            })??;

        info!(
            path = %install_path.display(),
            backup = %backup.path.display(),
            "Created backup"
        );
        Ok(Some(backup))
    }

    /// Replace whatever is at `install_path` with the contents of `backup`.
    pub async fn restore(&self, backup: &Backup, install_path: &Path) -> Result<(), SyncError> {
        let fs = Arc::clone(&self.fs);
        let archive = backup.path.clone();
        let target = install_path.to_path_buf();

        let result = tokio::task::spawn_blocking(move || restore_into(fs.as_ref(), &archive, &target))
            .await
            .map_err(|e| format!("restore task failed: {e}"))
            .and_then(|r| r);

        match result {
            Ok(()) => {
                info!(
                    path = %install_path.display(),
                    backup = %backup.path.display(),
                    "Restored backup"
                );
                Ok(())
            }
            Err(reason) => Err(SyncError::RestoreFailed {
                backup: backup.path.clone(),
                reason,
            }),
        }
    }

    /// Delete the backup archive. Failures are logged.
    pub async fn discard(&self, backup: &Backup) {
        match tokio::fs::remove_file(&backup.path).await {
            Ok(()) => debug!(backup = %backup.path.display(), "Discarded backup"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(backup = %backup.path.display(), error = %e, "Failed to delete backup"),
        }
    }
}

fn restore_into(fs: &dyn Filesystem, archive: &Path, install_path: &Path) -> Result<(), String> {
    let parent = install_path
        .parent()
        .ok_or_else(|| format!("{} has no parent directory", install_path.display()))?;

    fs.remove_dir_all(install_path)
        .map_err(|e| format!("could not clear {}: {e}", install_path.display()))?;
    fs.create_dir_all(parent)
        .map_err(|e| format!("could not create {}: {e}", parent.display()))?;
    unpack_zip(archive, parent).map_err(|e| e.to_string())?;

    if !fs.exists(install_path) {
        return Err(format!(
            "backup did not contain {}",
            install_path.file_name().unwrap_or_default().to_string_lossy()
        ));
    }
    Ok(())
}

/// `{name}-{timestamp}.zip`, or `{name}-{timestamp}-{n}.zip` when taken twice in one second.
fn backup_file_name(backup_dir: &Path, name: &str) -> PathBuf {
    let stamp = Local::now().format("%Y-%m-%d-%H-%M-%S");
    let first = backup_dir.join(format!("{name}-{stamp}.zip"));
    if !first.exists() {
        return first;
    }
    (1..)
        .map(|n| backup_dir.join(format!("{name}-{stamp}-{n}.zip")))
        .find(|candidate| !candidate.exists())
        .unwrap_or(first)
}

fn write_backup(backup_dir: &Path, source: &Path) -> Result<Backup, SyncError> {
    let failed = |reason: String| SyncError::BackupFailed {
        path: source.to_path_buf(),
        reason,
    };

    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| failed("install path has no directory name".to_string()))?;

    std::fs::create_dir_all(backup_dir)
        .map_err(|e| failed(format!("cannot create {}: {e}", backup_dir.display())))?;
    let path = backup_file_name(backup_dir, &name);

    let result = zip_directory(source, &name, &path);
    if let Err(e) = result {
        let _ = std::fs::remove_file(&path);
        return Err(failed(e.to_string()));
    }

    Ok(Backup {
        path,
        source: source.to_path_buf(),
    })
}

fn zip_directory(source: &Path, root_name: &str, archive: &Path) -> io::Result<()> {
    let mut zip = ZipWriter::new(File::create(archive)?);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for entry in WalkDir::new(source).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(io::Error::other)?;
        let relative = entry.path().strip_prefix(source).map_err(io::Error::other)?;

        // Zip entry names always use '/'.
        let mut name = root_name.to_string();
        for component in relative.components() {
            name.push('/');
            name.push_str(&component.as_os_str().to_string_lossy());
        }

        if entry.file_type().is_dir() {
            zip.add_directory(format!("{name}/"), options)?;
        } else if entry.file_type().is_file() {
            let mut file_options = options;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let mode = entry.metadata().map_err(io::Error::other)?.permissions().mode();
                file_options = file_options.unix_permissions(mode & 0o777);
            }
            zip.start_file(name, file_options)?;
            let mut file = File::open(entry.path())?;
            io::copy(&mut file, &mut zip)?;
        }
    }

    zip.finish()?;
    Ok(())
}
