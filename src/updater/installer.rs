//! Atomic swap of an extracted artifact into its install path.
//!
//! The swap runs `remove existing -> ensure parent -> move (or copy) ->
//! verify`. The installer never restores anything itself: the pipeline owns
//! the backup and decides what to do with a failure.

use crate::constants::{REMOVAL_ATTEMPTS, REMOVAL_RETRY_DELAY};
use crate::core::{ItemKind, SyncError, TrackedItem};
use crate::updater::fs::Filesystem;
use crate::updater::manifest::ArtifactValidator;
use crate::utils::retry_fixed;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Run a blocking filesystem call off the async runtime.
async fn blocking<T, F>(f: F) -> io::Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> io::Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(io::Error::other)?
}

pub struct Installer {
    fs: Arc<dyn Filesystem>,
    validator: Arc<dyn ArtifactValidator>,
    removal_attempts: usize,
    removal_delay: Duration,
}

impl Installer {
    pub fn new(fs: Arc<dyn Filesystem>, validator: Arc<dyn ArtifactValidator>) -> Self {
        Self {
            fs,
            validator,
            removal_attempts: REMOVAL_ATTEMPTS,
            removal_delay: REMOVAL_RETRY_DELAY,
        }
    }

    /// Override how often removal of the existing install is attempted.
    #[must_use]
    pub fn with_removal_policy(mut self, attempts: usize, delay: Duration) -> Self {
        self.removal_attempts = attempts.max(1);
        self.removal_delay = delay;
        self
    }

    /// Replace `item.install_path` with `artifact_root` and verify the result.
    ///
    /// When `is_update` is set an existing install path is removed first.
    pub async fn install(
        &self,
        item: &TrackedItem,
        artifact_root: &Path,
        is_update: bool,
    ) -> Result<(), SyncError> {
        let target = item.install_path.as_path();

        if is_update && self.fs.exists(target) {
            self.remove_existing(target).await?;
        }

        if let Some(parent) = target.parent() {
            let fs = Arc::clone(&self.fs);
            let dir = parent.to_path_buf();
            blocking(move || fs.create_dir_all(&dir))
                .await
                .map_err(|source| SyncError::TargetDir {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        self.place(artifact_root, target).await?;
        self.verify(item)?;

        info!(item_id = item.id, path = %target.display(), "Installed {}", item.kind);
        Ok(())
    }

    async fn remove_existing(&self, target: &Path) -> Result<(), SyncError> {
        let result = retry_fixed(self.removal_attempts, self.removal_delay, |attempt| {
            let fs = Arc::clone(&self.fs);
            let path = target.to_path_buf();
            async move {
                blocking(move || {
                    fs.remove_dir_all(&path)?;
                    if fs.exists(&path) {
                        return Err(io::Error::other("directory still present after removal"));
                    }
                    Ok(())
                })
                .await
                .inspect_err(|e| warn!(path = %target.display(), attempt, error = %e, "Removal attempt failed"))
            }
        })
        .await;

        match result {
            Ok(()) => {
                debug!(path = %target.display(), "Removed existing installation");
                Ok(())
            }
            Err(_) => Err(SyncError::RemovalFailed {
                path: target.to_path_buf(),
                attempts: self.removal_attempts,
            }),
        }
    }

    /// Move `from` to `to`, falling back to copy-then-remove-source.
    async fn place(&self, from: &Path, to: &Path) -> Result<(), SyncError> {
        let (src, dst) = (from.to_path_buf(), to.to_path_buf());

        let fs = Arc::clone(&self.fs);
        let (a, b) = (src.clone(), dst.clone());
        let rename_err = match blocking(move || fs.rename(&a, &b)).await {
            Ok(()) => {
                debug!(from = %from.display(), to = %to.display(), "Moved artifact into place");
                return Ok(());
            }
            Err(e) => e,
        };
        warn!(
            from = %from.display(),
            to = %to.display(),
            error = %rename_err,
            "Move failed, copying instead"
        );

        let fs = Arc::clone(&self.fs);
        let (a, b) = (src.clone(), dst.clone());
        if let Err(copy_err) = blocking(move || fs.copy_dir(&a, &b)).await {
            self.discard_partial(&dst).await;
            return Err(SyncError::MoveOrCopyFailed {
                from: src,
                to: dst,
                reason: format!("rename: {rename_err}; copy: {copy_err}"),
            });
        }

        let fs = Arc::clone(&self.fs);
        if let Err(e) = blocking(move || fs.remove_dir_all(&src)).await {
            warn!(path = %from.display(), error = %e, "Failed to remove copied source");
        }
        Ok(())
    }

    async fn discard_partial(&self, target: &Path) {
        let fs = Arc::clone(&self.fs);
        let path: PathBuf = target.to_path_buf();
        if let Err(e) = blocking(move || fs.remove_dir_all(&path)).await {
            warn!(path = %target.display(), error = %e, "Failed to clean up partial copy");
        }
    }

    /// Check that a valid manifest sits directly under the install path.
    pub fn verify(&self, item: &TrackedItem) -> Result<PathBuf, SyncError> {
        self.validator
            .locate_manifest(&item.install_path, item.kind, &item.slug)
            .ok_or_else(|| SyncError::VerificationFailed {
                path: item.install_path.clone(),
                kind: item.kind.to_string(),
                reason: match item.kind {
                    ItemKind::Plugin => format!(
                        "no PHP file with a 'Plugin Name:' header (looked for {}.php, index.php and *.php)",
                        item.slug
                    ),
                    ItemKind::Theme => "style.css with a 'Theme Name:' header not found".to_string(),
                },
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{FailingFs, FsOp, tracked_item_at};
    use crate::updater::fs::{FallbackFs, FileByFileFs, NativeFs};
    use crate::updater::manifest::HeaderValidator;
    use std::fs;
    use tempfile::TempDir;

    const HEADER: &str = "<?php\n/* Plugin Name: Widget\nVersion: 2.0.0 */";

    fn artifact(root: &Path, header: &str) -> PathBuf {
        let dir = root.join("work/acme-widget-9f8e7d6");
        fs::create_dir_all(dir.join("assets")).unwrap();
        fs::write(dir.join("widget.php"), header).unwrap();
        fs::write(dir.join("assets/app.js"), "console.log(1)").unwrap();
        dir
    }

    fn installer(fs: Arc<dyn Filesystem>) -> Installer {
        Installer::new(fs, Arc::new(HeaderValidator)).with_removal_policy(2, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_fresh_install_moves_artifact() {
        let temp = TempDir::new().unwrap();
        let source = artifact(temp.path(), HEADER);
        let item = tracked_item_at(1, temp.path().join("plugins/widget"));

        installer(Arc::new(NativeFs)).install(&item, &source, false).await.unwrap();
        assert!(item.install_path.join("widget.php").is_file());
        assert!(item.install_path.join("assets/app.js").is_file());
        assert!(!source.exists());
    }

    #[tokio::test]
    async fn test_update_replaces_existing() {
        let temp = TempDir::new().unwrap();
        let source = artifact(temp.path(), HEADER);
        let item = tracked_item_at(1, temp.path().join("plugins/widget"));
        fs::create_dir_all(&item.install_path).unwrap();
        fs::write(item.install_path.join("stale.php"), "<?php").unwrap();

        installer(Arc::new(NativeFs)).install(&item, &source, true).await.unwrap();
        assert!(item.install_path.join("widget.php").is_file());
        assert!(!item.install_path.join("stale.php").exists());
    }

    #[tokio::test]
    async fn test_rename_failure_falls_back_to_copy() {
        let temp = TempDir::new().unwrap();
        let source = artifact(temp.path(), HEADER);
        let item = tracked_item_at(1, temp.path().join("plugins/widget"));

        let fs = FailingFs::new(NativeFs, [FsOp::Rename]);
        installer(Arc::new(fs)).install(&item, &source, false).await.unwrap();
        assert!(item.install_path.join("assets/app.js").is_file());
        assert!(!source.exists());
    }

    #[tokio::test]
    async fn test_secondary_copy_used_when_primary_copy_fails() {
        let temp = TempDir::new().unwrap();
        let source = artifact(temp.path(), HEADER);
        let item = tracked_item_at(1, temp.path().join("plugins/widget"));

        let fs = FallbackFs::new(
            FailingFs::new(NativeFs, [FsOp::Rename, FsOp::CopyDir]),
            FailingFs::new(FileByFileFs, [FsOp::Rename]),
        );
        installer(Arc::new(fs)).install(&item, &source, false).await.unwrap();
        assert!(item.install_path.join("widget.php").is_file());
        assert!(!source.exists());
    }

    #[tokio::test]
    async fn test_move_and_copy_failure() {
        let temp = TempDir::new().unwrap();
        let source = artifact(temp.path(), HEADER);
        let item = tracked_item_at(1, temp.path().join("plugins/widget"));

        let fs = FailingFs::new(NativeFs, [FsOp::Rename, FsOp::CopyDir]);
        let err = installer(Arc::new(fs)).install(&item, &source, false).await.unwrap_err();
        assert!(matches!(err, SyncError::MoveOrCopyFailed { .. }));
        assert!(!item.install_path.exists());
        assert!(source.exists());
    }

    #[tokio::test]
    async fn test_removal_failure_after_retries() {
        let temp = TempDir::new().unwrap();
        let source = artifact(temp.path(), HEADER);
        let item = tracked_item_at(1, temp.path().join("plugins/widget"));
        fs::create_dir_all(&item.install_path).unwrap();

        let failing = Arc::new(FailingFs::new(NativeFs, [FsOp::RemoveDirAll]));
        let err = installer(failing.clone()).install(&item, &source, true).await.unwrap_err();
        assert!(matches!(err, SyncError::RemovalFailed { attempts: 2, .. }));
        assert_eq!(failing.calls(FsOp::RemoveDirAll), 2);
        assert!(item.install_path.exists());
    }

    #[tokio::test]
    async fn test_verification_failure() {
        let temp = TempDir::new().unwrap();
        let source = artifact(temp.path(), "<?php echo 'no header';");
        let item = tracked_item_at(1, temp.path().join("plugins/widget"));

        let err = installer(Arc::new(NativeFs)).install(&item, &source, false).await.unwrap_err();
        assert!(matches!(err, SyncError::VerificationFailed { .. }));
        // The swap itself happened; restoring is the caller's job.
        assert!(item.install_path.join("widget.php").exists());
    }

    #[tokio::test]
    async fn test_target_dir_failure() {
        let temp = TempDir::new().unwrap();
        let source = artifact(temp.path(), HEADER);
        let item = tracked_item_at(1, temp.path().join("plugins/widget"));

        let fs = FailingFs::new(NativeFs, [FsOp::CreateDirAll]);
        let err = installer(Arc::new(fs)).install(&item, &source, false).await.unwrap_err();
        assert!(matches!(err, SyncError::TargetDir { .. }));
    }
}
