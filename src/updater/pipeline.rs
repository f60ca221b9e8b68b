//! The install/update/rollback pipeline.
//!
//! ```text
//! resolve -> fetch -> extract & locate -> backup -> swap & verify -> commit
//!                                            \          |
//!                                             \     on failure
//!                                              \        v
//!                                               `-> restore backup
//! ```
//!
//! Every step before the backup is non-destructive, so its failure simply
//! returns. Any failure after a backup was taken restores it; the original
//! error is returned, or [`SyncError::Unrecoverable`] when the restore fails
//! too. A fresh install has no backup and never restores.
//!
//! Each run holds the item's lock from [`ItemLocks`] for its whole duration.

use crate::constants::{DEFAULT_VERSION_LIST_LIMIT, GITHUB_MAX_PER_PAGE};
use crate::core::{SyncError, TrackedItem, TrackedItemPatch};
use crate::gate::{AllowAll, SyncGate};
use crate::github::{self, SourceError, SourceProvider};
use crate::registry::Registry;
use crate::updater::backup::{Backup, BackupManager};
use crate::updater::detector::{UpdateCheck, UpdateDetector};
use crate::updater::extract::extract_and_locate;
use crate::updater::fetcher::ArchiveFetcher;
use crate::updater::fs::{DefaultFs, Filesystem};
use crate::updater::installer::Installer;
use crate::updater::lock::ItemLocks;
use crate::updater::manifest::{ArtifactValidator, HeaderValidator, InstalledArtifact};
use crate::updater::resolver::{ArchiveResolver, short_sha};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Result of a committed install, update or rollback.
#[derive(Debug, Clone)]
pub struct InstallOutcome {
    /// The item as stored after the cursor moved.
    pub item: TrackedItem,
    /// Identifier stored as `last_known_version`.
    pub version: String,
    /// Short form for messages.
    pub display: String,
    /// Whether an existing installation was replaced.
    pub replaced: bool,
    /// `sha256:<hex>` of the installed archive.
    pub checksum: String,
}

/// One selectable version for rollback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionEntry {
    /// Tag name, or short commit SHA in branch mode.
    pub version: String,
    /// Release name, or first line of the commit message.
    pub name: String,
    pub date: Option<DateTime<Utc>>,
    /// Release body or full commit message.
    pub description: String,
    pub is_prerelease: bool,
}

/// Orchestrates the update pipeline for tracked items.
///
/// Construct with [`Pipeline::builder`]; collaborators are injected, there is
/// no global state.
pub struct Pipeline {
    registry: Arc<dyn Registry>,
    source: Arc<dyn SourceProvider>,
    gate: Arc<dyn SyncGate>,
    validator: Arc<dyn ArtifactValidator>,
    fs: Arc<dyn Filesystem>,
    resolver: Arc<ArchiveResolver>,
    fetcher: ArchiveFetcher,
    backups: BackupManager,
    installer: Installer,
    detector: UpdateDetector,
    locks: ItemLocks,
    work_dir: PathBuf,
}

impl Pipeline {
    pub fn builder(registry: Arc<dyn Registry>, source: Arc<dyn SourceProvider>) -> PipelineBuilder {
        PipelineBuilder::new(registry, source)
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<dyn Registry> {
        &self.registry
    }

    #[must_use]
    pub fn source(&self) -> &Arc<dyn SourceProvider> {
        &self.source
    }

    #[must_use]
    pub fn locks(&self) -> &ItemLocks {
        &self.locks
    }

    /// Install the latest upstream version, or `version` when given.
    pub async fn install(&self, id: u64, version: Option<&str>) -> Result<InstallOutcome, SyncError> {
        self.run(id, version, false).await
    }

    /// Reinstall from upstream. Fails with [`SyncError::NotInstalled`] when
    /// nothing valid is installed yet.
    pub async fn update(&self, id: u64) -> Result<InstallOutcome, SyncError> {
        self.run(id, None, true).await
    }

    /// Install a specific tag or commit.
    pub async fn rollback(&self, id: u64, version: &str) -> Result<InstallOutcome, SyncError> {
        if version.trim().is_empty() {
            return Err(SyncError::Other {
                message: "a version is required for rollback".to_string(),
            });
        }
        self.run(id, Some(version), false).await
    }

    /// Compare upstream with the stored cursor. Records `last_checked`.
    pub async fn check_for_update(&self, id: u64) -> Result<UpdateCheck, SyncError> {
        let item = self.entitled_item(id).await?;
        Ok(self.detector.check(&item).await)
    }

    /// [`check_for_update`](Self::check_for_update) collapsed to a boolean.
    /// A failed check reports `false`.
    pub async fn has_update(&self, id: u64) -> Result<bool, SyncError> {
        Ok(self.check_for_update(id).await?.is_available())
    }

    /// Versions available for rollback, newest first.
    pub async fn available_versions(
        &self,
        id: u64,
        limit: Option<usize>,
    ) -> Result<Vec<VersionEntry>, SyncError> {
        let item = self.registry.get(id).await?;
        let limit = limit.unwrap_or(DEFAULT_VERSION_LIST_LIMIT).clamp(1, GITHUB_MAX_PER_PAGE);
        let remote = |source: SourceError| SyncError::Remote {
            repo: item.repo.to_string(),
            source,
        };

        if item.use_releases {
            let releases = self.source.releases(&item.repo, limit).await.map_err(remote)?;
            Ok(releases
                .into_iter()
                .map(|r| VersionEntry {
                    name: r.name.clone().filter(|n| !n.is_empty()).unwrap_or_else(|| r.tag_name.clone()),
                    version: r.tag_name,
                    date: r.published_at,
                    description: r.body.unwrap_or_default(),
                    is_prerelease: r.prerelease,
                })
                .collect())
        } else {
            let commits = self
                .source
                .recent_commits(&item.repo, &item.branch, limit)
                .await
                .map_err(remote)?;
            Ok(commits
                .into_iter()
                .map(|c| VersionEntry {
                    version: short_sha(&c.sha).to_string(),
                    name: c.summary().to_string(),
                    date: c.date(),
                    description: c.commit.message,
                    is_prerelease: false,
                })
                .collect())
        }
    }

    /// Release notes (releases mode) or head commit message (branch mode).
    pub async fn release_notes(&self, id: u64) -> Result<String, SyncError> {
        let item = self.registry.get(id).await?;
        github::release_notes(self.source.as_ref(), &item)
            .await
            .map_err(|source| SyncError::Remote {
                repo: item.repo.to_string(),
                source,
            })
    }

    /// What is currently installed for item `id`, read from disk.
    pub async fn installed(&self, id: u64) -> Result<Option<InstalledArtifact>, SyncError> {
        let item = self.registry.get(id).await?;
        Ok(self.inspect(&item))
    }

    #[must_use]
    pub fn inspect(&self, item: &TrackedItem) -> Option<InstalledArtifact> {
        InstalledArtifact::inspect(item, self.validator.as_ref())
    }

    #[must_use]
    pub fn is_installed(&self, item: &TrackedItem) -> bool {
        self.inspect(item).is_some()
    }

    /// `Version:` header of the installed manifest.
    #[must_use]
    pub fn installed_version(&self, item: &TrackedItem) -> Option<String> {
        self.inspect(item).and_then(|artifact| artifact.version)
    }

    async fn entitled_item(&self, id: u64) -> Result<TrackedItem, SyncError> {
        let item = self.registry.get(id).await?;
        if !self.gate.is_allowed(&item) {
            warn!(item_id = id, repo = %item.repo, "Sync refused by entitlement gate");
            return Err(SyncError::NotEntitled {
                repo: item.repo.to_string(),
            });
        }
        Ok(item)
    }

    async fn run(
        &self,
        id: u64,
        explicit: Option<&str>,
        require_installed: bool,
    ) -> Result<InstallOutcome, SyncError> {
        self.entitled_item(id).await?;
        let _guard = self.locks.acquire(id).await?;

        // Re-read under the lock; another run may have moved the cursor.
        let item = self.registry.get(id).await?;
        if require_installed && !self.is_installed(&item) {
            return Err(SyncError::NotInstalled {
                id,
                path: item.install_path.clone(),
            });
        }

        info!(item_id = id, repo = %item.repo, version = explicit.unwrap_or("latest"), "Starting install");

        let candidate = self.resolver.resolve(&item, explicit).await?;
        let archive = self.fetcher.fetch(&candidate.download_url).await?;
        let extracted = extract_and_locate(
            archive.path(),
            &self.work_dir,
            item.kind,
            &item.slug,
            Arc::clone(&self.validator),
        )
        .await?;

        let replaced = self.fs.exists(&item.install_path);
        let backup = self.backups.create(&item.install_path).await?;

        if let Err(e) = self.installer.install(&item, &extracted.root, replaced).await {
            return Err(self.recover(&item, e, backup.as_ref()).await);
        }

        let version = explicit
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map_or_else(|| candidate.identifier.clone(), str::to_string);

        let stored = match self
            .registry
            .update(id, TrackedItemPatch::installed(version.clone(), Utc::now()))
            .await
        {
            Ok(stored) => stored,
            Err(e) => {
                error!(item_id = id, error = %e, "Installed, but failed to record the new version");
                item.clone()
            }
        };

        if let Some(backup) = &backup {
            self.backups.discard(backup).await;
        }

        info!(
            item_id = id,
            repo = %item.repo,
            version = %candidate.display,
            replaced,
            "Install committed"
        );

        Ok(InstallOutcome {
            item: stored,
            version,
            display: candidate.display,
            replaced,
            checksum: archive.sha256.clone(),
        })
    }

    /// Restore `backup` after `failure`. Returns the error to report.
    async fn recover(&self, item: &TrackedItem, failure: SyncError, backup: Option<&Backup>) -> SyncError {
        let Some(backup) = backup else {
            warn!(item_id = item.id, error = %failure, "Fresh install failed, nothing to restore");
            return failure;
        };

        warn!(
            item_id = item.id,
            error = %failure,
            backup = %backup.path.display(),
            "Install failed, restoring backup"
        );

        match self.backups.restore(backup, &item.install_path).await {
            Ok(()) => {
                info!(item_id = item.id, "Previous version restored");
                self.backups.discard(backup).await;
                failure
            }
            Err(restore_error) => {
                error!(
                    item_id = item.id,
                    path = %item.install_path.display(),
                    backup = %backup.path.display(),
                    error = %restore_error,
                    "Restore failed, installed files are in an unknown state"
                );
                SyncError::Unrecoverable {
                    original: Box::new(failure),
                    backup: backup.path.clone(),
                    restore_error: restore_error.to_string(),
                }
            }
        }
    }
}

/// Builder for [`Pipeline`].
pub struct PipelineBuilder {
    registry: Arc<dyn Registry>,
    source: Arc<dyn SourceProvider>,
    gate: Arc<dyn SyncGate>,
    validator: Arc<dyn ArtifactValidator>,
    fs: Arc<dyn Filesystem>,
    work_dir: Option<PathBuf>,
    backup_dir: Option<PathBuf>,
    locks: Option<ItemLocks>,
    removal_policy: Option<(usize, Duration)>,
}

impl PipelineBuilder {
    fn new(registry: Arc<dyn Registry>, source: Arc<dyn SourceProvider>) -> Self {
        Self {
            registry,
            source,
            gate: Arc::new(AllowAll),
            validator: Arc::new(HeaderValidator),
            fs: Arc::new(DefaultFs::default()),
            work_dir: None,
            backup_dir: None,
            locks: None,
            removal_policy: None,
        }
    }

    /// Directory for downloads, extraction and lock files.
    #[must_use]
    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn backup_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.backup_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn gate(mut self, gate: Arc<dyn SyncGate>) -> Self {
        self.gate = gate;
        self
    }

    #[must_use]
    pub fn validator(mut self, validator: Arc<dyn ArtifactValidator>) -> Self {
        self.validator = validator;
        self
    }

    #[must_use]
    pub fn filesystem(mut self, fs: Arc<dyn Filesystem>) -> Self {
        self.fs = fs;
        self
    }

    /// Defaults to file-backed locks under the work directory.
    #[must_use]
    pub fn locks(mut self, locks: ItemLocks) -> Self {
        self.locks = Some(locks);
        self
    }

    #[must_use]
    pub fn removal_policy(mut self, attempts: usize, delay: Duration) -> Self {
        self.removal_policy = Some((attempts, delay));
        self
    }

    pub fn build(self) -> Result<Pipeline, SyncError> {
        let work_dir = self.work_dir.ok_or_else(|| SyncError::Other {
            message: "pipeline work directory not set".to_string(),
        })?;
        let backup_dir = self.backup_dir.ok_or_else(|| SyncError::Other {
            message: "pipeline backup directory not set".to_string(),
        })?;

        let resolver = Arc::new(ArchiveResolver::new(Arc::clone(&self.source)));
        let mut installer = Installer::new(Arc::clone(&self.fs), Arc::clone(&self.validator));
        if let Some((attempts, delay)) = self.removal_policy {
            installer = installer.with_removal_policy(attempts, delay);
        }

        Ok(Pipeline {
            fetcher: ArchiveFetcher::new(Arc::clone(&self.source), work_dir.clone()),
            backups: BackupManager::new(backup_dir, Arc::clone(&self.fs)),
            detector: UpdateDetector::new(Arc::clone(&resolver), Arc::clone(&self.registry)),
            locks: self.locks.unwrap_or_else(|| ItemLocks::new(work_dir.clone())),
            installer,
            resolver,
            registry: self.registry,
            source: self.source,
            gate: self.gate,
            validator: self.validator,
            fs: self.fs,
            work_dir,
        })
    }
}

