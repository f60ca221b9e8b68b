//! JSON file registry.
//!
//! The document on disk is the only copy. Reads load it fresh, and every
//! change runs read-modify-write under an exclusive lock on the sibling
//! `<name>.lock` file, so a CLI invocation and a running `serve` process
//! see each other's edits and never overwrite them.

use super::paths::{InstallRoots, validate_repo_component};
use super::Registry;
use crate::constants::{MAX_BACKOFF_DELAY_MS, REGISTRY_LOCK_TIMEOUT, STARTING_BACKOFF_DELAY_MS};
use crate::core::{NewTrackedItem, RepoCoords, SyncError, TrackedItem, TrackedItemPatch};
use crate::utils::atomic_write_async;
use async_trait::async_trait;
use chrono::Utc;
use fs4::fs_std::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio_retry::strategy::ExponentialBackoff;
use tracing::{debug, info};

const DEFAULT_BRANCH: &str = "main";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RegistryDocument {
    next_id: u64,
    #[serde(default)]
    items: Vec<TrackedItem>,
}

impl Default for RegistryDocument {
    fn default() -> Self {
        Self {
            next_id: 1,
            items: Vec::new(),
        }
    }
}

/// Registry persisted as one JSON document, rewritten atomically on every change.
#[derive(Debug)]
pub struct FileRegistry {
    path: PathBuf,
    lock_path: PathBuf,
    roots: InstallRoots,
    writer: Mutex<()>,
}

impl FileRegistry {
    /// Open the registry at `path`; a missing file is an empty registry.
    ///
    /// The document is parsed once here so a corrupt file fails early.
    pub async fn open(path: impl Into<PathBuf>, roots: InstallRoots) -> Result<Self, SyncError> {
        let path = path.into();
        load_document(&path).await?;
        debug!(path = %path.display(), "Opened registry");

        let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        Ok(Self {
            lock_path: path.with_file_name(format!("{name}.lock")),
            path,
            roots,
            writer: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn roots(&self) -> &InstallRoots {
        &self.roots
    }

    async fn persist(&self, document: &RegistryDocument) -> Result<(), SyncError> {
        let json = serde_json::to_vec_pretty(document).map_err(|e| SyncError::Registry {
            message: format!("failed to serialize registry: {e}"),
        })?;
        atomic_write_async(self.path.clone(), json).await.map_err(|e| SyncError::Registry {
            message: format!("{e:#}"),
        })
    }

    /// Load, change and save the document while holding the registry lock.
    ///
    /// Nothing is written when `apply` fails.
    async fn mutate<T, F>(&self, apply: F) -> Result<T, SyncError>
    where
        F: FnOnce(&mut RegistryDocument) -> Result<T, SyncError> + Send,
    {
        let _writer = self.writer.lock().await;
        let _lock = self.lock_document().await?;

        let mut document = load_document(&self.path).await?;
        let value = apply(&mut document)?;
        self.persist(&document).await?;
        Ok(value)
    }

    /// Take the exclusive file lock, polling with backoff until the timeout.
    async fn lock_document(&self) -> Result<Arc<File>, SyncError> {
        if let Some(parent) = self.lock_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SyncError::io("create registry directory", parent, e))?;
        }

        let open_path = self.lock_path.clone();
        let file = tokio::task::spawn_blocking(move || {
            OpenOptions::new().create(true).write(true).truncate(false).open(&open_path)
        })
        .await
        .map_err(|e| SyncError::Other {
            message: format!("lock task failed: {e}"),
        })?
        .map_err(|e| SyncError::io("open registry lock", &self.lock_path, e))?;
        let file = Arc::new(file);

        let start = Instant::now();
        let backoff = ExponentialBackoff::from_millis(STARTING_BACKOFF_DELAY_MS)
            .max_delay(Duration::from_millis(MAX_BACKOFF_DELAY_MS));

        for delay in backoff {
            let candidate = Arc::clone(&file);
            let locked = tokio::task::spawn_blocking(move || candidate.try_lock_exclusive())
                .await
                .map_err(|e| SyncError::Other {
                    message: format!("lock task failed: {e}"),
                })?;

            if let Ok(true) = locked {
                return Ok(file);
            }

            let remaining = REGISTRY_LOCK_TIMEOUT.saturating_sub(start.elapsed());
            if remaining.is_zero() {
                break;
            }
            tokio::time::sleep(delay.min(remaining)).await;
        }

        Err(SyncError::Registry {
            message: format!(
                "timed out waiting for the registry lock {}",
                self.lock_path.display()
            ),
        })
    }
}

async fn load_document(path: &Path) -> Result<RegistryDocument, SyncError> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => serde_json::from_str(&content).map_err(|e| SyncError::Registry {
            message: format!("failed to parse {}: {e}", path.display()),
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(RegistryDocument::default()),
        Err(e) => Err(SyncError::io("read registry", path, e)),
    }
}

fn default_slug(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
}

#[async_trait]
impl Registry for FileRegistry {
    async fn get(&self, id: u64) -> Result<TrackedItem, SyncError> {
        load_document(&self.path)
            .await?
            .items
            .into_iter()
            .find(|item| item.id == id)
            .ok_or(SyncError::ItemNotFound { id })
    }

    async fn get_all(&self) -> Result<Vec<TrackedItem>, SyncError> {
        let mut items = load_document(&self.path).await?.items;
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(items)
    }

    async fn add(&self, new: NewTrackedItem) -> Result<TrackedItem, SyncError> {
        validate_repo_component("owner", &new.repo.owner)?;
        validate_repo_component("name", &new.repo.name)?;
        let install_path = self.roots.validate(new.kind, &new.install_path)?;

        let item = self
            .mutate(move |document| {
                let item = TrackedItem {
                    id: document.next_id,
                    slug: new
                        .slug
                        .filter(|s| !s.is_empty())
                        .unwrap_or_else(|| default_slug(&install_path)),
                    repo: new.repo,
                    branch: new
                        .branch
                        .filter(|b| !b.is_empty())
                        .unwrap_or_else(|| DEFAULT_BRANCH.to_string()),
                    use_releases: new.use_releases,
                    kind: new.kind,
                    install_path,
                    auto_update: new.auto_update,
                    last_known_version: None,
                    last_checked: None,
                    created_at: Utc::now(),
                };
                document.next_id += 1;
                document.items.push(item.clone());
                Ok(item)
            })
            .await?;

        info!(item_id = item.id, repo = %item.repo, path = %item.install_path.display(), "Repository added");
        Ok(item)
    }

    async fn update(&self, id: u64, patch: TrackedItemPatch) -> Result<TrackedItem, SyncError> {
        let roots = &self.roots;
        let item = self
            .mutate(move |document| {
                let index = document
                    .items
                    .iter()
                    .position(|item| item.id == id)
                    .ok_or(SyncError::ItemNotFound { id })?;
                let mut item = document.items[index].clone();

                if patch.owner.is_some() || patch.name.is_some() {
                    let owner = patch.owner.unwrap_or_else(|| item.repo.owner.clone());
                    let name = patch.name.unwrap_or_else(|| item.repo.name.clone());
                    validate_repo_component("owner", &owner)?;
                    validate_repo_component("name", &name)?;
                    item.repo = RepoCoords::new(owner, name);
                }
                if let Some(branch) = patch.branch.filter(|b| !b.is_empty()) {
                    item.branch = branch;
                }
                if let Some(use_releases) = patch.use_releases {
                    item.use_releases = use_releases;
                }
                if patch.kind.is_some() || patch.install_path.is_some() {
                    let kind = patch.kind.unwrap_or(item.kind);
                    let requested = patch.install_path.unwrap_or_else(|| item.install_path.clone());
                    item.install_path = roots.validate(kind, &requested)?;
                    item.kind = kind;
                }
                if let Some(slug) = patch.slug.filter(|s| !s.is_empty()) {
                    item.slug = slug;
                }
                if let Some(auto_update) = patch.auto_update {
                    item.auto_update = auto_update;
                }
                if let Some(version) = patch.last_known_version {
                    item.last_known_version = Some(version);
                }
                if let Some(checked) = patch.last_checked {
                    item.last_checked = Some(checked);
                }

                document.items[index] = item.clone();
                Ok(item)
            })
            .await?;

        debug!(item_id = id, "Repository updated");
        Ok(item)
    }

    async fn delete(&self, id: u64) -> Result<(), SyncError> {
        self.mutate(|document| {
            if !document.items.iter().any(|item| item.id == id) {
                return Err(SyncError::ItemNotFound { id });
            }
            document.items.retain(|item| item.id != id);
            Ok(())
        })
        .await?;

        info!(item_id = id, "Repository removed");
        Ok(())
    }
}
