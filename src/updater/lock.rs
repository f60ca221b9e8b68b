//! Per-item mutual exclusion.
//!
//! Two layers guard an item while an install, update or rollback runs:
//!
//! - an in-process keyed mutex, taken with `try_lock` so a second trigger in
//!   the same process fails fast with [`SyncError::ItemBusy`];
//! - an advisory file lock under `<work_dir>/.locks/item-<id>.lock`, so a CLI
//!   invocation and a running `serve` process never swap the same item at
//!   once. Waiting for it is bounded by a timeout.
//!
//! Both are released when the [`ItemGuard`] is dropped.

use crate::constants::{ITEM_LOCK_TIMEOUT, MAX_BACKOFF_DELAY_MS, STARTING_BACKOFF_DELAY_MS};
use crate::core::SyncError;
use dashmap::DashMap;
use fs4::fs_std::FileExt;
use std::fs::{File, OpenOptions};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio_retry::strategy::ExponentialBackoff;
use tracing::debug;

/// Holds an item's locks until dropped.
#[derive(Debug)]
pub struct ItemGuard {
    id: u64,
    _guard: OwnedMutexGuard<()>,
    _file: Option<Arc<File>>,
}

impl ItemGuard {
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for ItemGuard {
    fn drop(&mut self) {
        debug!(item_id = self.id, "Item lock released");
    }
}

/// Keyed locks for tracked items.
#[derive(Debug)]
pub struct ItemLocks {
    held: DashMap<u64, Arc<Mutex<()>>>,
    locks_dir: Option<PathBuf>,
    timeout: Duration,
}

impl ItemLocks {
    /// Locks coordinated across processes through files under `work_dir/.locks`.
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            held: DashMap::new(),
            locks_dir: Some(work_dir.into().join(".locks")),
            timeout: ITEM_LOCK_TIMEOUT,
        }
    }

    /// Locks that only coordinate tasks within this process.
    #[must_use]
    pub fn in_process() -> Self {
        Self {
            held: DashMap::new(),
            locks_dir: None,
            timeout: ITEM_LOCK_TIMEOUT,
        }
    }

    /// How long to wait for another process holding the file lock.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Whether some task in this process currently holds the item's lock.
    #[must_use]
    pub fn is_locked(&self, id: u64) -> bool {
        self.held
            .get(&id)
            .is_some_and(|mutex| mutex.try_lock().is_err())
    }

    /// Lock item `id`, failing with [`SyncError::ItemBusy`] when it is taken.
    pub async fn acquire(&self, id: u64) -> Result<ItemGuard, SyncError> {
        let mutex = Arc::clone(self.held.entry(id).or_default().value());
        let guard = mutex.try_lock_owned().map_err(|_| {
            debug!(item_id = id, "Item is locked by another task");
            SyncError::ItemBusy { id }
        })?;

        let file = match &self.locks_dir {
            Some(dir) => Some(self.lock_file(dir.clone(), id).await?),
            None => None,
        };

        debug!(item_id = id, "Item lock acquired");
        Ok(ItemGuard {
            id,
            _guard: guard,
            _file: file,
        })
    }

    async fn lock_file(&self, locks_dir: PathBuf, id: u64) -> Result<Arc<File>, SyncError> {
        tokio::fs::create_dir_all(&locks_dir)
            .await
            .map_err(|e| SyncError::io("create locks directory", &locks_dir, e))?;

        let lock_path = locks_dir.join(format!("item-{id}.lock"));
        let open_path = lock_path.clone();
        let file = tokio::task::spawn_blocking(move || {
            OpenOptions::new().create(true).write(true).truncate(false).open(&open_path)
        })
        .await
        .map_err(|e| SyncError::Other {
            message: format!("lock task failed: {e}"),
        })?
        .map_err(|e| SyncError::io("open lock file", &lock_path, e))?;
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
                debug!(item_id = id, wait_ms = start.elapsed().as_millis(), "Item file lock acquired");
                return Ok(file);
            }

            let remaining = self.timeout.saturating_sub(start.elapsed());
            if remaining.is_zero() {
                debug!(item_id = id, "Timed out waiting for item file lock");
                return Err(SyncError::ItemBusy { id });
            }
            tokio::time::sleep(delay.min(remaining)).await;
        }

        Err(SyncError::ItemBusy { id })
    }
}
