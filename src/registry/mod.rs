//! Tracked repository registry.
//!
//! The pipeline reads tracked coordinates through [`Registry`] and writes
//! back only the version cursor. [`FileRegistry`] is the JSON file backed
//! implementation used by the binary.

pub mod file;
pub mod paths;

pub use file::FileRegistry;
pub use paths::{InstallRoots, validate_repo_component};

use crate::core::{NewTrackedItem, SyncError, TrackedItem, TrackedItemPatch};
use async_trait::async_trait;

/// CRUD over tracked items keyed by id.
#[async_trait]
pub trait Registry: Send + Sync {
    /// Fails with [`SyncError::ItemNotFound`] for unknown ids.
    async fn get(&self, id: u64) -> Result<TrackedItem, SyncError>;

    /// All items, newest first.
    async fn get_all(&self) -> Result<Vec<TrackedItem>, SyncError>;

    /// Validate and register a new item.
    async fn add(&self, item: NewTrackedItem) -> Result<TrackedItem, SyncError>;

    /// Apply a partial update, re-validating the install path when it or the kind changes.
    async fn update(&self, id: u64, patch: TrackedItemPatch) -> Result<TrackedItem, SyncError>;

    /// Forget an item. Installed files are left alone.
    async fn delete(&self, id: u64) -> Result<(), SyncError>;
}
