//! A complete pipeline over temporary directories and a fake source.

use super::source::FakeSource;
use crate::core::{ItemKind, NewTrackedItem, RepoCoords, TrackedItem};
use crate::registry::{FileRegistry, InstallRoots, Registry};
use crate::updater::{Filesystem, ItemLocks, NativeFs, Pipeline, PipelineBuilder};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Temporary WordPress-like layout wired to a [`Pipeline`].
///
/// ```text
/// <temp>/wp-content/plugins
/// <temp>/wp-content/themes
/// <temp>/data/{backups,tmp,repositories.json}
/// ```
pub struct TestPipeline {
    pub temp: TempDir,
    pub source: Arc<FakeSource>,
    pub registry: Arc<FileRegistry>,
    pub pipeline: Arc<Pipeline>,
}

impl TestPipeline {
    /// # Panics
    ///
    /// Panics if the temporary layout cannot be created.
    pub async fn new() -> Self {
        Self::with(|builder| builder).await
    }

    /// Pipeline using `fs` for swaps and restores.
    ///
    /// # Panics
    ///
    /// Panics if the temporary layout cannot be created.
    pub async fn with_fs(fs: Arc<dyn Filesystem>) -> Self {
        Self::with(move |builder| builder.filesystem(fs)).await
    }

    /// # Panics
    ///
    /// Panics if the temporary layout cannot be created.
    pub async fn with(customize: impl FnOnce(PipelineBuilder) -> PipelineBuilder) -> Self {
        let temp = TempDir::new().expect("create temp dir");
        let roots = InstallRoots::new(
            temp.path().join("wp-content/plugins"),
            temp.path().join("wp-content/themes"),
        );
        std::fs::create_dir_all(roots.root_for(ItemKind::Plugin)).expect("create plugins dir");
        std::fs::create_dir_all(roots.root_for(ItemKind::Theme)).expect("create themes dir");

        let registry = Arc::new(
            FileRegistry::open(temp.path().join("data/repositories.json"), roots)
                .await
                .expect("open registry"),
        );
        let source = Arc::new(FakeSource::new());

        let builder = Pipeline::builder(registry.clone(), source.clone())
            .work_dir(temp.path().join("data/tmp"))
            .backup_dir(temp.path().join("data/backups"))
            .filesystem(Arc::new(NativeFs))
            .locks(ItemLocks::in_process())
            .removal_policy(2, Duration::from_millis(1));
        let pipeline = Arc::new(customize(builder).build().expect("build pipeline"));

        Self {
            temp,
            source,
            registry,
            pipeline,
        }
    }

    #[must_use]
    pub fn plugins_dir(&self) -> PathBuf {
        self.temp.path().join("wp-content/plugins")
    }

    #[must_use]
    pub fn themes_dir(&self) -> PathBuf {
        self.temp.path().join("wp-content/themes")
    }

    #[must_use]
    pub fn backup_dir(&self) -> PathBuf {
        self.temp.path().join("data/backups")
    }

    /// Number of backup archives currently on disk.
    #[must_use]
    pub fn backup_count(&self) -> usize {
        std::fs::read_dir(self.backup_dir()).map(|d| d.count()).unwrap_or(0)
    }

    /// Register `acme/widget` as a plugin at `plugins/widget`.
    ///
    /// # Panics
    ///
    /// Panics if the registry rejects the item.
    pub async fn add_plugin(&self, use_releases: bool) -> TrackedItem {
        self.registry
            .add(NewTrackedItem {
                repo: RepoCoords::new("acme", "widget"),
                branch: Some("main".to_string()),
                use_releases,
                kind: ItemKind::Plugin,
                install_path: PathBuf::from("widget"),
                slug: None,
                auto_update: true,
            })
            .await
            .expect("add plugin")
    }

    /// Register `acme/flat` as a theme at `themes/flat`.
    ///
    /// # Panics
    ///
    /// Panics if the registry rejects the item.
    pub async fn add_theme(&self) -> TrackedItem {
        self.registry
            .add(NewTrackedItem {
                repo: RepoCoords::new("acme", "flat"),
                branch: None,
                use_releases: true,
                kind: ItemKind::Theme,
                install_path: PathBuf::from("flat"),
                slug: None,
                auto_update: true,
            })
            .await
            .expect("add theme")
    }

    /// Write a plugin directory by hand, as if installed earlier.
    ///
    /// # Panics
    ///
    /// Panics if the files cannot be written.
    pub fn install_plugin_files(&self, dir: &Path, version: &str) {
        std::fs::create_dir_all(dir).expect("create plugin dir");
        std::fs::write(
            dir.join("widget.php"),
            format!("<?php\n/**\n * Plugin Name: Widget\n * Version: {version}\n */\n"),
        )
        .expect("write plugin file");
    }
}
