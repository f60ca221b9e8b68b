//! Test utilities for github-push
//!
//! Helpers shared by unit tests and the integration suite:
//! - [`FakeSource`] - an in-memory [`SourceProvider`](crate::github::SourceProvider)
//!   serving zip archives built with [`ZipBuilder`]
//! - [`FailingFs`] - a [`Filesystem`](crate::updater::Filesystem) that fails
//!   chosen operations, for exercising rollback
//! - tracked item constructors and test logging
//!
//! # Example
//!
//! ```rust,no_run
//! use github_push::test_utils::{FakeSource, plugin_archive};
//!
//! let source = FakeSource::new();
//! source.serve("fake://acme/widget/main", plugin_archive("acme-widget-9f8e7d6", "widget", "2.0.0"));
//! ```

pub mod archive;
pub mod env;
pub mod fs;
pub mod source;

pub use archive::{ZipBuilder, plugin_archive, theme_archive};
pub use env::TestPipeline;
pub use fs::{FailingFs, FsOp};
pub use source::FakeSource;

use crate::core::{ItemKind, RepoCoords, TrackedItem};
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Initializes the tracing subscriber once, regardless of how many times it's
/// called. Uses `level` when given, otherwise `RUST_LOG`; with neither, tests
/// run without logging.
///
/// ```bash
/// RUST_LOG=github_push=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}

/// `acme/widget` plugin item on branch `main`, installed nowhere in particular.
#[must_use]
pub fn tracked_item(id: u64, use_releases: bool) -> TrackedItem {
    let mut item = tracked_item_at(id, PathBuf::from("/nonexistent/plugins/widget"));
    item.use_releases = use_releases;
    item
}

/// `acme/widget` plugin item installed at `install_path` with slug `widget`.
#[must_use]
pub fn tracked_item_at(id: u64, install_path: PathBuf) -> TrackedItem {
    TrackedItem {
        id,
        repo: RepoCoords::new("acme", "widget"),
        branch: "main".to_string(),
        use_releases: false,
        kind: ItemKind::Plugin,
        install_path,
        slug: "widget".to_string(),
        auto_update: true,
        last_known_version: None,
        last_checked: None,
        created_at: Utc::now(),
    }
}
