//! Integration test suite for github-push
//!
//! End-to-end tests driving the update pipeline against temporary
//! WordPress-like directory trees, an in-memory source provider serving zip
//! archives, a real JSON registry and real filesystem swaps.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **install**: Fresh installs, updates and the version cursor
//! - **rollback**: Failure after backup restores the previous files
//! - **detection**: Update checks and version listing
//! - **versions**: Explicit tag/commit installs
//! - **webhook**: Signature verification and delivery dispatch
//! - **concurrency**: Per-item locking
//! - **cli**: Binary-level smoke tests

mod cli;
mod concurrency;
mod detection;
mod install;
mod rollback;
mod versions;
mod webhook;

use github_push::core::TrackedItemPatch;
use github_push::github::Commit;
use github_push::registry::Registry;
use github_push::test_utils::{TestPipeline, init_test_logging, plugin_archive};

pub const OLD_SHA: &str = "a1b2c3d";
pub const NEW_SHA: &str = "9f8e7d6c5b4a39281706f5e4d3c2b1a098765432";

/// Branch-mode plugin installed at 1.0.0 with cursor [`OLD_SHA`], and an
/// upstream head at [`NEW_SHA`] serving version 2.0.0.
pub async fn installed_branch_plugin() -> (TestPipeline, u64) {
    init_test_logging(None);
    let env = TestPipeline::new().await;
    let item = env.add_plugin(false).await;
    env.install_plugin_files(&item.install_path, "1.0.0");
    env.registry
        .update(
            item.id,
            TrackedItemPatch {
                last_known_version: Some(OLD_SHA.to_string()),
                ..TrackedItemPatch::default()
            },
        )
        .await
        .unwrap();

    env.source.push_commit(Commit::new(NEW_SHA, "Fix activation hook"));
    env.source.serve("fake://acme/widget/main", plugin_archive("acme-widget-9f8e7d6", "widget", "2.0.0"));
    (env, item.id)
}
