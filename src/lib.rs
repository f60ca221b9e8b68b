//! github-push - WordPress plugin and theme sync from GitHub
//!
//! Keeps plugins and themes installed on a WordPress site in sync with GitHub
//! repositories. Each tracked item follows either the head of a branch or the
//! latest published release; updates replace the installed directory with an
//! atomic swap protected by a backup, and any failure after the backup
//! restores the previous files.
//!
//! # Architecture Overview
//!
//! ```text
//! trigger (CLI / webhook / scheduler)
//!   -> Pipeline::run
//!        gate -> per-item lock -> resolve -> fetch -> extract & locate
//!        -> backup -> atomic swap -> verify -> move cursor
//!        (on failure after backup: restore)
//! ```
//!
//! # Core Modules
//!
//! - [`core`] - Tracked item model, [`SyncError`](core::SyncError) and CLI error rendering
//! - [`updater`] - The update pipeline: resolver, fetcher, extractor, backup,
//!   installer, detector, per-item locks
//! - [`registry`] - Persistent store of tracked items
//! - [`github`] - Source provider capability and the GitHub REST client
//!
//! ## Triggers
//! - [`cli`] - `github-push` command tree
//! - [`webhook`] - Signed GitHub push/release deliveries
//! - [`scheduler`] - Periodic batch checks
//!
//! ## Supporting Modules
//! - [`config`] - `~/.github-push/config.toml`
//! - [`gate`] - Entitlement check consulted before any sync
//! - [`utils`] - Atomic writes and retry helpers
//!
//! # Command-Line Usage
//!
//! ```bash
//! # Track a plugin that follows releases
//! github-push add --owner acme --repo widget --path widget --releases --auto-update
//!
//! # Install it, then check for updates later
//! github-push install 1
//! github-push check 1
//!
//! # Go back to an earlier tag or commit
//! github-push versions 1
//! github-push rollback 1 v1.4.0
//!
//! # Serve the webhook endpoint with the periodic scheduler
//! github-push serve --bind 0.0.0.0:8787
//! ```

pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod gate;
pub mod github;
pub mod registry;
pub mod scheduler;
pub mod updater;
pub mod utils;
pub mod webhook;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
