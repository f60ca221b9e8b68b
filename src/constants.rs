//! Global constants used throughout the github-push codebase.
//!
//! This module contains timeout durations, retry parameters, and other
//! numeric constants that are used across multiple modules. Defining
//! them centrally improves maintainability and makes magic numbers
//! more discoverable.

use std::time::Duration;

/// Base URL of the GitHub REST API.
pub const GITHUB_API_BASE: &str = "https://api.github.com";

/// Media type requested from the GitHub REST API.
pub const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";

/// User agent sent with every GitHub request.
pub fn user_agent() -> String {
    format!("github-push/{}", env!("CARGO_PKG_VERSION"))
}

/// Timeout for GitHub metadata calls (releases, commits, repository info).
pub const METADATA_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for archive downloads (5 minutes).
///
/// Release zipballs of larger plugins can be tens of megabytes, so this is
/// deliberately much longer than [`METADATA_TIMEOUT`].
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// Upper bound on `per_page` accepted by the GitHub list endpoints.
pub const GITHUB_MAX_PER_PAGE: usize = 100;

/// Default number of versions listed for the rollback picker.
pub const DEFAULT_VERSION_LIST_LIMIT: usize = 50;

/// Number of attempts made to remove an installed directory before an update.
pub const REMOVAL_ATTEMPTS: usize = 3;

/// Delay between directory removal attempts.
///
/// Installed directories are briefly held open by the web server's own file
/// loading, so a short fixed pause is usually enough for the handle to go away.
pub const REMOVAL_RETRY_DELAY: Duration = Duration::from_millis(500);

/// How long a trigger waits for another process holding an item's lock.
pub const ITEM_LOCK_TIMEOUT: Duration = Duration::from_secs(120);

/// Default interval between scheduled update checks (twice a day).
pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 43_200;

/// Default bind address for the webhook endpoint.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8787";

/// Length of the abbreviated commit SHA shown to users.
pub const SHORT_SHA_LEN: usize = 7;

/// First backoff delay while polling for another process's item lock.
pub const STARTING_BACKOFF_DELAY_MS: u64 = 10;

/// Upper bound on the backoff delay while polling for an item lock.
pub const MAX_BACKOFF_DELAY_MS: u64 = 500;

/// How long a registry write waits for another process holding the registry lock.
pub const REGISTRY_LOCK_TIMEOUT: Duration = Duration::from_secs(30);
