//! Change detection between the installed cursor and upstream.
//!
//! Detection compares identifiers byte for byte. There is no version
//! ordering: a different upstream identifier, or no cursor at all, means an
//! update is available.

use crate::core::{TrackedItem, TrackedItemPatch};
use crate::registry::Registry;
use crate::updater::resolver::{ArchiveResolver, VersionCandidate};
use chrono::Utc;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Outcome of an update check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateCheck {
    /// Upstream matches the installed cursor.
    UpToDate { identifier: String },
    /// Upstream differs from the installed cursor.
    Available {
        current: Option<String>,
        latest: VersionCandidate,
    },
    /// Upstream could not be resolved.
    Failed { reason: String },
}

impl UpdateCheck {
    /// Compare a cursor with a resolved upstream candidate.
    #[must_use]
    pub fn compare(current: Option<&str>, latest: VersionCandidate) -> Self {
        match current {
            Some(cursor) if cursor == latest.identifier => UpdateCheck::UpToDate {
                identifier: latest.identifier,
            },
            _ => UpdateCheck::Available {
                current: current.map(str::to_string),
                latest,
            },
        }
    }

    /// `true` only for [`UpdateCheck::Available`]; a failed check counts as no update.
    #[must_use]
    pub fn is_available(&self) -> bool {
        matches!(self, UpdateCheck::Available { .. })
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, UpdateCheck::Failed { .. })
    }
}

impl fmt::Display for UpdateCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateCheck::UpToDate { identifier } => write!(f, "up to date ({identifier})"),
            UpdateCheck::Available { current, latest } => write!(
                f,
                "update available: {} -> {}",
                current.as_deref().unwrap_or("none"),
                latest.display
            ),
            UpdateCheck::Failed { reason } => write!(f, "check failed: {reason}"),
        }
    }
}

pub struct UpdateDetector {
    resolver: Arc<ArchiveResolver>,
    registry: Arc<dyn Registry>,
}

impl UpdateDetector {
    pub fn new(resolver: Arc<ArchiveResolver>, registry: Arc<dyn Registry>) -> Self {
        Self { resolver, registry }
    }

    /// Resolve upstream and compare it with `item`'s cursor.
    ///
    /// `last_checked` is recorded whatever the outcome.
    pub async fn check(&self, item: &TrackedItem) -> UpdateCheck {
        let outcome = match self.resolver.resolve(item, None).await {
            Ok(candidate) => UpdateCheck::compare(item.last_known_version.as_deref(), candidate),
            Err(e) => {
                warn!(item_id = item.id, repo = %item.repo, error = %e, "Update check failed");
                UpdateCheck::Failed {
                    reason: e.to_string(),
                }
            }
        };

        if let Err(e) = self.registry.update(item.id, TrackedItemPatch::checked_at(Utc::now())).await {
            error!(item_id = item.id, error = %e, "Failed to record check time");
        }

        debug!(item_id = item.id, outcome = %outcome, "Checked for update");
        outcome
    }
}
