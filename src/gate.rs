//! Entitlement gate.
//!
//! Deployments that license repositories plug their own check in here. The
//! pipeline consults the gate before any network or filesystem work.

use crate::core::TrackedItem;

/// Decides whether a tracked item may be synced.
pub trait SyncGate: Send + Sync {
    fn is_allowed(&self, item: &TrackedItem) -> bool;
}

/// Gate that allows every item.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl SyncGate for AllowAll {
    fn is_allowed(&self, _item: &TrackedItem) -> bool {
        true
    }
}

impl<F> SyncGate for F
where
    F: Fn(&TrackedItem) -> bool + Send + Sync,
{
    fn is_allowed(&self, item: &TrackedItem) -> bool {
        self(item)
    }
}
