//! Core types for github-push
//!
//! - [`error`] - [`SyncError`], its [`ErrorKind`] classification and the
//!   CLI-facing [`ErrorContext`]
//! - [`item`] - [`TrackedItem`] and the types used to create and edit it

pub mod error;
pub mod item;

pub use error::{ErrorContext, ErrorKind, SyncError, user_friendly_error};
pub use item::{ItemKind, NewTrackedItem, RepoCoords, TrackedItem, TrackedItemPatch};

/// Result alias for library operations.
pub type Result<T, E = SyncError> = std::result::Result<T, E>;
