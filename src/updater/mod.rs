//! The update/install pipeline.
//!
//! Leaves first:
//!
//! - [`resolver`] - which upstream version to install and its archive URL
//! - [`fetcher`] - download into a temporary file, with checksum
//! - [`extract`] - unzip and locate the plugin/theme root
//! - [`manifest`] - header-based artifact validation, installed state
//! - [`fs`] - filesystem capability with a fallback decorator
//! - [`backup`] - zip snapshots taken before a destructive swap
//! - [`installer`] - remove, move or copy, verify
//! - [`detector`] - change detection against the stored cursor
//! - [`lock`] - per-item mutual exclusion
//! - [`pipeline`] - orchestration and rollback

pub mod backup;
pub mod detector;
pub mod extract;
pub mod fetcher;
pub mod fs;
pub mod installer;
pub mod lock;
pub mod manifest;
pub mod pipeline;
pub mod resolver;

pub use backup::{Backup, BackupManager};
pub use detector::{UpdateCheck, UpdateDetector};
pub use extract::{ExtractedArtifact, extract_and_locate};
pub use fetcher::{ArchiveFetcher, FetchedArchive};
pub use fs::{DefaultFs, FallbackFs, FileByFileFs, Filesystem, NativeFs};
pub use installer::Installer;
pub use lock::{ItemGuard, ItemLocks};
pub use manifest::{ArtifactValidator, HeaderValidator, InstalledArtifact};
pub use pipeline::{InstallOutcome, Pipeline, PipelineBuilder, VersionEntry};
pub use resolver::{ArchiveResolver, VersionCandidate, VersionRef};
