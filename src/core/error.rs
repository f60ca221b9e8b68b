//! Error handling for github-push
//!
//! Errors are split in two layers:
//! - [`SyncError`] - strongly typed failures of the update pipeline and its
//!   collaborators. Every variant maps onto an [`ErrorKind`] so callers can
//!   decide how to react (log and continue, roll back, alert an operator).
//! - [`ErrorContext`] - a wrapper adding a suggestion and details for CLI
//!   users, produced by [`user_friendly_error`].
//!
//! Outer layers (configuration, CLI, server bootstrap) work with
//! [`anyhow::Result`] and hand the final error to [`user_friendly_error`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use github_push::core::{ErrorKind, SyncError, user_friendly_error};
//!
//! let error = SyncError::ItemBusy { id: 3 };
//! assert_eq!(error.kind(), ErrorKind::Busy);
//!
//! let context = user_friendly_error(anyhow::Error::from(error));
//! context.display();
//! ```

use crate::github::SourceError;
use colored::Colorize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Failure classes of the update pipeline.
///
/// The classes describe how a failure should be handled, not where it
/// happened: an [`ErrorKind::IoFailure`] raised after a backup was taken
/// triggers a restore, a [`ErrorKind::RestoreFailed`] leaves the installed
/// artifact in an unknown state and needs an operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Upstream has no addressable version or the metadata call failed.
    Resolution,
    /// Network failure while downloading an archive.
    Transport,
    /// A local filesystem operation failed.
    IoFailure,
    /// The archive has no locatable plugin/theme structure.
    ArtifactNotFound,
    /// The swapped-in artifact is not a valid plugin/theme.
    VerificationFailed,
    /// Restoring the backup failed.
    RestoreFailed,
    /// Another trigger is already processing the item.
    Busy,
    /// The item (or its installed artifact) does not exist.
    NotFound,
    /// The entitlement gate refused the item.
    NotEntitled,
    /// Caller supplied invalid input (paths, repository names).
    InvalidInput,
    /// The registry could not be read or written.
    Registry,
    /// Anything else.
    Other,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Resolution => "resolution",
            ErrorKind::Transport => "transport",
            ErrorKind::IoFailure => "io",
            ErrorKind::ArtifactNotFound => "artifact-not-found",
            ErrorKind::VerificationFailed => "verification-failed",
            ErrorKind::RestoreFailed => "restore-failed",
            ErrorKind::Busy => "busy",
            ErrorKind::NotFound => "not-found",
            ErrorKind::NotEntitled => "not-entitled",
            ErrorKind::InvalidInput => "invalid-input",
            ErrorKind::Registry => "registry",
            ErrorKind::Other => "other",
        };
        f.write_str(name)
    }
}

/// The main error type for sync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// No tracked item with this id.
    #[error("Repository #{id} is not tracked")]
    ItemNotFound {
        /// Registry id that was looked up
        id: u64,
    },

    /// The entitlement gate refused to sync this repository.
    #[error("Syncing {repo} is not allowed")]
    NotEntitled {
        /// `owner/name` of the refused repository
        repo: String,
    },

    /// Another install/update of the same item is running.
    #[error("An operation on repository #{id} is already in progress")]
    ItemBusy {
        /// Registry id of the busy item
        id: u64,
    },

    /// `update` was requested but nothing is installed yet.
    #[error("Repository #{id} is not installed at {path}")]
    NotInstalled {
        /// Registry id
        id: u64,
        /// Expected install path
        path: PathBuf,
    },

    /// Upstream has no release or commit to install.
    #[error("No version of {repo} could be resolved: {reason}")]
    NoVersionAvailable {
        /// `owner/name`
        repo: String,
        /// What was missing ("no releases found", ...)
        reason: String,
    },

    /// A GitHub metadata call failed.
    #[error("GitHub request for {repo} failed")]
    Remote {
        /// `owner/name`
        repo: String,
        /// Underlying provider error
        #[source]
        source: SourceError,
    },

    /// The archive download returned an HTTP error status.
    #[error("Download failed with HTTP {status}: {url}")]
    DownloadFailed {
        /// Archive URL
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// The archive download failed below HTTP (DNS, TLS, timeout, reset).
    #[error("Network error while downloading {url}: {message}")]
    Transport {
        /// Archive URL
        url: String,
        /// Transport error description
        message: String,
    },

    /// A local filesystem operation failed.
    #[error("Failed to {operation} {}", path.display())]
    Io {
        /// What was being done ("write archive", "read manifest", ...)
        operation: String,
        /// Path involved
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The archive could not be unpacked.
    #[error("Failed to extract archive {}: {reason}", archive.display())]
    Extraction {
        /// Archive file
        archive: PathBuf,
        /// Reason reported by the unzipper
        reason: String,
    },

    /// The extracted archive contains no directories.
    #[error("No plugin or theme directory found in archive {}", archive.display())]
    ArtifactNotFound {
        /// Archive file
        archive: PathBuf,
    },

    /// Creating the pre-swap backup failed.
    #[error("Failed to back up {}: {reason}", path.display())]
    BackupFailed {
        /// Installed directory
        path: PathBuf,
        /// Why the snapshot failed
        reason: String,
    },

    /// The installed directory could not be removed before the swap.
    #[error("Could not remove existing installation at {} after {attempts} attempts", path.display())]
    RemovalFailed {
        /// Installed directory
        path: PathBuf,
        /// Number of attempts made
        attempts: usize,
    },

    /// The parent of the install path could not be created.
    #[error("Failed to create target directory {}", path.display())]
    TargetDir {
        /// Directory that could not be created
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Neither rename nor either copy strategy could place the artifact.
    #[error("Failed to move {} to {}: {reason}", from.display(), to.display())]
    MoveOrCopyFailed {
        /// Extracted artifact root
        from: PathBuf,
        /// Install path
        to: PathBuf,
        /// Last error in the fallback chain
        reason: String,
    },

    /// The artifact at the install path has no valid manifest header.
    #[error("Installed files at {} are not a valid {kind}: {reason}", path.display())]
    VerificationFailed {
        /// Install path
        path: PathBuf,
        /// "plugin" or "theme"
        kind: String,
        /// Which check failed
        reason: String,
    },

    /// Restoring a backup failed.
    #[error("Failed to restore backup {}: {reason}", backup.display())]
    RestoreFailed {
        /// Backup archive
        backup: PathBuf,
        /// Why restore failed
        reason: String,
    },

    /// An operation failed and restoring the backup failed too.
    ///
    /// The install path may hold neither the old nor the new artifact. The
    /// backup is left in place for manual recovery.
    #[error("{original}; restoring the backup also failed ({restore_error}), installed files are in an unknown state")]
    Unrecoverable {
        /// The failure that triggered the rollback
        original: Box<SyncError>,
        /// Backup left on disk
        backup: PathBuf,
        /// Why the restore failed
        restore_error: String,
    },

    /// The install path escapes the plugins/themes root.
    #[error("Invalid install path {}: {reason}", path.display())]
    InvalidInstallPath {
        /// Offending path
        path: PathBuf,
        /// Why it was rejected
        reason: String,
    },

    /// Owner or repository name contains forbidden characters.
    #[error("Invalid repository {field} '{value}': only letters, digits, '_', '.' and '-' are allowed")]
    InvalidRepository {
        /// "owner" or "name"
        field: String,
        /// Rejected value
        value: String,
    },

    /// The registry could not be read or persisted.
    #[error("Registry error: {message}")]
    Registry {
        /// Description of the failure
        message: String,
    },

    /// Generic error
    #[error("{message}")]
    Other {
        /// Generic error message
        message: String,
    },
}

impl SyncError {
    /// Failure class of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::ItemNotFound { .. } | SyncError::NotInstalled { .. } => ErrorKind::NotFound,
            SyncError::NotEntitled { .. } => ErrorKind::NotEntitled,
            SyncError::ItemBusy { .. } => ErrorKind::Busy,
            SyncError::NoVersionAvailable { .. } | SyncError::Remote { .. } => {
                ErrorKind::Resolution
            }
            SyncError::DownloadFailed { .. } | SyncError::Transport { .. } => ErrorKind::Transport,
            SyncError::Io { .. }
            | SyncError::Extraction { .. }
            | SyncError::BackupFailed { .. }
            | SyncError::RemovalFailed { .. }
            | SyncError::TargetDir { .. }
            | SyncError::MoveOrCopyFailed { .. } => ErrorKind::IoFailure,
            SyncError::ArtifactNotFound { .. } => ErrorKind::ArtifactNotFound,
            SyncError::VerificationFailed { .. } => ErrorKind::VerificationFailed,
            SyncError::RestoreFailed { .. } | SyncError::Unrecoverable { .. } => {
                ErrorKind::RestoreFailed
            }
            SyncError::InvalidInstallPath { .. } | SyncError::InvalidRepository { .. } => {
                ErrorKind::InvalidInput
            }
            SyncError::Registry { .. } => ErrorKind::Registry,
            SyncError::Other { .. } => ErrorKind::Other,
        }
    }

    /// Shorthand for [`SyncError::Io`].
    pub fn io(operation: impl Into<String>, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SyncError::Io {
            operation: operation.into(),
            path: path.into(),
            source,
        }
    }

    /// Whether the installed artifact may now be in an unknown state.
    #[must_use]
    pub fn is_unrecoverable(&self) -> bool {
        self.kind() == ErrorKind::RestoreFailed
    }
}

/// Error wrapper with a suggestion and details for CLI users.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: SyncError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    #[must_use]
    pub const fn new(error: SyncError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr with terminal colors.
    ///
    /// Error message in red, details in yellow, suggestion in green. An
    /// unrecoverable rollback gets an extra banner naming the backup so the
    /// operator can restore it by hand.
    pub fn display(&self) {
        if let SyncError::Unrecoverable { backup, .. } = &self.error {
            eprintln!(
                "{}",
                "!! ARTIFACT STATE UNKNOWN: rollback failed !!".red().bold().underline()
            );
            eprintln!("{}: {}", "backup kept at".red(), backup.display());
        }

        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into an [`ErrorContext`] with a suggestion.
///
/// [`SyncError`] values get a suggestion per failure class, I/O and TOML
/// errors get generic filesystem/config hints, everything else is shown with
/// its full cause chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let error = match error.downcast::<SyncError>() {
        Ok(sync_error) => return create_error_context(sync_error),
        Err(error) => error,
    };

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        let hint = match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => Some(
                "Check that the plugins/themes directories are writable by the user running github-push",
            ),
            std::io::ErrorKind::NotFound => {
                Some("Check that the file or directory exists and the path is correct")
            }
            _ => None,
        };
        if let Some(hint) = hint {
            return ErrorContext::new(SyncError::Other {
                message: chain_message(&error),
            })
            .with_suggestion(hint);
        }
    }

    if error.downcast_ref::<toml::de::Error>().is_some() {
        return ErrorContext::new(SyncError::Other {
            message: chain_message(&error),
        })
        .with_suggestion("Check the TOML syntax of your github-push config file")
        .with_details("Use --config to point at a different file, or delete it to fall back to defaults");
    }

    ErrorContext::new(SyncError::Other {
        message: chain_message(&error),
    })
}

fn chain_message(error: &anyhow::Error) -> String {
    let mut message = error.to_string();
    let chain: Vec<String> = error.chain().skip(1).map(ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }
    message
}

fn create_error_context(error: SyncError) -> ErrorContext {
    match error.kind() {
        ErrorKind::Resolution => ErrorContext::new(error)
            .with_suggestion("Check the repository name, branch and token. Private repositories need a token with read access")
            .with_details("Releases mode needs at least one published release; branch mode needs at least one commit on the tracked branch"),
        ErrorKind::Transport => ErrorContext::new(error)
            .with_suggestion("Check your network connection and retry; the next scheduled check will retry automatically"),
        ErrorKind::IoFailure => ErrorContext::new(error)
            .with_suggestion("Check free disk space and that the plugins/themes directories are writable")
            .with_details("If a backup was taken it has been restored"),
        ErrorKind::ArtifactNotFound => ErrorContext::new(error)
            .with_suggestion("Make sure the repository contains the plugin or theme files"),
        ErrorKind::VerificationFailed => ErrorContext::new(error)
            .with_suggestion("Plugins need a PHP file with a 'Plugin Name:' header; themes need style.css with a 'Theme Name:' header")
            .with_details("The previous version has been restored"),
        ErrorKind::RestoreFailed => ErrorContext::new(error)
            .with_suggestion("Unzip the backup archive into the plugins/themes directory by hand")
            .with_details("Neither the previous nor the new version may be fully installed"),
        ErrorKind::Busy => ErrorContext::new(error)
            .with_suggestion("Wait for the running install or update to finish and try again"),
        ErrorKind::NotFound => ErrorContext::new(error)
            .with_suggestion("Run 'github-push list' to see tracked repositories, or 'github-push install <id>' to install first"),
        ErrorKind::NotEntitled => ErrorContext::new(error)
            .with_suggestion("Check your license or entitlement for this repository"),
        ErrorKind::InvalidInput => ErrorContext::new(error)
            .with_suggestion("Install paths must be inside the configured plugins_dir or themes_dir"),
        ErrorKind::Registry => ErrorContext::new(error)
            .with_suggestion("Check the registry file named in [paths].registry of your config"),
        ErrorKind::Other => ErrorContext::new(error),
    }
}
