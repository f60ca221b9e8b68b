//! GitHub as a source of plugin/theme archives.
//!
//! [`SourceProvider`] is the capability the update pipeline consumes:
//! release and commit metadata plus raw archive bytes. [`GitHubClient`] is the
//! REST implementation; tests substitute an in-memory provider.

pub mod auth;
pub mod client;
pub mod models;

pub use auth::{Credentials, TokenKind};
pub use client::GitHubClient;
pub use models::{AuthenticatedUser, Commit, Release, RepositoryInfo};

use crate::constants::GITHUB_API_BASE;
use crate::core::{RepoCoords, TrackedItem};
use async_trait::async_trait;
use thiserror::Error;

/// Failures reported by a [`SourceProvider`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The resource does not exist (HTTP 404, no releases, empty history).
    #[error("{resource} not found")]
    NotFound {
        /// What was looked up
        resource: String,
    },

    /// GitHub answered with an error status.
    #[error("GitHub API error (HTTP {status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// `message` field of the error payload, or a generic text
        message: String,
    },

    /// The request never got an HTTP answer.
    #[error("request failed: {0}")]
    Transport(String),

    /// The response body was not the expected JSON.
    #[error("unexpected response: {0}")]
    Decode(String),

    /// An authenticated endpoint was called without a token.
    #[error("GitHub token not configured")]
    NoToken,
}

impl SourceError {
    pub fn not_found(resource: impl Into<String>) -> Self {
        SourceError::NotFound {
            resource: resource.into(),
        }
    }

    /// HTTP status, when the failure came from an HTTP response.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            SourceError::NotFound { .. } => Some(404),
            SourceError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Read access to a repository host.
#[async_trait]
pub trait SourceProvider: Send + Sync {
    /// Whether `repo` exists and is readable with the configured credentials.
    async fn verify_repository(&self, repo: &RepoCoords) -> Result<bool, SourceError>;

    /// Latest published (non-draft, non-prerelease) release.
    async fn latest_release(&self, repo: &RepoCoords) -> Result<Release, SourceError>;

    /// Releases, newest first, at most `limit` (capped at 100).
    async fn releases(&self, repo: &RepoCoords, limit: usize) -> Result<Vec<Release>, SourceError>;

    /// Head commit of `branch`.
    async fn latest_commit(&self, repo: &RepoCoords, branch: &str) -> Result<Commit, SourceError>;

    /// Commits on `branch`, newest first, at most `limit` (capped at 100).
    async fn recent_commits(
        &self,
        repo: &RepoCoords,
        branch: &str,
        limit: usize,
    ) -> Result<Vec<Commit>, SourceError>;

    /// Download an archive. Any HTTP status >= 400 is an error; the body of
    /// an error response is not interpreted.
    async fn download_archive(&self, url: &str) -> Result<Vec<u8>, SourceError>;

    /// Generic zipball URL for a branch, tag or commit.
    fn archive_url(&self, repo: &RepoCoords, reference: &str) -> String {
        zipball_url(GITHUB_API_BASE, repo, reference)
    }
}

/// `{base}/repos/{owner}/{name}/zipball/{reference}`
#[must_use]
pub fn zipball_url(base: &str, repo: &RepoCoords, reference: &str) -> String {
    format!("{}/repos/{}/{}/zipball/{}", base.trim_end_matches('/'), repo.owner, repo.name, reference)
}

pub const NO_RELEASE_NOTES: &str = "No release notes available.";
pub const NO_COMMIT_MESSAGE: &str = "No commit message available.";

/// Release notes for the item's upstream version.
///
/// Releases mode returns the latest release body, branch mode the head
/// commit's message. Empty text falls back to a fixed placeholder.
pub async fn release_notes(
    source: &dyn SourceProvider,
    item: &TrackedItem,
) -> Result<String, SourceError> {
    if item.use_releases {
        let release = source.latest_release(&item.repo).await?;
        Ok(release.body.filter(|b| !b.trim().is_empty()).unwrap_or_else(|| NO_RELEASE_NOTES.to_string()))
    } else {
        let commit = source.latest_commit(&item.repo, &item.branch).await?;
        if commit.commit.message.is_empty() {
            Ok(NO_COMMIT_MESSAGE.to_string())
        } else {
            Ok(commit.commit.message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zipball_url() {
        let repo = RepoCoords::new("acme", "widget");
        assert_eq!(
            zipball_url("https://api.github.com/", &repo, "main"),
            "https://api.github.com/repos/acme/widget/zipball/main"
        );
    }

    #[test]
    fn test_source_error_status() {
        assert_eq!(SourceError::not_found("releases").status(), Some(404));
        assert_eq!(
            SourceError::Api {
                status: 403,
                message: "rate limited".into()
            }
            .status(),
            Some(403)
        );
        assert_eq!(SourceError::Transport("reset".into()).status(), None);
    }
}
