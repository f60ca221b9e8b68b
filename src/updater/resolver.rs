//! Archive resolution: which upstream version to install and where to download it.

use crate::constants::{GITHUB_MAX_PER_PAGE, SHORT_SHA_LEN};
use crate::core::{SyncError, TrackedItem};
use crate::github::{SourceError, SourceProvider};
use regex::Regex;
use std::sync::{Arc, LazyLock};
use tracing::{debug, warn};

static COMMIT_SHA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-fA-F]{7,40}$").expect("sha regex is valid"));

/// An explicitly requested version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionRef {
    /// 7 to 40 hex characters.
    Commit(String),
    /// Anything else.
    Tag(String),
}

impl VersionRef {
    #[must_use]
    pub fn classify(version: &str) -> Self {
        let version = version.trim();
        if COMMIT_SHA.is_match(version) {
            VersionRef::Commit(version.to_string())
        } else {
            VersionRef::Tag(version.to_string())
        }
    }
}

/// A resolved upstream version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionCandidate {
    /// Value compared against and stored in `last_known_version`:
    /// full commit SHA in branch mode, tag name in releases mode.
    pub identifier: String,
    /// Archive to download.
    pub download_url: String,
    /// Short form for messages (7-char SHA or the tag).
    pub display: String,
}

/// First [`SHORT_SHA_LEN`] characters of a SHA.
#[must_use]
pub fn short_sha(sha: &str) -> &str {
    sha.get(..SHORT_SHA_LEN).unwrap_or(sha)
}

pub struct ArchiveResolver {
    source: Arc<dyn SourceProvider>,
}

impl ArchiveResolver {
    pub fn new(source: Arc<dyn SourceProvider>) -> Self {
        Self { source }
    }

    /// Resolve the latest upstream version, or `explicit` when given.
    pub async fn resolve(
        &self,
        item: &TrackedItem,
        explicit: Option<&str>,
    ) -> Result<VersionCandidate, SyncError> {
        match explicit.map(str::trim).filter(|v| !v.is_empty()) {
            Some(version) => self.resolve_explicit(item, VersionRef::classify(version)).await,
            None if item.use_releases => self.resolve_latest_release(item).await,
            None => self.resolve_branch_head(item).await,
        }
    }

    async fn resolve_latest_release(&self, item: &TrackedItem) -> Result<VersionCandidate, SyncError> {
        let release = self
            .source
            .latest_release(&item.repo)
            .await
            .map_err(|e| resolution_error(item, "no releases found", e))?;

        let download_url = release
            .zipball_url
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| self.source.archive_url(&item.repo, &release.tag_name));
        debug!(repo = %item.repo, tag = %release.tag_name, "Resolved latest release");

        Ok(VersionCandidate {
            display: release.tag_name.clone(),
            identifier: release.tag_name,
            download_url,
        })
    }

    async fn resolve_branch_head(&self, item: &TrackedItem) -> Result<VersionCandidate, SyncError> {
        let commit = self
            .source
            .latest_commit(&item.repo, &item.branch)
            .await
            .map_err(|e| resolution_error(item, &format!("no commits on branch '{}'", item.branch), e))?;

        if commit.sha.is_empty() {
            return Err(SyncError::NoVersionAvailable {
                repo: item.repo.to_string(),
                reason: format!("branch '{}' has no head commit", item.branch),
            });
        }
        debug!(repo = %item.repo, branch = %item.branch, sha = %commit.sha, "Resolved branch head");

        Ok(VersionCandidate {
            display: short_sha(&commit.sha).to_string(),
            download_url: self.source.archive_url(&item.repo, &item.branch),
            identifier: commit.sha,
        })
    }

    async fn resolve_explicit(
        &self,
        item: &TrackedItem,
        version: VersionRef,
    ) -> Result<VersionCandidate, SyncError> {
        match version {
            VersionRef::Commit(sha) => Ok(VersionCandidate {
                display: short_sha(&sha).to_string(),
                download_url: self.source.archive_url(&item.repo, &sha),
                identifier: sha,
            }),
            VersionRef::Tag(tag) => {
                let release_url = match self.source.releases(&item.repo, GITHUB_MAX_PER_PAGE).await {
                    Ok(releases) => releases
                        .into_iter()
                        .find(|r| r.tag_name == tag)
                        .and_then(|r| r.zipball_url)
                        .filter(|url| !url.is_empty()),
                    Err(e) => {
                        warn!(repo = %item.repo, tag = %tag, error = %e, "Could not list releases, using tag archive");
                        None
                    }
                };

                let download_url = release_url.unwrap_or_else(|| {
                    debug!(repo = %item.repo, tag = %tag, "No release for tag, using tag archive");
                    self.source.archive_url(&item.repo, &tag)
                });

                Ok(VersionCandidate {
                    display: tag.clone(),
                    identifier: tag,
                    download_url,
                })
            }
        }
    }
}

fn resolution_error(item: &TrackedItem, reason: &str, error: SourceError) -> SyncError {
    match error {
        SourceError::NotFound { .. } => SyncError::NoVersionAvailable {
            repo: item.repo.to_string(),
            reason: reason.to_string(),
        },
        source => SyncError::Remote {
            repo: item.repo.to_string(),
            source,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::{Commit, Release};
    use crate::test_utils::{FakeSource, tracked_item};

    const SHA: &str = "9f8e7d6c5b4a39281706f5e4d3c2b1a098765432";

    #[test]
    fn test_classify() {
        assert_eq!(VersionRef::classify(SHA), VersionRef::Commit(SHA.to_string()));
        assert_eq!(VersionRef::classify("a1b2c3d"), VersionRef::Commit("a1b2c3d".to_string()));
        assert_eq!(VersionRef::classify("v2.3.1"), VersionRef::Tag("v2.3.1".to_string()));
        assert_eq!(VersionRef::classify("abc123"), VersionRef::Tag("abc123".to_string()));
        assert_eq!(VersionRef::classify("1234567"), VersionRef::Commit("1234567".to_string()));
        let too_long = format!("{SHA}0");
        assert_eq!(VersionRef::classify(&too_long), VersionRef::Tag(too_long.clone()));
    }

    #[tokio::test]
    async fn test_branch_head() {
        let source = Arc::new(FakeSource::new());
        source.push_commit(Commit::new(SHA, "Fix widget"));
        let resolver = ArchiveResolver::new(source.clone());

        let candidate = resolver.resolve(&tracked_item(1, false), None).await.unwrap();
        assert_eq!(candidate.identifier, SHA);
        assert_eq!(candidate.display, "9f8e7d6");
        assert_eq!(candidate.download_url, "fake://acme/widget/main");
    }

    #[tokio::test]
    async fn test_latest_release() {
        let source = Arc::new(FakeSource::new());
        source.push_release(Release::new("v1.0.0"));
        source.push_release(Release::new("v1.1.0"));
        let resolver = ArchiveResolver::new(source);

        let candidate = resolver.resolve(&tracked_item(1, true), None).await.unwrap();
        assert_eq!(candidate.identifier, "v1.1.0");
        assert_eq!(candidate.download_url, "fake://acme/widget/release/v1.1.0");
    }

    #[tokio::test]
    async fn test_no_releases_is_no_version() {
        let resolver = ArchiveResolver::new(Arc::new(FakeSource::new()));
        let err = resolver.resolve(&tracked_item(1, true), None).await.unwrap_err();
        assert!(matches!(err, SyncError::NoVersionAvailable { .. }));
    }

    #[tokio::test]
    async fn test_api_failure_is_remote() {
        let source = Arc::new(FakeSource::new());
        source.fail_metadata(SourceError::Api {
            status: 500,
            message: "boom".into(),
        });
        let err = ArchiveResolver::new(source)
            .resolve(&tracked_item(1, false), None)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Remote { .. }));
    }

    #[tokio::test]
    async fn test_explicit_tag_searches_releases_then_falls_back() {
        let source = Arc::new(FakeSource::new());
        source.push_release(Release::new("v2.3.1"));
        let resolver = ArchiveResolver::new(source);
        let item = tracked_item(1, false);

        let found = resolver.resolve(&item, Some("v2.3.1")).await.unwrap();
        assert_eq!(found.download_url, "fake://acme/widget/release/v2.3.1");

        let missing = resolver.resolve(&item, Some("v9.9.9")).await.unwrap();
        assert_eq!(missing.identifier, "v9.9.9");
        assert_eq!(missing.download_url, "fake://acme/widget/v9.9.9");
    }

    #[tokio::test]
    async fn test_explicit_commit_skips_release_lookup() {
        let source = Arc::new(FakeSource::new());
        source.fail_metadata(SourceError::Transport("offline".into()));
        let candidate = ArchiveResolver::new(source)
            .resolve(&tracked_item(1, true), Some(SHA))
            .await
            .unwrap();
        assert_eq!(candidate.identifier, SHA);
        assert_eq!(candidate.download_url, format!("fake://acme/widget/{SHA}"));
    }
}
