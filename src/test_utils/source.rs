//! In-memory source provider.

use crate::core::RepoCoords;
use crate::github::{Commit, Release, SourceError, SourceProvider};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
struct State {
    /// Oldest first; the last non-draft, non-prerelease entry is "latest".
    releases: Vec<Release>,
    /// Oldest first; the last entry is the branch head.
    commits: Vec<Commit>,
    archives: HashMap<String, Vec<u8>>,
    metadata_error: Option<SourceError>,
    download_error: Option<SourceError>,
}

/// A [`SourceProvider`] answering from memory.
///
/// Archive URLs have the form `fake://{owner}/{name}/{reference}`; releases
/// without an explicit `zipball_url` get `fake://{owner}/{name}/release/{tag}`.
/// The same history is served for every repository and branch.
#[derive(Debug, Default)]
pub struct FakeSource {
    state: Mutex<State>,
    downloads: AtomicUsize,
}

impl FakeSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut State) -> T) -> T {
        let mut state = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&mut state)
    }

    /// Publish a release; it becomes the latest.
    pub fn push_release(&self, release: Release) {
        self.with_state(|s| s.releases.push(release));
    }

    /// Add a commit; it becomes the branch head.
    pub fn push_commit(&self, commit: Commit) {
        self.with_state(|s| s.commits.push(commit));
    }

    /// Serve `bytes` for downloads of `url`.
    pub fn serve(&self, url: &str, bytes: Vec<u8>) {
        self.with_state(|s| {
            s.archives.insert(url.to_string(), bytes);
        });
    }

    /// Fail every metadata call with `error`.
    pub fn fail_metadata(&self, error: SourceError) {
        self.with_state(|s| s.metadata_error = Some(error));
    }

    /// Fail every download with `error`.
    pub fn fail_download(&self, error: SourceError) {
        self.with_state(|s| s.download_error = Some(error));
    }

    pub fn clear_failures(&self) {
        self.with_state(|s| {
            s.metadata_error = None;
            s.download_error = None;
        });
    }

    /// Number of download attempts so far.
    pub fn downloads(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }

    fn metadata_error(&self) -> Result<(), SourceError> {
        self.with_state(|s| s.metadata_error.clone()).map_or(Ok(()), Err)
    }

    fn with_url(repo: &RepoCoords, mut release: Release) -> Release {
        if release.zipball_url.is_none() {
            release.zipball_url = Some(format!("fake://{}/{}/release/{}", repo.owner, repo.name, release.tag_name));
        }
        release
    }
}

#[async_trait]
impl SourceProvider for FakeSource {
    async fn verify_repository(&self, _repo: &RepoCoords) -> Result<bool, SourceError> {
        match self.metadata_error() {
            Ok(()) => Ok(true),
            Err(SourceError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn latest_release(&self, repo: &RepoCoords) -> Result<Release, SourceError> {
        self.metadata_error()?;
        self.with_state(|s| {
            s.releases
                .iter()
                .rev()
                .find(|r| !r.draft && !r.prerelease)
                .cloned()
        })
        .map(|r| Self::with_url(repo, r))
        .ok_or_else(|| SourceError::not_found("latest release"))
    }

    async fn releases(&self, repo: &RepoCoords, limit: usize) -> Result<Vec<Release>, SourceError> {
        self.metadata_error()?;
        Ok(self.with_state(|s| {
            s.releases
                .iter()
                .rev()
                .take(limit)
                .cloned()
                .map(|r| Self::with_url(repo, r))
                .collect()
        }))
    }

    async fn latest_commit(&self, _repo: &RepoCoords, branch: &str) -> Result<Commit, SourceError> {
        self.metadata_error()?;
        self.with_state(|s| s.commits.last().cloned())
            .ok_or_else(|| SourceError::not_found(format!("branch {branch}")))
    }

    async fn recent_commits(
        &self,
        _repo: &RepoCoords,
        _branch: &str,
        limit: usize,
    ) -> Result<Vec<Commit>, SourceError> {
        self.metadata_error()?;
        Ok(self.with_state(|s| s.commits.iter().rev().take(limit).cloned().collect()))
    }

    async fn download_archive(&self, url: &str) -> Result<Vec<u8>, SourceError> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        self.with_state(|s| {
            if let Some(e) = &s.download_error {
                return Err(e.clone());
            }
            s.archives
                .get(url)
                .cloned()
                .ok_or_else(|| SourceError::not_found(format!("archive {url}")))
        })
    }

    fn archive_url(&self, repo: &RepoCoords, reference: &str) -> String {
        format!("fake://{}/{}/{}", repo.owner, repo.name, reference)
    }
}
