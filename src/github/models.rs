//! Subset of the GitHub REST API payloads used by the pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A published release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub prerelease: bool,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub zipball_url: Option<String>,
    #[serde(default)]
    pub target_commitish: Option<String>,
}

impl Release {
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into(),
            name: None,
            body: None,
            published_at: None,
            prerelease: false,
            draft: false,
            zipball_url: None,
            target_commitish: None,
        }
    }
}

/// A commit as returned by `/repos/{o}/{r}/commits`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub sha: String,
    pub commit: CommitDetail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitDetail {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub author: Option<CommitSignature>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitSignature {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

impl Commit {
    pub fn new(sha: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            sha: sha.into(),
            commit: CommitDetail {
                message: message.into(),
                author: None,
            },
        }
    }

    /// First line of the commit message.
    #[must_use]
    pub fn summary(&self) -> &str {
        self.commit.message.lines().next().unwrap_or_default()
    }

    #[must_use]
    pub fn date(&self) -> Option<DateTime<Utc>> {
        self.commit.author.as_ref().and_then(|a| a.date)
    }
}

/// `/repos/{o}/{r}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryInfo {
    pub full_name: String,
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub private: bool,
}

/// `/user`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub login: String,
    #[serde(default, rename = "type")]
    pub account_type: Option<String>,
}
