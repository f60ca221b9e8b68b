//! Tracked item model.
//!
//! A [`TrackedItem`] is one WordPress plugin or theme whose installed files are
//! kept in sync with a GitHub repository. Items are created through the
//! registry's add operation, edited field by field through a
//! [`TrackedItemPatch`], and carry a version cursor (`last_known_version`,
//! `last_checked`) that only the update pipeline moves.
//!
//! # Examples
//!
//! ```rust
//! use github_push::core::ItemKind;
//!
//! let kind: ItemKind = "theme".parse().unwrap();
//! assert_eq!(kind, ItemKind::Theme);
//! assert_eq!(kind.to_string(), "theme");
//! assert_eq!(ItemKind::Plugin.manifest_header(), "Plugin Name");
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// The kind of artifact a tracked repository installs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// A plugin, identified by a PHP file carrying a `Plugin Name:` header.
    #[default]
    Plugin,

    /// A theme, identified by `style.css` carrying a `Theme Name:` header.
    Theme,
}

impl ItemKind {
    /// Header field that marks the root of an artifact of this kind.
    #[must_use]
    pub fn manifest_header(&self) -> &'static str {
        match self {
            ItemKind::Plugin => "Plugin Name",
            ItemKind::Theme => "Theme Name",
        }
    }

    /// Human readable label used in messages ("Plugin" / "Theme").
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            ItemKind::Plugin => "Plugin",
            ItemKind::Theme => "Theme",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKind::Plugin => write!(f, "plugin"),
            ItemKind::Theme => write!(f, "theme"),
        }
    }
}

impl std::str::FromStr for ItemKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "plugin" | "plugins" => Ok(ItemKind::Plugin),
            "theme" | "themes" => Ok(ItemKind::Theme),
            other => Err(format!("unknown item kind '{other}' (expected 'plugin' or 'theme')")),
        }
    }
}

/// Owner/name pair identifying a GitHub repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoCoords {
    /// Repository owner (user or organization login).
    pub owner: String,
    /// Repository name.
    pub name: String,
}

impl RepoCoords {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Case-sensitive match against a webhook payload's owner and name.
    #[must_use]
    pub fn matches(&self, owner: &str, name: &str) -> bool {
        self.owner == owner && self.name == name
    }
}

impl fmt::Display for RepoCoords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// A registered plugin or theme synced from a GitHub repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedItem {
    /// Immutable numeric identity assigned by the registry.
    pub id: u64,
    /// Source repository.
    pub repo: RepoCoords,
    /// Tracked branch; ignored for version resolution when `use_releases` is set.
    pub branch: String,
    /// Track the latest published release instead of the branch head.
    #[serde(default)]
    pub use_releases: bool,
    /// Plugin or theme.
    #[serde(default)]
    pub kind: ItemKind,
    /// Absolute install directory, always inside the kind's root directory.
    pub install_path: PathBuf,
    /// Directory name of the artifact, used to find `{slug}.php`.
    pub slug: String,
    /// Whether webhook and scheduled triggers may install updates unattended.
    #[serde(default)]
    pub auto_update: bool,
    /// Commit SHA or tag of the last successful install.
    #[serde(default)]
    pub last_known_version: Option<String>,
    /// Time of the last upstream check, successful or not.
    #[serde(default)]
    pub last_checked: Option<DateTime<Utc>>,
    /// Registration time.
    pub created_at: DateTime<Utc>,
}

impl TrackedItem {
    /// Short display label, e.g. `#3 acme/widget (plugin)`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("#{} {} ({})", self.id, self.repo, self.kind)
    }

    /// Whether the upstream version comes from releases rather than a branch.
    #[must_use]
    pub fn tracks_releases(&self) -> bool {
        self.use_releases
    }
}

/// Fields supplied when registering a new item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTrackedItem {
    pub repo: RepoCoords,
    pub branch: Option<String>,
    pub use_releases: bool,
    pub kind: ItemKind,
    /// Absolute, or relative to the kind's root directory.
    pub install_path: PathBuf,
    /// Defaults to the final component of the install path.
    pub slug: Option<String>,
    pub auto_update: bool,
}

/// Partial update of a tracked item. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackedItemPatch {
    pub owner: Option<String>,
    pub name: Option<String>,
    pub branch: Option<String>,
    pub use_releases: Option<bool>,
    pub kind: Option<ItemKind>,
    pub install_path: Option<PathBuf>,
    pub slug: Option<String>,
    pub auto_update: Option<bool>,
    pub last_known_version: Option<String>,
    pub last_checked: Option<DateTime<Utc>>,
}

impl TrackedItemPatch {
    /// Patch that only records an upstream check.
    #[must_use]
    pub fn checked_at(when: DateTime<Utc>) -> Self {
        Self {
            last_checked: Some(when),
            ..Self::default()
        }
    }

    /// Patch that moves the version cursor after a confirmed install.
    #[must_use]
    pub fn installed(version: impl Into<String>, when: DateTime<Utc>) -> Self {
        Self {
            last_known_version: Some(version.into()),
            last_checked: Some(when),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
