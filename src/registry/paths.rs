//! Install path and repository name validation.
//!
//! Install paths are checked twice. `.` and `..` are first folded lexically,
//! so a path that does not exist yet (a fresh install) is accepted on its
//! shape. The deepest existing ancestor is then canonicalized and compared
//! with the canonical root, so a symlink under the root cannot point the
//! install somewhere else.

use crate::core::{ItemKind, SyncError};
use std::path::{Component, Path, PathBuf};

/// The two directories items may be installed under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRoots {
    pub plugins: PathBuf,
    pub themes: PathBuf,
}

impl InstallRoots {
    pub fn new(plugins: impl Into<PathBuf>, themes: impl Into<PathBuf>) -> Self {
        Self {
            plugins: plugins.into(),
            themes: themes.into(),
        }
    }

    #[must_use]
    pub fn root_for(&self, kind: ItemKind) -> &Path {
        match kind {
            ItemKind::Plugin => &self.plugins,
            ItemKind::Theme => &self.themes,
        }
    }

    /// Resolve `path` for `kind` and check it is a strict descendant of the root.
    ///
    /// Relative paths are joined onto the root. The returned path is the
    /// normalized absolute form that gets stored.
    pub fn validate(&self, kind: ItemKind, path: &Path) -> Result<PathBuf, SyncError> {
        let root = normalize(self.root_for(kind));
        let joined = if path.is_absolute() { path.to_path_buf() } else { root.join(path) };

        let normalized = normalize_checked(&joined).ok_or_else(|| SyncError::InvalidInstallPath {
            path: path.to_path_buf(),
            reason: "path escapes the filesystem root".to_string(),
        })?;

        if normalized == root || !normalized.starts_with(&root) {
            return Err(SyncError::InvalidInstallPath {
                path: path.to_path_buf(),
                reason: format!("must be inside the {kind}s directory {}", root.display()),
            });
        }

        check_resolved(&root, &normalized).map_err(|reason| SyncError::InvalidInstallPath {
            path: path.to_path_buf(),
            reason,
        })?;

        Ok(normalized)
    }
}

/// Follow symlinks in the existing part of `candidate` and require the result
/// to stay a strict descendant of the canonical `root`.
fn check_resolved(root: &Path, candidate: &Path) -> Result<(), String> {
    let canonical_root = match root.canonicalize() {
        Ok(resolved) => resolved,
        // Nothing under a missing root can be a symlink.
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(format!("cannot resolve {}: {e}", root.display())),
    };

    let mut existing = candidate;
    let mut missing = Vec::new();
    while existing.symlink_metadata().is_err() {
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            _ => return Ok(()),
        }
    }

    let mut resolved = existing
        .canonicalize()
        .map_err(|e| format!("cannot resolve {}: {e}", existing.display()))?;
    resolved.extend(missing.iter().rev());

    if resolved == canonical_root || !resolved.starts_with(&canonical_root) {
        return Err(format!(
            "resolves to {}, outside {}",
            resolved.display(),
            canonical_root.display()
        ));
    }
    Ok(())
}

/// Fold `.` and `..` lexically. Returns `None` when `..` climbs above the start.
fn normalize_checked(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    let mut depth = 0usize;
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if depth == 0 {
                    return None;
                }
                out.pop();
                depth -= 1;
            }
            Component::Normal(part) => {
                out.push(part);
                depth += 1;
            }
        }
    }
    Some(out)
}

fn normalize(path: &Path) -> PathBuf {
    normalize_checked(path).unwrap_or_else(|| path.to_path_buf())
}

/// Owner and repository names: letters, digits, `_`, `.` and `-`.
pub fn validate_repo_component(field: &str, value: &str) -> Result<(), SyncError> {
    let valid = !value.is_empty()
        && value.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
    if valid {
        Ok(())
    } else {
        Err(SyncError::InvalidRepository {
            field: field.to_string(),
            value: value.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roots() -> InstallRoots {
        InstallRoots::new("/srv/wp/wp-content/plugins", "/srv/wp/wp-content/themes")
    }

    #[test]
    fn test_relative_path_is_joined_to_root() {
        let path = roots().validate(ItemKind::Plugin, Path::new("widget")).unwrap();
        assert_eq!(path, PathBuf::from("/srv/wp/wp-content/plugins/widget"));
    }

    #[test]
    fn test_absolute_path_inside_root() {
        let path = roots()
            .validate(ItemKind::Theme, Path::new("/srv/wp/wp-content/themes/./twenty"))
            .unwrap();
        assert_eq!(path, PathBuf::from("/srv/wp/wp-content/themes/twenty"));
    }

    #[test]
    fn test_rejects_root_itself_and_escapes() {
        let roots = roots();
        assert!(roots.validate(ItemKind::Plugin, Path::new("/srv/wp/wp-content/plugins")).is_err());
        assert!(roots.validate(ItemKind::Plugin, Path::new("../themes/x")).is_err());
        assert!(roots.validate(ItemKind::Plugin, Path::new("widget/../../x")).is_err());
        assert!(roots.validate(ItemKind::Plugin, Path::new("/etc/passwd")).is_err());
    }

    #[test]
    fn test_kind_selects_root() {
        let err = roots()
            .validate(ItemKind::Theme, Path::new("/srv/wp/wp-content/plugins/widget"))
            .unwrap_err();
        assert!(matches!(err, SyncError::InvalidInstallPath { .. }));
    }

    #[test]
    fn test_sibling_prefix_is_not_descendant() {
        assert!(roots()
            .validate(ItemKind::Plugin, Path::new("/srv/wp/wp-content/plugins-old/widget"))
            .is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_out_of_root_is_rejected() {
        let temp = tempfile::TempDir::new().unwrap();
        let plugins = temp.path().join("plugins");
        std::fs::create_dir_all(&plugins).unwrap();
        std::fs::create_dir_all(temp.path().join("outside")).unwrap();
        std::os::unix::fs::symlink("../outside", plugins.join("link")).unwrap();
        std::os::unix::fs::symlink("../missing", plugins.join("dangling")).unwrap();
        let roots = InstallRoots::new(&plugins, temp.path().join("themes"));

        let err = roots.validate(ItemKind::Plugin, Path::new("link/victim")).unwrap_err();
        assert!(matches!(err, SyncError::InvalidInstallPath { .. }));
        assert!(roots.validate(ItemKind::Plugin, Path::new("link")).is_err());
        assert!(roots.validate(ItemKind::Plugin, Path::new("dangling/victim")).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_within_root_is_accepted() {
        let temp = tempfile::TempDir::new().unwrap();
        let plugins = temp.path().join("plugins");
        std::fs::create_dir_all(plugins.join("real")).unwrap();
        std::os::unix::fs::symlink("real", plugins.join("alias")).unwrap();
        let roots = InstallRoots::new(&plugins, temp.path().join("themes"));

        let path = roots.validate(ItemKind::Plugin, Path::new("alias/widget")).unwrap();
        assert_eq!(path, plugins.join("alias").join("widget"));
        assert!(roots.validate(ItemKind::Plugin, Path::new("fresh/widget")).is_ok());
    }

    #[test]
    fn test_repo_component_validation() {
        assert!(validate_repo_component("owner", "acme-corp_1.x").is_ok());
        assert!(validate_repo_component("owner", "").is_err());
        assert!(validate_repo_component("name", "widget/../x").is_err());
        assert!(validate_repo_component("name", "wid get").is_err());
    }
}
