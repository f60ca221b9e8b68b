//! User configuration file.
//!
//! # Location
//!
//! - Unix/macOS: `~/.github-push/config.toml`
//! - Windows: `%LOCALAPPDATA%\github-push\config.toml`
//!
//! The location can be overridden with the `GITHUB_PUSH_CONFIG` environment
//! variable or the global `--config` flag.
//!
//! # Example
//!
//! ```toml
//! token = "github_pat_..."
//! webhook_secret = "s3cret"
//! log_level = "info"
//!
//! [paths]
//! plugins_dir = "/var/www/html/wp-content/plugins"
//! themes_dir = "/var/www/html/wp-content/themes"
//!
//! [scheduler]
//! enabled = true
//! interval_secs = 43200
//!
//! [server]
//! bind = "0.0.0.0:8787"
//! ```
//!
//! The file may hold a GitHub token, so it is written with `0600`
//! permissions on Unix.

use crate::constants::{DEFAULT_BIND_ADDR, DEFAULT_CHECK_INTERVAL_SECS};
use crate::core::ItemKind;
use crate::utils::atomic_write_async;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "GITHUB_PUSH_CONFIG";

/// Environment variable consulted when the file has no token.
pub const TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct SyncConfig {
    /// GitHub credential (fine-grained `github_pat_...` or classic `ghp_...`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Shared secret for webhook signatures. Empty or absent accepts unsigned deliveries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_secret: Option<String>,

    /// Default log filter when neither `RUST_LOG` nor `--verbose/--quiet` is given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

/// Filesystem locations.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct PathsConfig {
    /// Root directory plugins are installed under.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugins_dir: Option<PathBuf>,

    /// Root directory themes are installed under.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub themes_dir: Option<PathBuf>,

    /// Where pre-swap backups are written. Defaults to `<data>/backups`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_dir: Option<PathBuf>,

    /// Scratch space for downloads, extraction and lock files. Defaults to `<data>/tmp`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_dir: Option<PathBuf>,

    /// Registry document. Defaults to `<data>/repositories.json`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry: Option<PathBuf>,
}

/// Periodic update checks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Global auto-update switch. Off by default.
    #[serde(default)]
    pub enabled: bool,

    /// Seconds between scheduled runs.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: DEFAULT_CHECK_INTERVAL_SECS,
        }
    }
}

impl SchedulerConfig {
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

const fn default_interval_secs() -> u64 {
    DEFAULT_CHECK_INTERVAL_SECS
}

/// Webhook endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    DEFAULT_BIND_ADDR.to_string()
}

impl SyncConfig {
    /// Load from the default location, or defaults when the file is missing.
    pub async fn load() -> Result<Self> {
        Self::load_with_optional(None).await
    }

    /// Load from `path` if given, else from [`SyncConfig::default_path`].
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => Self::default_path()?,
        };
        if path.exists() {
            Self::load_from(&path).await
        } else {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            Ok(Self::default())
        }
    }

    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    pub async fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        atomic_write_async(path.to_path_buf(), content.into_bytes())
            .await
            .with_context(|| format!("Failed to write config to {}", path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            let mut perms = fs::metadata(path)
                .await
                .with_context(|| format!("Failed to read permissions for {}", path.display()))?
                .permissions();
            perms.set_mode(0o600);
            fs::set_permissions(path, perms).await.with_context(|| {
                format!("Failed to set secure permissions on {}", path.display())
            })?;
        }

        Ok(())
    }

    /// Config file location, honoring `GITHUB_PUSH_CONFIG`.
    pub fn default_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            if !path.is_empty() {
                return Ok(PathBuf::from(path));
            }
        }
        Ok(data_dir()?.join("config.toml"))
    }

    /// Token from the file, falling back to `GITHUB_TOKEN`. Empty strings count as unset.
    #[must_use]
    pub fn effective_token(&self) -> Option<String> {
        self.token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| std::env::var(TOKEN_ENV).ok().filter(|t| !t.trim().is_empty()))
    }

    /// Webhook secret, `None` when absent or empty.
    #[must_use]
    pub fn effective_webhook_secret(&self) -> Option<&str> {
        self.webhook_secret.as_deref().filter(|s| !s.is_empty())
    }

    /// Install root for `kind`.
    pub fn install_root(&self, kind: ItemKind) -> Result<PathBuf> {
        let (root, key) = match kind {
            ItemKind::Plugin => (&self.paths.plugins_dir, "plugins_dir"),
            ItemKind::Theme => (&self.paths.themes_dir, "themes_dir"),
        };
        root.clone().with_context(|| {
            format!("[paths].{key} is not configured; set it in the config file")
        })
    }

    pub fn backup_dir(&self) -> Result<PathBuf> {
        self.path_or_default(&self.paths.backup_dir, "backups")
    }

    pub fn work_dir(&self) -> Result<PathBuf> {
        self.path_or_default(&self.paths.work_dir, "tmp")
    }

    pub fn registry_path(&self) -> Result<PathBuf> {
        self.path_or_default(&self.paths.registry, "repositories.json")
    }

    fn path_or_default(&self, value: &Option<PathBuf>, default_name: &str) -> Result<PathBuf> {
        match value {
            Some(path) => Ok(path.clone()),
            None => Ok(data_dir()?.join(default_name)),
        }
    }
}

/// Directory holding the config file, registry, backups and scratch space.
pub fn data_dir() -> Result<PathBuf> {
    let dir = if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .ok_or_else(|| anyhow::anyhow!("Unable to determine local data directory"))?
            .join("github-push")
    } else {
        dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
            .join(".github-push")
    };
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_config_defaults() {
        let config = SyncConfig::default();
        assert!(!config.scheduler.enabled);
        assert_eq!(config.scheduler.interval_secs, DEFAULT_CHECK_INTERVAL_SECS);
        assert_eq!(config.server.bind, DEFAULT_BIND_ADDR);
        assert!(config.effective_webhook_secret().is_none());
    }

    #[tokio::test]
    async fn test_config_save_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");

        let mut config = SyncConfig::default();
        config.token = Some("ghp_example".to_string());
        config.webhook_secret = Some("secret".to_string());
        config.paths.plugins_dir = Some(temp.path().join("plugins"));
        config.scheduler.enabled = true;

        config.save_to(&path).await.unwrap();
        let loaded = SyncConfig::load_from(&path).await.unwrap();
        assert_eq!(loaded, config);
    }

    #[tokio::test]
    async fn test_partial_file_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[paths]\nthemes_dir = \"/srv/wp/themes\"\n").unwrap();

        let config = SyncConfig::load_from(&path).await.unwrap();
        assert_eq!(config.install_root(ItemKind::Theme).unwrap(), PathBuf::from("/srv/wp/themes"));
        assert!(config.install_root(ItemKind::Plugin).is_err());
        assert_eq!(config.scheduler.interval_secs, DEFAULT_CHECK_INTERVAL_SECS);
    }

    #[tokio::test]
    async fn test_missing_file_gives_defaults() {
        let temp = TempDir::new().unwrap();
        let config =
            SyncConfig::load_with_optional(Some(temp.path().join("absent.toml"))).await.unwrap();
        assert_eq!(config, SyncConfig::default());
    }

    #[test]
    fn test_empty_secret_is_unset() {
        let config = SyncConfig {
            webhook_secret: Some(String::new()),
            ..SyncConfig::default()
        };
        assert!(config.effective_webhook_secret().is_none());
    }

    #[test]
    #[serial]
    fn test_token_falls_back_to_env() {
        let config = SyncConfig::default();
        unsafe { std::env::set_var(TOKEN_ENV, "ghp_from_env") };
        assert_eq!(config.effective_token().as_deref(), Some("ghp_from_env"));
        unsafe { std::env::remove_var(TOKEN_ENV) };

        let config = SyncConfig {
            token: Some("github_pat_file".to_string()),
            ..SyncConfig::default()
        };
        assert_eq!(config.effective_token().as_deref(), Some("github_pat_file"));
    }

    #[test]
    #[serial]
    fn test_default_path_env_override() {
        unsafe { std::env::set_var(CONFIG_ENV, "/tmp/custom-github-push.toml") };
        assert_eq!(
            SyncConfig::default_path().unwrap(),
            PathBuf::from("/tmp/custom-github-push.toml")
        );
        unsafe { std::env::remove_var(CONFIG_ENV) };
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_config_file_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        SyncConfig::default().save_to(&path).await.unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600, "Config file should have 600 permissions");
    }
}
