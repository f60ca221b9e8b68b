//! Shared plumbing for commands: configuration, registry, source provider
//! and pipeline wired together from one [`SyncConfig`].

use crate::config::SyncConfig;
use crate::core::{ItemKind, TrackedItem};
use crate::github::GitHubClient;
use crate::registry::{FileRegistry, InstallRoots, Registry};
use crate::updater::Pipeline;
use anyhow::{Context, Result};
use colored::Colorize;
use std::sync::Arc;

/// Everything a command needs, built once per invocation.
pub struct CommandContext {
    pub config: SyncConfig,
    pub client: Arc<GitHubClient>,
    pub pipeline: Arc<Pipeline>,
}

impl CommandContext {
    pub async fn from_config(config: SyncConfig) -> Result<Self> {
        let roots = InstallRoots::new(
            config.install_root(ItemKind::Plugin)?,
            config.install_root(ItemKind::Theme)?,
        );
        let registry_path = config.registry_path()?;
        let registry = FileRegistry::open(&registry_path, roots)
            .await
            .with_context(|| format!("Failed to open registry at {}", registry_path.display()))?;

        let client = Arc::new(
            GitHubClient::new(config.effective_token()).context("Failed to create GitHub client")?,
        );

        let pipeline = Pipeline::builder(Arc::new(registry), client.clone())
            .work_dir(config.work_dir()?)
            .backup_dir(config.backup_dir()?)
            .build()
            .context("Failed to set up the update pipeline")?;

        Ok(Self {
            config,
            client,
            pipeline: Arc::new(pipeline),
        })
    }

    pub fn registry(&self) -> &Arc<dyn Registry> {
        self.pipeline.registry()
    }

    pub async fn item(&self, id: u64) -> Result<TrackedItem> {
        Ok(self.registry().get(id).await?)
    }
}

/// `acme/widget` in bold followed by the dimmed item id.
pub fn item_heading(item: &TrackedItem) -> String {
    format!("{} {}", item.repo.to_string().bold(), format!("#{}", item.id).dimmed())
}

/// `releases` or `branch <name>`.
pub fn tracking_label(item: &TrackedItem) -> String {
    if item.use_releases {
        "releases".to_string()
    } else {
        format!("branch {}", item.branch)
    }
}
