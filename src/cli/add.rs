//! Track a new repository.

use super::common::{CommandContext, tracking_label};
use crate::core::{ItemKind, NewTrackedItem, RepoCoords};
use anyhow::{Context, Result, bail};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

#[derive(Args)]
pub struct AddCommand {
    /// Repository owner (user or organization)
    #[arg(long)]
    owner: String,

    /// Repository name
    #[arg(long)]
    repo: String,

    /// Branch to track (default: main)
    #[arg(long)]
    branch: Option<String>,

    /// Artifact kind
    #[arg(long, default_value = "plugin")]
    kind: ItemKind,

    /// Install directory, absolute or relative to the kind's root
    #[arg(long)]
    path: PathBuf,

    /// Artifact slug (default: last component of the path)
    #[arg(long)]
    slug: Option<String>,

    /// Track the latest release instead of the branch head
    #[arg(long)]
    releases: bool,

    /// Allow webhook and scheduled updates
    #[arg(long)]
    auto_update: bool,

    /// Register without checking that the repository exists
    #[arg(long)]
    skip_verify: bool,
}

impl AddCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let repo = RepoCoords::new(self.owner, self.repo);

        if !self.skip_verify {
            let exists = ctx
                .pipeline
                .source()
                .verify_repository(&repo)
                .await
                .with_context(|| format!("Failed to verify {repo}"))?;
            if !exists {
                bail!("Repository {repo} not found or not accessible with the configured token");
            }
        }

        let item = ctx
            .registry()
            .add(NewTrackedItem {
                repo,
                branch: self.branch,
                use_releases: self.releases,
                kind: self.kind,
                install_path: self.path,
                slug: self.slug,
                auto_update: self.auto_update,
            })
            .await?;

        println!("{} {} as #{}", "Added".green().bold(), item.repo, item.id);
        println!("  {:<12} {}", "kind:", item.kind);
        println!("  {:<12} {}", "tracking:", tracking_label(&item));
        println!("  {:<12} {}", "path:", item.install_path.display());
        println!("  {:<12} {}", "auto-update:", if item.auto_update { "on" } else { "off" });
        Ok(())
    }
}
