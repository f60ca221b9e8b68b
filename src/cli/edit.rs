//! Edit fields of a tracked repository.

use super::common::{CommandContext, item_heading, tracking_label};
use crate::core::{ItemKind, TrackedItemPatch};
use anyhow::{Result, bail};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

#[derive(Args)]
pub struct EditCommand {
    /// Item id
    id: u64,

    #[arg(long)]
    owner: Option<String>,

    #[arg(long)]
    repo: Option<String>,

    #[arg(long)]
    branch: Option<String>,

    #[arg(long)]
    kind: Option<ItemKind>,

    #[arg(long)]
    path: Option<PathBuf>,

    #[arg(long)]
    slug: Option<String>,

    /// Track releases (true) or the branch head (false)
    #[arg(long)]
    releases: Option<bool>,

    #[arg(long)]
    auto_update: Option<bool>,
}

impl EditCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let patch = TrackedItemPatch {
            owner: self.owner,
            name: self.repo,
            branch: self.branch,
            use_releases: self.releases,
            kind: self.kind,
            install_path: self.path,
            slug: self.slug,
            auto_update: self.auto_update,
            ..TrackedItemPatch::default()
        };
        if patch.is_empty() {
            bail!("Nothing to change; pass at least one field to edit");
        }

        let item = ctx.registry().update(self.id, patch).await?;
        println!("{} {}", "Updated".green().bold(), item_heading(&item));
        println!("  {:<12} {}", "tracking:", tracking_label(&item));
        println!("  {:<12} {}", "path:", item.install_path.display());
        Ok(())
    }
}
