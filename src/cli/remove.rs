//! Stop tracking a repository. Installed files stay where they are.

use super::common::CommandContext;
use anyhow::Result;
use clap::Args;
use colored::Colorize;

#[derive(Args)]
pub struct RemoveCommand {
    /// Item id
    id: u64,
}

impl RemoveCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let item = ctx.item(self.id).await?;
        ctx.registry().delete(self.id).await?;

        println!("{} {} #{}", "Removed".yellow().bold(), item.repo, item.id);
        println!("  files left in place at {}", item.install_path.display());
        Ok(())
    }
}
