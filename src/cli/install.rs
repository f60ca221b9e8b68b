//! Install the latest upstream version, or an explicit tag or commit.

use super::common::{CommandContext, item_heading};
use crate::updater::InstallOutcome;
use anyhow::Result;
use clap::Args;
use colored::Colorize;

#[derive(Args)]
pub struct InstallCommand {
    /// Item id
    id: u64,

    /// Tag or commit SHA to install instead of the latest version
    #[arg(long)]
    version: Option<String>,
}

impl InstallCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let outcome = ctx.pipeline.install(self.id, self.version.as_deref()).await?;
        print_outcome(if outcome.replaced { "Reinstalled" } else { "Installed" }, &outcome);
        Ok(())
    }
}

/// Summary shared by install, update and rollback.
pub(super) fn print_outcome(verb: &str, outcome: &InstallOutcome) {
    println!("{} {} at {}", verb.green().bold(), item_heading(&outcome.item), outcome.display.cyan());
    println!("  {:<10} {}", "path:", outcome.item.install_path.display());
    println!("  {:<10} {}", "archive:", outcome.checksum.dimmed());
}
