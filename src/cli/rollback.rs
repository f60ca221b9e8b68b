//! Install an explicit version. Strings of 7 to 40 hex digits are commits,
//! anything else is a tag.

use super::common::CommandContext;
use super::install::print_outcome;
use anyhow::Result;
use clap::Args;

#[derive(Args)]
pub struct RollbackCommand {
    /// Item id
    id: u64,

    /// Tag name or commit SHA
    version: String,
}

impl RollbackCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let outcome = ctx.pipeline.rollback(self.id, &self.version).await?;
        print_outcome("Rolled back", &outcome);
        Ok(())
    }
}
