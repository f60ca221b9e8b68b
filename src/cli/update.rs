use super::common::CommandContext;
use super::install::print_outcome;
use anyhow::Result;
use clap::Args;

#[derive(Args)]
pub struct UpdateCommand {
    /// Item id
    id: u64,
}

impl UpdateCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let outcome = ctx.pipeline.update(self.id).await?;
        print_outcome("Updated", &outcome);
        Ok(())
    }
}
