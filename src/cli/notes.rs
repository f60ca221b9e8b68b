use super::common::{CommandContext, item_heading};
use anyhow::Result;
use clap::Args;

#[derive(Args)]
pub struct NotesCommand {
    /// Item id
    id: u64,
}

impl NotesCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let item = ctx.item(self.id).await?;
        let notes = ctx.pipeline.release_notes(self.id).await?;
        println!("{}\n", item_heading(&item));
        println!("{notes}");
        Ok(())
    }
}
