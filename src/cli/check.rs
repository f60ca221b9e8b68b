//! Compare installed and upstream versions for one item or all of them.

use super::common::{CommandContext, item_heading};
use crate::updater::UpdateCheck;
use anyhow::{Result, bail};
use clap::Args;
use colored::Colorize;

#[derive(Args)]
pub struct CheckCommand {
    /// Item id; all tracked items when omitted
    id: Option<u64>,
}

impl CheckCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let ids = match self.id {
            Some(id) => vec![id],
            None => ctx.registry().get_all().await?.into_iter().map(|item| item.id).collect(),
        };
        if ids.is_empty() {
            println!("No repositories tracked.");
            return Ok(());
        }

        let mut failed = 0usize;
        for id in ids {
            let check = ctx.pipeline.check_for_update(id).await?;
            let item = ctx.item(id).await?;
            let status = match &check {
                UpdateCheck::Available { .. } => check.to_string().yellow().bold(),
                UpdateCheck::UpToDate { .. } => check.to_string().green(),
                UpdateCheck::Failed { .. } => {
                    failed += 1;
                    check.to_string().red()
                }
            };
            println!("{}: {status}", item_heading(&item));
        }

        if failed > 0 {
            bail!("{failed} check(s) failed");
        }
        Ok(())
    }
}
