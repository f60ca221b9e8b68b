//! One scheduled batch: check every auto-update item and update the stale ones.

use super::common::CommandContext;
use crate::scheduler::Scheduler;
use anyhow::{Result, bail};
use clap::Args;
use colored::Colorize;

#[derive(Args)]
pub struct CronCommand {
    /// Run even when `[scheduler].enabled` is off
    #[arg(long)]
    force: bool,
}

impl CronCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let enabled = self.force || ctx.config.scheduler.enabled;
        if !enabled {
            println!("Automatic updates are disabled; set [scheduler].enabled or pass --force.");
            return Ok(());
        }

        let report = Scheduler::new(ctx.pipeline.clone(), enabled).run_once().await;
        println!(
            "{} checked {}, updated {}, skipped {}, failed {}",
            "Batch complete:".bold(),
            report.checked,
            report.updated.len(),
            report.skipped.len(),
            report.failed.len()
        );
        for (id, reason) in &report.failed {
            println!("  {} #{id}: {reason}", "failed".red());
        }

        if report.has_failures() {
            bail!("{} item(s) failed during the batch", report.failed.len());
        }
        Ok(())
    }
}
