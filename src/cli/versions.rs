//! Versions available for rollback: releases, or recent commits on the
//! tracked branch.

use super::common::{CommandContext, item_heading};
use crate::constants::DEFAULT_VERSION_LIST_LIMIT;
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

#[derive(Args)]
pub struct VersionsCommand {
    /// Item id
    id: u64,

    /// Number of versions to list (1-100)
    #[arg(long, default_value_t = DEFAULT_VERSION_LIST_LIMIT)]
    limit: usize,

    /// Print as JSON
    #[arg(long)]
    json: bool,
}

impl VersionsCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let item = ctx.item(self.id).await?;
        let versions = ctx.pipeline.available_versions(self.id, Some(self.limit)).await?;

        if self.json {
            let json = serde_json::to_string_pretty(&versions).context("Failed to serialize versions")?;
            println!("{json}");
            return Ok(());
        }

        println!("{}", item_heading(&item));
        if versions.is_empty() {
            println!("  no versions found");
            return Ok(());
        }

        let current = item.last_known_version.as_deref();
        for entry in &versions {
            let marker = if current.is_some_and(|c| c == entry.version || c.starts_with(&entry.version)) {
                "*".green().bold().to_string()
            } else {
                " ".to_string()
            };
            let date = entry.date.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default();
            let pre = if entry.is_prerelease { " (pre-release)".yellow().to_string() } else { String::new() };
            println!("{marker} {:<12} {:<10} {}{pre}", entry.version.cyan(), date, entry.name);
        }
        Ok(())
    }
}
