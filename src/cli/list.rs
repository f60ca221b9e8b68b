//! List tracked repositories with their installed state.

use super::common::{CommandContext, item_heading, tracking_label};
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

#[derive(Args)]
pub struct ListCommand {
    /// Print the registry as JSON
    #[arg(long)]
    json: bool,
}

impl ListCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let items = ctx.registry().get_all().await?;

        if self.json {
            let json = serde_json::to_string_pretty(&items).context("Failed to serialize registry")?;
            println!("{json}");
            return Ok(());
        }

        if items.is_empty() {
            println!("No repositories tracked. Use `github-push add` to register one.");
            return Ok(());
        }

        for item in &items {
            let installed = ctx.pipeline.inspect(item);
            let state = match &installed {
                Some(artifact) => {
                    format!("installed {}", artifact.version.as_deref().unwrap_or("(no version header)"))
                        .green()
                        .to_string()
                }
                None => "not installed".dimmed().to_string(),
            };

            println!("{} {} [{}]", item_heading(item), item.kind, state);
            println!("  {:<12} {}", "tracking:", tracking_label(item));
            println!("  {:<12} {}", "path:", item.install_path.display());
            println!("  {:<12} {}", "cursor:", item.last_known_version.as_deref().unwrap_or("-"));
            println!(
                "  {:<12} {}",
                "checked:",
                item.last_checked.map_or_else(|| "never".to_string(), |t| t.to_rfc3339())
            );
            println!("  {:<12} {}", "auto-update:", if item.auto_update { "on" } else { "off" });
        }
        Ok(())
    }
}
