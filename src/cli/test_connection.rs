use super::common::CommandContext;
use crate::github::Credentials;
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

#[derive(Args)]
pub struct TestConnectionCommand {}

impl TestConnectionCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let login = ctx.client.test_connection().await.context("GitHub connection test failed")?;

        let token = ctx.config.effective_token().map(Credentials::new);
        println!("{} authenticated as {}", "Connected:".green().bold(), login.bold());
        if let Some(credentials) = token {
            println!("  {:<8} {} ({})", "token:", credentials.masked(), credentials.kind());
        }
        Ok(())
    }
}
