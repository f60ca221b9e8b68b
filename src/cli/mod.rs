//! Command-line interface for github-push.
//!
//! Each command lives in its own module with a clap `Args` struct and an
//! `execute` method. [`Cli::execute`] loads the configuration, installs the
//! log subscriber and dispatches to the selected command.
//!
//! # Commands
//!
//! ## Registry
//! - `add` - Track a repository as a plugin or theme
//! - `edit` - Change fields of a tracked repository
//! - `remove` - Stop tracking a repository (installed files are kept)
//! - `list` - Show tracked repositories and their installed versions
//!
//! ## Pipeline
//! - `install` - Install the latest or an explicit version
//! - `update` - Replace an installed artifact with the latest version
//! - `rollback` - Install an explicit tag or commit
//! - `versions` - List versions available for rollback
//! - `check` - Compare installed and upstream versions
//! - `notes` - Show release notes or the head commit message
//!
//! ## Automation
//! - `cron` - Run one scheduled batch
//! - `serve` - Webhook endpoint plus periodic scheduler
//! - `test-connection` - Verify the configured GitHub token
//!
//! # Global Options
//!
//! - `--verbose` - Debug logging
//! - `--quiet` - Warnings and errors only
//! - `--config` - Path to the config file (also `GITHUB_PUSH_CONFIG`)
//!
//! `RUST_LOG` overrides both flags and the configured `log_level`.
//!
//! # Example
//!
//! ```bash
//! github-push add --owner acme --repo widget --path widget --releases --auto-update
//! github-push install 1
//! github-push check
//! github-push rollback 1 v1.4.0
//! ```

mod add;
mod check;
pub mod common;
mod cron;
mod edit;
mod install;
mod list;
mod notes;
mod remove;
mod rollback;
mod serve;
mod test_connection;
mod update;
mod versions;

use crate::config::SyncConfig;
use anyhow::Result;
use clap::{Parser, Subcommand};
use common::CommandContext;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "github-push",
    about = "Keep WordPress plugins and themes in sync with GitHub repositories",
    version,
    author,
    long_about = "github-push installs, updates and rolls back WordPress plugins and themes from GitHub \
                  releases or branches, swapping files atomically with a backup for every change."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Track a repository
    Add(add::AddCommand),

    /// Edit a tracked repository
    Edit(edit::EditCommand),

    /// Stop tracking a repository
    Remove(remove::RemoveCommand),

    /// List tracked repositories
    List(list::ListCommand),

    /// Install the latest or an explicit version
    Install(install::InstallCommand),

    /// Update an installed artifact to the latest version
    Update(update::UpdateCommand),

    /// Install an explicit tag or commit
    Rollback(rollback::RollbackCommand),

    /// List versions available for rollback
    Versions(versions::VersionsCommand),

    /// Check for updates
    Check(check::CheckCommand),

    /// Show release notes for the upstream version
    Notes(notes::NotesCommand),

    /// Run one scheduled update batch
    Cron(cron::CronCommand),

    /// Run the webhook endpoint and the periodic scheduler
    Serve(serve::ServeCommand),

    /// Verify the configured GitHub token
    TestConnection(test_connection::TestConnectionCommand),
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let config = SyncConfig::load_with_optional(self.config.clone()).await?;
        self.init_logging(config.log_level.as_deref());

        let ctx = CommandContext::from_config(config).await?;
        match self.command {
            Commands::Add(cmd) => cmd.execute(&ctx).await,
            Commands::Edit(cmd) => cmd.execute(&ctx).await,
            Commands::Remove(cmd) => cmd.execute(&ctx).await,
            Commands::List(cmd) => cmd.execute(&ctx).await,
            Commands::Install(cmd) => cmd.execute(&ctx).await,
            Commands::Update(cmd) => cmd.execute(&ctx).await,
            Commands::Rollback(cmd) => cmd.execute(&ctx).await,
            Commands::Versions(cmd) => cmd.execute(&ctx).await,
            Commands::Check(cmd) => cmd.execute(&ctx).await,
            Commands::Notes(cmd) => cmd.execute(&ctx).await,
            Commands::Cron(cmd) => cmd.execute(&ctx).await,
            Commands::Serve(cmd) => cmd.execute(ctx).await,
            Commands::TestConnection(cmd) => cmd.execute(&ctx).await,
        }
    }

    /// Level used when `RUST_LOG` is unset.
    fn default_level<'a>(&self, configured: Option<&'a str>) -> &'a str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "warn"
        } else {
            configured.filter(|level| !level.is_empty()).unwrap_or("info")
        }
    }

    fn init_logging(&self, configured: Option<&str>) {
        let level = self.default_level(configured);
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

        // A subscriber may already be installed when embedded in tests.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }
}
