//! Webhook endpoint plus the periodic scheduler, until Ctrl-C.

use super::common::CommandContext;
use crate::scheduler::Scheduler;
use crate::webhook::{WebhookHandler, serve};
use anyhow::{Context, Result};
use clap::Args;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Args)]
pub struct ServeCommand {
    /// Address to listen on (default: `[server].bind`)
    #[arg(long)]
    bind: Option<String>,
}

impl ServeCommand {
    pub async fn execute(self, ctx: CommandContext) -> Result<()> {
        let bind = self.bind.unwrap_or_else(|| ctx.config.server.bind.clone());
        let addr: SocketAddr =
            bind.parse().with_context(|| format!("Invalid bind address '{bind}'"))?;

        let secret = ctx.config.effective_webhook_secret().map(ToString::to_string);
        if secret.is_none() {
            warn!("No webhook secret configured; unsigned deliveries will be accepted");
        }
        let handler = Arc::new(WebhookHandler::new(ctx.pipeline.clone(), secret));

        let scheduler = if ctx.config.scheduler.enabled {
            let interval = ctx.config.scheduler.interval();
            info!(interval_secs = interval.as_secs(), "Scheduler started");
            let scheduler = Scheduler::new(ctx.pipeline.clone(), true);
            Some(tokio::spawn(async move { scheduler.run(interval).await }))
        } else {
            info!("Scheduler disabled");
            None
        };

        let result = serve(addr, handler, async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutting down");
            }
        })
        .await;

        if let Some(task) = scheduler {
            task.abort();
        }
        result
    }
}
