//! GitHub webhook trigger.
//!
//! A delivery is verified ([`signature`]), decoded ([`events`]) and
//! dispatched to every matching item through [`Pipeline::update`]. Per-item
//! failures, including an item already being updated, are only logged:
//! GitHub gets a success response whenever the delivery itself was valid.

pub mod events;
pub mod server;
pub mod signature;

pub use events::{InvalidPayload, WebhookEvent, parse_payload};
pub use server::{router, serve};
pub use signature::{SignatureError, sign, verify};

use crate::core::SyncError;
use crate::updater::Pipeline;
use std::sync::Arc;
use tracing::{error, info};

/// What a delivery did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    /// Items updated successfully.
    pub updated: Vec<u64>,
    /// Items whose update failed, with the error message.
    pub failed: Vec<(u64, String)>,
    /// Items of the same repository skipped (auto-update off, other branch or mode).
    pub skipped: Vec<u64>,
}

/// Verifies and dispatches webhook deliveries.
pub struct WebhookHandler {
    pipeline: Arc<Pipeline>,
    secret: Option<String>,
}

impl WebhookHandler {
    pub fn new(pipeline: Arc<Pipeline>, secret: Option<String>) -> Self {
        Self {
            pipeline,
            secret: secret.filter(|s| !s.is_empty()),
        }
    }

    pub fn verify(&self, signature: Option<&str>, body: &[u8]) -> Result<(), SignatureError> {
        signature::verify(self.secret.as_deref(), signature, body)
    }

    /// Run the pipeline for every item `event` applies to.
    pub async fn dispatch(&self, event: &WebhookEvent) -> Result<DispatchReport, SyncError> {
        let mut report = DispatchReport::default();

        for item in self.pipeline.registry().get_all().await? {
            if !event.concerns(&item) {
                continue;
            }
            if !event.matches(&item) {
                info!(item_id = item.id, repo = %item.repo, "Webhook does not apply to item, skipping");
                report.skipped.push(item.id);
                continue;
            }

            info!(item_id = item.id, repo = %item.repo, "Webhook triggered update");
            match self.pipeline.update(item.id).await {
                Ok(outcome) => {
                    info!(item_id = item.id, version = %outcome.display, "Webhook update finished");
                    report.updated.push(item.id);
                }
                Err(e) => {
                    error!(item_id = item.id, repo = %item.repo, error = %e, "Webhook update failed");
                    report.failed.push((item.id, e.to_string()));
                }
            }
        }

        Ok(report)
    }
}
