//! Periodic update checks.
//!
//! A batch run walks every item with auto-update enabled, checks upstream and
//! updates stale items. One item's failure never stops the batch. The whole
//! scheduler is off unless `[scheduler] enabled = true`.

use crate::updater::{Pipeline, UpdateCheck};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Outcome of one batch run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchReport {
    /// Items whose upstream was checked.
    pub checked: usize,
    /// Items updated.
    pub updated: Vec<u64>,
    /// Items with auto-update disabled.
    pub skipped: Vec<u64>,
    /// Items whose check or update failed, with the reason.
    pub failed: Vec<(u64, String)>,
}

impl BatchReport {
    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

pub struct Scheduler {
    pipeline: Arc<Pipeline>,
    enabled: bool,
}

impl Scheduler {
    pub fn new(pipeline: Arc<Pipeline>, enabled: bool) -> Self {
        Self { pipeline, enabled }
    }

    /// Check every auto-update item once and update the stale ones.
    pub async fn run_once(&self) -> BatchReport {
        let mut report = BatchReport::default();
        if !self.enabled {
            debug!("Scheduled updates disabled, skipping batch");
            return report;
        }

        let items = match self.pipeline.registry().get_all().await {
            Ok(items) => items,
            Err(e) => {
                error!(error = %e, "Failed to load tracked repositories");
                return report;
            }
        };

        for item in items {
            if !item.auto_update {
                report.skipped.push(item.id);
                continue;
            }

            report.checked += 1;
            match self.pipeline.check_for_update(item.id).await {
                Ok(UpdateCheck::Available { latest, .. }) => {
                    info!(item_id = item.id, repo = %item.repo, latest = %latest.display, "Update available");
                    match self.pipeline.update(item.id).await {
                        Ok(_) => report.updated.push(item.id),
                        Err(e) => {
                            error!(item_id = item.id, repo = %item.repo, error = %e, "Scheduled update failed");
                            report.failed.push((item.id, e.to_string()));
                        }
                    }
                }
                Ok(UpdateCheck::Failed { reason }) => {
                    warn!(item_id = item.id, repo = %item.repo, %reason, "Scheduled check failed");
                    report.failed.push((item.id, reason));
                }
                Ok(UpdateCheck::UpToDate { .. }) => {}
                Err(e) => {
                    warn!(item_id = item.id, error = %e, "Scheduled check failed");
                    report.failed.push((item.id, e.to_string()));
                }
            }
        }

        info!(
            checked = report.checked,
            updated = report.updated.len(),
            failed = report.failed.len(),
            "Scheduled check finished"
        );
        report
    }

    /// Run [`run_once`](Self::run_once) every `interval`, forever.
    ///
    /// The first run happens one interval after start.
    pub async fn run(&self, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            ticker.tick().await;
            self.run_once().await;
        }
    }
}
