//! Scheduled task registration for the host's job framework.

use std::sync::Arc;

use async_trait::async_trait;
use bridge_traits::background::{ProgressSink, ScheduledTask, TaskTrigger};
use bridge_traits::error::{BridgeError, Result};
use core_sync::{FavoritesSync, SyncOutcome};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub const TASK_NAME: &str = "Import Loved Tracks";
pub const TASK_KEY: &str = "ImportLovedTracks";
pub const TASK_CATEGORY: &str = "Scrobbling";
const TASK_DESCRIPTION: &str =
    "Marks songs in the library as favorites when they are loved on the scrobble service";

/// Runs a favorites sync pass each time the host triggers it.
///
/// Cancellation completes the task normally; any other failure is reported to
/// the host as `BridgeError::OperationFailed`.
pub struct ImportLovedTracksTask {
    sync: Arc<FavoritesSync>,
}

impl ImportLovedTracksTask {
    pub fn new(sync: Arc<FavoritesSync>) -> Self {
        Self { sync }
    }
}

#[async_trait]
impl ScheduledTask for ImportLovedTracksTask {
    fn name(&self) -> &str {
        TASK_NAME
    }

    fn key(&self) -> &str {
        TASK_KEY
    }

    fn category(&self) -> &str {
        TASK_CATEGORY
    }

    fn description(&self) -> &str {
        TASK_DESCRIPTION
    }

    fn default_triggers(&self) -> Vec<TaskTrigger> {
        Vec::new()
    }

    async fn execute(
        &self,
        cancel: CancellationToken,
        progress: Arc<dyn ProgressSink>,
    ) -> Result<()> {
        match self.sync.run(&cancel, progress.as_ref()).await {
            Ok(SyncOutcome::Completed(report)) => {
                info!(
                    job_id = %report.job_id,
                    matched = report.tracks_matched(),
                    "Import task finished"
                );
                Ok(())
            }
            Ok(SyncOutcome::Cancelled(report)) => {
                info!(job_id = %report.job_id, "Import task cancelled");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Import task failed");
                Err(BridgeError::OperationFailed(e.to_string()))
            }
        }
    }
}
