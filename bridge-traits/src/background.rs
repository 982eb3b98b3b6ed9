//! Scheduled Task Contract
//!
//! The host's job framework runs tasks with a cancellation signal and a
//! progress sink. Progress is reported on a 0–100 scale.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::error::Result;

/// When the host should run a task on its own
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskTrigger {
    /// Run at a fixed interval
    Interval(Duration),
    /// Run once after the host starts
    Startup,
}

/// Receives fractional progress (0.0–100.0) from a running task
pub trait ProgressSink: Send + Sync {
    fn report(&self, percent: f64);
}

impl<F> ProgressSink for F
where
    F: Fn(f64) + Send + Sync,
{
    fn report(&self, percent: f64) {
        self(percent)
    }
}

/// Progress sink that discards every report
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn report(&self, _percent: f64) {}
}

/// A task the host can schedule and run
///
/// # Example
///
/// ```ignore
/// let cancel = CancellationToken::new();
/// let progress: Arc<dyn ProgressSink> = Arc::new(|p: f64| println!("{p:.0}%"));
/// task.execute(cancel.clone(), progress).await?;
/// ```
#[async_trait]
pub trait ScheduledTask: Send + Sync {
    /// Human-readable task name
    fn name(&self) -> &str;

    /// Stable key used by the host to persist schedules
    fn key(&self) -> &str;

    fn category(&self) -> &str;

    fn description(&self) -> &str;

    /// Triggers registered when the host first sees the task
    fn default_triggers(&self) -> Vec<TaskTrigger> {
        Vec::new()
    }

    /// Run the task to completion or until `cancel` fires
    ///
    /// Returns `Ok(())` on cancellation as well; ordinary "no data"
    /// conditions are never errors.
    async fn execute(
        &self,
        cancel: CancellationToken,
        progress: Arc<dyn ProgressSink>,
    ) -> Result<()>;
}
