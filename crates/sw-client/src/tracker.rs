//! Periodic status refresh of active jobs.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::controller::QueueController;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackMode {
    /// Keep ticking until cancelled.
    Forever,
    /// Return once no job is pending, queued or processing.
    UntilIdle,
}

/// Refresh every active job each `interval`.
///
/// Returns `true` when the queue went idle (`TrackMode::UntilIdle`), `false`
/// when cancelled.
pub async fn run_status_tracker(
    controller: Arc<QueueController>,
    interval: Duration,
    mode: TrackMode,
    cancel: CancellationToken,
) -> bool {
    let mut ticks = 0u64;

    loop {
        if mode == TrackMode::UntilIdle && !controller.has_active().await {
            tracing::info!(ticks, "No active jobs left");
            return true;
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(ticks, "Status tracker stopped");
                return false;
            }
            _ = tokio::time::sleep(interval) => {}
        }

        ticks += 1;
        let counts = controller.counts().await;
        if counts.active > 0 {
            tracing::debug!(tick = ticks, active = counts.active, "Refreshing job status");
            controller.refresh_active().await;
        }
    }
}

pub fn spawn_status_tracker(
    controller: Arc<QueueController>,
    interval: Duration,
    mode: TrackMode,
) -> (CancellationToken, JoinHandle<bool>) {
    let cancel = CancellationToken::new();
    let task = tokio::spawn(run_status_tracker(controller, interval, mode, cancel.clone()));
    (cancel, task)
}
