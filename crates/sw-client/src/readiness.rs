//! Backend readiness polling.
//!
//! [`ReadinessPoller::run`] keeps asking the backend whether it can accept
//! work. A reachable-but-not-ready backend is polled at a fixed interval; a
//! transport failure backs off exponentially up to a cap and never gives up.
//! At most one query is in flight because the next one is only scheduled
//! after the previous one resolves.

use std::sync::Arc;
use std::time::Duration;

use sw_core::ReadinessSnapshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::backend::GenBackend;
use crate::events::{AppEvent, EventSender};

pub const CONNECTING_MESSAGE: &str = "Connecting to backend...";
pub const NOT_RESPONDING_MESSAGE: &str =
    "Backend not responding. Make sure the server is running; still retrying...";

#[derive(Debug, Clone, PartialEq)]
pub struct ReadinessConfig {
    /// Delay between polls while the backend answers but is not ready.
    pub poll_interval: Duration,
    /// Pause between the final status message and the ready signal.
    pub grace_delay: Duration,
    pub backoff_base: Duration,
    pub backoff_multiplier: f64,
    pub backoff_max: Duration,
    /// Retry count from which failures are reported as "not responding".
    pub not_responding_after: u32,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            grace_delay: Duration::from_millis(500),
            backoff_base: Duration::from_secs(1),
            backoff_multiplier: 1.5,
            backoff_max: Duration::from_secs(10),
            not_responding_after: 5,
        }
    }
}

/// Delay after the `retry_count`-th consecutive transport failure:
/// `min(base * multiplier^retry_count, max)`.
pub fn backoff_delay(retry_count: u32, config: &ReadinessConfig) -> Duration {
    let exponent = i32::try_from(retry_count).unwrap_or(i32::MAX);
    let secs = config.backoff_base.as_secs_f64() * config.backoff_multiplier.powi(exponent);

    if !secs.is_finite() || secs >= config.backoff_max.as_secs_f64() {
        config.backoff_max
    } else {
        Duration::from_secs_f64(secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessPhase {
    Connecting,
    Ready,
    Degraded,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReadinessStatus {
    pub phase: ReadinessPhase,
    pub message: String,
    pub retry_count: u32,
    /// Latest snapshot, when the backend answered at all.
    pub snapshot: Option<ReadinessSnapshot>,
}

pub struct ReadinessPoller {
    backend: Arc<dyn GenBackend>,
    config: ReadinessConfig,
    events: EventSender,
}

impl ReadinessPoller {
    pub fn new(backend: Arc<dyn GenBackend>, config: ReadinessConfig, events: EventSender) -> Self {
        Self {
            backend,
            config,
            events,
        }
    }

    /// Poll until the backend is ready or `cancel` fires.
    ///
    /// `on_ready` runs once, after the grace delay, and never after
    /// cancellation. Returns the ready snapshot, or `None` when cancelled.
    pub async fn run<F>(&self, cancel: &CancellationToken, on_ready: F) -> Option<ReadinessSnapshot>
    where
        F: FnOnce(&ReadinessSnapshot),
    {
        let mut retry_count = 0u32;

        loop {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return None,
                result = self.backend.fetch_readiness() => result,
            };

            let delay = match result {
                Ok(snapshot) if snapshot.ready => {
                    let message = if snapshot.status_message.is_empty() {
                        "Backend ready".to_string()
                    } else {
                        snapshot.status_message.clone()
                    };
                    self.publish(ReadinessPhase::Ready, message, 0, Some(snapshot.clone()));

                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return None,
                        _ = tokio::time::sleep(self.config.grace_delay) => {}
                    }

                    tracing::info!(
                        gpu = snapshot.gpu_info.as_ref().map(|gpu| gpu.name.as_str()),
                        "Backend ready",
                    );
                    on_ready(&snapshot);
                    return Some(snapshot);
                }
                Ok(snapshot) => {
                    retry_count = 0;
                    let message = not_ready_message(&snapshot);
                    tracing::debug!(message = %message, "Backend reachable but not ready");
                    self.publish(ReadinessPhase::Connecting, message, 0, Some(snapshot));
                    self.config.poll_interval
                }
                Err(e) => {
                    retry_count = retry_count.saturating_add(1);
                    let delay = backoff_delay(retry_count, &self.config);
                    tracing::warn!(
                        error = %e,
                        retry_count,
                        delay_ms = delay.as_millis() as u64,
                        "Readiness check failed",
                    );

                    if retry_count >= self.config.not_responding_after {
                        self.publish(
                            ReadinessPhase::Degraded,
                            NOT_RESPONDING_MESSAGE.to_string(),
                            retry_count,
                            None,
                        );
                    } else {
                        self.publish(
                            ReadinessPhase::Connecting,
                            CONNECTING_MESSAGE.to_string(),
                            retry_count,
                            None,
                        );
                    }
                    delay
                }
            };

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return None,
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Run the poller on its own task.
    pub fn spawn<F>(self, on_ready: F) -> ReadinessHandle
    where
        F: FnOnce(&ReadinessSnapshot) + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let task = tokio::spawn(async move { self.run(&token, on_ready).await });

        ReadinessHandle { cancel, task }
    }

    fn publish(
        &self,
        phase: ReadinessPhase,
        message: String,
        retry_count: u32,
        snapshot: Option<ReadinessSnapshot>,
    ) {
        self.events.emit(AppEvent::Readiness(ReadinessStatus {
            phase,
            message,
            retry_count,
            snapshot,
        }));
    }
}

fn not_ready_message(snapshot: &ReadinessSnapshot) -> String {
    if !snapshot.status_message.is_empty() {
        return snapshot.status_message.clone();
    }
    let pending = snapshot.components.pending();
    if pending.is_empty() {
        "Backend starting...".to_string()
    } else {
        format!("Waiting for {}", pending.join(", "))
    }
}

/// Handle onto a spawned poller.
pub struct ReadinessHandle {
    cancel: CancellationToken,
    task: JoinHandle<Option<ReadinessSnapshot>>,
}

impl ReadinessHandle {
    /// Stop polling. Any scheduled poll and the ready callback are dropped.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the poller to finish; `None` if it was stopped.
    pub async fn wait(self) -> Option<ReadinessSnapshot> {
        match self.task.await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::error!(error = %e, "Readiness task failed");
                None
            }
        }
    }
}
