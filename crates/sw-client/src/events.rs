use sw_core::{JobId, JobRecord, Notification, QueueStatus};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::readiness::ReadinessStatus;

#[derive(Debug, Clone)]
pub enum AppEvent {
    Notify(Notification),

    JobCreated(JobRecord),
    JobUpdated(JobRecord),
    JobRemoved(JobId),
    QueueCleared {
        count: usize,
    },
    PausedChanged(bool),
    /// Backend queue totals changed.
    QueueStatus(QueueStatus),

    BatchProgress(BatchProgress),
    Readiness(ReadinessStatus),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchProgress {
    pub completed: usize,
    pub total: usize,
    pub percent: f32,
}

impl BatchProgress {
    pub fn new(completed: usize, total: usize) -> Self {
        let percent = if total == 0 {
            100.0
        } else {
            completed as f32 * 100.0 / total as f32
        };
        Self {
            completed,
            total,
            percent,
        }
    }
}

/// Cloneable handle onto the outcome channel shared by every component.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: UnboundedSender<AppEvent>,
}

impl EventSender {
    pub fn channel() -> (Self, UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn emit(&self, event: AppEvent) {
        // A closed receiver only means nobody is listening anymore.
        let _ = self.tx.send(event);
    }

    pub fn notify(&self, notification: Notification) {
        self.emit(AppEvent::Notify(notification));
    }

    pub fn success(&self, title: &str, message: impl Into<String>) {
        self.notify(Notification::success(title, message));
    }

    pub fn error(&self, title: &str, message: impl Into<String>) {
        self.notify(Notification::error(title, message));
    }

    pub fn info(&self, title: &str, message: impl Into<String>) {
        self.notify(Notification::info(title, message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_progress_percent() {
        assert_eq!(BatchProgress::new(1, 4).percent, 25.0);
        assert_eq!(BatchProgress::new(4, 4).percent, 100.0);
        assert_eq!(BatchProgress::new(0, 0).percent, 100.0);
    }

    #[test]
    fn emitting_without_receiver_is_harmless() {
        let (events, rx) = EventSender::channel();
        drop(rx);
        events.info("Queue", "nobody listens");
    }
}
