//! Scripted in-memory backend for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use sw_core::{JobStatus, QueueStatus, ReadinessSnapshot, StatusReport};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::Instant;

use crate::backend::{ClearReceipt, GenBackend, SubmitReceipt, SubmitRequest};
use crate::error::RemoteError;
use crate::events::AppEvent;

type Scripted<T> = Mutex<VecDeque<Result<T, RemoteError>>>;

/// Replies are taken from per-operation scripts in order. Unscripted
/// readiness, status and queue status queries fail with a transport error; unscripted
/// submissions and actions succeed.
#[derive(Default)]
pub struct MockBackend {
    readiness: Scripted<ReadinessSnapshot>,
    readiness_calls: Mutex<Vec<Instant>>,
    submits: Scripted<SubmitReceipt>,
    submitted: Mutex<Vec<SubmitRequest>>,
    statuses: Mutex<HashMap<String, VecDeque<Result<StatusReport, RemoteError>>>>,
    actions: Scripted<String>,
    clears: Scripted<ClearReceipt>,
    queue_statuses: Scripted<QueueStatus>,
    calls: Mutex<Vec<String>>,
    next_id: AtomicUsize,
}

impl MockBackend {
    pub fn script_readiness(&self, replies: impl IntoIterator<Item = Result<ReadinessSnapshot, RemoteError>>) {
        self.readiness.lock().unwrap().extend(replies);
    }

    pub fn script_submits(&self, replies: impl IntoIterator<Item = Result<SubmitReceipt, RemoteError>>) {
        self.submits.lock().unwrap().extend(replies);
    }

    pub fn script_status(
        &self,
        job_id: &str,
        replies: impl IntoIterator<Item = Result<StatusReport, RemoteError>>,
    ) {
        self.statuses
            .lock()
            .unwrap()
            .entry(job_id.to_string())
            .or_default()
            .extend(replies);
    }

    /// Replies for cancel, retry, pause and resume, shared in call order.
    pub fn script_actions(&self, replies: impl IntoIterator<Item = Result<String, RemoteError>>) {
        self.actions.lock().unwrap().extend(replies);
    }

    pub fn script_clears(&self, replies: impl IntoIterator<Item = Result<ClearReceipt, RemoteError>>) {
        self.clears.lock().unwrap().extend(replies);
    }

    pub fn script_queue_status(&self, replies: impl IntoIterator<Item = Result<QueueStatus, RemoteError>>) {
        self.queue_statuses.lock().unwrap().extend(replies);
    }

    pub fn readiness_calls(&self) -> Vec<Instant> {
        self.readiness_calls.lock().unwrap().clone()
    }

    pub fn submitted(&self) -> Vec<SubmitRequest> {
        self.submitted.lock().unwrap().clone()
    }

    /// Log of remote calls other than readiness, e.g. `"cancel job-1"`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn action(&self, call: String) -> Result<String, RemoteError> {
        self.record(call.clone());
        self.actions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(format!("{call}: ok")))
    }
}

/// Successful receipt for a queued job.
pub fn receipt(job_id: &str) -> SubmitReceipt {
    SubmitReceipt {
        job_id: job_id.to_string(),
        asset_id: Some(format!("asset-{job_id}")),
        status: JobStatus::Queued,
        message: "Job queued for processing".to_string(),
        queue_position: Some(1),
    }
}

pub fn transport<T>() -> Result<T, RemoteError> {
    Err(RemoteError::Transport("connection refused".to_string()))
}

#[async_trait]
impl GenBackend for MockBackend {
    async fn submit_job(&self, request: &SubmitRequest) -> Result<SubmitReceipt, RemoteError> {
        self.submitted.lock().unwrap().push(request.clone());
        self.record("submit".to_string());
        let scripted = self.submits.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| {
            let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(receipt(&format!("job-{n}")))
        })
    }

    async fn fetch_job_status(&self, job_id: &str) -> Result<StatusReport, RemoteError> {
        self.record(format!("status {job_id}"));
        self.statuses
            .lock()
            .unwrap()
            .get_mut(job_id)
            .and_then(|script| script.pop_front())
            .unwrap_or_else(transport)
    }

    async fn cancel_job(&self, job_id: &str) -> Result<String, RemoteError> {
        self.action(format!("cancel {job_id}"))
    }

    async fn retry_job(&self, job_id: &str) -> Result<String, RemoteError> {
        self.action(format!("retry {job_id}"))
    }

    async fn pause_queue(&self) -> Result<String, RemoteError> {
        self.action("pause".to_string())
    }

    async fn resume_queue(&self) -> Result<String, RemoteError> {
        self.action("resume".to_string())
    }

    async fn clear_queue(&self) -> Result<ClearReceipt, RemoteError> {
        self.record("clear".to_string());
        self.clears.lock().unwrap().pop_front().unwrap_or_else(|| {
            Ok(ClearReceipt {
                message: "Queue cleared".to_string(),
                cleared_count: 0,
            })
        })
    }

    async fn fetch_queue_status(&self) -> Result<QueueStatus, RemoteError> {
        self.record("queue status".to_string());
        self.queue_statuses.lock().unwrap().pop_front().unwrap_or_else(transport)
    }

    async fn fetch_readiness(&self) -> Result<ReadinessSnapshot, RemoteError> {
        self.readiness_calls.lock().unwrap().push(Instant::now());
        self.readiness.lock().unwrap().pop_front().unwrap_or_else(transport)
    }
}

pub fn drain_events(rx: &mut UnboundedReceiver<AppEvent>) -> Vec<AppEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
