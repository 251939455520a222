//! User-facing queue actions.
//!
//! [`QueueController`] pairs the [`QueueCoordinator`] with a backend. Every
//! action that has a remote effect calls the backend first and only commits
//! to the coordinator once the call succeeded, so a failure leaves local state
//! exactly as it was. Each action reports its outcome on the event channel.
//!
//! The coordinator lock is only taken to read or commit, never across a
//! remote call, so actions on different jobs do not wait on each other.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use futures::future::{join_all, BoxFuture};
use log::{debug, info, warn};
use sw_core::lifecycle::{self, JobEvent};
use sw_core::params::validate_prompt;
use sw_core::{
    GenerationParameters, InvalidParameters, JobId, JobPriority, JobRecord, JobStatus,
    QueueStatus, StatusReport,
};
use tokio::sync::RwLock;

use crate::backend::{GenBackend, JobSource, SubmitRequest};
use crate::batch::{self, BatchOutcome, BatchSession};
use crate::error::{QueueError, RemoteError};
use crate::events::{AppEvent, EventSender};
use crate::queue::{QueueCoordinator, QueueCounts, ReportOutcome, StatusFilter};

pub struct QueueController {
    backend: Arc<dyn GenBackend>,
    state: RwLock<QueueCoordinator>,
    events: EventSender,
    sequence: AtomicU64,
}

impl QueueController {
    pub fn new(backend: Arc<dyn GenBackend>, events: EventSender) -> Self {
        Self {
            backend,
            state: RwLock::new(QueueCoordinator::new()),
            events,
            sequence: AtomicU64::new(0),
        }
    }

    pub fn events(&self) -> &EventSender {
        &self.events
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub async fn submit(&self, request: SubmitRequest) -> Result<JobRecord, QueueError> {
        match self.create_job(&request).await {
            Ok(job) => {
                self.events.emit(AppEvent::JobCreated(job.clone()));
                self.events
                    .success("Job submitted", format!("{} queued", job.display_name()));
                Ok(job)
            }
            Err(e) => {
                warn!("Submission failed: {e}");
                self.events.error("Submission failed", e.to_string());
                Err(e)
            }
        }
    }

    /// Submit every selected unit of `session` in order. The session is
    /// consumed and its previews released.
    pub async fn submit_batch(
        &self,
        session: BatchSession,
        parameters: GenerationParameters,
        priority: JobPriority,
    ) -> BatchOutcome {
        batch::run_batch(session, &self.events, |unit| {
            let mut request = SubmitRequest::image(unit.path.clone())
                .with_parameters(parameters.clone())
                .with_priority(priority);
            if let Some(stem) = unit.path.file_stem() {
                request = request.with_name(stem.to_string_lossy());
            }
            async move { self.create_job(&request).await }
        })
        .await
    }

    /// Validate, submit and track one job without emitting anything.
    async fn create_job(&self, request: &SubmitRequest) -> Result<JobRecord, QueueError> {
        validate_request(request)?;

        let receipt = self.backend.submit_job(request).await?;
        debug!("Backend accepted job {}: {}", receipt.job_id, receipt.message);

        let mut job = JobRecord::new(receipt.job_id, request.source.job_type(), Utc::now())
            .with_initial_status(receipt.status)
            .with_reserved_asset(receipt.asset_id)
            .with_queue_position(receipt.queue_position);
        if let Some(name) = &request.name {
            job = job.with_name(name.clone());
        }
        if let JobSource::Image(path) = &request.source {
            job = job.with_source_image(path.clone());
        }
        job.revision = self.next_sequence();

        self.state.write().await.add_job(job.clone())?;
        Ok(job)
    }

    pub async fn cancel(&self, id: &str) -> Result<JobRecord, QueueError> {
        let result = self
            .job_action(id, JobEvent::Cancelled, self.backend.cancel_job(id))
            .await;
        self.finish_job_action("Job cancelled", "Cancel failed", result)
    }

    pub async fn retry(&self, id: &str) -> Result<JobRecord, QueueError> {
        let result = self
            .job_action(id, JobEvent::Retried, self.backend.retry_job(id))
            .await;
        self.finish_job_action("Job retried", "Retry failed", result)
    }

    /// Check `event` against the current record, run `remote`, then commit.
    async fn job_action(
        &self,
        id: &str,
        event: JobEvent,
        remote: BoxFuture<'_, Result<String, RemoteError>>,
    ) -> Result<(JobRecord, String), QueueError> {
        {
            let state = self.state.read().await;
            let job = state
                .get(id)
                .ok_or_else(|| QueueError::UnknownJob(id.to_string()))?;
            lifecycle::check(job, &event)?;
        }

        let message = remote.await?;

        // The sequence is taken after the backend confirmed, so any status
        // reply dispatched before this point is stale.
        let sequence = self.next_sequence();
        let action = event.action();
        let job = self
            .state
            .write()
            .await
            .transition(id, event, sequence)
            .inspect_err(|e| warn!("Backend accepted {action} of {id} but it cannot be applied: {e}"))?;

        Ok((job, message))
    }

    fn finish_job_action(
        &self,
        success_title: &str,
        failure_title: &str,
        result: Result<(JobRecord, String), QueueError>,
    ) -> Result<JobRecord, QueueError> {
        match result {
            Ok((job, message)) => {
                info!("{success_title}: {}", job.id);
                self.events.emit(AppEvent::JobUpdated(job.clone()));
                self.events.success(success_title, message);
                Ok(job)
            }
            Err(e) => {
                warn!("{failure_title}: {e}");
                self.events.error(failure_title, e.to_string());
                Err(e)
            }
        }
    }

    /// Drop one finished job from the local set.
    pub async fn remove(&self, id: &str) -> Result<JobRecord, QueueError> {
        let result = self.state.write().await.remove_job(id);
        match &result {
            Ok(job) => {
                self.events.emit(AppEvent::JobRemoved(job.id.clone()));
                self.events
                    .info("Job removed", format!("{} removed from queue", job.display_name()));
            }
            Err(e) => self.events.error("Remove failed", e.to_string()),
        }
        result
    }

    pub async fn clear_completed(&self) -> usize {
        let removed = self.state.write().await.clear_completed();
        for id in &removed {
            self.events.emit(AppEvent::JobRemoved(id.clone()));
        }
        self.events
            .info("Queue", format!("Cleared {} completed jobs", removed.len()));
        removed.len()
    }

    /// Clear the backend queue and then every local job. Needs `confirmed`.
    pub async fn clear_all(&self, confirmed: bool) -> Result<usize, QueueError> {
        if !confirmed {
            self.events
                .info("Queue", "Clearing the whole queue needs confirmation");
            return Err(QueueError::ConfirmationRequired);
        }

        match self.backend.clear_queue().await {
            Ok(receipt) => {
                let count = self.state.write().await.clear_all();
                info!(
                    "Queue cleared: {count} local jobs, {} on the backend",
                    receipt.cleared_count
                );
                self.events.emit(AppEvent::QueueCleared { count });
                self.events.success("Queue cleared", receipt.message);
                Ok(count)
            }
            Err(e) => {
                warn!("Clearing queue failed: {e}");
                self.events.error("Clear failed", e.to_string());
                Err(e.into())
            }
        }
    }

    pub async fn toggle_pause(&self) -> Result<bool, QueueError> {
        let paused = self.state.read().await.is_paused();
        self.set_paused(!paused).await
    }

    /// Pause or resume the backend queue; the local flag follows only on
    /// success.
    pub async fn set_paused(&self, paused: bool) -> Result<bool, QueueError> {
        let result = if paused {
            self.backend.pause_queue().await
        } else {
            self.backend.resume_queue().await
        };

        match result {
            Ok(message) => {
                self.state.write().await.set_paused(paused);
                self.events.emit(AppEvent::PausedChanged(paused));
                let title = if paused { "Queue paused" } else { "Queue resumed" };
                self.events.success(title, message);
                Ok(paused)
            }
            Err(e) => {
                warn!("Changing pause state failed: {e}");
                let title = if paused { "Pause failed" } else { "Resume failed" };
                self.events.error(title, e.to_string());
                Err(e.into())
            }
        }
    }

    pub async fn select(&self, id: Option<&str>) -> Result<(), QueueError> {
        self.state.write().await.select_job(id)
    }

    /// Fetch and merge the backend status of one job.
    ///
    /// A job the backend refuses to report on is failed with the backend's
    /// message; transport failures are returned untouched.
    pub async fn refresh(&self, id: &str) -> Result<ReportOutcome, QueueError> {
        let sequence = self.next_sequence();
        let report = match self.backend.fetch_job_status(id).await {
            Ok(report) => report,
            Err(RemoteError::Rejected(message)) => {
                StatusReport::new(id, JobStatus::Failed).with_error(message)
            }
            Err(e) => return Err(e.into()),
        };
        self.apply_report_at(sequence, report).await
    }

    /// Refresh every active job concurrently.
    pub async fn refresh_active(&self) {
        let ids = self.state.read().await.active_ids();
        let results = join_all(ids.iter().map(|id| self.refresh(id))).await;

        for (id, result) in ids.iter().zip(results) {
            match result {
                Err(QueueError::Remote(e)) if e.is_transport() => {
                    debug!("Status of {id} unavailable, retrying next tick: {e}")
                }
                Err(e) => warn!("Status of {id} not applied: {e}"),
                Ok(_) => {}
            }
        }
    }

    /// Fetch the backend's queue totals and keep them for [`Self::counts`].
    pub async fn refresh_queue_status(&self) -> Result<QueueStatus, QueueError> {
        let status = self.backend.fetch_queue_status().await?;
        self.apply_queue_status(status.clone()).await;
        Ok(status)
    }

    pub async fn apply_queue_status(&self, status: QueueStatus) {
        let changed = {
            let mut state = self.state.write().await;
            let changed = state.backend_status() != Some(&status);
            state.set_backend_status(status.clone());
            changed
        };
        if changed {
            debug!(
                "Backend queue: {} waiting, {} processing, {} completed",
                status.queue_size, status.processing_count, status.completed_count
            );
            self.events.emit(AppEvent::QueueStatus(status));
        }
    }

    /// Merge a report pushed by the backend.
    pub async fn apply_report(&self, report: StatusReport) -> Result<ReportOutcome, QueueError> {
        let sequence = self.next_sequence();
        self.apply_report_at(sequence, report).await
    }

    async fn apply_report_at(
        &self,
        sequence: u64,
        report: StatusReport,
    ) -> Result<ReportOutcome, QueueError> {
        let (previous, outcome) = {
            let mut state = self.state.write().await;
            let previous = state.get(&report.job_id).map(|job| job.status);
            (previous, state.apply_report(sequence, &report, Utc::now())?)
        };

        if let ReportOutcome::Applied(job) = &outcome {
            self.events.emit(AppEvent::JobUpdated(job.clone()));
            if previous != Some(job.status) {
                match job.status {
                    JobStatus::Completed => self.events.success(
                        "Generation complete",
                        format!("{} is ready", job.display_name()),
                    ),
                    JobStatus::Failed => self.events.error(
                        "Generation failed",
                        format!(
                            "{}: {}",
                            job.display_name(),
                            job.error.as_deref().unwrap_or_default()
                        ),
                    ),
                    _ => {}
                }
            }
        }

        Ok(outcome)
    }

    pub async fn jobs(&self) -> Vec<JobRecord> {
        self.state.read().await.jobs().to_vec()
    }

    pub async fn get(&self, id: &str) -> Option<JobRecord> {
        self.state.read().await.get(id).cloned()
    }

    pub async fn view(&self, filter: StatusFilter) -> Vec<JobRecord> {
        self.state
            .read()
            .await
            .view(filter)
            .into_iter()
            .cloned()
            .collect()
    }

    pub async fn is_paused(&self) -> bool {
        self.state.read().await.is_paused()
    }

    pub async fn selected(&self) -> Option<JobRecord> {
        self.state.read().await.selected().cloned()
    }

    pub async fn counts(&self) -> QueueCounts {
        self.state.read().await.counts()
    }

    pub async fn active_ids(&self) -> Vec<JobId> {
        self.state.read().await.active_ids()
    }

    pub async fn has_active(&self) -> bool {
        self.state.read().await.has_active()
    }
}

fn validate_request(request: &SubmitRequest) -> Result<(), QueueError> {
    request.parameters.validate()?;
    match &request.source {
        JobSource::Text(prompt) => validate_prompt(prompt)?,
        JobSource::Image(path) if !batch::is_supported_image(path) => {
            return Err(InvalidParameters(vec![format!(
                "{} is not a supported image file",
                path.display()
            )])
            .into());
        }
        JobSource::Image(_) => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use sw_core::NotificationKind;

    use super::*;
    use crate::testing::{drain_events, init_logger, receipt, transport, MockBackend};

    fn controller() -> (
        Arc<MockBackend>,
        QueueController,
        tokio::sync::mpsc::UnboundedReceiver<AppEvent>,
    ) {
        init_logger();
        let backend = Arc::new(MockBackend::default());
        let (events, rx) = EventSender::channel();
        let controller = QueueController::new(backend.clone(), events);
        (backend, controller, rx)
    }

    fn notifications(events: &[AppEvent]) -> Vec<(NotificationKind, String)> {
        events
            .iter()
            .filter_map(|event| match event {
                AppEvent::Notify(n) => Some((n.kind, n.title.clone())),
                _ => None,
            })
            .collect()
    }

    async fn submitted(controller: &QueueController, name: &str) -> JobRecord {
        controller
            .submit(SubmitRequest::image(format!("{name}.png")).with_name(name))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn submit_tracks_queued_job() {
        let (backend, controller, mut rx) = controller();
        backend.script_submits([Ok(receipt("job-a"))]);

        let job = submitted(&controller, "chair").await;
        assert_eq!(job.id, "job-a");
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.reserved_asset_id.as_deref(), Some("asset-job-a"));
        assert_eq!(job.source_image_path.as_deref(), Some(std::path::Path::new("chair.png")));
        assert_eq!(controller.jobs().await.len(), 1);

        let events = drain_events(&mut rx);
        assert!(matches!(&events[0], AppEvent::JobCreated(job) if job.id == "job-a"));
        assert_eq!(
            notifications(&events),
            vec![(NotificationKind::Success, "Job submitted".to_string())]
        );
    }

    #[tokio::test]
    async fn invalid_submission_never_reaches_backend() {
        let (backend, controller, mut rx) = controller();

        let err = controller
            .submit(SubmitRequest::text("hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, QueueError::InvalidParameters(_)));

        let err = controller
            .submit(SubmitRequest::image("notes.txt"))
            .await
            .unwrap_err();
        assert!(matches!(err, QueueError::InvalidParameters(_)));

        let err = controller
            .submit(SubmitRequest::text("a wooden chair").with_parameters(GenerationParameters {
                inference_steps: 1,
                ..Default::default()
            }))
            .await
            .unwrap_err();
        assert!(matches!(err, QueueError::InvalidParameters(_)));

        assert!(backend.submitted().is_empty());
        assert!(controller.jobs().await.is_empty());
        assert_eq!(notifications(&drain_events(&mut rx)).len(), 3);
    }

    #[tokio::test]
    async fn rejected_submission_creates_no_job() {
        let (backend, controller, _rx) = controller();
        backend.script_submits([Err(RemoteError::Validation("file too large".into()))]);

        let err = controller
            .submit(SubmitRequest::image("huge.png"))
            .await
            .unwrap_err();
        assert_eq!(err, QueueError::Remote(RemoteError::Validation("file too large".into())));
        assert!(controller.jobs().await.is_empty());
    }

    #[tokio::test]
    async fn cancel_commits_after_backend_confirms() {
        let (backend, controller, mut rx) = controller();
        let job = submitted(&controller, "chair").await;
        drain_events(&mut rx);

        let cancelled = controller.cancel(&job.id).await.unwrap();
        assert_eq!(cancelled.status, JobStatus::Cancelled);
        assert_eq!(backend.calls().last().unwrap(), &format!("cancel {}", job.id));

        let events = drain_events(&mut rx);
        assert!(matches!(&events[0], AppEvent::JobUpdated(job) if job.status == JobStatus::Cancelled));
        assert_eq!(
            notifications(&events),
            vec![(NotificationKind::Success, "Job cancelled".to_string())]
        );
    }

    #[tokio::test]
    async fn failed_cancel_leaves_job_untouched() {
        let (backend, controller, mut rx) = controller();
        let job = submitted(&controller, "chair").await;
        drain_events(&mut rx);
        backend.script_actions([transport()]);

        let err = controller.cancel(&job.id).await.unwrap_err();
        assert!(matches!(err, QueueError::Remote(RemoteError::Transport(_))));
        assert_eq!(controller.get(&job.id).await.unwrap().status, JobStatus::Queued);
        assert_eq!(
            notifications(&drain_events(&mut rx)),
            vec![(NotificationKind::Error, "Cancel failed".to_string())]
        );
    }

    #[tokio::test]
    async fn illegal_action_is_rejected_before_remote_call() {
        let (backend, controller, _rx) = controller();
        let job = submitted(&controller, "chair").await;

        let err = controller.retry(&job.id).await.unwrap_err();
        assert!(matches!(err, QueueError::IllegalTransition(_)));
        assert!(!backend.calls().iter().any(|call| call.starts_with("retry")));

        let err = controller.cancel("nope").await.unwrap_err();
        assert_eq!(err, QueueError::UnknownJob("nope".into()));
    }

    #[tokio::test]
    async fn retry_after_failure_requeues() {
        let (backend, controller, _rx) = controller();
        let job = submitted(&controller, "chair").await;
        backend.script_status(
            &job.id,
            [Ok(StatusReport::new(&job.id, JobStatus::Failed).with_error("out of memory"))],
        );
        controller.refresh(&job.id).await.unwrap();
        assert_eq!(
            controller.get(&job.id).await.unwrap().error.as_deref(),
            Some("out of memory")
        );

        let retried = controller.retry(&job.id).await.unwrap();
        assert_eq!(retried.status, JobStatus::Queued);
        assert_eq!(retried.progress, 0.0);
        assert_eq!(retried.error, None);
    }

    #[tokio::test]
    async fn failed_retry_leaves_job_failed() {
        let (backend, controller, _rx) = controller();
        let job = submitted(&controller, "chair").await;
        controller
            .apply_report(StatusReport::new(&job.id, JobStatus::Failed))
            .await
            .unwrap();
        backend.script_actions([Err(RemoteError::Rejected("Job not found".into()))]);

        assert!(controller.retry(&job.id).await.is_err());
        assert_eq!(controller.get(&job.id).await.unwrap().status, JobStatus::Failed);
    }

    #[tokio::test]
    async fn reply_dispatched_before_cancel_is_stale() {
        let (_backend, controller, _rx) = controller();
        let job = submitted(&controller, "chair").await;

        let in_flight = controller.next_sequence();
        controller.cancel(&job.id).await.unwrap();

        let late = StatusReport::new(&job.id, JobStatus::Processing).with_progress(30.0, None);
        let outcome = controller.apply_report_at(in_flight, late).await.unwrap();
        assert_eq!(outcome, ReportOutcome::Stale);
        assert_eq!(controller.get(&job.id).await.unwrap().status, JobStatus::Cancelled);
    }

    #[tokio::test]
    async fn pause_flag_follows_backend() {
        let (backend, controller, mut rx) = controller();
        backend.script_actions([transport(), Ok("Queue paused".to_string())]);

        assert!(controller.toggle_pause().await.is_err());
        assert!(!controller.is_paused().await);

        assert!(controller.toggle_pause().await.unwrap());
        assert!(controller.is_paused().await);

        let events = drain_events(&mut rx);
        assert!(events.iter().any(|e| matches!(e, AppEvent::PausedChanged(true))));
        assert_eq!(
            notifications(&events),
            vec![
                (NotificationKind::Error, "Pause failed".to_string()),
                (NotificationKind::Success, "Queue paused".to_string()),
            ]
        );
        assert_eq!(backend.calls(), vec!["pause", "pause"]);
    }

    #[tokio::test]
    async fn resume_flag_follows_backend() {
        let (backend, controller, mut rx) = controller();
        backend.script_actions([
            Ok("Queue paused".to_string()),
            transport(),
            Ok("Queue resumed".to_string()),
        ]);
        assert!(controller.set_paused(true).await.unwrap());
        drain_events(&mut rx);

        assert!(controller.toggle_pause().await.is_err());
        assert!(controller.is_paused().await);

        assert!(!controller.toggle_pause().await.unwrap());
        assert!(!controller.is_paused().await);

        let events = drain_events(&mut rx);
        assert!(events.iter().any(|e| matches!(e, AppEvent::PausedChanged(false))));
        assert_eq!(
            notifications(&events),
            vec![
                (NotificationKind::Error, "Resume failed".to_string()),
                (NotificationKind::Success, "Queue resumed".to_string()),
            ]
        );
        assert_eq!(backend.calls(), vec!["pause", "resume", "resume"]);
    }

    #[tokio::test]
    async fn queue_status_shows_in_counts() {
        let (backend, controller, mut rx) = controller();
        let status = QueueStatus {
            queue_size: 2,
            current_job_id: Some("job-9".to_string()),
            pending_count: 2,
            processing_count: 1,
            completed_count: 5,
            failed_count: 1,
        };
        backend.script_queue_status([transport(), Ok(status.clone()), Ok(status.clone())]);

        assert!(controller.refresh_queue_status().await.is_err());
        assert_eq!(controller.counts().await.backend, None);

        assert_eq!(controller.refresh_queue_status().await.unwrap(), status);
        assert_eq!(controller.counts().await.backend, Some(status.clone()));

        // Same totals again: nothing new to report.
        controller.refresh_queue_status().await.unwrap();
        let updates = drain_events(&mut rx)
            .into_iter()
            .filter(|e| matches!(e, AppEvent::QueueStatus(_)))
            .count();
        assert_eq!(updates, 1);
        assert_eq!(backend.calls(), vec!["queue status"; 3]);
    }

    #[tokio::test]
    async fn clear_all_needs_confirmation_and_backend() {
        let (backend, controller, _rx) = controller();
        submitted(&controller, "a").await;
        submitted(&controller, "b").await;

        assert_eq!(
            controller.clear_all(false).await.unwrap_err(),
            QueueError::ConfirmationRequired
        );
        assert!(!backend.calls().contains(&"clear".to_string()));

        backend.script_clears([transport()]);
        assert!(controller.clear_all(true).await.is_err());
        assert_eq!(controller.jobs().await.len(), 2);

        assert_eq!(controller.clear_all(true).await.unwrap(), 2);
        assert!(controller.jobs().await.is_empty());
    }

    #[tokio::test]
    async fn remove_only_finished_jobs() {
        let (_backend, controller, _rx) = controller();
        let job = submitted(&controller, "chair").await;

        assert!(matches!(
            controller.remove(&job.id).await.unwrap_err(),
            QueueError::NotTerminal { .. }
        ));

        controller
            .apply_report(StatusReport::new(&job.id, JobStatus::Completed))
            .await
            .unwrap();
        controller.remove(&job.id).await.unwrap();
        assert!(controller.jobs().await.is_empty());
    }

    #[tokio::test]
    async fn refresh_active_merges_reports() {
        let (backend, controller, mut rx) = controller();
        let a = submitted(&controller, "a").await;
        let b = submitted(&controller, "b").await;
        backend.script_status(
            &a.id,
            [Ok(StatusReport::new(&a.id, JobStatus::Completed).with_asset("asset-final"))],
        );
        backend.script_status(&b.id, [Err(RemoteError::Rejected("Job not found".into()))]);
        drain_events(&mut rx);

        controller.refresh_active().await;

        let a = controller.get(&a.id).await.unwrap();
        assert_eq!(a.status, JobStatus::Completed);
        assert_eq!(a.asset_id.as_deref(), Some("asset-final"));
        let b = controller.get(&b.id).await.unwrap();
        assert_eq!(b.status, JobStatus::Failed);
        assert_eq!(b.error.as_deref(), Some("Job not found"));
        assert!(!controller.has_active().await);

        let mut kinds: Vec<_> = notifications(&drain_events(&mut rx));
        kinds.sort_by(|x, y| x.1.cmp(&y.1));
        assert_eq!(
            kinds,
            vec![
                (NotificationKind::Success, "Generation complete".to_string()),
                (NotificationKind::Error, "Generation failed".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn transport_failure_keeps_job_active() {
        let (_backend, controller, _rx) = controller();
        let job = submitted(&controller, "chair").await;

        controller.refresh_active().await;
        assert_eq!(controller.get(&job.id).await.unwrap().status, JobStatus::Queued);
    }
}
