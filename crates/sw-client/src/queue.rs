//! In-memory job set.
//!
//! The coordinator owns every [`JobRecord`] the session knows about. It never
//! talks to the backend; callers confirm remote effects first and then commit
//! them here.

use chrono::{DateTime, Utc};
use log::debug;
use sw_core::lifecycle::{self, JobEvent};
use sw_core::{JobId, JobRecord, JobStatus, QueueStatus, StatusReport};

use crate::error::QueueError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    /// Pending, queued or processing.
    Active,
    Completed,
    /// Failed or cancelled.
    Failed,
}

impl StatusFilter {
    pub fn matches(&self, status: JobStatus) -> bool {
        match self {
            Self::All => true,
            Self::Active => status.is_active(),
            Self::Completed => status == JobStatus::Completed,
            Self::Failed => matches!(status, JobStatus::Failed | JobStatus::Cancelled),
        }
    }
}

/// Changes to one record. The status only changes through `event`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobPatch {
    pub event: Option<JobEvent>,
    pub name: Option<String>,
    pub queue_position: Option<u32>,
    /// Sequence number the change was taken at.
    pub sequence: Option<u64>,
}

impl JobPatch {
    pub fn event(event: JobEvent) -> Self {
        Self {
            event: Some(event),
            ..Default::default()
        }
    }

    pub fn at(mut self, sequence: u64) -> Self {
        self.sequence = Some(sequence);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReportOutcome {
    Applied(JobRecord),
    Unchanged,
    /// Older than the last report or action applied to the job.
    Stale,
}

/// Local tallies plus the backend's own totals once known.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueCounts {
    pub active: usize,
    pub completed: usize,
    pub failed: usize,
    pub backend: Option<QueueStatus>,
}

#[derive(Debug, Default)]
pub struct QueueCoordinator {
    jobs: Vec<JobRecord>,
    paused: bool,
    selected: Option<JobId>,
    backend_status: Option<QueueStatus>,
}

impl QueueCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Jobs in insertion order.
    pub fn jobs(&self) -> &[JobRecord] {
        &self.jobs
    }

    pub fn get(&self, id: &str) -> Option<&JobRecord> {
        self.jobs.iter().find(|job| job.id == id)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    fn index_of(&self, id: &str) -> Result<usize, QueueError> {
        self.jobs
            .iter()
            .position(|job| job.id == id)
            .ok_or_else(|| QueueError::UnknownJob(id.to_string()))
    }

    pub fn add_job(&mut self, job: JobRecord) -> Result<(), QueueError> {
        if self.get(&job.id).is_some() {
            return Err(QueueError::DuplicateJob(job.id));
        }
        debug!("Tracking job {} ({})", job.id, job.status);
        self.jobs.push(job);
        Ok(())
    }

    pub fn update_job(&mut self, id: &str, patch: JobPatch) -> Result<JobRecord, QueueError> {
        let index = self.index_of(id)?;
        let current = &self.jobs[index];

        let mut next = match patch.event {
            Some(event) => lifecycle::apply(current, event)?,
            None => current.clone(),
        };
        if let Some(name) = patch.name {
            next.name = Some(name);
        }
        if let Some(position) = patch.queue_position {
            if next.status.is_waiting() {
                next.queue_position = Some(position);
            }
        }
        if let Some(sequence) = patch.sequence {
            next.revision = next.revision.max(sequence);
        }

        self.jobs[index] = next.clone();
        Ok(next)
    }

    /// Apply a lifecycle event taken at `sequence`.
    pub fn transition(
        &mut self,
        id: &str,
        event: JobEvent,
        sequence: u64,
    ) -> Result<JobRecord, QueueError> {
        self.update_job(id, JobPatch::event(event).at(sequence))
    }

    /// Merge a backend report dispatched at `sequence`.
    pub fn apply_report(
        &mut self,
        sequence: u64,
        report: &StatusReport,
        now: DateTime<Utc>,
    ) -> Result<ReportOutcome, QueueError> {
        let index = self.index_of(&report.job_id)?;
        let current = &self.jobs[index];

        if sequence <= current.revision {
            debug!(
                "Dropping stale report for {} (seq {sequence} <= {})",
                current.id, current.revision
            );
            return Ok(ReportOutcome::Stale);
        }

        match lifecycle::reconcile(current, report, now)? {
            Some(mut next) => {
                next.revision = sequence;
                self.jobs[index] = next.clone();
                Ok(ReportOutcome::Applied(next))
            }
            None => {
                self.jobs[index].revision = sequence;
                Ok(ReportOutcome::Unchanged)
            }
        }
    }

    /// Remove one finished job.
    pub fn remove_job(&mut self, id: &str) -> Result<JobRecord, QueueError> {
        let index = self.index_of(id)?;
        let status = self.jobs[index].status;
        if !status.is_terminal() {
            return Err(QueueError::NotTerminal {
                id: id.to_string(),
                status,
            });
        }

        if self.selected.as_deref() == Some(id) {
            self.selected = None;
        }
        Ok(self.jobs.remove(index))
    }

    /// Drop every completed job; returns their ids. Failed and cancelled
    /// jobs stay so they can still be retried.
    pub fn clear_completed(&mut self) -> Vec<JobId> {
        let (completed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.jobs)
            .into_iter()
            .partition(|job| job.status == JobStatus::Completed);
        self.jobs = kept;
        self.drop_dangling_selection();
        completed.into_iter().map(|job| job.id).collect()
    }

    /// Forget every job. Only call once the backend queue has been cleared.
    pub fn clear_all(&mut self) -> usize {
        let count = self.jobs.len();
        self.jobs.clear();
        self.selected = None;
        count
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Only call once the backend confirmed the pause or resume.
    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// Latest backend totals; older snapshots are simply replaced.
    pub fn set_backend_status(&mut self, status: QueueStatus) {
        self.backend_status = Some(status);
    }

    pub fn backend_status(&self) -> Option<&QueueStatus> {
        self.backend_status.as_ref()
    }

    pub fn select_job(&mut self, id: Option<&str>) -> Result<(), QueueError> {
        match id {
            Some(id) => {
                self.index_of(id)?;
                self.selected = Some(id.to_string());
            }
            None => self.selected = None,
        }
        Ok(())
    }

    pub fn selected(&self) -> Option<&JobRecord> {
        self.selected.as_deref().and_then(|id| self.get(id))
    }

    fn drop_dangling_selection(&mut self) {
        if let Some(id) = &self.selected {
            if self.get(id).is_none() {
                self.selected = None;
            }
        }
    }

    /// Jobs matching `filter`, processing first, then queued, pending,
    /// completed, failed and cancelled. Newest first within a status.
    pub fn view(&self, filter: StatusFilter) -> Vec<&JobRecord> {
        let mut jobs: Vec<_> = self
            .jobs
            .iter()
            .filter(|job| filter.matches(job.status))
            .collect();
        jobs.sort_by(|a, b| {
            a.status
                .display_rank()
                .cmp(&b.status.display_rank())
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        jobs
    }

    pub fn counts(&self) -> QueueCounts {
        let counts = QueueCounts {
            backend: self.backend_status.clone(),
            ..Default::default()
        };
        self.jobs
            .iter()
            .fold(counts, |mut counts, job| {
                match job.status {
                    status if status.is_active() => counts.active += 1,
                    JobStatus::Completed => counts.completed += 1,
                    _ => counts.failed += 1,
                }
                counts
            })
    }

    pub fn active_ids(&self) -> Vec<JobId> {
        self.jobs
            .iter()
            .filter(|job| job.status.is_active())
            .map(|job| job.id.clone())
            .collect()
    }

    pub fn has_active(&self) -> bool {
        self.jobs.iter().any(|job| job.status.is_active())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use sw_core::JobType;

    use super::*;

    fn job_at(id: &str, status: JobStatus, minutes_ago: i64) -> JobRecord {
        let mut job = JobRecord::new(id, JobType::ImageTo3d, Utc::now() - Duration::minutes(minutes_ago));
        job.status = status;
        job
    }

    fn coordinator(jobs: Vec<JobRecord>) -> QueueCoordinator {
        let mut queue = QueueCoordinator::new();
        for job in jobs {
            queue.add_job(job).unwrap();
        }
        queue
    }

    fn statuses(jobs: &[&JobRecord]) -> Vec<JobStatus> {
        jobs.iter().map(|job| job.status).collect()
    }

    #[test]
    fn sort_by_status_then_newest() {
        use JobStatus::*;

        let queue = coordinator(vec![
            job_at("a", Completed, 4),
            job_at("b", Processing, 3),
            job_at("c", Queued, 2),
            job_at("d", Failed, 1),
        ]);
        assert_eq!(
            statuses(&queue.view(StatusFilter::All)),
            vec![Processing, Queued, Completed, Failed]
        );

        let queue = coordinator(vec![
            job_at("old", Queued, 10),
            job_at("new", Queued, 1),
            job_at("pending", Pending, 0),
        ]);
        let ids: Vec<_> = queue.view(StatusFilter::All).iter().map(|j| j.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old", "pending"]);
    }

    #[test]
    fn filters_partition_statuses() {
        let queue = coordinator(
            JobStatus::ALL
                .iter()
                .enumerate()
                .map(|(i, status)| job_at(&format!("job-{i}"), *status, i as i64))
                .collect(),
        );

        let active = queue.view(StatusFilter::Active);
        assert_eq!(active.len(), 3);
        assert!(active.iter().all(|job| job.status.is_active()));

        assert_eq!(
            statuses(&queue.view(StatusFilter::Completed)),
            vec![JobStatus::Completed]
        );
        assert_eq!(
            statuses(&queue.view(StatusFilter::Failed)),
            vec![JobStatus::Failed, JobStatus::Cancelled]
        );
        assert_eq!(queue.view(StatusFilter::All).len(), 6);
        assert_eq!(
            queue.counts(),
            QueueCounts {
                active: 3,
                completed: 1,
                failed: 2,
                backend: None,
            }
        );
    }

    #[test]
    fn counts_carry_backend_totals() {
        let mut queue = coordinator(vec![job_at("a", JobStatus::Queued, 0)]);
        let status = QueueStatus {
            queue_size: 4,
            pending_count: 4,
            processing_count: 1,
            completed_count: 9,
            ..Default::default()
        };
        queue.set_backend_status(status.clone());

        let counts = queue.counts();
        assert_eq!(counts.active, 1);
        assert_eq!(counts.backend, Some(status));

        queue.clear_all();
        assert_eq!(queue.counts().backend.unwrap().queue_size, 4);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut queue = coordinator(vec![job_at("a", JobStatus::Queued, 0)]);
        let err = queue.add_job(job_at("a", JobStatus::Queued, 0)).unwrap_err();
        assert_eq!(err, QueueError::DuplicateJob("a".into()));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn removing_unfinished_job_is_an_error() {
        let mut queue = coordinator(vec![
            job_at("running", JobStatus::Processing, 0),
            job_at("done", JobStatus::Completed, 0),
        ]);

        let err = queue.remove_job("running").unwrap_err();
        assert!(matches!(err, QueueError::NotTerminal { status: JobStatus::Processing, .. }));
        assert_eq!(queue.len(), 2);

        queue.select_job(Some("done")).unwrap();
        assert_eq!(queue.remove_job("done").unwrap().id, "done");
        assert!(queue.selected().is_none());
        assert_eq!(queue.remove_job("done").unwrap_err(), QueueError::UnknownJob("done".into()));
    }

    #[test]
    fn clear_completed_keeps_retryable_and_active_jobs() {
        let mut queue = coordinator(vec![
            job_at("a", JobStatus::Completed, 0),
            job_at("b", JobStatus::Processing, 0),
            job_at("c", JobStatus::Cancelled, 0),
            job_at("d", JobStatus::Queued, 0),
            job_at("e", JobStatus::Failed, 0),
            job_at("f", JobStatus::Completed, 0),
        ]);
        queue.select_job(Some("f")).unwrap();

        let removed = queue.clear_completed();
        assert_eq!(removed, vec!["a".to_string(), "f".to_string()]);
        let ids: Vec<_> = queue.jobs().iter().map(|j| j.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "d", "e"]);
        assert!(queue.selected().is_none());

        // Both stay retryable.
        queue.transition("c", JobEvent::Retried, 1).unwrap();
        queue.transition("e", JobEvent::Retried, 1).unwrap();
        assert_eq!(queue.get("e").unwrap().status, JobStatus::Queued);
    }

    #[test]
    fn update_goes_through_lifecycle() {
        let mut queue = coordinator(vec![job_at("a", JobStatus::Completed, 0)]);

        let err = queue
            .update_job("a", JobPatch::event(JobEvent::Retried))
            .unwrap_err();
        assert!(matches!(err, QueueError::IllegalTransition(_)));
        assert_eq!(queue.get("a").unwrap().status, JobStatus::Completed);

        let renamed = queue
            .update_job(
                "a",
                JobPatch {
                    name: Some("chair".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(renamed.display_name(), "chair");
    }

    #[test]
    fn stale_reports_are_discarded() {
        let mut queue = coordinator(vec![job_at("a", JobStatus::Queued, 0)]);
        let now = Utc::now();

        let processing =
            StatusReport::new("a", JobStatus::Processing).with_progress(40.0, Some("shape"));
        assert!(matches!(
            queue.apply_report(2, &processing, now).unwrap(),
            ReportOutcome::Applied(_)
        ));

        // A reply to an earlier request lands late.
        let queued = StatusReport::new("a", JobStatus::Queued);
        assert_eq!(queue.apply_report(1, &queued, now).unwrap(), ReportOutcome::Stale);
        assert_eq!(queue.get("a").unwrap().status, JobStatus::Processing);

        assert_eq!(
            queue.apply_report(3, &processing, now).unwrap(),
            ReportOutcome::Unchanged
        );
        assert_eq!(queue.get("a").unwrap().revision, 3);
    }

    #[test]
    fn committed_action_fences_older_reports() {
        let mut queue = coordinator(vec![job_at("a", JobStatus::Processing, 0)]);
        queue.transition("a", JobEvent::Cancelled, 5).unwrap();

        let report = StatusReport::new("a", JobStatus::Completed);
        assert_eq!(
            queue.apply_report(4, &report, Utc::now()).unwrap(),
            ReportOutcome::Stale
        );
        assert_eq!(queue.get("a").unwrap().status, JobStatus::Cancelled);
    }

    #[test]
    fn selection_must_exist() {
        let mut queue = coordinator(vec![job_at("a", JobStatus::Queued, 0)]);
        assert!(queue.select_job(Some("missing")).is_err());
        queue.select_job(Some("a")).unwrap();
        assert_eq!(queue.selected().unwrap().id, "a");
        queue.select_job(None).unwrap();
        assert!(queue.selected().is_none());
    }

    #[test]
    fn independent_coordinators() {
        let mut first = QueueCoordinator::new();
        let second = QueueCoordinator::new();
        first.add_job(job_at("a", JobStatus::Queued, 0)).unwrap();
        first.set_paused(true);
        assert!(second.is_empty());
        assert!(!second.is_paused());
    }
}
