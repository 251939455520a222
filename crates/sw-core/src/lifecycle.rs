//! Job lifecycle state machine.
//!
//! Everything here is pure: functions take the current [`JobRecord`] and an
//! event or backend report and return the next record, or an
//! [`IllegalTransition`] when the move is not one of the permitted edges.
//!
//! ```text
//! pending|queued ──► processing ──► completed
//!        │               │ ▲
//!        │               └─┘ progress
//!        ├───────────────┴──► failed ─────┐
//!        └───────────────┴──► cancelled ──┴──► queued (retry)
//! ```

use chrono::{DateTime, Utc};

use crate::error::IllegalTransition;
use crate::job::{JobRecord, JobStatus};
use crate::report::StatusReport;

pub const DEFAULT_FAILURE_MESSAGE: &str = "Generation failed";

/// Something that happened to a job, either reported by the backend or
/// confirmed after a user action.
#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    Started { at: DateTime<Utc> },
    Progressed { progress: f32, stage: Option<String> },
    Completed { asset_id: Option<String>, at: DateTime<Utc> },
    Failed { error: String },
    Cancelled,
    Retried,
}

impl JobEvent {
    /// Status the job ends up in after this event.
    pub fn target(&self) -> JobStatus {
        match self {
            Self::Started { .. } | Self::Progressed { .. } => JobStatus::Processing,
            Self::Completed { .. } => JobStatus::Completed,
            Self::Failed { .. } => JobStatus::Failed,
            Self::Cancelled => JobStatus::Cancelled,
            Self::Retried => JobStatus::Queued,
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            Self::Started { .. } => "start",
            Self::Progressed { .. } => "update progress of",
            Self::Completed { .. } => "complete",
            Self::Failed { .. } => "fail",
            Self::Cancelled => "cancel",
            Self::Retried => "retry",
        }
    }

    fn accepts(&self, from: JobStatus) -> bool {
        match self {
            Self::Started { .. } => from.is_waiting(),
            Self::Progressed { .. } | Self::Completed { .. } => from == JobStatus::Processing,
            Self::Failed { .. } | Self::Cancelled => from.is_active(),
            Self::Retried => matches!(from, JobStatus::Failed | JobStatus::Cancelled),
        }
    }
}

/// Whether `from -> to` is one of the permitted status edges.
pub fn is_legal(from: JobStatus, to: JobStatus) -> bool {
    use JobStatus::*;

    matches!(
        (from, to),
        (Pending | Queued, Processing)
            | (Processing, Processing)
            | (Processing, Completed)
            | (Pending | Queued | Processing, Failed)
            | (Pending | Queued | Processing, Cancelled)
            | (Failed | Cancelled, Queued)
    )
}

/// Reject `event` if it cannot be applied to `job` in its current status.
pub fn check(job: &JobRecord, event: &JobEvent) -> Result<(), IllegalTransition> {
    if event.accepts(job.status) {
        debug_assert!(is_legal(job.status, event.target()));
        Ok(())
    } else {
        Err(IllegalTransition {
            job_id: job.id.clone(),
            from: job.status,
            action: event.action(),
        })
    }
}

/// Apply one event and return the resulting record.
pub fn apply(job: &JobRecord, event: JobEvent) -> Result<JobRecord, IllegalTransition> {
    check(job, &event)?;

    let mut next = job.clone();
    match event {
        JobEvent::Started { at } => {
            next.status = JobStatus::Processing;
            next.started_at.get_or_insert(at);
            next.queue_position = None;
        }
        JobEvent::Progressed { progress, stage } => {
            // Never moves backwards while processing.
            next.progress = clamp_progress(progress).max(job.progress);
            if stage.is_some() {
                next.stage = stage;
            }
        }
        JobEvent::Completed { asset_id, at } => {
            next.status = JobStatus::Completed;
            next.progress = 100.0;
            next.stage = None;
            next.error = None;
            next.completed_at.get_or_insert(at);
            next.asset_id = asset_id.or_else(|| job.reserved_asset_id.clone());
        }
        JobEvent::Failed { error } => {
            next.status = JobStatus::Failed;
            next.stage = None;
            next.error = Some(error);
            next.queue_position = None;
        }
        JobEvent::Cancelled => {
            next.status = JobStatus::Cancelled;
            next.stage = None;
            next.queue_position = None;
        }
        JobEvent::Retried => {
            next.status = JobStatus::Queued;
            next.progress = 0.0;
            next.stage = None;
            next.error = None;
        }
    }

    Ok(next)
}

pub fn clamp_progress(progress: f32) -> f32 {
    if progress.is_nan() {
        0.0
    } else {
        progress.clamp(0.0, 100.0)
    }
}

/// Merge a backend report into `job`.
///
/// Reports that skip an observable step (a queued job reported completed) are
/// walked through the intermediate edges. Returns `Ok(None)` when the report
/// changes nothing.
pub fn reconcile(
    job: &JobRecord,
    report: &StatusReport,
    now: DateTime<Utc>,
) -> Result<Option<JobRecord>, IllegalTransition> {
    use JobStatus::*;

    let illegal = |action: &'static str| IllegalTransition {
        job_id: job.id.clone(),
        from: job.status,
        action,
    };
    let started = || JobEvent::Started {
        at: report.started_at.unwrap_or(now),
    };
    let progressed = || JobEvent::Progressed {
        progress: report.progress,
        stage: report.stage.clone(),
    };
    let completed = || JobEvent::Completed {
        asset_id: report.asset_id.clone(),
        at: report.completed_at.unwrap_or(now),
    };

    let next = match (job.status, report.status) {
        (from, to) if from.is_waiting() && to.is_waiting() => {
            if from == to && job.queue_position == report.queue_position {
                return Ok(None);
            }
            let mut next = job.clone();
            next.status = to;
            next.queue_position = report.queue_position;
            next
        }
        (_, Pending | Queued) => return Err(illegal("requeue")),

        (from, Processing) if from.is_waiting() => apply(&apply(job, started())?, progressed())?,
        (Processing, Processing) => {
            let next = apply(job, progressed())?;
            if next.progress == job.progress && next.stage == job.stage {
                return Ok(None);
            }
            next
        }
        (_, Processing) => return Err(illegal("start")),

        (from, Completed) if from.is_waiting() => apply(&apply(job, started())?, completed())?,
        (Processing, Completed) => apply(job, completed())?,
        (Completed, Completed) => return Ok(None),
        (_, Completed) => return Err(illegal("complete")),

        (from, Failed) if from.is_active() => apply(
            job,
            JobEvent::Failed {
                error: report
                    .error
                    .clone()
                    .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string()),
            },
        )?,
        (Failed, Failed) => return Ok(None),
        (_, Failed) => return Err(illegal("fail")),

        // Cancellation is only ever committed by a confirmed user action.
        (Cancelled, Cancelled) => return Ok(None),
        (_, Cancelled) => return Err(illegal("cancel")),
    };

    Ok(Some(next))
}
