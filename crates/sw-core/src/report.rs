use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::job::{JobId, JobStatus};

/// Backend view of one job, already mapped to typed values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub job_id: JobId,
    pub status: JobStatus,
    /// Percentage; clamped by the lifecycle engine when applied.
    pub progress: f32,
    pub stage: Option<String>,
    pub error: Option<String>,
    pub asset_id: Option<String>,
    pub queue_position: Option<u32>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Backend-side queue totals, as reported by the queue status endpoint and the
/// progress stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStatus {
    /// Jobs waiting in the backend queue.
    pub queue_size: usize,
    pub current_job_id: Option<JobId>,
    pub pending_count: usize,
    pub processing_count: usize,
    pub completed_count: usize,
    pub failed_count: usize,
}

impl StatusReport {
    pub fn new(job_id: impl Into<JobId>, status: JobStatus) -> Self {
        Self {
            job_id: job_id.into(),
            status,
            progress: 0.0,
            stage: None,
            error: None,
            asset_id: None,
            queue_position: None,
            started_at: None,
            completed_at: None,
        }
    }

    pub fn with_progress(mut self, progress: f32, stage: Option<&str>) -> Self {
        self.progress = progress;
        self.stage = stage.map(str::to_string);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_asset(mut self, asset_id: impl Into<String>) -> Self {
        self.asset_id = Some(asset_id.into());
        self
    }
}
