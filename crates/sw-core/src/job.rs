use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::UnknownStatus;

/// Opaque job identifier assigned by the backend.
pub type JobId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobType {
    #[serde(rename = "image_to_3d")]
    ImageTo3d,
    #[serde(rename = "text_to_3d")]
    TextTo3d,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ImageTo3d => "image_to_3d",
            Self::TextTo3d => "text_to_3d",
        }
    }

    /// Human readable label
    pub fn label(&self) -> &'static str {
        match self {
            Self::ImageTo3d => "Image to 3D",
            Self::TextTo3d => "Text to 3D",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Queued,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub const ALL: [JobStatus; 6] = [
        Self::Pending,
        Self::Queued,
        Self::Processing,
        Self::Completed,
        Self::Failed,
        Self::Cancelled,
    ];

    /// Accepted by the backend but not started yet.
    pub fn is_waiting(&self) -> bool {
        matches!(self, Self::Pending | Self::Queued)
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::Queued | Self::Processing)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Position in the queue display; lower sorts first.
    pub fn display_rank(&self) -> u8 {
        match self {
            Self::Processing => 0,
            Self::Queued => 1,
            Self::Pending => 2,
            Self::Completed => 3,
            Self::Failed => 4,
            Self::Cancelled => 5,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "queued" => Ok(Self::Queued),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

/// One generation job as tracked by the client.
///
/// Status-bearing fields are only changed through [`crate::lifecycle`]; the
/// rest is fixed when the record is created from a submission receipt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: JobId,
    pub job_type: JobType,
    pub name: Option<String>,
    pub status: JobStatus,
    /// Percentage in `[0, 100]`.
    pub progress: f32,
    pub stage: Option<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Local file the job was generated from. Never uploaded again.
    pub source_image_path: Option<PathBuf>,
    /// Only set once the job has completed.
    pub asset_id: Option<String>,
    /// Asset id the backend allocated at submission, promoted to `asset_id`
    /// on completion when the completion report carries none.
    pub reserved_asset_id: Option<String>,
    pub queue_position: Option<u32>,
    /// Sequence number of the last report or action applied to this record.
    pub revision: u64,
}

impl JobRecord {
    pub fn new(id: impl Into<JobId>, job_type: JobType, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            job_type,
            name: None,
            status: JobStatus::Queued,
            progress: 0.0,
            stage: None,
            error: None,
            created_at,
            started_at: None,
            completed_at: None,
            source_image_path: None,
            asset_id: None,
            reserved_asset_id: None,
            queue_position: None,
            revision: 0,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_source_image(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_image_path = Some(path.into());
        self
    }

    pub fn with_reserved_asset(mut self, asset_id: Option<String>) -> Self {
        self.reserved_asset_id = asset_id;
        self
    }

    pub fn with_queue_position(mut self, position: Option<u32>) -> Self {
        self.queue_position = position;
        self
    }

    /// Initial status as reported by the submission receipt. Only the two
    /// not-yet-started states are meaningful here.
    pub fn with_initial_status(mut self, status: JobStatus) -> Self {
        if status.is_waiting() {
            self.status = status;
        }
        self
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

impl PartialEq for JobRecord {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for JobRecord {}
