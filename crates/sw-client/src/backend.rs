pub mod http;
pub mod schemas;

use std::path::PathBuf;

use async_trait::async_trait;
use sw_core::{
    GenerationParameters, JobId, JobPriority, JobStatus, JobType, QueueStatus, ReadinessSnapshot,
    StatusReport,
};

use crate::error::RemoteError;

pub use http::HttpBackend;

/// What a job is generated from.
#[derive(Debug, Clone, PartialEq)]
pub enum JobSource {
    Image(PathBuf),
    Text(String),
}

impl JobSource {
    pub fn job_type(&self) -> JobType {
        match self {
            Self::Image(_) => JobType::ImageTo3d,
            Self::Text(_) => JobType::TextTo3d,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubmitRequest {
    pub source: JobSource,
    pub name: Option<String>,
    pub parameters: GenerationParameters,
    pub priority: JobPriority,
    pub project_id: Option<String>,
    pub tags: Vec<String>,
}

impl SubmitRequest {
    pub fn image(path: impl Into<PathBuf>) -> Self {
        Self::new(JobSource::Image(path.into()))
    }

    pub fn text(prompt: impl Into<String>) -> Self {
        Self::new(JobSource::Text(prompt.into()))
    }

    fn new(source: JobSource) -> Self {
        Self {
            source,
            name: None,
            parameters: GenerationParameters::default(),
            priority: JobPriority::default(),
            project_id: None,
            tags: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_parameters(mut self, parameters: GenerationParameters) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_priority(mut self, priority: JobPriority) -> Self {
        self.priority = priority;
        self
    }
}

/// Backend acknowledgement of a submission.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitReceipt {
    pub job_id: JobId,
    pub asset_id: Option<String>,
    pub status: JobStatus,
    pub message: String,
    pub queue_position: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClearReceipt {
    pub message: String,
    pub cleared_count: usize,
}

/// Remote operations of the generation service.
///
/// Implementations own transport concerns (timeouts, encoding); callers only
/// see a result or a [`RemoteError`].
#[async_trait]
pub trait GenBackend: Send + Sync {
    async fn submit_job(&self, request: &SubmitRequest) -> Result<SubmitReceipt, RemoteError>;

    async fn fetch_job_status(&self, job_id: &str) -> Result<StatusReport, RemoteError>;

    async fn cancel_job(&self, job_id: &str) -> Result<String, RemoteError>;

    async fn retry_job(&self, job_id: &str) -> Result<String, RemoteError>;

    async fn pause_queue(&self) -> Result<String, RemoteError>;

    async fn resume_queue(&self) -> Result<String, RemoteError>;

    async fn clear_queue(&self) -> Result<ClearReceipt, RemoteError>;

    async fn fetch_queue_status(&self) -> Result<QueueStatus, RemoteError>;

    /// Fails only when the backend cannot be reached; "not ready yet" is a
    /// successful snapshot with `ready == false`.
    async fn fetch_readiness(&self) -> Result<ReadinessSnapshot, RemoteError>;
}
