use thiserror::Error;

use crate::job::{JobId, JobStatus};

/// A status change the lifecycle engine refuses to make.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("illegal transition for job {job_id}: cannot {action} a job that is {from}")]
pub struct IllegalTransition {
    pub job_id: JobId,
    pub from: JobStatus,
    pub action: &'static str,
}

/// A status string the backend sent that is not one of the known states.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown job status '{0}'")]
pub struct UnknownStatus(pub String);

/// Generation parameters that fail validation. Holds one message per field.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid generation parameters: {}", .0.join("; "))]
pub struct InvalidParameters(pub Vec<String>);
