use sw_core::{IllegalTransition, InvalidParameters, JobId, JobStatus};
use thiserror::Error;

/// Failure of a call to the generation backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Network or connection failure; the request may not have arrived.
    #[error("Could not reach backend: {0}")]
    Transport(String),

    /// The backend refused a submission. No job was created.
    #[error("Submission rejected: {0}")]
    Validation(String),

    /// The backend refused an action on an existing job or the queue.
    #[error("Backend refused request: {0}")]
    Rejected(String),

    /// The backend answered with something the client cannot interpret.
    #[error("Unexpected response from backend: {0}")]
    UnexpectedResponse(String),
}

impl RemoteError {
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueueError {
    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    IllegalTransition(#[from] IllegalTransition),

    #[error(transparent)]
    InvalidParameters(#[from] InvalidParameters),

    #[error("Job {0} is already tracked")]
    DuplicateJob(JobId),

    #[error("Job {0} is not tracked")]
    UnknownJob(JobId),

    #[error("Job {id} is still {status}; only finished jobs can be removed")]
    NotTerminal { id: JobId, status: JobStatus },

    #[error("Clearing the whole queue needs confirmation")]
    ConfirmationRequired,
}
