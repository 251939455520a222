//! Wire shapes of the backend's JSON bodies and their mapping onto core types.
//!
//! Status strings are parsed into [`JobStatus`] here; anything unknown is an
//! [`RemoteError::UnexpectedResponse`] rather than being passed through.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sw_core::{JobStatus, QueueStatus, StatusReport};

use crate::backend::{ClearReceipt, SubmitReceipt};
use crate::error::RemoteError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobCreateResponse {
    pub job_id: String,
    pub asset_id: Option<String>,
    pub status: String,
    pub message: Option<String>,
    pub queue_position: Option<u32>,
}

impl TryFrom<JobCreateResponse> for SubmitReceipt {
    type Error = RemoteError;

    fn try_from(resp: JobCreateResponse) -> Result<Self, Self::Error> {
        Ok(Self {
            status: parse_status(&resp.status)?,
            job_id: resp.job_id,
            asset_id: resp.asset_id,
            message: resp.message.unwrap_or_else(|| "Job queued for processing".to_string()),
            queue_position: resp.queue_position,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobStatusResponse {
    pub job_id: String,
    pub asset_id: Option<String>,
    pub status: String,
    /// Fraction in `[0, 1]`.
    #[serde(default)]
    pub progress: f32,
    pub stage: Option<String>,
    pub message: Option<String>,
    pub error: Option<String>,
    #[serde(default, with = "wire_time")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, with = "wire_time")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<JobStatusResponse> for StatusReport {
    type Error = RemoteError;

    fn try_from(resp: JobStatusResponse) -> Result<Self, Self::Error> {
        Ok(Self {
            status: parse_status(&resp.status)?,
            job_id: resp.job_id,
            progress: fraction_to_percent(resp.progress),
            stage: resp.stage,
            error: resp.error,
            asset_id: resp.asset_id,
            queue_position: None,
            started_at: resp.started_at,
            completed_at: resp.completed_at,
        })
    }
}

/// `progress` message broadcast on the progress stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProgressMessage {
    pub job_id: String,
    #[serde(default)]
    pub asset_id: Option<String>,
    #[serde(default)]
    pub progress: f32,
    #[serde(default)]
    pub stage: Option<String>,
    pub status: String,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl TryFrom<ProgressMessage> for StatusReport {
    type Error = RemoteError;

    fn try_from(msg: ProgressMessage) -> Result<Self, Self::Error> {
        let asset_id = msg.asset_id.or_else(|| {
            msg.result
                .as_ref()
                .and_then(|result| result.get("asset_id"))
                .and_then(|id| id.as_str())
                .map(str::to_string)
        });

        Ok(Self {
            status: parse_status(&msg.status)?,
            job_id: msg.job_id,
            progress: fraction_to_percent(msg.progress),
            stage: msg.stage,
            error: msg.error,
            asset_id,
            queue_position: None,
            started_at: None,
            completed_at: None,
        })
    }
}

/// Body of `GET /api/generation/queue/status` and of `queue_status` messages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueueStatusResponse {
    pub queue_size: usize,
    #[serde(default)]
    pub current_job_id: Option<String>,
    pub pending_count: usize,
    pub processing_count: usize,
    pub completed_count: usize,
    #[serde(default)]
    pub failed_count: usize,
}

impl From<QueueStatusResponse> for QueueStatus {
    fn from(resp: QueueStatusResponse) -> Self {
        Self {
            queue_size: resp.queue_size,
            current_job_id: resp.current_job_id,
            pending_count: resp.pending_count,
            processing_count: resp.processing_count,
            completed_count: resp.completed_count,
            failed_count: resp.failed_count,
        }
    }
}

/// Messages the backend sends on the progress stream.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Progress(ProgressMessage),
    QueueStatus(QueueStatusResponse),
    JobCreated {
        job_id: String,
        #[serde(default)]
        asset_id: Option<String>,
    },
    AssetReady {
        asset_id: String,
        #[serde(default)]
        name: Option<String>,
    },
    Error {
        code: String,
        message: String,
        #[serde(default)]
        job_id: Option<String>,
    },
    Pong,
}

/// Messages the client sends on the progress stream.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientMessage {
    Subscribe { job_id: String },
    Unsubscribe { job_id: String },
    RequestStatus,
    Ping,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClearResponse {
    pub message: String,
    #[serde(default)]
    pub cleared_count: usize,
}

impl From<ClearResponse> for ClearReceipt {
    fn from(resp: ClearResponse) -> Self {
        Self {
            message: resp.message,
            cleared_count: resp.cleared_count,
        }
    }
}

/// Error body of a refused request.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    pub detail: serde_json::Value,
}

impl ErrorResponse {
    pub fn message(&self) -> String {
        match &self.detail {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

fn parse_status(raw: &str) -> Result<JobStatus, RemoteError> {
    raw.parse()
        .map_err(|e: sw_core::UnknownStatus| RemoteError::UnexpectedResponse(e.to_string()))
}

fn fraction_to_percent(fraction: f32) -> f32 {
    fraction * 100.0
}

/// Timestamps arrive either as RFC 3339 or as naive UTC (`2025-01-31T10:00:00.123`).
mod wire_time {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<DateTime<Utc>>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(dt) => s.serialize_some(&dt.to_rfc3339()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        raw.map(|s| parse(&s).map_err(de::Error::custom)).transpose()
    }

    pub fn parse(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        match DateTime::parse_from_rfc3339(raw) {
            Ok(dt) => Ok(dt.with_timezone(&Utc)),
            Err(_) => NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").map(|n| n.and_utc()),
        }
    }
}
