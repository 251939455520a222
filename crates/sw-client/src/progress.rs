//! Live job progress over the backend's `/ws/progress` WebSocket.
//!
//! The backend broadcasts `progress` and `queue_status` messages to every
//! connected client. [`ProgressStream`] keeps one connection open, subscribes
//! to every active job after each (re)connect so their current state is
//! replayed, and feeds what it receives into the [`QueueController`]. A dropped
//! connection is retried with capped exponential backoff until cancelled.

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use sw_core::StatusReport;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;

use crate::backend::schemas::{ClientMessage, ServerMessage};
use crate::controller::QueueController;
use crate::error::{QueueError, RemoteError};

const PROGRESS_PATH: &str = "/ws/progress";

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressConfig {
    /// Full WebSocket URL, e.g. `ws://127.0.0.1:8000/ws/progress`.
    pub url: String,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl ProgressConfig {
    /// Stream URL on the same host as the REST API at `backend_url`.
    pub fn for_backend(backend_url: &str) -> Self {
        let base = backend_url.trim_end_matches('/');
        let base = match base.split_once("://") {
            Some(("https", rest)) => format!("wss://{rest}"),
            Some(("http", rest)) => format!("ws://{rest}"),
            _ => base.to_string(),
        };

        Self {
            url: format!("{base}{PROGRESS_PATH}"),
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

/// Next reconnect delay, clamped to `max_delay`.
pub fn next_delay(current: Duration, config: &ProgressConfig) -> Duration {
    let next_ms = (current.as_millis() as f64 * config.multiplier) as u64;
    Duration::from_millis(next_ms).min(config.max_delay)
}

pub struct ProgressStream {
    controller: Arc<QueueController>,
    config: ProgressConfig,
}

impl ProgressStream {
    pub fn new(controller: Arc<QueueController>, config: ProgressConfig) -> Self {
        Self { controller, config }
    }

    pub async fn connect(&self) -> Result<WsStream, RemoteError> {
        let (ws, _response) = connect_async(self.config.url.as_str())
            .await
            .map_err(|e| {
                RemoteError::Transport(format!("Failed to connect to {}: {e}", self.config.url))
            })?;
        tracing::info!(url = %self.config.url, "Progress stream connected");
        Ok(ws)
    }

    /// Keep a connection open until `cancel` fires.
    pub async fn run(&self, cancel: &CancellationToken) {
        let mut delay = self.config.initial_delay;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let connected = tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                result = self.connect() => result,
            };

            match connected {
                Ok(ws) => {
                    delay = self.config.initial_delay;
                    attempt = 0;
                    match self.forward(ws, cancel).await {
                        Ok(()) if cancel.is_cancelled() => return,
                        Ok(()) => tracing::info!("Progress stream closed by the backend"),
                        Err(e) => tracing::warn!(error = %e, "Progress stream dropped"),
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Progress stream unavailable",
                    );
                }
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }
            delay = next_delay(delay, &self.config);
        }
    }

    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(&cancel).await })
    }

    /// Subscribe to active jobs, then apply incoming messages until the
    /// connection closes or `cancel` fires.
    async fn forward(&self, ws: WsStream, cancel: &CancellationToken) -> Result<(), RemoteError> {
        let (mut sink, mut stream) = ws.split();

        for job_id in self.controller.active_ids().await {
            send(&mut sink, &ClientMessage::Subscribe { job_id }).await?;
        }

        loop {
            let frame = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    // Best effort; the backend drops us either way.
                    let _ = sink.close().await;
                    return Ok(());
                }
                frame = stream.next() => frame,
            };

            match frame {
                Some(Ok(Message::Text(text))) => handle_message(&self.controller, &text).await,
                Some(Ok(Message::Close(_))) | None => return Ok(()),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(RemoteError::Transport(e.to_string())),
            }
        }
    }
}

async fn send<S>(sink: &mut S, message: &ClientMessage) -> Result<(), RemoteError>
where
    S: futures::Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
{
    let text = serde_json::to_string(message)
        .map_err(|e| RemoteError::UnexpectedResponse(e.to_string()))?;
    sink.send(Message::Text(text))
        .await
        .map_err(|e| RemoteError::Transport(e.to_string()))
}

/// Apply one text frame from the stream.
pub async fn handle_message(controller: &QueueController, text: &str) {
    let message = match serde_json::from_str::<ServerMessage>(text) {
        Ok(message) => message,
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring progress stream message");
            return;
        }
    };

    match message {
        ServerMessage::Progress(progress) => {
            let report = match StatusReport::try_from(progress) {
                Ok(report) => report,
                Err(e) => {
                    tracing::warn!(error = %e, "Unreadable progress message");
                    return;
                }
            };
            let job_id = report.job_id.clone();
            match controller.apply_report(report).await {
                Ok(_) => {}
                // Broadcasts cover jobs submitted by other clients too.
                Err(QueueError::UnknownJob(_)) => {
                    tracing::trace!(job_id = %job_id, "Progress for an untracked job")
                }
                Err(e) => tracing::warn!(job_id = %job_id, error = %e, "Progress not applied"),
            }
        }
        ServerMessage::QueueStatus(status) => controller.apply_queue_status(status.into()).await,
        ServerMessage::Error { code, message, job_id } => {
            tracing::warn!(code = %code, job_id = ?job_id, "Backend reported: {message}");
        }
        ServerMessage::JobCreated { job_id, .. } => {
            tracing::debug!(job_id = %job_id, "Backend created a job");
        }
        ServerMessage::AssetReady { asset_id, .. } => {
            tracing::debug!(asset_id = %asset_id, "Asset ready");
        }
        ServerMessage::Pong => {}
    }
}
