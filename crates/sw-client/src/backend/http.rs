use std::path::Path;

use async_trait::async_trait;
use log::{debug, info};
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use sw_core::{QueueStatus, ReadinessSnapshot, StatusReport};

use crate::backend::schemas::{
    ClearResponse, ErrorResponse, JobCreateResponse, JobStatusResponse, MessageResponse,
    QueueStatusResponse,
};
use crate::backend::{ClearReceipt, GenBackend, JobSource, SubmitReceipt, SubmitRequest};
use crate::config::ClientConfig;
use crate::error::RemoteError;

const GENERATION: &str = "/api/generation";
const READY: &str = "/api/system/ready";

/// [`GenBackend`] over the backend's REST API.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(config: &ClientConfig) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| RemoteError::Transport(format!("Failed to build HTTP client: {e}")))?;

        info!("Using generation backend at {}", config.backend_url);

        Ok(Self {
            client,
            base_url: config.backend_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn job_url(&self, job_id: &str, suffix: &str) -> String {
        self.url(&format!("{GENERATION}/jobs/{job_id}{suffix}"))
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        refused: fn(StatusCode, String) -> RemoteError,
    ) -> Result<T, RemoteError> {
        let response = request
            .send()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| RemoteError::UnexpectedResponse(e.to_string()));
        }

        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ErrorResponse>(&body)
            .map(|err| err.message())
            .unwrap_or(body);
        debug!("Backend answered {status}: {detail}");

        Err(classify(status, detail, refused))
    }

    async fn action(&self, request: RequestBuilder) -> Result<String, RemoteError> {
        let resp: MessageResponse = self.send(request, action_refused).await?;
        Ok(resp.message)
    }

    async fn image_form(&self, path: &Path, request: &SubmitRequest) -> Result<Form, RemoteError> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            RemoteError::Validation(format!("Cannot read {}: {e}", path.display()))
        })?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        let mime = image::ImageFormat::from_path(path)
            .map(|format| format.to_mime_type())
            .unwrap_or("application/octet-stream");

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mime)
            .map_err(|e| RemoteError::Validation(e.to_string()))?;

        Ok(form_fields(request)
            .into_iter()
            .fold(Form::new().part("file", part), |form, (key, value)| form.text(key, value)))
    }
}

fn classify(
    status: StatusCode,
    detail: String,
    refused: fn(StatusCode, String) -> RemoteError,
) -> RemoteError {
    if status == StatusCode::NOT_IMPLEMENTED {
        RemoteError::Rejected(detail)
    } else if status.is_server_error() {
        RemoteError::Transport(format!("HTTP {status}: {detail}"))
    } else {
        refused(status, detail)
    }
}

fn action_refused(_status: StatusCode, detail: String) -> RemoteError {
    RemoteError::Rejected(detail)
}

fn submission_refused(status: StatusCode, detail: String) -> RemoteError {
    match status {
        StatusCode::BAD_REQUEST
        | StatusCode::PAYLOAD_TOO_LARGE
        | StatusCode::UNSUPPORTED_MEDIA_TYPE
        | StatusCode::UNPROCESSABLE_ENTITY => RemoteError::Validation(detail),
        _ => RemoteError::Rejected(detail),
    }
}

/// Form fields shared by both submission endpoints.
fn form_fields(request: &SubmitRequest) -> Vec<(&'static str, String)> {
    let params = &request.parameters;
    let mut fields = vec![
        ("inference_steps", params.inference_steps.to_string()),
        ("guidance_scale", params.guidance_scale.to_string()),
        ("octree_resolution", params.octree_resolution.to_string()),
        ("generate_texture", params.generate_texture.to_string()),
        ("output_format", params.output_format.as_str().to_string()),
        ("mode", params.mode.as_str().to_string()),
        ("priority", request.priority.as_str().to_string()),
    ];

    if let Some(name) = &request.name {
        fields.push(("name", name.clone()));
    }
    if let Some(seed) = params.seed {
        fields.push(("seed", seed.to_string()));
    }
    if let Some(faces) = params.face_count {
        fields.push(("face_count", faces.to_string()));
    }
    if let Some(project) = &request.project_id {
        fields.push(("project_id", project.clone()));
    }
    if !request.tags.is_empty() {
        fields.push(("tags", request.tags.join(",")));
    }
    if let JobSource::Text(prompt) = &request.source {
        fields.push(("prompt", prompt.clone()));
    }

    fields
}

#[async_trait]
impl GenBackend for HttpBackend {
    async fn submit_job(&self, request: &SubmitRequest) -> Result<SubmitReceipt, RemoteError> {
        let builder = match &request.source {
            JobSource::Image(path) => {
                let form = self.image_form(path, request).await?;
                self.client
                    .post(self.url(&format!("{GENERATION}/image-to-3d")))
                    .multipart(form)
            }
            JobSource::Text(_) => self
                .client
                .post(self.url(&format!("{GENERATION}/text-to-3d")))
                .form(&form_fields(request)),
        };

        let created: JobCreateResponse = self.send(builder, submission_refused).await?;
        SubmitReceipt::try_from(created)
    }

    async fn fetch_job_status(&self, job_id: &str) -> Result<StatusReport, RemoteError> {
        let resp: JobStatusResponse = self
            .send(self.client.get(self.job_url(job_id, "")), action_refused)
            .await?;
        StatusReport::try_from(resp)
    }

    async fn cancel_job(&self, job_id: &str) -> Result<String, RemoteError> {
        self.action(self.client.delete(self.job_url(job_id, ""))).await
    }

    async fn retry_job(&self, job_id: &str) -> Result<String, RemoteError> {
        self.action(self.client.post(self.job_url(job_id, "/retry"))).await
    }

    async fn pause_queue(&self) -> Result<String, RemoteError> {
        self.action(self.client.post(self.url(&format!("{GENERATION}/queue/pause"))))
            .await
    }

    async fn resume_queue(&self) -> Result<String, RemoteError> {
        self.action(self.client.post(self.url(&format!("{GENERATION}/queue/resume"))))
            .await
    }

    async fn clear_queue(&self) -> Result<ClearReceipt, RemoteError> {
        let resp: ClearResponse = self
            .send(
                self.client.delete(self.url(&format!("{GENERATION}/queue"))),
                action_refused,
            )
            .await?;
        Ok(resp.into())
    }

    async fn fetch_queue_status(&self) -> Result<QueueStatus, RemoteError> {
        let resp: QueueStatusResponse = self
            .send(
                self.client.get(self.url(&format!("{GENERATION}/queue/status"))),
                action_refused,
            )
            .await?;
        Ok(resp.into())
    }

    async fn fetch_readiness(&self) -> Result<ReadinessSnapshot, RemoteError> {
        let response = self
            .client
            .get(self.url(READY))
            .send()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        // Until the API is mounted any status is as good as no answer.
        if !response.status().is_success() {
            return Err(RemoteError::Transport(format!(
                "Readiness endpoint returned {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| RemoteError::UnexpectedResponse(e.to_string()))
    }
}
