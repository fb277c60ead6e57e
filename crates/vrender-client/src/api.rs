//! Render API HTTP client.

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use vrender_models::{JobId, JobStatus, RenderJob};

use crate::error::{ClientError, ClientResult};

/// Body returned by a render submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub job_id: JobId,
    pub status: JobStatus,
    pub polling_url: String,
    pub download_url: String,
}

/// Answer of the download endpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteDownload {
    /// Render still pending or processing
    Pending,
    /// Render failed on the server
    Failed(String),
    Ready {
        file_name: Option<String>,
        data: Vec<u8>,
    },
}

/// Operations the download manager needs from the render service.
#[async_trait]
pub trait RenderApi: Send + Sync {
    async fn submit(&self, render_spec: &serde_json::Value) -> ClientResult<SubmitResponse>;

    async fn status(&self, job_id: &JobId) -> ClientResult<RenderJob>;

    async fn download(&self, job_id: &JobId) -> ClientResult<RemoteDownload>;

    /// Fetch a plain URL.
    async fn fetch(&self, url: &str) -> ClientResult<Vec<u8>>;
}

/// Configuration for the render API client.
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

impl ApiClientConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("RENDER_API_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            timeout: Duration::from_secs(
                std::env::var("RENDER_API_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(120),
            ),
        }
    }
}

/// reqwest implementation of [`RenderApi`].
pub struct HttpRenderApi {
    http: Client,
    config: ApiClientConfig,
}

impl HttpRenderApi {
    pub fn new(config: ApiClientConfig) -> ClientResult<Self> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    pub fn from_env() -> ClientResult<Self> {
        Self::new(ApiClientConfig::from_env())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl RenderApi for HttpRenderApi {
    async fn submit(&self, render_spec: &serde_json::Value) -> ClientResult<SubmitResponse> {
        let url = self.url("/api/render");
        debug!("Submitting render to {}", url);

        let response = self.http.post(&url).json(render_spec).send().await?;
        if !response.status().is_success() {
            return Err(error_from(response).await);
        }
        Ok(response.json().await?)
    }

    async fn status(&self, job_id: &JobId) -> ClientResult<RenderJob> {
        let response = self
            .http
            .get(self.url(&format!("/api/render/{}", job_id)))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound(job_id.to_string()));
        }
        if !response.status().is_success() {
            return Err(error_from(response).await);
        }
        Ok(response.json().await?)
    }

    async fn download(&self, job_id: &JobId) -> ClientResult<RemoteDownload> {
        let response = self
            .http
            .put(self.url(&format!("/api/render/{}/download", job_id)))
            .send()
            .await?;

        match response.status() {
            StatusCode::ACCEPTED => Ok(RemoteDownload::Pending),
            StatusCode::NOT_FOUND => Err(ClientError::NotFound(job_id.to_string())),
            StatusCode::INTERNAL_SERVER_ERROR => {
                let body = response.text().await.unwrap_or_default();
                Ok(RemoteDownload::Failed(detail_of(&body)))
            }
            status if status.is_success() => {
                let file_name = response
                    .headers()
                    .get(header::CONTENT_DISPOSITION)
                    .and_then(|value| value.to_str().ok())
                    .and_then(attachment_file_name);
                let data = response.bytes().await?.to_vec();
                Ok(RemoteDownload::Ready { file_name, data })
            }
            _ => Err(error_from(response).await),
        }
    }

    async fn fetch(&self, url: &str) -> ClientResult<Vec<u8>> {
        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            return Err(error_from(response).await);
        }
        Ok(response.bytes().await?.to_vec())
    }
}

async fn error_from(response: reqwest::Response) -> ClientError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    ClientError::api(status, detail_of(&body))
}

/// `detail` of a JSON error body, or the raw body.
fn detail_of(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

/// File name of an `attachment; filename="..."` header.
fn attachment_file_name(value: &str) -> Option<String> {
    value
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("filename="))
        .map(|name| name.trim_matches('"').to_string())
        .filter(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn api_for(server: &MockServer) -> HttpRenderApi {
        HttpRenderApi::new(ApiClientConfig {
            base_url: server.uri(),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[test]
    fn test_attachment_file_name() {
        assert_eq!(
            attachment_file_name(r#"attachment; filename="M-video.mp4""#).as_deref(),
            Some("M-video.mp4")
        );
        assert!(attachment_file_name("inline").is_none());
    }

    #[test]
    fn test_detail_of() {
        assert_eq!(detail_of(r#"{"detail":"boom","code":"x"}"#), "boom");
        assert_eq!(detail_of("plain"), "plain");
    }

    #[tokio::test]
    async fn test_submit() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/render"))
            .respond_with(ResponseTemplate::new(202).set_body_json(serde_json::json!({
                "jobId": "job-1",
                "status": "pending",
                "pollingUrl": "/api/render/job-1",
                "downloadUrl": "/api/render/job-1/download",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = api_for(&server)
            .await
            .submit(&serde_json::json!({"duration": 1000}))
            .await
            .unwrap();
        assert_eq!(response.job_id, JobId::from_string("job-1"));
        assert_eq!(response.status, JobStatus::Pending);
    }

    #[tokio::test]
    async fn test_status_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/render/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "detail": "Job not found", "code": "not_found"
            })))
            .mount(&server)
            .await;

        let err = api_for(&server)
            .await
            .status(&JobId::from_string("missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_status_parses_job() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/render/job-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "job-2",
                "status": "processing",
                "progress": 42,
                "createdAt": "2026-01-01T00:00:00Z",
                "startedAt": "2026-01-01T00:00:02Z",
            })))
            .mount(&server)
            .await;

        let job = api_for(&server)
            .await
            .status(&JobId::from_string("job-2"))
            .await
            .unwrap();
        assert_eq!(job.status, JobStatus::Processing);
        assert_eq!(job.progress, 42);
    }

    #[tokio::test]
    async fn test_download_states() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/render/pending/download"))
            .respond_with(ResponseTemplate::new(202))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/api/render/failed/download"))
            .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
                "detail": "Render failed: rate exceeded", "code": "render_failed"
            })))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/api/render/done/download"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "video/mp4")
                    .insert_header("content-disposition", r#"attachment; filename="1-video.mp4""#)
                    .set_body_bytes(b"mp4".to_vec()),
            )
            .mount(&server)
            .await;

        let api = api_for(&server).await;
        assert_eq!(
            api.download(&JobId::from_string("pending")).await.unwrap(),
            RemoteDownload::Pending
        );
        assert_eq!(
            api.download(&JobId::from_string("failed")).await.unwrap(),
            RemoteDownload::Failed("Render failed: rate exceeded".to_string())
        );
        assert_eq!(
            api.download(&JobId::from_string("done")).await.unwrap(),
            RemoteDownload::Ready {
                file_name: Some("1-video.mp4".to_string()),
                data: b"mp4".to_vec(),
            }
        );
    }
}
