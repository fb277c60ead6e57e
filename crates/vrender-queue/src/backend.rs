//! Render backends the queue dispatches to.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;
use vrender_media::{MediaError, RenderCommand, RenderRunner, RenderScratch};
use vrender_models::JobId;

use crate::config::QueueConfig;
use crate::error::{QueueError, QueueResult};
use crate::output::{is_rate_limited, parse_result_url, RATE_LIMIT_MESSAGE};

/// Receives whole-job progress percentages.
pub type ProgressSink = Arc<dyn Fn(u8) + Send + Sync>;

/// Renders one spec and returns the result URL.
#[async_trait]
pub trait RenderBackend: Send + Sync + 'static {
    async fn render(
        &self,
        job_id: &JobId,
        render_spec: &serde_json::Value,
        progress: ProgressSink,
    ) -> QueueResult<String>;
}

/// Serverless renderer driven through its CLI.
///
/// The spec is handed over as a props file; the CLI prints the result URL
/// once the render service reports completion.
#[derive(Debug, Clone)]
pub struct CliRenderBackend {
    config: QueueConfig,
}

impl CliRenderBackend {
    pub fn new(config: QueueConfig) -> Self {
        Self { config }
    }

    fn command(&self, scratch: &RenderScratch) -> RenderCommand {
        let mut cmd = RenderCommand::new(&self.config.render_cli).args(&self.config.render_args);
        if let Some(serve_url) = &self.config.serve_url {
            cmd = cmd.arg(serve_url);
        }
        cmd.arg(&self.config.composition_id)
            .props_file(scratch.props_path())
    }
}

#[async_trait]
impl RenderBackend for CliRenderBackend {
    async fn render(
        &self,
        job_id: &JobId,
        render_spec: &serde_json::Value,
        progress: ProgressSink,
    ) -> QueueResult<String> {
        let scratch = RenderScratch::create(
            self.config.scratch_dir.as_deref(),
            job_id.as_str(),
            render_spec,
            "out.mp4",
        )
        .await?;

        let cmd = self.command(&scratch);
        let runner = RenderRunner::new().with_timeout(self.config.render_timeout);
        let result = runner
            .run_with_progress(&cmd, move |p| progress(p.percentage()))
            .await;
        scratch.cleanup().await;

        match result {
            Ok(output) => {
                let combined = output.combined();
                debug!(job_id = %job_id, "Render CLI finished");
                parse_result_url(&combined).ok_or_else(|| {
                    if is_rate_limited(&combined) {
                        QueueError::RateLimited(RATE_LIMIT_MESSAGE.to_string())
                    } else {
                        QueueError::submission_failed("render CLI reported no result URL")
                    }
                })
            }
            Err(e @ MediaError::RenderFailed { .. }) => {
                let output = e.output().unwrap_or_default();
                if is_rate_limited(output) {
                    Err(QueueError::RateLimited(RATE_LIMIT_MESSAGE.to_string()))
                } else {
                    Err(QueueError::submission_failed(format!(
                        "{}: {}",
                        e,
                        last_line(output)
                    )))
                }
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Last non-empty line of CLI output, usually the error summary.
fn last_line(output: &str) -> &str {
    output
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sink() -> ProgressSink {
        Arc::new(|_| {})
    }

    fn shell_backend(script: &str) -> CliRenderBackend {
        CliRenderBackend::new(QueueConfig {
            render_cli: "sh".to_string(),
            render_args: vec!["-c".to_string(), script.to_string()],
            ..Default::default()
        })
    }

    #[test]
    fn test_last_line() {
        assert_eq!(last_line("a\nError: boom\n\n"), "Error: boom");
        assert_eq!(last_line(""), "");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cli_result_url() {
        let backend = shell_backend("echo 'Rendered 1/1'; echo '+ S3 https://b.s3.amazonaws.com/renders/x/out.mp4'");
        let url = backend
            .render(&JobId::new(), &serde_json::json!({"duration": 1000}), sink())
            .await
            .unwrap();
        assert_eq!(url, "https://b.s3.amazonaws.com/renders/x/out.mp4");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cli_rate_limited() {
        let backend = shell_backend("echo 'TooManyRequestsException: Rate Exceeded.' 1>&2; exit 1");
        let err = backend
            .render(&JobId::new(), &serde_json::json!({}), sink())
            .await
            .unwrap_err();
        assert!(matches!(err, QueueError::RateLimited(_)));
        assert_eq!(err.kind(), vrender_models::JobErrorKind::RateLimit);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cli_failure_is_submission_error() {
        let backend = shell_backend("echo 'Error: bundle not found' 1>&2; exit 2");
        let err = backend
            .render(&JobId::new(), &serde_json::json!({}), sink())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), vrender_models::JobErrorKind::Submission);
        assert!(err.to_string().contains("bundle not found"));
    }
}
