//! In-process render worker.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn, Instrument};
use vrender_media::{RenderCommand, RenderRunner, RenderScratch};
use vrender_models::{JobErrorKind, JobId, JobResult, JobStatus, RenderJob, RenderSpec};
use vrender_queue::{metrics, DownloadOutcome, JobLogger};

use crate::config::LocalWorkerConfig;
use crate::error::{WorkerError, WorkerResult};

const QUEUE_LABEL: &str = "local";
const OUTPUT_FILE: &str = "out.mp4";

/// Handle to the local worker. Clones share the same job table.
///
/// Jobs wait on a FIFO render lock so only one subprocess runs at a time.
#[derive(Clone)]
pub struct LocalRenderWorker {
    inner: Arc<Inner>,
}

struct Inner {
    config: LocalWorkerConfig,
    jobs: RwLock<HashMap<JobId, RenderJob>>,
    render_lock: Mutex<()>,
    shutdown_tx: watch::Sender<bool>,
}

impl LocalRenderWorker {
    pub fn new(config: LocalWorkerConfig) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                config,
                jobs: RwLock::new(HashMap::new()),
                render_lock: Mutex::new(()),
                shutdown_tx,
            }),
        }
    }

    /// Validate and start rendering a spec; returns without waiting.
    pub fn submit(&self, mut spec: RenderSpec) -> WorkerResult<JobId> {
        if *self.inner.shutdown_tx.borrow() {
            return Err(WorkerError::ShutDown);
        }
        spec.validate()?;
        if let Some(clamp) = spec.clamp_to_ceiling() {
            warn!(
                variation = %spec.variation.name,
                requested_ms = clamp.requested_ms,
                clamped_ms = clamp.clamped_ms,
                "Render duration exceeds ceiling, clamping"
            );
        }

        let job = RenderJob::new(serde_json::to_value(&spec)?);
        let id = job.id.clone();
        self.jobs_mut().insert(id.clone(), job);
        metrics::record_submitted(QUEUE_LABEL);
        info!(job_id = %id, variation = %spec.variation.name, "Local render job queued");

        let worker = self.clone();
        let job_id = id.clone();
        tokio::spawn(async move { worker.run(job_id).await });
        Ok(id)
    }

    pub fn status(&self, id: &JobId) -> Option<RenderJob> {
        self.jobs().get(id).cloned()
    }

    /// Jobs not yet holding the render lock.
    pub fn pending_len(&self) -> usize {
        self.jobs()
            .values()
            .filter(|job| job.status == JobStatus::Pending)
            .count()
    }

    pub fn remove(&self, id: &JobId) -> Option<RenderJob> {
        self.jobs_mut().remove(id)
    }

    /// Kill the running subprocess and fail every job still waiting.
    pub fn shutdown(&self) {
        info!("Local render worker shutting down");
        self.inner.shutdown_tx.send_replace(true);
    }

    /// Hand out the artifact of a completed job and forget the job.
    pub fn download(&self, id: &JobId) -> WorkerResult<DownloadOutcome> {
        let mut jobs = self.jobs_mut();
        let job = jobs
            .get(id)
            .ok_or_else(|| WorkerError::JobNotFound(id.to_string()))?;

        match job.status {
            JobStatus::Pending | JobStatus::Processing => Ok(DownloadOutcome::NotReady {
                status: job.status,
                progress: job.progress,
            }),
            JobStatus::Failed => Ok(DownloadOutcome::Failed {
                error: job.error.clone().unwrap_or_else(|| "Render failed".to_string()),
                kind: job.error_kind,
            }),
            JobStatus::Completed => {
                let Some(job) = jobs.remove(id) else {
                    return Err(WorkerError::JobNotFound(id.to_string()));
                };
                let file_name = job
                    .render_spec
                    .pointer("/variation/name")
                    .and_then(|name| name.as_str())
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("{}.mp4", job.id));
                match job.result {
                    Some(JobResult::Bytes { data, .. }) => {
                        metrics::record_download(QUEUE_LABEL, "ok");
                        Ok(DownloadOutcome::Ready { file_name, data })
                    }
                    _ => Err(WorkerError::internal(format!(
                        "job {} completed without an artifact",
                        id
                    ))),
                }
            }
        }
    }

    async fn run(&self, id: JobId) {
        let logger = JobLogger::new(&id, QUEUE_LABEL);
        let _guard = self.inner.render_lock.lock().await;

        let render_spec = {
            let mut jobs = self.jobs_mut();
            let Some(job) = jobs.get_mut(&id) else {
                debug!(job_id = %id, "Job removed before rendering");
                return;
            };
            if *self.inner.shutdown_tx.borrow() {
                job.fail(JobErrorKind::Cancelled, "worker shut down before the job started");
                metrics::record_failed(QUEUE_LABEL, JobErrorKind::Cancelled);
                return;
            }
            job.start();
            job.render_spec.clone()
        };
        metrics::set_processing(QUEUE_LABEL, true);
        logger.log_start("spawning render CLI");

        let result = self
            .render(&id, &render_spec)
            .instrument(logger.create_span())
            .await;
        metrics::set_processing(QUEUE_LABEL, false);

        let mut jobs = self.jobs_mut();
        let Some(job) = jobs.get_mut(&id) else {
            logger.log_warning("job removed while rendering, discarding artifact");
            return;
        };
        match result {
            Ok(data) => {
                logger.log_completion(&format!("{} bytes", data.len()));
                job.complete(JobResult::bytes(data));
                metrics::record_completed(QUEUE_LABEL);
            }
            Err(e) => {
                let kind = e.kind();
                logger.log_error(&e.to_string());
                job.fail(kind, e.to_string());
                metrics::record_failed(QUEUE_LABEL, kind);
            }
        }
    }

    /// Write the props, run the CLI and load the output. The scratch
    /// directory is removed whatever the outcome.
    async fn render(&self, id: &JobId, render_spec: &serde_json::Value) -> WorkerResult<Vec<u8>> {
        let config = &self.inner.config;
        let scratch = RenderScratch::create(
            config.scratch_dir.as_deref(),
            id.as_str(),
            render_spec,
            OUTPUT_FILE,
        )
        .await?;

        let cmd = RenderCommand::new(&config.render_cli)
            .args(&config.render_args)
            .arg(&config.entry_point)
            .arg(&config.composition_id)
            .output(scratch.output_path())
            .props_file(scratch.props_path());
        let runner = RenderRunner::new()
            .with_timeout(config.render_timeout)
            .with_cancel(self.inner.shutdown_tx.subscribe());

        let worker = self.clone();
        let job_id = id.clone();
        let result = match runner
            .run_with_progress(&cmd, move |p| worker.set_progress(&job_id, p.percentage()))
            .await
        {
            Ok(_) => scratch.read_output().await,
            Err(e) => Err(e),
        };
        scratch.cleanup().await;
        result.map_err(WorkerError::from)
    }

    fn set_progress(&self, id: &JobId, percent: u8) {
        if let Some(job) = self.jobs_mut().get_mut(id) {
            job.set_progress(percent);
        }
    }

    fn jobs(&self) -> RwLockReadGuard<'_, HashMap<JobId, RenderJob>> {
        self.inner.jobs.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn jobs_mut(&self) -> RwLockWriteGuard<'_, HashMap<JobId, RenderJob>> {
        self.inner.jobs.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;
    use vrender_models::{PlatformConfig, VariationSummary, MAX_RENDER_DURATION_MS};

    fn spec(name: &str) -> RenderSpec {
        RenderSpec {
            variation: VariationSummary {
                name: name.to_string(),
                ..Default::default()
            },
            text_overlays: Vec::new(),
            platform: PlatformConfig::default(),
            duration: 3000,
            video_track_items: Vec::new(),
            audio_track_items: Vec::new(),
            progress_bar: None,
            speed_factor: 1.0,
            duration_clamp: None,
        }
    }

    /// Worker whose CLI is a shell script. Positional parameters are
    /// `$0` entry, `$1` composition, `$2` output, `$3` props flag.
    fn shell_worker(script: &str, scratch: &TempDir, timeout: Duration) -> LocalRenderWorker {
        LocalRenderWorker::new(LocalWorkerConfig {
            render_cli: "sh".to_string(),
            render_args: vec!["-c".to_string(), script.to_string()],
            render_timeout: timeout,
            scratch_dir: Some(scratch.path().to_path_buf()),
            ..Default::default()
        })
    }

    async fn wait_terminal(worker: &LocalRenderWorker, id: &JobId) -> RenderJob {
        tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                if let Some(job) = worker.status(id).filter(|job| job.is_terminal()) {
                    return job;
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .expect("job did not finish")
    }

    fn scratch_is_empty(scratch: &TempDir) -> bool {
        std::fs::read_dir(scratch.path()).unwrap().next().is_none()
    }

    #[tokio::test]
    async fn test_render_loads_artifact_and_cleans_up() {
        let scratch = TempDir::new().unwrap();
        let worker = shell_worker(
            r#"echo 'Rendered 5/10'; printf video > "$2""#,
            &scratch,
            Duration::from_secs(5),
        );
        let id = worker.submit(spec("M-video.mp4")).unwrap();

        let job = wait_terminal(&worker, &id).await;
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress, 100);
        assert!(scratch_is_empty(&scratch));

        match worker.download(&id).unwrap() {
            DownloadOutcome::Ready { file_name, data } => {
                assert_eq!(file_name, "M-video.mp4");
                assert_eq!(data, b"video");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert!(worker.status(&id).is_none());
    }

    #[tokio::test]
    async fn test_missing_output_fails_job() {
        let scratch = TempDir::new().unwrap();
        let worker = shell_worker("true", &scratch, Duration::from_secs(5));
        let id = worker.submit(spec("a.mp4")).unwrap();

        let job = wait_terminal(&worker, &id).await;
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.error.unwrap().contains("not created"));
        assert!(scratch_is_empty(&scratch));
    }

    #[tokio::test]
    async fn test_subprocess_timeout() {
        let scratch = TempDir::new().unwrap();
        let worker = shell_worker("sleep 5", &scratch, Duration::from_millis(200));
        let id = worker.submit(spec("a.mp4")).unwrap();

        let job = wait_terminal(&worker, &id).await;
        assert_eq!(job.error_kind, Some(JobErrorKind::Timeout));
        assert!(scratch_is_empty(&scratch));
    }

    #[tokio::test]
    async fn test_jobs_render_one_at_a_time() {
        let scratch = TempDir::new().unwrap();
        let worker = shell_worker(
            r#"sleep 0.2; printf x > "$2""#,
            &scratch,
            Duration::from_secs(5),
        );
        let first = worker.submit(spec("a.mp4")).unwrap();
        let second = worker.submit(spec("b.mp4")).unwrap();

        let first = wait_terminal(&worker, &first).await;
        let second = wait_terminal(&worker, &second).await;
        assert_eq!(first.status, JobStatus::Completed);
        assert_eq!(second.status, JobStatus::Completed);
        assert!(second.started_at.unwrap() >= first.completed_at.unwrap());
    }

    #[tokio::test]
    async fn test_invalid_spec_rejected() {
        let scratch = TempDir::new().unwrap();
        let worker = shell_worker("true", &scratch, Duration::from_secs(5));
        let mut bad = spec("a.mp4");
        bad.speed_factor = 0.0;
        assert!(matches!(worker.submit(bad), Err(WorkerError::Validation(_))));
    }

    #[tokio::test]
    async fn test_over_ceiling_duration_clamped_at_submission() {
        let scratch = TempDir::new().unwrap();
        let worker = shell_worker(r#"printf x > "$2""#, &scratch, Duration::from_secs(5));
        let mut long = spec("a.mp4");
        long.duration = 400_000;
        let id = worker.submit(long).unwrap();

        let job = worker.status(&id).unwrap();
        assert_eq!(job.render_spec["duration"], MAX_RENDER_DURATION_MS);
        assert_eq!(job.render_spec["durationClamp"]["requestedMs"], 400_000);
        assert_eq!(wait_terminal(&worker, &id).await.status, JobStatus::Completed);
    }

    #[tokio::test]
    async fn test_shutdown_fails_waiting_jobs() {
        let scratch = TempDir::new().unwrap();
        let worker = shell_worker("sleep 5", &scratch, Duration::from_secs(30));
        let first = worker.submit(spec("a.mp4")).unwrap();
        let second = worker.submit(spec("b.mp4")).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        worker.shutdown();

        assert_eq!(
            wait_terminal(&worker, &first).await.error_kind,
            Some(JobErrorKind::Cancelled)
        );
        assert_eq!(
            wait_terminal(&worker, &second).await.error_kind,
            Some(JobErrorKind::Cancelled)
        );
        assert!(matches!(worker.submit(spec("c.mp4")), Err(WorkerError::ShutDown)));
    }
}
