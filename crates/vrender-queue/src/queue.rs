//! Single-worker FIFO render queue.
//!
//! Jobs are processed strictly one at a time: a boolean lock admits a single
//! worker, which pops the head of the pending list, renders it, releases
//! the lock and schedules the next pop after a cooldown. The job table is
//! only written by the lock holder and by submission/removal; readers may
//! observe a job in any state, or not at all once it is removed.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn, Instrument};
use vrender_models::{JobErrorKind, JobId, JobResult, JobStatus, RenderJob, RenderSpec};
use vrender_storage::{fetch_with_retry, object_key_from_url, ObjectStore};

use crate::backend::{ProgressSink, RenderBackend};
use crate::config::QueueConfig;
use crate::error::{QueueError, QueueResult};
use crate::logging::JobLogger;
use crate::metrics;

const QUEUE_LABEL: &str = "remote";

/// Result of the explicit download step.
#[derive(Debug)]
pub enum DownloadOutcome {
    /// Still pending or processing
    NotReady { status: JobStatus, progress: u8 },
    /// The render failed; the job is kept for inspection
    Failed {
        error: String,
        kind: Option<JobErrorKind>,
    },
    /// Artifact fetched; the job has been removed
    Ready { file_name: String, data: Vec<u8> },
}

/// Handle to the remote render queue. Clones share the same queue.
#[derive(Clone)]
pub struct RenderQueue {
    inner: Arc<Inner>,
}

struct Inner {
    config: QueueConfig,
    backend: Arc<dyn RenderBackend>,
    store: Option<Arc<dyn ObjectStore>>,
    jobs: RwLock<HashMap<JobId, RenderJob>>,
    pending: Mutex<VecDeque<JobId>>,
    processing: AtomicBool,
    /// No job starts before this instant
    resume_at: Mutex<Option<Instant>>,
    shutdown_tx: watch::Sender<bool>,
}

impl RenderQueue {
    pub fn new(
        config: QueueConfig,
        backend: Arc<dyn RenderBackend>,
        store: Option<Arc<dyn ObjectStore>>,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                config,
                backend,
                store,
                jobs: RwLock::new(HashMap::new()),
                pending: Mutex::new(VecDeque::new()),
                processing: AtomicBool::new(false),
                resume_at: Mutex::new(None),
                shutdown_tx,
            }),
        }
    }

    /// Validate and enqueue a render spec; returns without waiting.
    pub fn submit(&self, mut spec: RenderSpec) -> QueueResult<JobId> {
        if self.is_shut_down() {
            return Err(QueueError::ShutDown);
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
        let depth = {
            let mut pending = lock(&self.inner.pending);
            pending.push_back(id.clone());
            pending.len()
        };

        metrics::record_submitted(QUEUE_LABEL);
        metrics::set_queue_depth(QUEUE_LABEL, depth);
        info!(job_id = %id, variation = %spec.variation.name, depth, "Render job queued");

        self.spawn_processing();
        Ok(id)
    }

    /// Snapshot of a job.
    pub fn status(&self, id: &JobId) -> Option<RenderJob> {
        self.jobs().get(id).cloned()
    }

    /// Number of jobs waiting for the worker.
    pub fn pending_len(&self) -> usize {
        lock(&self.inner.pending).len()
    }

    pub fn is_processing(&self) -> bool {
        self.inner.processing.load(Ordering::Acquire)
    }

    /// Drop a job from the table and the pending list.
    ///
    /// A job already handed to the render service keeps running remotely;
    /// its outcome is discarded.
    pub fn remove(&self, id: &JobId) -> Option<RenderJob> {
        lock(&self.inner.pending).retain(|pending| pending != id);
        self.jobs_mut().remove(id)
    }

    /// Stop starting new jobs and reject further submissions.
    pub fn shutdown(&self) {
        info!("Render queue shutting down");
        self.inner.shutdown_tx.send_replace(true);
    }

    pub fn is_shut_down(&self) -> bool {
        *self.inner.shutdown_tx.borrow()
    }

    /// Fetch the artifact of a completed job.
    ///
    /// On success the job record is deleted. A failed fetch leaves the job
    /// untouched so the download can be retried without re-rendering.
    pub async fn download(&self, id: &JobId) -> QueueResult<DownloadOutcome> {
        let job = self
            .status(id)
            .ok_or_else(|| QueueError::JobNotFound(id.to_string()))?;

        let url = match (job.status, &job.result) {
            (JobStatus::Pending | JobStatus::Processing, _) => {
                return Ok(DownloadOutcome::NotReady {
                    status: job.status,
                    progress: job.progress,
                });
            }
            (JobStatus::Failed, _) => {
                metrics::record_download(QUEUE_LABEL, "failed_job");
                return Ok(DownloadOutcome::Failed {
                    error: job.error.unwrap_or_else(|| "Render failed".to_string()),
                    kind: job.error_kind,
                });
            }
            (JobStatus::Completed, Some(JobResult::Url { url })) => url.clone(),
            (JobStatus::Completed, _) => {
                return Err(QueueError::internal(format!(
                    "job {} completed without a result URL",
                    id
                )));
            }
        };

        let store = self
            .inner
            .store
            .as_ref()
            .ok_or(QueueError::StorageNotConfigured)?;
        let fetched = match object_key_from_url(&url, store.bucket()) {
            Ok(key) => {
                debug!(job_id = %id, key = %key, "Fetching render artifact");
                fetch_with_retry(store.as_ref(), &key, &self.inner.config.fetch).await
            }
            Err(e) => Err(e),
        };

        let data = match fetched {
            Ok(data) => data,
            Err(e) => {
                warn!(job_id = %id, "Artifact fetch failed, keeping job for retry: {}", e);
                metrics::record_download(QUEUE_LABEL, "fetch_failed");
                return Err(e.into());
            }
        };

        self.remove(id);
        metrics::record_download(QUEUE_LABEL, "ok");
        info!(job_id = %id, size = data.len(), "Render artifact downloaded, job removed");
        Ok(DownloadOutcome::Ready {
            file_name: output_file_name(&job),
            data,
        })
    }

    fn spawn_processing(&self) {
        let queue = self.clone();
        tokio::spawn(async move { queue.process_next().await });
    }

    fn spawn_after(&self, at: Instant) {
        let queue = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep_until(at).await;
            queue.process_next().await;
        });
    }

    /// Take the lock, run the head of the queue, release, schedule the next.
    async fn process_next(&self) {
        if self.is_shut_down() {
            return;
        }
        if self
            .inner
            .processing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        let cooling_until = *lock(&self.inner.resume_at);
        if let Some(at) = cooling_until.filter(|at| *at > Instant::now()) {
            self.inner.processing.store(false, Ordering::Release);
            debug!("Queue cooling down, deferring");
            self.spawn_after(at);
            return;
        }

        let next = lock(&self.inner.pending).pop_front();
        let Some(id) = next else {
            self.inner.processing.store(false, Ordering::Release);
            return;
        };
        metrics::set_queue_depth(QUEUE_LABEL, self.pending_len());
        metrics::set_processing(QUEUE_LABEL, true);

        self.run_job(&id).await;

        let resume = Instant::now() + self.inner.config.cooldown;
        *lock(&self.inner.resume_at) = Some(resume);
        self.inner.processing.store(false, Ordering::Release);
        metrics::set_processing(QUEUE_LABEL, false);

        if self.pending_len() > 0 {
            self.spawn_after(resume);
        }
    }

    async fn run_job(&self, id: &JobId) {
        let render_spec = {
            let mut jobs = self.jobs_mut();
            let Some(job) = jobs.get_mut(id) else {
                debug!(job_id = %id, "Job removed before processing");
                return;
            };
            job.start();
            job.render_spec.clone()
        };

        let logger = JobLogger::new(id, QUEUE_LABEL);
        logger.log_start("submitting to render service");

        let progress: ProgressSink = {
            let queue = self.clone();
            let id = id.clone();
            Arc::new(move |percent| queue.set_progress(&id, percent))
        };

        // Run on its own task so a panicking backend still releases the lock.
        let backend = Arc::clone(&self.inner.backend);
        let job_id = id.clone();
        let handle = tokio::spawn(
            async move { backend.render(&job_id, &render_spec, progress).await }
                .instrument(logger.create_span()),
        );
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => Err(QueueError::internal(format!("render task aborted: {}", e))),
        };

        let mut jobs = self.jobs_mut();
        let Some(job) = jobs.get_mut(id) else {
            logger.log_warning("job removed while rendering, discarding outcome");
            return;
        };
        match result {
            Ok(url) => {
                logger.log_completion(&url);
                job.complete(JobResult::url(url));
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

    fn set_progress(&self, id: &JobId, percent: u8) {
        if let Some(job) = self.jobs_mut().get_mut(id) {
            if job.status == JobStatus::Processing {
                job.set_progress(percent);
            }
        }
    }

    fn jobs(&self) -> std::sync::RwLockReadGuard<'_, HashMap<JobId, RenderJob>> {
        self.inner.jobs.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn jobs_mut(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<JobId, RenderJob>> {
        self.inner.jobs.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Download file name: the variation name carried by the render spec.
fn output_file_name(job: &RenderJob) -> String {
    job.render_spec
        .pointer("/variation/name")
        .and_then(|name| name.as_str())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("{}.mp4", job.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::time::Duration;
    use vrender_models::{PlatformConfig, VariationSummary, MAX_RENDER_DURATION_MS};
    use vrender_storage::{FetchRetryConfig, StorageError, StorageResult};

    fn spec(name: &str) -> RenderSpec {
        RenderSpec {
            variation: VariationSummary {
                name: name.to_string(),
                ..Default::default()
            },
            text_overlays: Vec::new(),
            platform: PlatformConfig::default(),
            duration: 5000,
            video_track_items: Vec::new(),
            audio_track_items: Vec::new(),
            progress_bar: None,
            speed_factor: 1.0,
            duration_clamp: None,
        }
    }

    /// Takes one second per job and records start times and completion order.
    #[derive(Default)]
    struct FakeBackend {
        started: Mutex<Vec<Instant>>,
        finished: Mutex<Vec<String>>,
        fail_with_rate_limit: bool,
    }

    #[async_trait]
    impl RenderBackend for FakeBackend {
        async fn render(
            &self,
            job_id: &JobId,
            render_spec: &serde_json::Value,
            progress: ProgressSink,
        ) -> QueueResult<String> {
            lock(&self.started).push(Instant::now());
            progress(50);
            tokio::time::sleep(Duration::from_secs(1)).await;
            if self.fail_with_rate_limit {
                return Err(QueueError::RateLimited(crate::RATE_LIMIT_MESSAGE.to_string()));
            }
            let name = render_spec["variation"]["name"].as_str().unwrap_or_default();
            lock(&self.finished).push(name.to_string());
            Ok(format!("https://bucket.s3.amazonaws.com/renders/{}/{}", job_id, name))
        }
    }

    struct MemoryStore {
        fail: bool,
    }

    #[async_trait]
    impl ObjectStore for MemoryStore {
        fn bucket(&self) -> &str {
            "bucket"
        }

        async fn get_bytes(&self, key: &str) -> StorageResult<Vec<u8>> {
            if self.fail {
                Err(StorageError::not_found(key))
            } else {
                Ok(key.as_bytes().to_vec())
            }
        }
    }

    fn queue(backend: Arc<FakeBackend>, store: Option<MemoryStore>) -> RenderQueue {
        let config = QueueConfig {
            fetch: FetchRetryConfig {
                max_retries: 3,
                backoff: Duration::from_secs(3),
            },
            ..Default::default()
        };
        RenderQueue::new(
            config,
            backend,
            store.map(|s| Arc::new(s) as Arc<dyn ObjectStore>),
        )
    }

    async fn wait_terminal(queue: &RenderQueue, id: &JobId) -> RenderJob {
        loop {
            if let Some(job) = queue.status(id) {
                if job.is_terminal() {
                    return job;
                }
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_job_processing_at_a_time_in_fifo_order() {
        let backend = Arc::new(FakeBackend::default());
        let queue = queue(Arc::clone(&backend), None);

        let ids: Vec<JobId> = ["a.mp4", "b.mp4", "c.mp4"]
            .iter()
            .map(|name| queue.submit(spec(name)).unwrap())
            .collect();

        let mut saw_processing = false;
        for _ in 0..120 {
            let processing = ids
                .iter()
                .filter_map(|id| queue.status(id))
                .filter(|job| job.status == JobStatus::Processing)
                .count();
            assert!(processing <= 1, "{} jobs processing at once", processing);
            saw_processing |= processing == 1;
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(saw_processing);

        for id in &ids {
            assert_eq!(wait_terminal(&queue, id).await.status, JobStatus::Completed);
        }
        assert_eq!(*lock(&backend.finished), vec!["a.mp4", "b.mp4", "c.mp4"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_between_jobs() {
        let backend = Arc::new(FakeBackend::default());
        let queue = queue(Arc::clone(&backend), None);
        let first = queue.submit(spec("a.mp4")).unwrap();
        wait_terminal(&queue, &first).await;

        // Submitted while cooling down: must still start once the pause ends.
        let second = queue.submit(spec("b.mp4")).unwrap();
        wait_terminal(&queue, &second).await;

        let started = lock(&backend.started).clone();
        assert_eq!(started.len(), 2);
        // one second of rendering plus the two second cooldown
        assert!(started[1] - started[0] >= Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_invalid_spec_rejected_synchronously() {
        let queue = queue(Arc::new(FakeBackend::default()), None);
        let mut bad = spec("a.mp4");
        bad.duration = 0;
        assert!(matches!(queue.submit(bad), Err(QueueError::Validation(_))));
        assert_eq!(queue.pending_len(), 0);
    }

    #[tokio::test]
    async fn test_over_ceiling_duration_clamped_at_submission() {
        let queue = queue(Arc::new(FakeBackend::default()), None);
        let mut long = spec("a.mp4");
        long.duration = 400_000;
        let id = queue.submit(long).unwrap();

        let job = queue.status(&id).unwrap();
        assert_eq!(job.render_spec["duration"], MAX_RENDER_DURATION_MS);
        assert_eq!(job.render_spec["durationClamp"]["requestedMs"], 400_000);
        assert_eq!(
            job.render_spec["durationClamp"]["clampedMs"],
            MAX_RENDER_DURATION_MS
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_recorded_on_job() {
        let backend = Arc::new(FakeBackend {
            fail_with_rate_limit: true,
            ..Default::default()
        });
        let queue = queue(backend, None);
        let id = queue.submit(spec("a.mp4")).unwrap();

        let job = wait_terminal(&queue, &id).await;
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error_kind, Some(JobErrorKind::RateLimit));
        assert!(job.error.unwrap().contains("concurrency limit"));

        match queue.download(&id).await.unwrap() {
            DownloadOutcome::Failed { kind, .. } => assert_eq!(kind, Some(JobErrorKind::RateLimit)),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_download_removes_job_after_success() {
        let queue = queue(
            Arc::new(FakeBackend::default()),
            Some(MemoryStore { fail: false }),
        );
        let id = queue.submit(spec("M-video.mp4")).unwrap();

        assert!(matches!(
            queue.download(&id).await.unwrap(),
            DownloadOutcome::NotReady { .. }
        ));

        wait_terminal(&queue, &id).await;
        match queue.download(&id).await.unwrap() {
            DownloadOutcome::Ready { file_name, data } => {
                assert_eq!(file_name, "M-video.mp4");
                assert_eq!(data, format!("renders/{}/M-video.mp4", id).into_bytes());
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert!(queue.status(&id).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_fetch_keeps_job() {
        let queue = queue(
            Arc::new(FakeBackend::default()),
            Some(MemoryStore { fail: true }),
        );
        let id = queue.submit(spec("a.mp4")).unwrap();
        wait_terminal(&queue, &id).await;

        let err = queue.download(&id).await.unwrap_err();
        assert_eq!(err.kind(), JobErrorKind::PermanentFetch);
        assert_eq!(queue.status(&id).unwrap().status, JobStatus::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_rejects_and_stops() {
        let queue = queue(Arc::new(FakeBackend::default()), None);
        let first = queue.submit(spec("a.mp4")).unwrap();
        let second = queue.submit(spec("b.mp4")).unwrap();
        wait_terminal(&queue, &first).await;
        queue.shutdown();

        assert!(matches!(queue.submit(spec("c.mp4")), Err(QueueError::ShutDown)));
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(queue.status(&second).unwrap().status, JobStatus::Pending);
    }

    #[tokio::test]
    async fn test_unknown_job() {
        let queue = queue(Arc::new(FakeBackend::default()), None);
        let err = queue.download(&JobId::new()).await.unwrap_err();
        assert!(matches!(err, QueueError::JobNotFound(_)));
    }
}
