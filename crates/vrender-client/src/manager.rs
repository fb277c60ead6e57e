//! Persisted download/render manager.
//!
//! Items wait in a persisted list and are started one at a time. A render
//! item submits its spec (once), polls the job until it finishes and then
//! downloads the artifact; a direct item just fetches its URL. Whatever
//! happens to a started item, the processing lock is released and the queue
//! re-checked after a short delay.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};
use vrender_models::{DownloadId, DownloadItem, DownloadKind, DownloadStatus, JobId, JobStatus};

use crate::api::{RemoteDownload, RenderApi};
use crate::error::{ClientError, ClientResult};
use crate::store::QueueStore;

/// Reason recorded on items cancelled by the user.
pub const CANCELLED_REASON: &str = "cancelled";

/// Download manager configuration.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Items downloading at once
    pub max_concurrent: usize,
    /// Delay between status checks of a remote job
    pub poll_interval: Duration,
    /// Status checks before a render is given up as timed out
    pub max_poll_attempts: u32,
    /// Delay before the queue is re-checked after an item finishes
    pub requeue_delay: Duration,
    /// Where finished files are written
    pub output_dir: PathBuf,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 1,
            poll_interval: Duration::from_secs(3),
            max_poll_attempts: 600,
            requeue_delay: Duration::from_millis(500),
            output_dir: PathBuf::from("downloads"),
        }
    }
}

impl ManagerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_concurrent: std::env::var("DOWNLOAD_MAX_CONCURRENT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_concurrent),
            poll_interval: std::env::var("DOWNLOAD_POLL_INTERVAL_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_interval),
            max_poll_attempts: std::env::var("DOWNLOAD_MAX_POLL_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_poll_attempts),
            requeue_delay: defaults.requeue_delay,
            output_dir: std::env::var("DOWNLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
        }
    }
}

/// Handle to the download queue. Clones share the same queue.
#[derive(Clone)]
pub struct DownloadManager {
    inner: Arc<Inner>,
}

struct Inner {
    config: ManagerConfig,
    api: Arc<dyn RenderApi>,
    store: Arc<dyn QueueStore>,
    items: Mutex<Vec<DownloadItem>>,
    /// Global lock, held from the start of an item until its cleanup
    processing: AtomicBool,
}

impl DownloadManager {
    /// Load the persisted queue.
    ///
    /// Items interrupted while downloading go back to pending; render items
    /// that already reached the server keep their job id and resume polling
    /// it instead of submitting again. Call [`process_queue`] to start.
    ///
    /// [`process_queue`]: DownloadManager::process_queue
    pub fn new(
        config: ManagerConfig,
        api: Arc<dyn RenderApi>,
        store: Arc<dyn QueueStore>,
    ) -> ClientResult<Self> {
        let mut items = store.load()?;
        let mut resumed = 0;
        for item in items
            .iter_mut()
            .filter(|item| item.status == DownloadStatus::Downloading)
        {
            item.reset();
            resumed += 1;
        }
        if resumed > 0 {
            info!(resumed, "Resuming interrupted downloads");
            store.save(&items)?;
        }

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                api,
                store,
                items: Mutex::new(items),
                processing: AtomicBool::new(false),
            }),
        })
    }

    pub fn add_render(&self, name: impl Into<String>, render_spec: serde_json::Value) -> DownloadId {
        self.enqueue(DownloadItem::render(name, render_spec))
    }

    pub fn add_direct(&self, name: impl Into<String>, url: impl Into<String>) -> DownloadId {
        self.enqueue(DownloadItem::direct(name, url))
    }

    /// Append an item and kick the queue.
    pub fn enqueue(&self, item: DownloadItem) -> DownloadId {
        let id = item.id.clone();
        {
            let mut items = self.lock_items();
            items.push(item);
            self.persist(&items);
        }
        debug!(download_id = %id, "Download queued");
        self.process_queue();
        id
    }

    /// Snapshot of the queue in order.
    pub fn items(&self) -> Vec<DownloadItem> {
        self.lock_items().clone()
    }

    pub fn get(&self, id: &DownloadId) -> Option<DownloadItem> {
        self.lock_items().iter().find(|item| &item.id == id).cloned()
    }

    pub fn is_processing(&self) -> bool {
        self.inner.processing.load(Ordering::Acquire)
    }

    /// Start the first pending item, unless something is already running.
    ///
    /// Safe to call any number of times.
    pub fn process_queue(&self) {
        if self
            .inner
            .processing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        let next = {
            let items = self.lock_items();
            let active = items
                .iter()
                .filter(|item| item.status == DownloadStatus::Downloading)
                .count();
            if active >= self.inner.config.max_concurrent.max(1) {
                None
            } else {
                items
                    .iter()
                    .find(|item| item.status == DownloadStatus::Pending)
                    .map(|item| item.id.clone())
            }
        };

        let Some(id) = next else {
            self.inner.processing.store(false, Ordering::Release);
            return;
        };
        let manager = self.clone();
        tokio::spawn(async move { manager.start_download(id).await });
    }

    /// Cancel a pending or in-flight item.
    ///
    /// A render already submitted keeps running on the server; the poll
    /// loop notices the status change and stops.
    pub fn cancel(&self, id: &DownloadId) -> ClientResult<()> {
        let mut items = self.lock_items();
        let item = items
            .iter_mut()
            .find(|item| &item.id == id)
            .ok_or_else(|| ClientError::ItemNotFound(id.to_string()))?;
        if !item.status.is_terminal() {
            item.fail(CANCELLED_REASON);
            info!(download_id = %id, "Download cancelled");
            self.persist(&items);
        }
        Ok(())
    }

    /// Remove an item.
    ///
    /// An item that is downloading is not dropped but failed as cancelled,
    /// so its poll loop stops and the outcome stays visible. Everything
    /// else leaves the queue.
    pub fn remove(&self, id: &DownloadId) -> Option<DownloadItem> {
        let mut items = self.lock_items();
        let index = items.iter().position(|item| &item.id == id)?;
        let removed = if items[index].status == DownloadStatus::Downloading {
            items[index].fail(CANCELLED_REASON);
            info!(download_id = %id, "Running download cancelled by removal");
            items[index].clone()
        } else {
            items.remove(index)
        };
        self.persist(&items);
        Some(removed)
    }

    /// Put a failed item back in line for a fresh attempt.
    pub fn retry(&self, id: &DownloadId) -> ClientResult<()> {
        {
            let mut items = self.lock_items();
            let item = items
                .iter_mut()
                .find(|item| &item.id == id)
                .ok_or_else(|| ClientError::ItemNotFound(id.to_string()))?;
            if item.status != DownloadStatus::Failed {
                return Err(ClientError::invalid_item(format!(
                    "only failed items can be retried, {} is {}",
                    id, item.status
                )));
            }
            item.reset();
            item.job_id = None;
            self.persist(&items);
        }
        self.process_queue();
        Ok(())
    }

    /// Drop every completed item; returns how many were dropped.
    pub fn clear_completed(&self) -> usize {
        let mut items = self.lock_items();
        let before = items.len();
        items.retain(|item| item.status != DownloadStatus::Completed);
        let cleared = before - items.len();
        if cleared > 0 {
            self.persist(&items);
        }
        cleared
    }

    async fn start_download(&self, id: DownloadId) {
        let started = {
            let mut items = self.lock_items();
            let item = items
                .iter_mut()
                .find(|item| item.id == id && item.status == DownloadStatus::Pending);
            let started = item.map(|item| {
                item.start();
                item.clone()
            });
            self.persist(&items);
            started
        };

        if let Some(item) = started {
            info!(download_id = %id, kind = item.kind.as_str(), name = %item.name, "Download started");
            // Own task: a panicking handler must not leave the lock held.
            let manager = self.clone();
            let handle = tokio::spawn(async move { manager.run_item(&item).await });
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => Err(ClientError::Internal(format!("download task aborted: {}", e))),
            };
            self.finish(&id, outcome);
        }

        self.inner.processing.store(false, Ordering::Release);
        let manager = self.clone();
        let delay = self.inner.config.requeue_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            manager.process_queue();
        });
    }

    fn finish(&self, id: &DownloadId, outcome: ClientResult<String>) {
        let mut items = self.lock_items();
        let Some(item) = items.iter_mut().find(|item| &item.id == id) else {
            debug!(download_id = %id, "Item removed while downloading");
            return;
        };
        if item.status != DownloadStatus::Downloading {
            debug!(download_id = %id, status = %item.status, "Item changed while downloading");
            return;
        }
        match outcome {
            Ok(path) => {
                info!(download_id = %id, "Download completed: {}", path);
                item.complete(path);
            }
            Err(e) => {
                warn!(download_id = %id, "Download failed: {}", e);
                item.fail(e.to_string());
            }
        }
        self.persist(&items);
    }

    async fn run_item(&self, item: &DownloadItem) -> ClientResult<String> {
        match item.kind {
            DownloadKind::Render => self.run_render(item).await,
            DownloadKind::Direct => {
                let url = item
                    .url
                    .as_deref()
                    .ok_or_else(|| ClientError::invalid_item("direct item without a URL"))?;
                let data = self.inner.api.fetch(url).await?;
                self.ensure_active(&item.id)?;
                self.write_output(&item.name, &data).await
            }
        }
    }

    async fn run_render(&self, item: &DownloadItem) -> ClientResult<String> {
        let job_id = match &item.job_id {
            Some(job_id) => {
                info!(download_id = %item.id, job_id = %job_id, "Resuming render job");
                job_id.clone()
            }
            None => {
                let spec = item
                    .render_spec
                    .as_ref()
                    .ok_or_else(|| ClientError::invalid_item("render item without a spec"))?;
                let submitted = self.inner.api.submit(spec).await?;
                self.update(&item.id, |item| item.job_id = Some(submitted.job_id.clone()));
                submitted.job_id
            }
        };

        let config = &self.inner.config;
        for attempt in 1..=config.max_poll_attempts {
            self.ensure_active(&item.id)?;

            match self.inner.api.status(&job_id).await {
                Ok(job) if job.status == JobStatus::Completed => {
                    if let Some(path) = self.try_download(item, &job_id).await? {
                        return Ok(path);
                    }
                }
                Ok(job) if job.status == JobStatus::Failed => {
                    return Err(ClientError::RenderFailed(
                        job.error.unwrap_or_else(|| "unknown error".to_string()),
                    ));
                }
                Ok(job) => self.update(&item.id, |item| item.set_progress(job.progress)),
                Err(e) if e.is_retryable() => {
                    warn!(download_id = %item.id, attempt, "Status check failed, will retry: {}", e);
                }
                Err(e) => return Err(e),
            }

            tokio::time::sleep(config.poll_interval).await;
        }

        Err(ClientError::Timeout {
            attempts: config.max_poll_attempts,
        })
    }

    /// Fetch a finished render; `None` when the server is not ready yet.
    async fn try_download(&self, item: &DownloadItem, job_id: &JobId) -> ClientResult<Option<String>> {
        self.ensure_active(&item.id)?;
        match self.inner.api.download(job_id).await {
            Ok(RemoteDownload::Ready { data, .. }) => {
                self.ensure_active(&item.id)?;
                self.write_output(&item.name, &data).await.map(Some)
            }
            Ok(RemoteDownload::Pending) => Ok(None),
            Ok(RemoteDownload::Failed(error)) => Err(ClientError::RenderFailed(error)),
            Err(e) if e.is_retryable() => {
                warn!(download_id = %item.id, "Artifact download failed, will retry: {}", e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Fails with [`ClientError::Cancelled`] once the item was cancelled or removed.
    fn ensure_active(&self, id: &DownloadId) -> ClientResult<()> {
        let active = self
            .lock_items()
            .iter()
            .any(|item| &item.id == id && item.status == DownloadStatus::Downloading);
        if active {
            Ok(())
        } else {
            debug!(download_id = %id, "Item no longer active, stopping");
            Err(ClientError::Cancelled)
        }
    }

    async fn write_output(&self, name: &str, data: &[u8]) -> ClientResult<String> {
        let dir = &self.inner.config.output_dir;
        tokio::fs::create_dir_all(dir).await?;
        let file_name = Path::new(name)
            .file_name()
            .map(|n| n.to_os_string())
            .ok_or_else(|| ClientError::invalid_item(format!("bad file name {:?}", name)))?;
        let path = dir.join(file_name);
        tokio::fs::write(&path, data).await?;
        Ok(path.to_string_lossy().to_string())
    }

    fn update(&self, id: &DownloadId, f: impl FnOnce(&mut DownloadItem)) {
        let mut items = self.lock_items();
        if let Some(item) = items.iter_mut().find(|item| &item.id == id) {
            f(item);
            self.persist(&items);
        }
    }

    fn lock_items(&self) -> MutexGuard<'_, Vec<DownloadItem>> {
        self.inner.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Save while the items lock is held so saves land in order.
    fn persist(&self, items: &[DownloadItem]) {
        if let Err(e) = self.inner.store.save(items) {
            warn!("Failed to persist download queue: {}", e);
        }
    }
}
