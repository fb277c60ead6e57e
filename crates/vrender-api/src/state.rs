//! Application state.

use std::sync::Arc;

use tracing::{info, warn};
use vrender_queue::{CliRenderBackend, QueueConfig, RenderQueue};
use vrender_storage::{ObjectStore, R2Client};
use vrender_worker::{LocalRenderWorker, LocalWorkerConfig};

use crate::config::ApiConfig;

/// Shared application state.
///
/// Both render services are owned here and live exactly as long as the
/// server; handlers reach them only through this handle.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub queue: RenderQueue,
    pub local: LocalRenderWorker,
    /// Present when object storage credentials are configured
    pub storage: Option<Arc<R2Client>>,
    /// Render CLI programs the readiness probe resolves
    pub render_clis: Vec<String>,
}

impl AppState {
    /// Create new application state from the environment.
    pub fn new(config: ApiConfig) -> Self {
        let queue_config = QueueConfig::from_env();
        let local_config = LocalWorkerConfig::from_env();

        let storage = match R2Client::from_env() {
            Ok(client) => {
                info!("Object storage configured, remote downloads enabled");
                Some(Arc::new(client))
            }
            Err(e) => {
                warn!("Object storage unavailable, remote downloads will fail: {}", e);
                None
            }
        };

        let mut render_clis = vec![queue_config.render_cli.clone()];
        if !render_clis.contains(&local_config.render_cli) {
            render_clis.push(local_config.render_cli.clone());
        }

        let backend = Arc::new(CliRenderBackend::new(queue_config.clone()));
        let store = storage
            .clone()
            .map(|client| client as Arc<dyn ObjectStore>);
        let queue = RenderQueue::new(queue_config, backend, store);
        let local = LocalRenderWorker::new(local_config);

        Self {
            config,
            queue,
            local,
            storage,
            render_clis,
        }
    }

    /// Assemble state from already-built services.
    pub fn from_parts(
        config: ApiConfig,
        queue: RenderQueue,
        local: LocalRenderWorker,
        render_clis: Vec<String>,
    ) -> Self {
        Self {
            config,
            queue,
            local,
            storage: None,
            render_clis,
        }
    }

    /// Stop both render services; running subprocesses are cancelled.
    pub fn shutdown(&self) {
        self.queue.shutdown();
        self.local.shutdown();
    }
}
