//! Queue configuration.

use std::path::PathBuf;
use std::time::Duration;
use vrender_storage::FetchRetryConfig;

/// Remote queue configuration.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Pause between the end of one job and the start of the next
    pub cooldown: Duration,
    /// Render CLI program
    pub render_cli: String,
    /// Arguments placed before the serve URL and composition id
    pub render_args: Vec<String>,
    /// Deployed bundle the serverless renderer should use
    pub serve_url: Option<String>,
    /// Composition to render inside the bundle
    pub composition_id: String,
    /// Ceiling on a single CLI invocation
    pub render_timeout: Duration,
    /// Directory for props files (system temp dir when unset)
    pub scratch_dir: Option<PathBuf>,
    /// Artifact fetch policy of the download step
    pub fetch: FetchRetryConfig,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            cooldown: Duration::from_secs(2),
            render_cli: "npx".to_string(),
            render_args: vec![
                "remotion".to_string(),
                "lambda".to_string(),
                "render".to_string(),
            ],
            serve_url: None,
            composition_id: "VariationVideo".to_string(),
            render_timeout: Duration::from_secs(600),
            scratch_dir: None,
            fetch: FetchRetryConfig::default(),
        }
    }
}

impl QueueConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cooldown: std::env::var("QUEUE_COOLDOWN_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.cooldown),
            render_cli: std::env::var("REMOTE_RENDER_CLI").unwrap_or(defaults.render_cli),
            render_args: std::env::var("REMOTE_RENDER_ARGS")
                .ok()
                .map(|s| s.split_whitespace().map(str::to_string).collect())
                .unwrap_or(defaults.render_args),
            serve_url: std::env::var("REMOTE_RENDER_SERVE_URL").ok(),
            composition_id: std::env::var("RENDER_COMPOSITION_ID")
                .unwrap_or(defaults.composition_id),
            render_timeout: std::env::var("REMOTE_RENDER_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.render_timeout),
            scratch_dir: std::env::var("RENDER_SCRATCH_DIR").ok().map(PathBuf::from),
            fetch: FetchRetryConfig::from_env(),
        }
    }
}
