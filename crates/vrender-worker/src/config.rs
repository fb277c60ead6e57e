//! Local worker configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Local render worker configuration.
#[derive(Debug, Clone)]
pub struct LocalWorkerConfig {
    /// Render CLI program
    pub render_cli: String,
    /// Arguments placed before the entry point
    pub render_args: Vec<String>,
    /// Bundle entry point handed to the CLI
    pub entry_point: String,
    /// Composition to render
    pub composition_id: String,
    /// Subprocess timeout
    pub render_timeout: Duration,
    /// Directory for props and output files (system temp dir when unset)
    pub scratch_dir: Option<PathBuf>,
}

impl Default for LocalWorkerConfig {
    fn default() -> Self {
        Self {
            render_cli: "npx".to_string(),
            render_args: vec!["remotion".to_string(), "render".to_string()],
            entry_point: "src/index.ts".to_string(),
            composition_id: "VariationVideo".to_string(),
            render_timeout: Duration::from_secs(300), // 5 minutes
            scratch_dir: None,
        }
    }
}

impl LocalWorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            render_cli: std::env::var("LOCAL_RENDER_CLI").unwrap_or(defaults.render_cli),
            render_args: std::env::var("LOCAL_RENDER_ARGS")
                .ok()
                .map(|s| s.split_whitespace().map(str::to_string).collect())
                .unwrap_or(defaults.render_args),
            entry_point: std::env::var("LOCAL_RENDER_ENTRY").unwrap_or(defaults.entry_point),
            composition_id: std::env::var("RENDER_COMPOSITION_ID")
                .unwrap_or(defaults.composition_id),
            render_timeout: std::env::var("LOCAL_RENDER_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.render_timeout),
            scratch_dir: std::env::var("RENDER_SCRATCH_DIR").ok().map(PathBuf::from),
        }
    }
}
