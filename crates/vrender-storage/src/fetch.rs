//! Artifact fetch with fixed-backoff retry.
//!
//! Render results can take a few seconds to become readable after the
//! render service reports them, so fetches are retried on a fixed delay
//! rather than an exponential one.

use std::time::Duration;
use tracing::{debug, warn};

use crate::client::ObjectStore;
use crate::error::{StorageError, StorageResult};

/// Retry policy for artifact fetches.
#[derive(Debug, Clone)]
pub struct FetchRetryConfig {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay between attempts
    pub backoff: Duration,
}

impl Default for FetchRetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: Duration::from_secs(3),
        }
    }
}

impl FetchRetryConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let max_retries = std::env::var("FETCH_MAX_RETRIES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_retries);
        let backoff = std::env::var("FETCH_BACKOFF_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.backoff);
        Self {
            max_retries,
            backoff,
        }
    }
}

/// Fetch an object, retrying transient failures and empty bodies.
///
/// Once the retries are used up the last error is wrapped in
/// [`StorageError::RetriesExhausted`].
pub async fn fetch_with_retry<S>(
    store: &S,
    key: &str,
    config: &FetchRetryConfig,
) -> StorageResult<Vec<u8>>
where
    S: ObjectStore + ?Sized,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        let error = match store.get_bytes(key).await {
            Ok(bytes) if !bytes.is_empty() => {
                debug!(key, attempt, size = bytes.len(), "Fetched artifact");
                return Ok(bytes);
            }
            Ok(_) => StorageError::Empty(key.to_string()),
            Err(e) => e,
        };

        if !error.is_transient() {
            return Err(error);
        }
        if attempt > config.max_retries {
            return Err(StorageError::RetriesExhausted {
                key: key.to_string(),
                attempts: attempt,
                source: Box::new(error),
            });
        }

        warn!(
            key,
            attempt,
            delay_ms = config.backoff.as_millis() as u64,
            "Artifact fetch failed, retrying: {}",
            error
        );
        metrics::counter!("vrender_fetch_retries_total").increment(1);
        tokio::time::sleep(config.backoff).await;
    }
}
