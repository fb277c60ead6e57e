//! Parsing of render CLI output.

use regex::Regex;
use std::sync::LazyLock;
use vrender_storage::strip_ansi;

/// `+ S3 https://...` line printed when a serverless render finishes.
static RESULT_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\+\s*S3\s+(https?://\S+)").unwrap());

/// Any MP4 URL, for output formats without the `+ S3` marker.
static RESULT_URL_FALLBACK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(https?://[^\s"']+\.mp4)"#).unwrap());

static RATE_LIMIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)rate exceeded|toomanyrequestsexception|concurrency\s*limit").unwrap()
});

/// Message recorded on jobs rejected by the render service's concurrency ceiling.
pub const RATE_LIMIT_MESSAGE: &str = "The render service is at its concurrency limit. \
     Wait a minute before retrying, or ask for a higher concurrency quota.";

/// Result URL reported by the render CLI, if any.
pub fn parse_result_url(output: &str) -> Option<String> {
    let clean = strip_ansi(output);
    RESULT_URL
        .captures(&clean)
        .or_else(|| RESULT_URL_FALLBACK.captures(&clean))
        .map(|caps| caps[1].trim_end_matches(['"', '\'', ',', ')']).to_string())
}

/// Whether the output shows the external concurrency ceiling was hit.
pub fn is_rate_limited(output: &str) -> bool {
    RATE_LIMIT.is_match(output)
}
