//! Object key extraction from render result URLs.

use regex::Regex;
use std::sync::LazyLock;
use url::Url;

use crate::error::{StorageError, StorageResult};

static ANSI_ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;]*[A-Za-z]").unwrap());

/// Remove terminal color sequences picked up from CLI output.
pub fn strip_ansi(input: &str) -> String {
    ANSI_ESCAPE.replace_all(input, "").into_owned()
}

/// Object key of a result URL.
///
/// Handles both path-style (`https://host/bucket/renders/x/out.mp4`) and
/// virtual-hosted (`https://bucket.host/renders/x/out.mp4`) URLs.
pub fn object_key_from_url(raw: &str, bucket: &str) -> StorageResult<String> {
    let cleaned = strip_ansi(raw);
    let cleaned = cleaned.trim();
    let url = Url::parse(cleaned)
        .map_err(|e| StorageError::invalid_key(format!("{}: {}", cleaned, e)))?;

    let mut segments: Vec<&str> = url
        .path_segments()
        .map(|segments| segments.filter(|s| !s.is_empty()).collect())
        .unwrap_or_default();
    if segments.first() == Some(&bucket) {
        segments.remove(0);
    }

    if segments.is_empty() {
        return Err(StorageError::invalid_key(format!(
            "no object key in {}",
            cleaned
        )));
    }
    Ok(segments.join("/"))
}
