//! Persistence of the download queue.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tempfile::NamedTempFile;
use tracing::debug;
use vrender_models::DownloadItem;

use crate::error::{ClientError, ClientResult};

/// Durable home of the download queue, read once at startup and rewritten
/// after every change.
pub trait QueueStore: Send + Sync {
    fn load(&self) -> ClientResult<Vec<DownloadItem>>;

    fn save(&self, items: &[DownloadItem]) -> ClientResult<()>;
}

/// Queue kept in a JSON file, replaced atomically on save.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl QueueStore for JsonFileStore {
    fn load(&self) -> ClientResult<Vec<DownloadItem>> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, items: &[DownloadItem]) -> ClientResult<()> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let mut file = NamedTempFile::new_in(dir)?;
        file.write_all(&serde_json::to_vec_pretty(items)?)?;
        file.persist(&self.path)
            .map_err(|e| ClientError::Persist(e.to_string()))?;
        debug!(count = items.len(), "Saved download queue to {}", self.path.display());
        Ok(())
    }
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: Mutex<Vec<DownloadItem>>,
}

impl MemoryStore {
    pub fn new(items: Vec<DownloadItem>) -> Self {
        Self {
            items: Mutex::new(items),
        }
    }

    pub fn snapshot(&self) -> Vec<DownloadItem> {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl QueueStore for MemoryStore {
    fn load(&self) -> ClientResult<Vec<DownloadItem>> {
        Ok(self.snapshot())
    }

    fn save(&self, items: &[DownloadItem]) -> ClientResult<()> {
        *self.items.lock().unwrap_or_else(PoisonError::into_inner) = items.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_empty_queue() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path().join("queue.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state/queue.json");
        let items = vec![
            DownloadItem::render("M-video.mp4", serde_json::json!({"duration": 1000})),
            DownloadItem::direct("clip.mp4", "https://cdn.example.com/clip.mp4"),
        ];
        JsonFileStore::new(&path).save(&items).unwrap();

        let loaded = JsonFileStore::new(&path).load().unwrap();
        assert_eq!(loaded, items);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("queue.json");
        std::fs::write(&path, b"not json").unwrap();
        assert!(matches!(
            JsonFileStore::new(&path).load(),
            Err(ClientError::Json(_))
        ));
    }
}
