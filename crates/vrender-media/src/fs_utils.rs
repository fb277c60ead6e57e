//! Scratch files for a single render.
//!
//! Every render gets its own temporary directory holding the props file
//! handed to the CLI and the output path it writes to. [`RenderScratch::cleanup`]
//! removes both explicitly; dropping the guard removes the directory as a
//! fallback, so nothing is left behind on any exit path.

use serde::Serialize;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::fs;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

const PROPS_FILE: &str = "props.json";

/// Props file and output path of one render.
#[derive(Debug)]
pub struct RenderScratch {
    dir: TempDir,
    props_path: PathBuf,
    output_path: PathBuf,
}

impl RenderScratch {
    /// Create the scratch directory and write the props file.
    ///
    /// `root` overrides the system temp dir; `output_name` is the file the
    /// CLI is asked to produce.
    pub async fn create<T: Serialize>(
        root: Option<&Path>,
        job_id: &str,
        props: &T,
        output_name: &str,
    ) -> MediaResult<Self> {
        let prefix = format!("vrender-{}-", job_id);
        let dir = match root {
            Some(root) => {
                fs::create_dir_all(root).await?;
                tempfile::Builder::new().prefix(&prefix).tempdir_in(root)?
            }
            None => tempfile::Builder::new().prefix(&prefix).tempdir()?,
        };

        let props_path = dir.path().join(PROPS_FILE);
        let output_path = dir.path().join(output_name);
        fs::write(&props_path, serde_json::to_vec(props)?).await?;
        debug!("Wrote render props to {}", props_path.display());

        Ok(Self {
            dir,
            props_path,
            output_path,
        })
    }

    pub fn props_path(&self) -> &Path {
        &self.props_path
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Load the produced artifact.
    pub async fn read_output(&self) -> MediaResult<Vec<u8>> {
        if !fs::try_exists(&self.output_path).await.unwrap_or(false) {
            return Err(MediaError::OutputNotCreated(self.output_path.clone()));
        }
        let data = fs::read(&self.output_path).await?;
        if data.is_empty() {
            return Err(MediaError::EmptyOutput(self.output_path.clone()));
        }
        Ok(data)
    }

    /// Remove the props file, the output and the directory.
    pub async fn cleanup(self) {
        for path in [&self.props_path, &self.output_path] {
            match fs::remove_file(path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
            }
        }
        let dir = self.dir.path().to_path_buf();
        if let Err(e) = self.dir.close() {
            warn!("Failed to remove scratch dir {}: {}", dir.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_props_written_and_cleaned_up() {
        let root = TempDir::new().unwrap();
        let scratch = RenderScratch::create(
            Some(root.path()),
            "job-1",
            &serde_json::json!({"duration": 1000}),
            "out.mp4",
        )
        .await
        .unwrap();

        let props: serde_json::Value =
            serde_json::from_slice(&fs::read(scratch.props_path()).await.unwrap()).unwrap();
        assert_eq!(props["duration"], 1000);

        fs::write(scratch.output_path(), b"mp4").await.unwrap();
        assert_eq!(scratch.read_output().await.unwrap(), b"mp4");

        let props_path = scratch.props_path().to_path_buf();
        let output_path = scratch.output_path().to_path_buf();
        scratch.cleanup().await;
        assert!(!props_path.exists());
        assert!(!output_path.exists());
    }

    #[tokio::test]
    async fn test_missing_output_reported() {
        let root = TempDir::new().unwrap();
        let scratch = RenderScratch::create(Some(root.path()), "job-2", &(), "out.mp4")
            .await
            .unwrap();
        let err = scratch.read_output().await.unwrap_err();
        assert!(matches!(err, MediaError::OutputNotCreated(_)));
        assert!(err.to_string().contains("not created"));
    }

    #[tokio::test]
    async fn test_drop_removes_directory() {
        let root = TempDir::new().unwrap();
        let scratch = RenderScratch::create(Some(root.path()), "job-3", &(), "out.mp4")
            .await
            .unwrap();
        let props_path = scratch.props_path().to_path_buf();
        drop(scratch);
        assert!(!props_path.exists());
    }
}
