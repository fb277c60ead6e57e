//! Client-side render/download manager.
//!
//! This crate provides:
//! - [`HttpRenderApi`], a reqwest client for the render API
//! - A persisted queue of download items ([`QueueStore`])
//! - [`DownloadManager`], which drives one download at a time, polling
//!   remote render jobs to completion

pub mod api;
pub mod error;
pub mod manager;
pub mod store;

pub use api::{ApiClientConfig, HttpRenderApi, RemoteDownload, RenderApi, SubmitResponse};
pub use error::{ClientError, ClientResult};
pub use manager::{DownloadManager, ManagerConfig};
pub use store::{JsonFileStore, MemoryStore, QueueStore};
