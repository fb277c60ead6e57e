//! Object storage access for finished renders.
//!
//! This crate provides:
//! - The [`ObjectStore`] seam and an R2/S3 implementation
//! - Object key extraction from render result URLs
//! - Artifact fetch with fixed-backoff retry

pub mod client;
pub mod error;
pub mod fetch;
pub mod key;

pub use client::{ObjectStore, R2Client, R2Config};
pub use error::{StorageError, StorageResult};
pub use fetch::{fetch_with_retry, FetchRetryConfig};
pub use key::{object_key_from_url, strip_ansi};
