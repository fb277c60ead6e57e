//! Local render worker.
//!
//! Renders specs in-process by shelling out to the render CLI, one job at a
//! time, and keeps the artifacts in memory until they are downloaded.

pub mod config;
pub mod error;
pub mod local;

pub use config::LocalWorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use local::LocalRenderWorker;
