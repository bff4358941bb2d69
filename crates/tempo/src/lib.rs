//! Tempo: batch loader for song-play analytics.
//!
//! This crate handles:
//! - Reading song metadata and listening-event logs (JSON lines) from S3 or local disk
//! - Building the `songs`, `artists`, `users`, `time` and `songplays` tables
//! - Writing each table as a Hive-partitioned Parquet dataset, replacing the previous run

pub mod config;
pub mod error;
pub mod frame;
pub mod pipeline;
pub mod sink;
pub mod source;
pub mod transform;

// Re-export commonly used items
pub use config::Config;
pub use error::PipelineError;
pub use pipeline::{PipelineStats, run_pipeline};

// Re-export from tempo-core
pub use tempo_core::{CliArgs, StorageProvider, StorageProviderRef, init_tracing};
