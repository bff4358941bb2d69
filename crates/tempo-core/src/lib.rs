//! tempo-core: plumbing shared by the tempo loader.
//!
//! - `storage/` - storage abstraction (S3, local filesystem) and glob source locations
//! - `config/` - CLI arguments, config file loading and environment interpolation
//! - `metrics/` - metric events and the `emit!` macro
//! - `tracing` - subscriber initialization
//! - `error` - storage and configuration errors

pub mod config;
pub mod error;
pub mod metrics;
pub mod storage;
pub mod tracing;

pub use config::CliArgs;
pub use error::{ConfigError, StorageError};
pub use storage::{SourceLocation, StorageProvider, StorageProviderRef};
pub use self::tracing::init_tracing;
