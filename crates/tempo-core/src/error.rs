//! Error types shared by the loader crates.
//!
//! Storage and configuration errors live here because both the source reader
//! and the table writer surface them.

use snafu::prelude::*;

// ============ Storage Errors ============

/// Errors that can occur during storage operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum StorageError {
    /// Invalid storage URL format.
    #[snafu(display("Invalid storage URL: {url}"))]
    InvalidUrl { url: String },

    /// Invalid glob pattern in a source location.
    #[snafu(display("Invalid glob pattern '{pattern}': {source}"))]
    InvalidPattern {
        pattern: String,
        source: glob::PatternError,
    },

    /// Object store operation failed.
    #[snafu(display("Storage operation failed: {source}"))]
    ObjectStore { source: object_store::Error },

    /// IO error during storage operations.
    #[snafu(display("IO error: {source}"))]
    Io { source: std::io::Error },

    /// S3 configuration error.
    #[snafu(display("S3 configuration error: {source}"))]
    S3Config { source: object_store::Error },
}

// ============ Config Errors ============

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConfigError {
    /// Song metadata source is empty.
    #[snafu(display("source.song_data cannot be empty"))]
    EmptySongSource,

    /// Event log source is empty.
    #[snafu(display("source.log_data cannot be empty"))]
    EmptyLogSource,

    /// Output root is empty.
    #[snafu(display("sink.output_uri cannot be empty"))]
    EmptyOutputUri,

    /// A numeric setting must be positive.
    #[snafu(display("{setting} must be greater than zero"))]
    ZeroValue { setting: String },

    /// Unknown IANA time zone name.
    #[snafu(display("Unknown time zone '{name}'"))]
    UnknownTimezone { name: String },

    /// Environment variable interpolation failed.
    #[snafu(display("Environment variable interpolation failed:\n{message}"))]
    EnvInterpolation { message: String },

    /// Failed to parse YAML configuration.
    #[snafu(display("Failed to parse YAML: {source}"))]
    YamlParse { source: serde_yaml::Error },

    /// Failed to read configuration file.
    #[snafu(display("Failed to read configuration file {}: {source}", path.display()))]
    ReadFile {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    /// Unsupported config file format.
    #[snafu(display("Unsupported config format for {}: only .yaml/.yml supported", path.display()))]
    UnsupportedFormat { path: std::path::PathBuf },
}
