//! Error types for the tempo loader.

use snafu::prelude::*;

// Re-export common errors
pub use tempo_core::error::{ConfigError, StorageError};

/// Errors raised by relational operations on a frame.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum FrameError {
    /// An Arrow compute kernel failed.
    #[snafu(display("Arrow operation '{operation}' failed: {source}"))]
    Arrow {
        operation: &'static str,
        source: arrow::error::ArrowError,
    },

    /// A column required by the operation is missing.
    #[snafu(display("Column '{name}' not found"))]
    ColumnNotFound { name: String },

    /// A join was requested without key columns.
    #[snafu(display("Join requires at least one key column"))]
    EmptyJoinKeys,

    /// A new column does not have one value per row.
    #[snafu(display("Column '{name}' has {actual} values, frame has {expected} rows"))]
    ColumnLength {
        name: String,
        expected: usize,
        actual: usize,
    },
}

/// Errors that can occur while decoding JSON-lines files.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ReaderError {
    /// Schema inference failed for a file.
    #[snafu(display("Failed to infer schema for {path}: {source}"))]
    Inference {
        path: String,
        source: arrow::error::ArrowError,
    },

    /// Failed to build Arrow decoder.
    #[snafu(display("Failed to build Arrow JSON decoder: {source}"))]
    DecoderBuild { source: arrow::error::ArrowError },

    /// Failed to decode JSON.
    #[snafu(display("Failed to decode JSON in {path}: {source}"))]
    JsonDecode {
        path: String,
        source: arrow::error::ArrowError,
    },

    /// Failed to concatenate decoded batches.
    #[snafu(display("Failed to combine records from {source_uri}: {source}"))]
    Concat {
        source_uri: String,
        source: arrow::error::ArrowError,
    },
}

/// Errors that can occur while reading a record source.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SourceError {
    /// The source URI is not a valid location.
    #[snafu(display("Invalid source location '{uri}': {source}"))]
    Location { uri: String, source: StorageError },

    /// Listing or fetching files failed.
    #[snafu(display("Failed to read from {uri}: {source}"))]
    Fetch { uri: String, source: StorageError },

    /// Decoding failed.
    #[snafu(display("{source}"))]
    Decode { source: ReaderError },
}

/// Errors that can occur while building a table.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum TransformError {
    /// A frame operation failed while building a table.
    #[snafu(display("Failed to build table '{table}': {source}"))]
    Table { table: String, source: FrameError },

    /// A timestamp column does not hold epoch milliseconds.
    #[snafu(display("Column '{column}' is not an Int64 epoch-millisecond timestamp"))]
    TimestampColumn { column: String },
}

/// Errors that can occur while writing a table.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SinkError {
    /// Failed to connect to the destination.
    #[snafu(display("Failed to open destination {destination}: {source}"))]
    Destination {
        destination: String,
        source: StorageError,
    },

    /// Storage operation failed while writing a table.
    #[snafu(display("Failed to write table '{table}' to {destination}: {source}"))]
    Write {
        table: String,
        destination: String,
        source: StorageError,
    },

    /// Failed to encode Parquet.
    #[snafu(display("Failed to encode table '{table}' as Parquet: {source}"))]
    Encode {
        table: String,
        source: parquet::errors::ParquetError,
    },

    /// Failed to split a table into partitions.
    #[snafu(display("Failed to partition table '{table}': {source}"))]
    Partition { table: String, source: FrameError },

    /// A partition path could not be built.
    #[snafu(display("Invalid output path for table '{table}': {source}"))]
    InvalidPath {
        table: String,
        source: object_store::path::Error,
    },
}

/// Top-level pipeline errors.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum PipelineError {
    /// Configuration error.
    #[snafu(display("Configuration error: {source}"))]
    Config { source: ConfigError },

    /// Source error.
    #[snafu(display("Source error: {source}"))]
    Source { source: SourceError },

    /// Transform error.
    #[snafu(display("Transform error: {source}"))]
    Transform { source: TransformError },

    /// Sink error.
    #[snafu(display("Sink error: {source}"))]
    Sink { source: SinkError },
}

impl From<ConfigError> for PipelineError {
    fn from(source: ConfigError) -> Self {
        PipelineError::Config { source }
    }
}

impl From<SourceError> for PipelineError {
    fn from(source: SourceError) -> Self {
        PipelineError::Source { source }
    }
}

impl From<TransformError> for PipelineError {
    fn from(source: TransformError) -> Self {
        PipelineError::Transform { source }
    }
}

impl From<SinkError> for PipelineError {
    fn from(source: SinkError) -> Self {
        PipelineError::Sink { source }
    }
}

impl From<ReaderError> for SourceError {
    fn from(source: ReaderError) -> Self {
        SourceError::Decode { source }
    }
}
