//! Configuration for the tempo loader.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::ConfigError;
pub use tempo_core::config::{InterpolationResult, interpolate, read_config_text};

/// Configuration for the two input sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Song metadata location, optionally ending in a glob
    /// (e.g. `s3a://udacity-dend/song_data/*/*/*/*.json`).
    pub song_data: String,
    /// Event log location, optionally ending in a glob.
    pub log_data: String,
    /// Number of records per decoded batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Maximum concurrent file downloads.
    #[serde(default = "default_max_concurrent_files")]
    pub max_concurrent_files: usize,
    /// Storage options for source storage (credentials, region, etc.)
    #[serde(default)]
    pub storage_options: HashMap<String, String>,
}

fn default_batch_size() -> usize {
    8192
}

fn default_max_concurrent_files() -> usize {
    8
}

/// Configuration for the output root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Root URI under which the five tables are written.
    pub output_uri: String,
    /// Parquet compression codec.
    #[serde(default)]
    pub compression: ParquetCompression,
    /// Maximum rows per Parquet file before rolling to the next part.
    #[serde(default = "default_max_rows_per_file")]
    pub max_rows_per_file: usize,
    /// Storage options for output storage (credentials, region, etc.).
    #[serde(default)]
    pub storage_options: HashMap<String, String>,
}

fn default_max_rows_per_file() -> usize {
    1_000_000
}

/// Knobs for the table transformations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformConfig {
    /// IANA time zone used to decompose event timestamps.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Precision kept in `start_time`.
    #[serde(default)]
    pub timestamp_resolution: TimestampResolution,
    /// How repeated artists are handled.
    #[serde(default)]
    pub artists_duplicates: DuplicatePolicy,
    /// How repeated users are handled.
    #[serde(default)]
    pub users_duplicates: DuplicatePolicy,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            timestamp_resolution: TimestampResolution::default(),
            artists_duplicates: DuplicatePolicy::default(),
            users_duplicates: DuplicatePolicy::default(),
        }
    }
}

/// Parquet compression codec.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParquetCompression {
    Uncompressed,
    #[default]
    Snappy,
    Gzip,
    Zstd,
    Lz4,
}

/// Precision of the derived `start_time`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampResolution {
    /// Truncate to whole seconds.
    #[default]
    Seconds,
    /// Keep milliseconds.
    Milliseconds,
}

/// How rows that share a table key are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Keep every input row, even if several share a key.
    #[default]
    Retain,
    /// Keep the earliest row per key.
    KeepFirst,
    /// Keep the latest row per key.
    KeepLast,
}

/// Main configuration for tempo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Source configuration.
    pub source: SourceConfig,
    /// Sink configuration.
    pub sink: SinkConfig,
    /// Transform configuration.
    #[serde(default)]
    pub transform: TransformConfig,
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = read_config_text(path)?;
        Self::from_yaml(&text)
    }

    /// Parse configuration from a YAML string.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        // Interpolate environment variables
        let result = interpolate(contents);
        if !result.is_ok() {
            return Err(ConfigError::EnvInterpolation {
                message: result.errors.join("\n"),
            });
        }
        Self::from_yaml(&result.text)
    }

    fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let config: Config =
            serde_yaml::from_str(text).map_err(|source| ConfigError::YamlParse { source })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source.song_data.trim().is_empty() {
            return Err(ConfigError::EmptySongSource);
        }
        if self.source.log_data.trim().is_empty() {
            return Err(ConfigError::EmptyLogSource);
        }
        if self.sink.output_uri.trim().is_empty() {
            return Err(ConfigError::EmptyOutputUri);
        }
        if self.source.batch_size == 0 {
            return Err(ConfigError::ZeroValue {
                setting: "source.batch_size".to_string(),
            });
        }
        if self.source.max_concurrent_files == 0 {
            return Err(ConfigError::ZeroValue {
                setting: "source.max_concurrent_files".to_string(),
            });
        }
        if self.sink.max_rows_per_file == 0 {
            return Err(ConfigError::ZeroValue {
                setting: "sink.max_rows_per_file".to_string(),
            });
        }
        if self.transform.timezone.parse::<chrono_tz::Tz>().is_err() {
            return Err(ConfigError::UnknownTimezone {
                name: self.transform.timezone.clone(),
            });
        }
        Ok(())
    }
}
