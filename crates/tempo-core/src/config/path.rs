//! Command line arguments and config file loading.

use std::path::{Path, PathBuf};

use clap::Parser;
use snafu::prelude::*;

use super::vars::interpolate;
use crate::error::{ConfigError, ReadFileSnafu, UnsupportedFormatSnafu};

#[derive(Parser, Debug)]
#[command(version, about = "Load song metadata and listening logs into a Parquet star schema")]
pub struct CliArgs {
    /// Path to the YAML configuration file
    #[arg(short, long)]
    pub config: PathBuf,
}

/// Check if a path has a YAML extension.
pub fn is_yaml_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext == "yaml" || ext == "yml")
        .unwrap_or(false)
}

/// Read a YAML config file and interpolate environment variables into it.
pub fn read_config_text(path: &Path) -> Result<String, ConfigError> {
    ensure!(
        is_yaml_file(path),
        UnsupportedFormatSnafu {
            path: path.to_path_buf()
        }
    );

    let raw = std::fs::read_to_string(path).context(ReadFileSnafu {
        path: path.to_path_buf(),
    })?;

    let result = interpolate(&raw);
    if !result.is_ok() {
        return Err(ConfigError::EnvInterpolation {
            message: result.errors.join("\n"),
        });
    }
    Ok(result.text)
}
