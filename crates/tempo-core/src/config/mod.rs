//! Configuration plumbing shared by the loader: CLI arguments, file loading
//! and environment interpolation.

mod path;
mod vars;

pub use path::{CliArgs, is_yaml_file, read_config_text};
pub use vars::{InterpolationResult, interpolate, interpolate_with};
