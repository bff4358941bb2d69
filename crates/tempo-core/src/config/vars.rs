//! Environment variable interpolation for config files.
//!
//! Supported syntax:
//! - `$VAR` or `${VAR}`: the variable's value, an error if unset
//! - `${VAR:-default}`: `default` when VAR is unset or empty
//! - `${VAR-default}`: `default` only when VAR is unset
//! - `$$`: a literal `$`

use regex::{Captures, Regex};
use std::env;
use std::sync::LazyLock;

static ENV_VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        \$\$
        |
        \$\{ ([A-Za-z_][A-Za-z0-9_]*) (?: (:?-) ([^}]*) )? \}
        |
        \$([A-Za-z_][A-Za-z0-9_]*)
        ",
    )
    .expect("interpolation pattern is valid")
});

/// Result of environment variable interpolation.
#[derive(Debug)]
pub struct InterpolationResult {
    /// The interpolated text.
    pub text: String,
    /// Every variable that could not be resolved.
    pub errors: Vec<String>,
}

impl InterpolationResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Interpolate environment variables using the process environment.
pub fn interpolate(input: &str) -> InterpolationResult {
    interpolate_with(input, |name| env::var(name).ok())
}

/// Interpolate variables using an explicit lookup.
///
/// Errors are accumulated so a user sees every missing variable at once.
pub fn interpolate_with<F>(input: &str, lookup: F) -> InterpolationResult
where
    F: Fn(&str) -> Option<String>,
{
    let mut errors = Vec::new();

    let text = ENV_VAR_PATTERN
        .replace_all(input, |caps: &Captures| {
            let full_match = &caps[0];
            if full_match == "$$" {
                return "$".to_string();
            }

            let name = caps
                .get(1)
                .or_else(|| caps.get(4))
                .map(|m| m.as_str())
                .unwrap_or_default();
            let operator = caps.get(2).map(|m| m.as_str());
            let default = caps.get(3).map(|m| m.as_str());

            match (lookup(name), default) {
                (Some(value), _) if value.contains(['\n', '\r']) => {
                    errors.push(format!(
                        "environment variable '{name}' contains newlines, which is not allowed"
                    ));
                    full_match.to_string()
                }
                (Some(value), Some(default)) if value.is_empty() && operator == Some(":-") => {
                    default.to_string()
                }
                (Some(value), _) => value,
                (None, Some(default)) => default.to_string(),
                (None, None) => {
                    errors.push(format!("environment variable '{name}' is not set"));
                    full_match.to_string()
                }
            }
        })
        .into_owned();

    InterpolationResult { text, errors }
}
