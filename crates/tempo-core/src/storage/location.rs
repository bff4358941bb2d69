//! Source locations: a storage root plus a glob pattern beneath it.

use glob::{MatchOptions, Pattern};
use snafu::prelude::*;

use crate::error::{InvalidPatternSnafu, StorageError};

/// Pattern used when a source URI names a directory without any wildcard.
pub const DEFAULT_PATTERN: &str = "**/*.json";

const GLOB_CHARS: &[char] = &['*', '?', '['];

/// Match options: `*` never crosses a `/`, `**` does.
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// A source URI split into the storage root and the pattern relative to it.
///
/// `s3a://bucket/song_data/*/*/*/*.json` becomes the root
/// `s3a://bucket/song_data` and the pattern `*/*/*/*.json`.
#[derive(Debug, Clone)]
pub struct SourceLocation {
    root: String,
    pattern: Pattern,
}

impl SourceLocation {
    /// Split a URI at the first path segment containing a glob metacharacter.
    pub fn parse(uri: &str) -> Result<Self, StorageError> {
        let segments: Vec<&str> = uri.split('/').collect();
        let first_glob = segments
            .iter()
            .position(|segment| segment.contains(GLOB_CHARS));

        let (root, pattern) = match first_glob {
            Some(idx) => (segments[..idx].join("/"), segments[idx..].join("/")),
            None => (
                uri.trim_end_matches('/').to_string(),
                DEFAULT_PATTERN.to_string(),
            ),
        };

        let compiled = Pattern::new(&pattern).context(InvalidPatternSnafu {
            pattern: pattern.clone(),
        })?;

        Ok(Self {
            root,
            pattern: compiled,
        })
    }

    /// Storage root URI (everything before the first wildcard segment).
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Pattern relative to the root.
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// Whether a path relative to the root matches the pattern.
    pub fn matches(&self, relative_path: &str) -> bool {
        self.pattern.matches_with(relative_path, MATCH_OPTIONS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_song_data_glob() {
        let location = SourceLocation::parse("s3a://udacity-dend/song_data/*/*/*/*.json").unwrap();
        assert_eq!(location.root(), "s3a://udacity-dend/song_data");
        assert_eq!(location.pattern(), "*/*/*/*.json");
    }

    #[test]
    fn test_split_local_glob() {
        let location = SourceLocation::parse("/data/log_data/*/*/*.json").unwrap();
        assert_eq!(location.root(), "/data/log_data");
        assert_eq!(location.pattern(), "*/*/*.json");
    }

    #[test]
    fn test_directory_without_wildcards_reads_all_json() {
        let location = SourceLocation::parse("/data/log_data/").unwrap();
        assert_eq!(location.root(), "/data/log_data");
        assert_eq!(location.pattern(), DEFAULT_PATTERN);
        assert!(location.matches("2018/11/2018-11-01-events.json"));
        assert!(location.matches("top-level.json"));
        assert!(!location.matches("2018/11/notes.txt"));
    }

    #[test]
    fn test_star_does_not_cross_separator() {
        let location = SourceLocation::parse("/data/song_data/*/*/*/*.json").unwrap();
        assert!(location.matches("A/A/A/TRAAAAW128F429D538.json"));
        assert!(!location.matches("A/A/TRAAAAW128F429D538.json"));
        assert!(!location.matches("A/A/A/B/TRAAAAW128F429D538.json"));
    }

    #[test]
    fn test_invalid_pattern() {
        let result = SourceLocation::parse("/data/[a-/x.json");
        assert!(matches!(result, Err(StorageError::InvalidPattern { .. })));
    }
}
