//! URL parsing for storage backends.
//!
//! Extracts backend configuration from the URL forms accepted for sources and
//! the output root (S3 variants and local filesystem paths).

use object_store::path::Path;
use regex::{Captures, Regex};
use std::sync::OnceLock;

use crate::error::{InvalidUrlSnafu, StorageError};

use super::{LocalConfig, S3Config};

const S3_PATH: &str =
    r"^https://s3\.(?P<region>[\w\-]+)\.amazonaws\.com/(?P<bucket>[a-z0-9\-\.]+)(/(?P<key>.+))?$";
const S3_VIRTUAL: &str =
    r"^https://(?P<bucket>[a-z0-9\-\.]+)\.s3\.(?P<region>[\w\-]+)\.amazonaws\.com(/(?P<key>.+))?$";
const S3_URL: &str = r"^[sS]3[aAnN]?://(?P<bucket>[a-z0-9\-\.]+)(/(?P<key>.*))?$";
const S3_ENDPOINT_URL: &str = r"^[sS]3[aA]?::(?<protocol>https?)://(?P<endpoint>[^:/]+):(?<port>\d+)/(?P<bucket>[a-z0-9\-\.]+)(/(?P<key>.*))?$";

const FILE_URI: &str = r"^file://(?P<path>.*)$";
const FILE_PATH: &str = r"^/(?P<path>.*)$";

struct Matchers {
    s3: Vec<Regex>,
    local: Vec<Regex>,
}

fn matchers() -> &'static Matchers {
    static MATCHERS: OnceLock<Matchers> = OnceLock::new();
    MATCHERS.get_or_init(|| {
        let compile = |patterns: &[&str]| {
            patterns
                .iter()
                .map(|p| Regex::new(p).expect("storage URL patterns are valid"))
                .collect()
        };
        Matchers {
            s3: compile(&[S3_PATH, S3_VIRTUAL, S3_ENDPOINT_URL, S3_URL]),
            local: compile(&[FILE_URI, FILE_PATH]),
        }
    })
}

/// Backend configuration parsed from a storage URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendConfig {
    S3(S3Config),
    Local(LocalConfig),
}

impl BackendConfig {
    /// Parse a URL into a backend configuration.
    pub fn parse_url(url: &str) -> Result<Self, StorageError> {
        let m = matchers();

        if let Some(caps) = m.s3.iter().find_map(|r| r.captures(url)) {
            return Ok(Self::parse_s3(&caps));
        }
        if let Some(caps) = m.local.iter().find_map(|r| r.captures(url)) {
            return Ok(Self::parse_local(&caps));
        }

        InvalidUrlSnafu {
            url: url.to_string(),
        }
        .fail()
    }

    fn parse_s3(caps: &Captures) -> Self {
        let bucket = caps
            .name("bucket")
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();

        let region = caps.name("region").map(|m| m.as_str().to_string());

        let endpoint = caps.name("endpoint").map(|endpoint| {
            let port = caps
                .name("port")
                .and_then(|p| p.as_str().parse::<u16>().ok())
                .unwrap_or(443);
            let protocol = caps.name("protocol").map(|p| p.as_str()).unwrap_or("https");
            format!("{protocol}://{}:{port}", endpoint.as_str())
        });

        let key = caps
            .name("key")
            .map(|m| m.as_str().trim_end_matches('/'))
            .filter(|k| !k.is_empty())
            .map(Path::from);

        BackendConfig::S3(S3Config {
            endpoint,
            region,
            bucket,
            key,
        })
    }

    fn parse_local(caps: &Captures) -> Self {
        let path = caps.name("path").map(|m| m.as_str()).unwrap_or_default();
        let path = format!("/{}", path.trim_start_matches('/'));
        let path = match path.trim_end_matches('/') {
            "" => "/".to_string(),
            trimmed => trimmed.to_string(),
        };

        BackendConfig::Local(LocalConfig { path })
    }

    /// Key prefix inside the backend that all relative paths are resolved against.
    pub(crate) fn key(&self) -> Option<&Path> {
        match self {
            BackendConfig::S3(s3) => s3.key.as_ref(),
            BackendConfig::Local(_) => None,
        }
    }
}
