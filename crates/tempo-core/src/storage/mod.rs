//! Storage abstraction over S3 and the local filesystem.
//!
//! Every provider is rooted at a URL; all paths handed to or returned from it
//! are relative to that root.

mod local;
mod location;
mod s3;
mod url_parser;

pub use local::LocalConfig;
pub use location::{DEFAULT_PATTERN, SourceLocation};
pub use s3::S3Config;
pub use url_parser::BackendConfig;

use bytes::Bytes;
use futures::StreamExt;
use object_store::path::Path;
use object_store::{Attribute, AttributeValue, Attributes, ObjectStore, PutOptions, PutPayload};
use snafu::prelude::*;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use crate::emit;
use crate::error::{ObjectStoreSnafu, StorageError};
use crate::metrics::events::{RequestStatus, StorageOperation, StorageRequest};

/// A reference-counted storage provider.
pub type StorageProviderRef = Arc<StorageProvider>;

/// Storage provider rooted at a URL.
#[derive(Clone)]
pub struct StorageProvider {
    pub(crate) config: BackendConfig,
    pub(crate) object_store: Arc<dyn ObjectStore>,
    pub(crate) canonical_url: String,
}

impl std::fmt::Debug for StorageProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StorageProvider<{}>", self.canonical_url)
    }
}

impl StorageProvider {
    /// Create a storage provider for the given URL with storage options.
    pub async fn for_url_with_options(
        url: &str,
        options: HashMap<String, String>,
    ) -> Result<Self, StorageError> {
        match BackendConfig::parse_url(url)? {
            BackendConfig::S3(config) => Self::construct_s3(config, options),
            BackendConfig::Local(config) => Self::construct_local(config, true).await,
        }
    }

    /// Like [`Self::for_url_with_options`], but for reading only: a local
    /// root is never created, and one that does not exist yields `None`.
    pub async fn for_existing_url_with_options(
        url: &str,
        options: HashMap<String, String>,
    ) -> Result<Option<Self>, StorageError> {
        match BackendConfig::parse_url(url)? {
            BackendConfig::S3(config) => Self::construct_s3(config, options).map(Some),
            BackendConfig::Local(config) => {
                if !local::root_exists(&config).await? {
                    return Ok(None);
                }
                Self::construct_local(config, false).await.map(Some)
            }
        }
    }

    /// The URL this provider is rooted at.
    pub fn canonical_url(&self) -> &str {
        &self.canonical_url
    }

    /// Qualify a relative path with the configured key prefix.
    pub fn qualify_path<'a>(&self, path: &'a Path) -> Cow<'a, Path> {
        match self.config.key() {
            Some(prefix) => Cow::Owned(prefix.parts().chain(path.parts()).collect()),
            None => Cow::Borrowed(path),
        }
    }

    /// List every object under `prefix` (or the whole root), recursively.
    ///
    /// Returned paths are relative to the root and sorted. A prefix that does
    /// not exist yields an empty list.
    pub async fn list(&self, prefix: Option<&Path>) -> Result<Vec<Path>, StorageError> {
        let start = Instant::now();
        let relative = prefix.cloned().unwrap_or_default();
        let full_prefix = self.qualify_path(&relative).into_owned();
        let key_part_count = self
            .config
            .key()
            .map(|key| key.parts().count())
            .unwrap_or_default();

        let search = (full_prefix.parts().count() > 0).then_some(&full_prefix);
        let mut stream = self.object_store.list(search);
        let mut paths = Vec::new();

        while let Some(result) = stream.next().await {
            match result {
                Ok(meta) => {
                    // Strip the key prefix so callers get paths relative to the root
                    let relative: Path = meta.location.parts().skip(key_part_count).collect();
                    paths.push(relative);
                }
                Err(object_store::Error::NotFound { .. }) => continue,
                Err(source) => {
                    emit!(StorageRequest {
                        operation: StorageOperation::List,
                        status: RequestStatus::Error,
                        duration: start.elapsed(),
                    });
                    return Err(StorageError::ObjectStore { source });
                }
            }
        }

        emit!(StorageRequest {
            operation: StorageOperation::List,
            status: RequestStatus::Success,
            duration: start.elapsed(),
        });

        paths.sort();
        Ok(paths)
    }

    /// List the files under the root that match a source location's pattern.
    pub async fn list_matching(
        &self,
        location: &SourceLocation,
    ) -> Result<Vec<Path>, StorageError> {
        let all = self.list(None).await?;
        let total = all.len();
        let matched: Vec<Path> = all
            .into_iter()
            .filter(|path| location.matches(path.as_ref()))
            .collect();

        debug!(
            root = %self.canonical_url,
            pattern = location.pattern(),
            listed = total,
            matched = matched.len(),
            "Listed source files"
        );

        Ok(matched)
    }

    /// Get the contents of a file.
    pub async fn get(&self, path: &Path) -> Result<Bytes, StorageError> {
        let start = Instant::now();
        let result = match self.object_store.get(&self.qualify_path(path)).await {
            Ok(response) => response.bytes().await,
            Err(e) => Err(e),
        };

        emit!(StorageRequest {
            operation: StorageOperation::Get,
            status: RequestStatus::from_result(&result),
            duration: start.elapsed(),
        });

        result.context(ObjectStoreSnafu)
    }

    /// Put a payload to a path.
    pub async fn put_payload(&self, path: &Path, payload: PutPayload) -> Result<(), StorageError> {
        self.put_payload_with_opts(path, payload, PutOptions::default())
            .await
    }

    /// Put a Parquet file to a path with the correct content type.
    ///
    /// Local filesystem doesn't support attributes, so they are skipped there.
    pub async fn put_parquet(&self, path: &Path, bytes: Bytes) -> Result<(), StorageError> {
        let payload = PutPayload::from(bytes);
        if matches!(self.config, BackendConfig::Local(_)) {
            return self.put_payload(path, payload).await;
        }

        let opts = PutOptions {
            attributes: Attributes::from_iter([(
                Attribute::ContentType,
                AttributeValue::from("application/vnd.apache.parquet"),
            )]),
            ..Default::default()
        };
        self.put_payload_with_opts(path, payload, opts).await
    }

    async fn put_payload_with_opts(
        &self,
        path: &Path,
        payload: PutPayload,
        opts: PutOptions,
    ) -> Result<(), StorageError> {
        let path = self.qualify_path(path);
        let start = Instant::now();
        let result = self.object_store.put_opts(&path, payload, opts).await;

        emit!(StorageRequest {
            operation: StorageOperation::Put,
            status: RequestStatus::from_result(&result),
            duration: start.elapsed(),
        });

        result.context(ObjectStoreSnafu)?;
        Ok(())
    }

    /// Delete a file at the given path.
    pub async fn delete(&self, path: &Path) -> Result<(), StorageError> {
        let path = self.qualify_path(path);
        let start = Instant::now();
        let result = self.object_store.delete(&path).await;

        emit!(StorageRequest {
            operation: StorageOperation::Delete,
            status: RequestStatus::from_result(&result),
            duration: start.elapsed(),
        });

        match result {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(source) => Err(StorageError::ObjectStore { source }),
        }
    }

    /// Delete every object under `prefix`. Returns the number of objects removed.
    pub async fn delete_prefix(&self, prefix: &Path) -> Result<usize, StorageError> {
        let paths = self.list(Some(prefix)).await?;
        for path in &paths {
            self.delete(path).await?;
        }
        if !paths.is_empty() {
            debug!(
                root = %self.canonical_url,
                prefix = %prefix,
                deleted = paths.len(),
                "Cleared existing objects"
            );
        }
        Ok(paths.len())
    }
}
