//! Local filesystem storage backend.

use object_store::ObjectStore;
use object_store::local::LocalFileSystem;
use snafu::prelude::*;
use std::sync::Arc;

use crate::error::{IoSnafu, ObjectStoreSnafu, StorageError};

use super::{BackendConfig, StorageProvider};

/// Local filesystem configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalConfig {
    pub path: String,
}

impl StorageProvider {
    /// `LocalFileSystem` canonicalizes its prefix, so the root has to exist
    /// by the time the store is built.
    pub(super) async fn construct_local(
        config: LocalConfig,
        create_root: bool,
    ) -> Result<Self, StorageError> {
        if create_root {
            tokio::fs::create_dir_all(&config.path)
                .await
                .context(IoSnafu)?;
        }

        let object_store: Arc<dyn ObjectStore> =
            Arc::new(LocalFileSystem::new_with_prefix(&config.path).context(ObjectStoreSnafu)?);

        let canonical_url = format!("file://{}", config.path);

        Ok(Self {
            config: BackendConfig::Local(config),
            object_store,
            canonical_url,
        })
    }
}

/// Whether a local root exists, without touching the filesystem otherwise.
pub(super) async fn root_exists(config: &LocalConfig) -> Result<bool, StorageError> {
    tokio::fs::try_exists(&config.path).await.context(IoSnafu)
}
