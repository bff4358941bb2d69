//! Record sources.
//!
//! A source URI names a base location and an optional glob, for example
//! `s3a://udacity-dend/song_data/*/*/*/*.json`. Every matching JSON-lines
//! file is read, in path order, into one frame.

mod inference;
mod reader;
mod traits;

pub use inference::{infer_schema_from_bytes, merge_schemas};
pub use reader::{JsonReader, SourceFile};
pub use traits::RecordSource;

use std::time::Instant;

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt, stream};
use snafu::prelude::*;
use tracing::{debug, info, warn};

use tempo_core::emit;
use tempo_core::metrics::events::{FilesDiscovered, RecordsRead};
use tempo_core::{SourceLocation, StorageProvider, StorageProviderRef};

use crate::config::SourceConfig;
use crate::error::{FetchSnafu, LocationSnafu, SourceError, StorageError};
use crate::frame::Frame;

/// A glob of JSON-lines files in object storage or on local disk.
pub struct JsonSource {
    name: String,
    uri: String,
    location: SourceLocation,
    /// `None` when the local base location does not exist.
    storage: Option<StorageProviderRef>,
    reader: JsonReader,
    max_concurrent_files: usize,
}

impl JsonSource {
    /// Connect to the storage behind `uri`. Nothing is created: a missing
    /// local base location reads as a source with no files.
    ///
    /// `name` labels logs and metrics (e.g. `song_data`).
    pub async fn open(name: &str, uri: &str, config: &SourceConfig) -> Result<Self, SourceError> {
        let location = SourceLocation::parse(uri).context(LocationSnafu { uri })?;
        let storage = StorageProvider::for_existing_url_with_options(
            location.root(),
            config.storage_options.clone(),
        )
        .await
        .context(LocationSnafu { uri })?;

        Ok(Self {
            name: name.to_string(),
            uri: uri.to_string(),
            location,
            storage: storage.map(StorageProviderRef::new),
            reader: JsonReader::new(config.batch_size),
            max_concurrent_files: config.max_concurrent_files,
        })
    }

    async fn fetch(&self) -> Result<Vec<SourceFile>, SourceError> {
        let Some(storage) = &self.storage else {
            debug!(source = %self.name, root = self.location.root(), "Base location does not exist");
            return Ok(Vec::new());
        };
        let paths = storage
            .list_matching(&self.location)
            .await
            .context(FetchSnafu { uri: &self.uri })?;

        emit!(FilesDiscovered {
            count: paths.len() as u64,
            source: self.name.clone(),
        });

        // `buffered` keeps results in path order
        stream::iter(paths)
            .map(|path| async move {
                let data = storage.get(&path).await?;
                Ok::<_, StorageError>(SourceFile {
                    path: format!("{}/{}", storage.canonical_url(), path),
                    data,
                })
            })
            .buffered(self.max_concurrent_files)
            .try_collect::<Vec<_>>()
            .await
            .context(FetchSnafu { uri: &self.uri })
    }
}

#[async_trait]
impl RecordSource for JsonSource {
    async fn read(&self) -> Result<Frame, SourceError> {
        let start = Instant::now();
        let files = self.fetch().await?;

        if files.is_empty() {
            warn!(
                source = %self.name,
                uri = %self.uri,
                pattern = self.location.pattern(),
                "No files matched, continuing with an empty frame"
            );
            return Ok(Frame::empty());
        }

        let bytes: usize = files.iter().map(|f| f.data.len()).sum();
        let frame = self.reader.read_files(&files, &self.uri)?;

        emit!(RecordsRead {
            count: frame.num_rows() as u64,
            bytes: bytes as u64,
            source: self.name.clone(),
        });
        info!(
            source = %self.name,
            files = files.len(),
            records = frame.num_rows(),
            columns = frame.column_names().len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Read source"
        );

        Ok(frame)
    }

    fn describe(&self) -> &str {
        &self.uri
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn config() -> SourceConfig {
        SourceConfig {
            song_data: String::new(),
            log_data: String::new(),
            batch_size: 8192,
            max_concurrent_files: 2,
            storage_options: HashMap::new(),
        }
    }

    fn write(dir: &TempDir, relative: &str, contents: &str) {
        let path = dir.path().join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    #[tokio::test]
    async fn test_reads_matching_files_only() {
        let dir = TempDir::new().unwrap();
        write(&dir, "song_data/A/B/C/one.json", r#"{"song_id": "S1"}"#);
        write(&dir, "song_data/A/B/C/two.json", r#"{"song_id": "S2"}"#);
        write(&dir, "song_data/A/B/three.json", r#"{"song_id": "S3"}"#);
        write(&dir, "song_data/A/B/C/notes.txt", "not json");

        let uri = format!("{}/song_data/*/*/*/*.json", dir.path().display());
        let source = JsonSource::open("song_data", &uri, &config()).await.unwrap();
        assert_eq!(source.describe(), uri);
        let frame = source.read().await.unwrap();

        assert_eq!(frame.num_rows(), 2);
        assert_eq!(
            crate::frame::tests::strings(&frame, "song_id"),
            vec![Some("S1".into()), Some("S2".into())]
        );
    }

    #[tokio::test]
    async fn test_directory_reads_all_json_recursively() {
        let dir = TempDir::new().unwrap();
        write(&dir, "log_data/2018/11/a.json", "{\"ts\": 1}\n{\"ts\": 2}\n");
        write(&dir, "log_data/b.json", "{\"ts\": 3}\n");

        let uri = format!("{}/log_data", dir.path().display());
        let frame = JsonSource::open("log_data", &uri, &config())
            .await
            .unwrap()
            .read()
            .await
            .unwrap();
        assert_eq!(frame.num_rows(), 3);
    }

    #[tokio::test]
    async fn test_missing_base_location_is_not_created() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("never_created");
        let uri = format!("{}/*/*.json", root.display());

        let frame = JsonSource::open("log_data", &uri, &config())
            .await
            .unwrap()
            .read()
            .await
            .unwrap();
        assert_eq!(frame.num_rows(), 0);
        assert!(!root.exists());
    }

    #[tokio::test]
    async fn test_no_matches_is_empty_frame() {
        let dir = TempDir::new().unwrap();
        let uri = format!("{}/log_data/*/*/*.json", dir.path().display());
        let frame = JsonSource::open("log_data", &uri, &config())
            .await
            .unwrap()
            .read()
            .await
            .unwrap();
        assert_eq!(frame.num_rows(), 0);
        assert!(frame.column_names().is_empty());
    }
}
