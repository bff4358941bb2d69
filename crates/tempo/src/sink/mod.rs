//! Table writers.
//!
//! Each table lives under `<output_uri>/<table>/`. Writing a table replaces
//! everything under that prefix:
//!
//! ```text
//! songs/year=1994/artist_id=AR1/part-00000.parquet
//! songs/_SUCCESS
//! artists/part-00000.parquet
//! artists/_SUCCESS
//! ```

mod encoder;
mod partition;

pub use encoder::ParquetEncoder;
pub use partition::{HIVE_DEFAULT_PARTITION, escape_partition_value, partition_dir};

use std::time::Instant;

use async_trait::async_trait;
use bytes::Bytes;
use object_store::PutPayload;
use object_store::path::Path;
use snafu::prelude::*;
use tracing::{debug, info};

use tempo_core::emit;
use tempo_core::metrics::events::{ParquetFileWritten, TableRowsWritten};
use tempo_core::{StorageProvider, StorageProviderRef};

use crate::config::SinkConfig;
use crate::error::{
    DestinationSnafu, EncodeSnafu, InvalidPathSnafu, PartitionSnafu, SinkError, WriteSnafu,
};
use crate::frame::Frame;

/// Marker written after every file of a table.
pub const SUCCESS_MARKER: &str = "_SUCCESS";

/// Summary of one written table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableWriteStats {
    pub rows: usize,
    pub files: usize,
    pub bytes: usize,
    pub partitions: usize,
    /// Objects removed from a previous run.
    pub replaced: usize,
}

/// Destination for finished tables.
#[async_trait]
pub trait TableSink: Send + Sync {
    /// Replace `table` with the rows of `frame`, partitioned by
    /// `partition_by` in the given order.
    async fn write_table(
        &self,
        table: &str,
        frame: &Frame,
        partition_by: &[&str],
    ) -> Result<TableWriteStats, SinkError>;
}

/// Writes tables as partitioned Parquet datasets.
pub struct ParquetSink {
    storage: StorageProviderRef,
    encoder: ParquetEncoder,
    max_rows_per_file: usize,
}

impl ParquetSink {
    pub async fn open(config: &SinkConfig) -> Result<Self, SinkError> {
        let storage =
            StorageProvider::for_url_with_options(&config.output_uri, config.storage_options.clone())
                .await
                .context(DestinationSnafu {
                    destination: &config.output_uri,
                })?;
        Ok(Self::new(
            StorageProviderRef::new(storage),
            ParquetEncoder::new(config.compression),
            config.max_rows_per_file,
        ))
    }

    pub fn new(storage: StorageProviderRef, encoder: ParquetEncoder, max_rows_per_file: usize) -> Self {
        Self {
            storage,
            encoder,
            max_rows_per_file: max_rows_per_file.max(1),
        }
    }

    fn destination(&self, table: &str) -> String {
        format!("{}/{table}", self.storage.canonical_url())
    }

    async fn put_file(&self, table: &str, path: &Path, frame: &Frame) -> Result<usize, SinkError> {
        let data = self
            .encoder
            .encode(frame.batch())
            .context(EncodeSnafu { table })?;
        let bytes = data.len();

        self.storage
            .put_parquet(path, data)
            .await
            .context(WriteSnafu {
                table,
                destination: self.destination(table),
            })?;

        emit!(ParquetFileWritten {
            bytes: bytes as u64,
            table: table.to_string(),
        });
        debug!(table, path = %path, rows = frame.num_rows(), bytes, "Wrote Parquet file");
        Ok(bytes)
    }
}

#[async_trait]
impl TableSink for ParquetSink {
    async fn write_table(
        &self,
        table: &str,
        frame: &Frame,
        partition_by: &[&str],
    ) -> Result<TableWriteStats, SinkError> {
        let start = Instant::now();
        let write_context = || WriteSnafu {
            table,
            destination: self.destination(table),
        };

        let replaced = self
            .storage
            .delete_prefix(&Path::from(table))
            .await
            .with_context(|_| write_context())?;

        let partitions = frame
            .partitions(partition_by)
            .context(PartitionSnafu { table })?;

        let mut stats = TableWriteStats {
            rows: frame.num_rows(),
            partitions: partitions.len(),
            replaced,
            ..Default::default()
        };

        for partition in &partitions {
            let dir = partition_dir(partition_by, &partition.values);
            let rows = partition.frame.num_rows();

            // An unpartitioned empty table still gets one file carrying the schema
            for (index, offset) in (0..rows.max(1)).step_by(self.max_rows_per_file).enumerate() {
                let length = self.max_rows_per_file.min(rows - offset);
                let path = Path::parse(format!("{table}/{dir}part-{index:05}.parquet"))
                    .context(InvalidPathSnafu { table })?;
                stats.bytes += self
                    .put_file(table, &path, &partition.frame.slice(offset, length))
                    .await?;
                stats.files += 1;
            }
        }

        self.storage
            .put_payload(&Path::from_iter([table, SUCCESS_MARKER]), PutPayload::from(Bytes::new()))
            .await
            .with_context(|_| write_context())?;

        emit!(TableRowsWritten {
            rows: stats.rows as u64,
            table: table.to_string(),
        });
        info!(
            table,
            destination = %self.destination(table),
            rows = stats.rows,
            files = stats.files,
            partitions = stats.partitions,
            bytes = stats.bytes,
            replaced = stats.replaced,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Wrote table"
        );

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParquetCompression;
    use arrow::array::{Int32Array, RecordBatch, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use std::collections::HashMap;
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn sink(dir: &TempDir, max_rows_per_file: usize) -> ParquetSink {
        ParquetSink::open(&SinkConfig {
            output_uri: dir.path().to_str().unwrap().to_string(),
            compression: ParquetCompression::Snappy,
            max_rows_per_file,
            storage_options: HashMap::new(),
        })
        .await
        .unwrap()
    }

    fn time_frame(rows: &[(&str, Option<i32>, i32)]) -> Frame {
        let schema = Arc::new(Schema::new(vec![
            Field::new("start_time", DataType::Utf8, true),
            Field::new("year", DataType::Int32, true),
            Field::new("month", DataType::Int32, true),
        ]));
        Frame::new(
            RecordBatch::try_new(
                schema,
                vec![
                    Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.0))),
                    Arc::new(Int32Array::from_iter(rows.iter().map(|r| r.1))),
                    Arc::new(Int32Array::from_iter_values(rows.iter().map(|r| r.2))),
                ],
            )
            .unwrap(),
        )
    }

    fn files_under(dir: &TempDir, table: &str) -> Vec<String> {
        let root = dir.path().join(table);
        let mut files = Vec::new();
        let mut stack = vec![root.clone()];
        while let Some(path) = stack.pop() {
            for entry in std::fs::read_dir(&path).unwrap() {
                let entry = entry.unwrap().path();
                if entry.is_dir() {
                    stack.push(entry);
                } else {
                    let relative = entry.strip_prefix(&root).unwrap();
                    files.push(relative.to_string_lossy().replace('\\', "/"));
                }
            }
        }
        files.sort();
        files
    }

    #[tokio::test]
    async fn test_partitioned_layout() {
        let dir = TempDir::new().unwrap();
        let frame = time_frame(&[
            ("2018-11-02 01:25:34", Some(2018), 11),
            ("2018-12-01 00:00:00", Some(2018), 12),
            ("1970-01-01 00:00:00", None, 1),
        ]);

        let stats = sink(&dir, 100)
            .await
            .write_table("time", &frame, &["year", "month"])
            .await
            .unwrap();

        assert_eq!(stats.rows, 3);
        assert_eq!(stats.files, 3);
        assert_eq!(stats.partitions, 3);
        assert_eq!(
            files_under(&dir, "time"),
            vec![
                "_SUCCESS",
                "year=2018/month=11/part-00000.parquet",
                "year=2018/month=12/part-00000.parquet",
                "year=__HIVE_DEFAULT_PARTITION__/month=1/part-00000.parquet",
            ]
        );
    }

    #[tokio::test]
    async fn test_rolls_files_by_row_count() {
        let dir = TempDir::new().unwrap();
        let frame = time_frame(&[
            ("a", Some(2018), 11),
            ("b", Some(2018), 11),
            ("c", Some(2018), 11),
            ("d", Some(2018), 11),
            ("e", Some(2018), 11),
        ]);

        let stats = sink(&dir, 2)
            .await
            .write_table("users", &frame, &[])
            .await
            .unwrap();
        assert_eq!(stats.files, 3);
        assert_eq!(
            files_under(&dir, "users"),
            vec![
                "_SUCCESS",
                "part-00000.parquet",
                "part-00001.parquet",
                "part-00002.parquet",
            ]
        );
    }

    #[tokio::test]
    async fn test_overwrite_removes_previous_files() {
        let dir = TempDir::new().unwrap();
        let sink = sink(&dir, 1).await;

        let first = time_frame(&[("a", Some(2018), 11), ("b", Some(2018), 11)]);
        sink.write_table("time", &first, &["year", "month"])
            .await
            .unwrap();
        assert_eq!(files_under(&dir, "time").len(), 3);

        let second = time_frame(&[("c", Some(2019), 1)]);
        let stats = sink
            .write_table("time", &second, &["year", "month"])
            .await
            .unwrap();
        assert_eq!(stats.replaced, 3);
        assert_eq!(
            files_under(&dir, "time"),
            vec!["_SUCCESS", "year=2019/month=1/part-00000.parquet"]
        );
    }

    #[tokio::test]
    async fn test_empty_tables() {
        let dir = TempDir::new().unwrap();
        let sink = sink(&dir, 10).await;
        let empty = time_frame(&[]);

        let stats = sink.write_table("artists", &empty, &[]).await.unwrap();
        assert_eq!(stats.files, 1);
        assert_eq!(
            files_under(&dir, "artists"),
            vec!["_SUCCESS", "part-00000.parquet"]
        );

        let stats = sink
            .write_table("time", &empty, &["year", "month"])
            .await
            .unwrap();
        assert_eq!(stats.files, 0);
        assert_eq!(files_under(&dir, "time"), vec!["_SUCCESS"]);
    }

    #[tokio::test]
    async fn test_sibling_prefixes_are_untouched() {
        let dir = TempDir::new().unwrap();
        let sink = sink(&dir, 10).await;
        let frame = time_frame(&[("a", Some(2018), 11)]);

        sink.write_table("songplays", &frame, &["year", "month"])
            .await
            .unwrap();
        sink.write_table("songs", &frame, &["year"]).await.unwrap();
        sink.write_table("songs", &frame, &["year"]).await.unwrap();

        assert_eq!(files_under(&dir, "songplays").len(), 2);
        assert_eq!(files_under(&dir, "songs").len(), 2);
    }
}
