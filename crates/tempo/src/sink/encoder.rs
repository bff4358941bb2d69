//! Parquet encoding.
//!
//! Each output file is encoded in memory and uploaded in one request.

use arrow::array::RecordBatch;
use bytes::Bytes;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use parquet::errors::ParquetError;
use parquet::file::properties::WriterProperties;

use crate::config::ParquetCompression;

/// Encodes record batches as standalone Parquet files.
#[derive(Debug, Clone)]
pub struct ParquetEncoder {
    properties: WriterProperties,
}

impl ParquetEncoder {
    pub fn new(compression: ParquetCompression) -> Self {
        Self {
            properties: Self::writer_properties(compression),
        }
    }

    fn writer_properties(compression: ParquetCompression) -> WriterProperties {
        let builder = WriterProperties::builder();

        builder
            .set_compression(match compression {
                ParquetCompression::Uncompressed => Compression::UNCOMPRESSED,
                ParquetCompression::Snappy => Compression::SNAPPY,
                ParquetCompression::Gzip => Compression::GZIP(GzipLevel::default()),
                ParquetCompression::Zstd => Compression::ZSTD(ZstdLevel::default()),
                ParquetCompression::Lz4 => Compression::LZ4,
            })
            .build()
    }

    /// Encode one batch as a complete Parquet file. A zero-row batch still
    /// produces a valid file carrying the schema.
    pub fn encode(&self, batch: &RecordBatch) -> Result<Bytes, ParquetError> {
        let mut writer =
            ArrowWriter::try_new(Vec::new(), batch.schema(), Some(self.properties.clone()))?;
        if batch.num_rows() > 0 {
            writer.write(batch)?;
        }
        let buffer = writer.into_inner()?;
        Ok(Bytes::from(buffer))
    }
}
