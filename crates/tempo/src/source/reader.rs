//! JSON-lines reader.
//!
//! Decodes raw file contents into a single frame using a schema merged
//! across every file of the source.

use std::io::Cursor;

use arrow::array::RecordBatch;
use arrow::compute::concat_batches;
use arrow::datatypes::SchemaRef;
use arrow::json::ReaderBuilder;
use bytes::Bytes;
use snafu::prelude::*;
use tracing::debug;

use super::inference::{infer_schema_from_bytes, merge_schemas};
use crate::error::{ConcatSnafu, DecoderBuildSnafu, JsonDecodeSnafu, ReaderError};
use crate::frame::Frame;

/// A fetched source file.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Fully qualified location, used in logs and errors.
    pub path: String,
    pub data: Bytes,
}

/// Reader for JSON-lines files.
#[derive(Debug, Clone)]
pub struct JsonReader {
    batch_size: usize,
}

impl JsonReader {
    pub fn new(batch_size: usize) -> Self {
        Self { batch_size }
    }

    /// Decode every file into one frame whose columns are the union of the
    /// fields across files. Values missing from a file are null.
    pub fn read_files(&self, files: &[SourceFile], source_uri: &str) -> Result<Frame, ReaderError> {
        let schemas = files
            .iter()
            .map(|file| infer_schema_from_bytes(&file.data, &file.path))
            .collect::<Result<Vec<_>, _>>()?;
        let schema = merge_schemas(&schemas);
        if schema.fields().is_empty() {
            return Ok(Frame::empty());
        }

        let mut batches = Vec::new();
        for file in files {
            batches.extend(self.decode(&file.data, &file.path, &schema)?);
        }

        let batch = concat_batches(&schema, &batches).context(ConcatSnafu { source_uri })?;
        Ok(Frame::new(batch))
    }

    fn decode(
        &self,
        data: &Bytes,
        path: &str,
        schema: &SchemaRef,
    ) -> Result<Vec<RecordBatch>, ReaderError> {
        let reader = ReaderBuilder::new(schema.clone())
            .with_batch_size(self.batch_size)
            .with_coerce_primitive(true)
            .build(Cursor::new(data.as_ref()))
            .context(DecoderBuildSnafu)?;

        let batches = reader
            .collect::<Result<Vec<_>, _>>()
            .context(JsonDecodeSnafu { path })?;
        let records: usize = batches.iter().map(|b| b.num_rows()).sum();
        debug!(path, records, batches = batches.len(), "Decoded file");
        Ok(batches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::tests::strings;

    fn file(path: &str, contents: &str) -> SourceFile {
        SourceFile {
            path: path.to_string(),
            data: Bytes::from(contents.to_string()),
        }
    }

    #[test]
    fn test_union_across_files_with_nulls() {
        let reader = JsonReader::new(2);
        let frame = reader
            .read_files(
                &[
                    file("a.json", "{\"page\": \"NextSong\", \"ts\": 1}\n{\"page\": \"Home\", \"ts\": 2}\n{\"page\": \"NextSong\", \"ts\": 3}\n"),
                    file("b.json", "{\"page\": \"Logout\", \"userId\": 7}\n"),
                ],
                "/logs",
            )
            .unwrap();

        assert_eq!(frame.num_rows(), 4);
        assert_eq!(frame.column_names(), vec!["page", "ts", "userId"]);
        assert_eq!(
            strings(&frame, "userId"),
            vec![None, None, None, Some("7".into())]
        );
    }

    #[test]
    fn test_single_object_song_file() {
        let frame = JsonReader::new(8192)
            .read_files(
                &[file(
                    "song_data/A/A/A/TRAAAAW128F429D538.json",
                    r#"{"num_songs": 1, "artist_id": "ARD7TVE1187B99BFB1", "artist_latitude": null, "artist_longitude": null, "artist_location": "California - LA", "artist_name": "Casual", "song_id": "SOMZWCG12A8C13C480", "title": "I Didn't Mean To", "duration": 218.93179, "year": 0}"#,
                )],
                "/song_data",
            )
            .unwrap();
        assert_eq!(frame.num_rows(), 1);
        assert_eq!(strings(&frame, "title"), vec![Some("I Didn't Mean To".into())]);
    }

    #[test]
    fn test_no_records_is_empty_frame() {
        let frame = JsonReader::new(8192)
            .read_files(&[file("empty.json", "\n\n")], "/logs")
            .unwrap();
        assert_eq!(frame.num_rows(), 0);
        assert!(frame.column_names().is_empty());
    }

    #[test]
    fn test_malformed_line_is_fatal() {
        let result = JsonReader::new(8192).read_files(
            &[file("bad.json", "{\"page\": \"Home\"}\n{\"page\": Home}\n")],
            "/logs",
        );
        let err = result.unwrap_err();
        assert!(err.to_string().contains("bad.json"));
    }
}
