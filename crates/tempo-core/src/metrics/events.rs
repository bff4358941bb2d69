//! Internal events for loader metrics.
//!
//! Each struct is a measurable occurrence; `InternalEvent::emit` records the
//! corresponding counter, gauge or histogram.

use metrics::{counter, gauge, histogram};
use std::time::Duration;
use tracing::trace;

/// Trait for internal events that can be emitted as metrics.
pub trait InternalEvent {
    /// Emit this event as a metric.
    fn emit(self);
}

/// Storage operation kind.
#[derive(Debug, Clone, Copy)]
pub enum StorageOperation {
    List,
    Get,
    Put,
    Delete,
}

impl StorageOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageOperation::List => "list",
            StorageOperation::Get => "get",
            StorageOperation::Put => "put",
            StorageOperation::Delete => "delete",
        }
    }
}

/// Outcome of a storage request.
#[derive(Debug, Clone, Copy)]
pub enum RequestStatus {
    Success,
    Error,
}

impl RequestStatus {
    pub fn from_result<T, E>(result: &Result<T, E>) -> Self {
        if result.is_ok() {
            RequestStatus::Success
        } else {
            RequestStatus::Error
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Success => "success",
            RequestStatus::Error => "error",
        }
    }
}

/// A single request against the storage backend.
pub struct StorageRequest {
    pub operation: StorageOperation,
    pub status: RequestStatus,
    pub duration: Duration,
}

impl InternalEvent for StorageRequest {
    fn emit(self) {
        trace!(
            operation = self.operation.as_str(),
            status = self.status.as_str(),
            duration_ms = self.duration.as_millis(),
            "Storage request"
        );
        counter!(
            "tempo_storage_requests_total",
            "operation" => self.operation.as_str(),
            "status" => self.status.as_str()
        )
        .increment(1);
        histogram!(
            "tempo_storage_request_duration_seconds",
            "operation" => self.operation.as_str()
        )
        .record(self.duration.as_secs_f64());
    }
}

/// Files matched by a source pattern.
pub struct FilesDiscovered {
    pub count: u64,
    /// Source label ("song_data", "log_data").
    pub source: String,
}

impl InternalEvent for FilesDiscovered {
    fn emit(self) {
        trace!(count = self.count, source = %self.source, "Files discovered");
        counter!("tempo_files_discovered_total", "source" => self.source).increment(self.count);
    }
}

/// Raw records decoded from a source.
pub struct RecordsRead {
    pub count: u64,
    pub bytes: u64,
    pub source: String,
}

impl InternalEvent for RecordsRead {
    fn emit(self) {
        trace!(count = self.count, bytes = self.bytes, source = %self.source, "Records read");
        counter!("tempo_records_read_total", "source" => self.source.clone())
            .increment(self.count);
        counter!("tempo_bytes_read_total", "source" => self.source).increment(self.bytes);
    }
}

/// Rows persisted for an output table.
pub struct TableRowsWritten {
    pub rows: u64,
    pub table: String,
}

impl InternalEvent for TableRowsWritten {
    fn emit(self) {
        trace!(rows = self.rows, table = %self.table, "Table rows written");
        gauge!("tempo_table_rows", "table" => self.table).set(self.rows as f64);
    }
}

/// A Parquet file written to storage.
pub struct ParquetFileWritten {
    pub bytes: u64,
    pub table: String,
}

impl InternalEvent for ParquetFileWritten {
    fn emit(self) {
        trace!(bytes = self.bytes, table = %self.table, "Parquet file written");
        counter!("tempo_parquet_files_written_total", "table" => self.table.clone()).increment(1);
        counter!("tempo_parquet_bytes_written_total", "table" => self.table).increment(self.bytes);
    }
}

/// Outcome of matching listening events against song metadata.
pub struct SongplayMatches {
    pub matched: u64,
    pub unmatched: u64,
    pub ambiguous: u64,
}

impl InternalEvent for SongplayMatches {
    fn emit(self) {
        trace!(
            matched = self.matched,
            unmatched = self.unmatched,
            ambiguous = self.ambiguous,
            "Songplay matches"
        );
        gauge!("tempo_songplay_events", "outcome" => "matched").set(self.matched as f64);
        gauge!("tempo_songplay_events", "outcome" => "unmatched").set(self.unmatched as f64);
        gauge!("tempo_songplay_events", "outcome" => "ambiguous").set(self.ambiguous as f64);
    }
}

/// Wall-clock time of one pipeline stage.
pub struct StageCompleted {
    pub stage: &'static str,
    pub duration: Duration,
}

impl InternalEvent for StageCompleted {
    fn emit(self) {
        trace!(
            stage = self.stage,
            duration_ms = self.duration.as_millis(),
            "Stage completed"
        );
        histogram!("tempo_stage_duration_seconds", "stage" => self.stage)
            .record(self.duration.as_secs_f64());
    }
}
