//! Traits for record sources.

use async_trait::async_trait;

use crate::error::SourceError;
use crate::frame::Frame;

/// Something that yields a frame of raw records.
///
/// The pipeline only depends on this trait, so tests can feed it in-memory
/// frames instead of files.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Read every record of the source.
    async fn read(&self) -> Result<Frame, SourceError>;

    /// Human-readable location, used in logs.
    fn describe(&self) -> &str;
}

#[async_trait]
impl RecordSource for Frame {
    async fn read(&self) -> Result<Frame, SourceError> {
        Ok(self.clone())
    }

    fn describe(&self) -> &str {
        "in-memory frame"
    }
}
