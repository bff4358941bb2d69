//! `songs` and `artists` dimensions.

use arrow::datatypes::DataType;
use snafu::prelude::*;
use tracing::debug;

use crate::config::DuplicatePolicy;
use crate::error::{TableSnafu, TransformError};
use crate::frame::{Column, Frame};

fn song_columns() -> Vec<Column> {
    vec![
        Column::new("song_id", DataType::Utf8),
        Column::new("title", DataType::Utf8),
        Column::new("artist_id", DataType::Utf8),
        Column::new("year", DataType::Int32),
        Column::new("duration", DataType::Float64),
    ]
}

fn artist_columns() -> Vec<Column> {
    vec![
        Column::new("artist_id", DataType::Utf8),
        Column::renamed("artist_name", "name", DataType::Utf8),
        Column::renamed("artist_location", "location", DataType::Utf8),
        Column::renamed("artist_latitude", "lattitude", DataType::Float64),
        Column::renamed("artist_longitude", "longitude", DataType::Float64),
    ]
}

/// One row per song metadata record. No deduplication.
pub fn extract_songs(song_df: &Frame) -> Result<Frame, TransformError> {
    song_df
        .project(&song_columns())
        .context(TableSnafu { table: "songs" })
}

/// One row per song metadata record, or one per `artist_id` when the policy
/// keeps the first or last record.
pub fn extract_artists(song_df: &Frame, policy: DuplicatePolicy) -> Result<Frame, TransformError> {
    let artists = song_df
        .project(&artist_columns())
        .context(TableSnafu { table: "artists" })?;

    let Some(keep) = policy.keep() else {
        return Ok(artists);
    };
    let deduped = artists
        .dedup_by(&["artist_id"], keep)
        .context(TableSnafu { table: "artists" })?;
    debug!(
        before = artists.num_rows(),
        after = deduped.num_rows(),
        ?policy,
        "Deduplicated artists"
    );
    Ok(deduped)
}
