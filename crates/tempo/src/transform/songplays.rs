//! The `songplays` fact table.
//!
//! Events and song metadata share no key, so a play is attributed to a song
//! by matching `(song, length)` against `(title, duration)` and then checking
//! that the event's artist name belongs to that song's artist.

use std::collections::HashMap;
use std::sync::Arc;

use arrow::array::{ArrayRef, AsArray, UInt64Array};
use arrow::datatypes::{DataType, UInt64Type};
use snafu::prelude::*;
use tracing::{info, warn};

use tempo_core::emit;
use tempo_core::metrics::events::SongplayMatches;

use super::time::TimestampConverter;
use crate::error::{ColumnNotFoundSnafu, FrameError, TableSnafu, TransformError};
use crate::frame::{Column, Frame};

const EVENT_ROW: &str = "__event_row";

/// How the events fared against the song metadata.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SongplayStats {
    /// Filtered song-play events considered.
    pub events: usize,
    /// Events that produced at least one songplay.
    pub matched: usize,
    /// Events dropped for lack of a song, artist or time match.
    pub unmatched: usize,
    /// Events that still matched more than one song record after the
    /// artist check.
    pub ambiguous_events: usize,
}

/// The fact table plus matching statistics.
#[derive(Debug, Clone)]
pub struct Songplays {
    pub table: Frame,
    pub stats: SongplayStats,
}

fn song_keys() -> Vec<Column> {
    vec![
        Column::new("title", DataType::Utf8),
        Column::new("duration", DataType::Float64),
        Column::new("song_id", DataType::Utf8),
        Column::new("artist_id", DataType::Utf8),
    ]
}

fn songplay_columns() -> Vec<Column> {
    vec![
        Column::new("start_time", DataType::Utf8),
        Column::renamed("userId", "user_id", DataType::Utf8),
        Column::new("level", DataType::Utf8),
        Column::new("song_id", DataType::Utf8),
        Column::new("artist_id", DataType::Utf8),
        Column::renamed("sessionId", "session_id", DataType::Int64),
        Column::new("location", DataType::Utf8),
        Column::renamed("userAgent", "user_agent", DataType::Utf8),
        Column::new("year", DataType::Int32),
        Column::new("month", DataType::Int32),
    ]
}

/// Build the fact table.
///
/// 1. events join song metadata on `song = title AND length = duration`
/// 2. the event's `artist` must name the matched song's `artist_id` in
///    `artists`; this is a semi-join so repeated artist rows add nothing
/// 3. the event's `start_time` joins `time` for `year` and `month`
///
/// Events that fail any step are dropped. An event that matches several
/// song records of the same artist yields one row per record and is counted
/// as ambiguous.
pub fn build_songplays(
    filtered: &Frame,
    song_df: &Frame,
    artists: &Frame,
    time: &Frame,
    converter: &TimestampConverter,
) -> Result<Songplays, TransformError> {
    let ts = filtered
        .column("ts")
        .context(ColumnNotFoundSnafu { name: "ts" })
        .context(TableSnafu { table: "songplays" })?;
    let start_time = converter.start_time_column(ts.as_ref())?;
    let events = filtered
        .with_column("start_time", start_time)
        .and_then(|events| events.with_column(EVENT_ROW, row_ids(filtered.num_rows())))
        .context(TableSnafu { table: "songplays" })?;

    let (by_artist, by_time) =
        join_events(&events, song_df, artists, time).context(TableSnafu { table: "songplays" })?;

    let matched = count_rows(&by_time).len();
    let stats = SongplayStats {
        events: filtered.num_rows(),
        matched,
        unmatched: filtered.num_rows() - matched,
        ambiguous_events: count_rows(&by_artist).values().filter(|&&n| n > 1).count(),
    };

    emit!(SongplayMatches {
        matched: stats.matched as u64,
        unmatched: stats.unmatched as u64,
        ambiguous: stats.ambiguous_events as u64,
    });
    if stats.ambiguous_events > 0 {
        warn!(
            ambiguous_events = stats.ambiguous_events,
            "Events matched more than one song record; each match yields a songplay"
        );
    }
    info!(
        events = stats.events,
        matched = stats.matched,
        unmatched = stats.unmatched,
        songplays = by_time.num_rows(),
        "Built songplays"
    );

    let table = by_time
        .project(&songplay_columns())
        .context(TableSnafu { table: "songplays" })?;
    Ok(Songplays { table, stats })
}

/// Returns the rows after the artist check and after all three joins.
fn join_events(
    events: &Frame,
    song_df: &Frame,
    artists: &Frame,
    time: &Frame,
) -> Result<(Frame, Frame), FrameError> {
    let songs = song_df.project(&song_keys())?;
    let by_song = events.inner_join(
        &songs,
        &[("song", "title"), ("length", "duration")],
        &["song_id", "artist_id"],
    )?;
    let by_artist = by_song.semi_join(artists, &[("artist", "name"), ("artist_id", "artist_id")])?;
    let by_time = by_artist.inner_join(time, &[("start_time", "start_time")], &["year", "month"])?;
    Ok((by_artist, by_time))
}

fn row_ids(rows: usize) -> ArrayRef {
    Arc::new(UInt64Array::from_iter_values((0..rows).map(|i| i as u64)))
}

/// How many output rows each input event produced.
fn count_rows(frame: &Frame) -> HashMap<u64, usize> {
    let mut counts = HashMap::new();
    if let Some(ids) = frame
        .column(EVENT_ROW)
        .and_then(|ids| ids.as_primitive_opt::<UInt64Type>())
    {
        for id in ids.iter().flatten() {
            *counts.entry(id).or_insert(0) += 1;
        }
    }
    counts
}
