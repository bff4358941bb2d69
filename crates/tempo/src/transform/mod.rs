//! Table builders: raw frames in, star-schema tables out.
//!
//! - `songs` - the `songs` and `artists` dimensions from song metadata
//! - `events` - play-event filtering and the `users` dimension
//! - `time` - timestamp decomposition and the `time` dimension
//! - `songplays` - the fact table

pub mod events;
pub mod songplays;
pub mod songs;
pub mod time;

pub use events::{extract_users, filter_events};
pub use songplays::{Songplays, SongplayStats, build_songplays};
pub use songs::{extract_artists, extract_songs};
pub use time::{TimeParts, TimestampConverter, extract_time};

use crate::config::DuplicatePolicy;
use crate::frame::{Frame, Keep};

/// A finished table and how it is laid out on disk.
#[derive(Debug, Clone)]
pub struct Table {
    pub name: &'static str,
    pub frame: Frame,
    pub partition_by: &'static [&'static str],
}

impl Table {
    pub fn songs(frame: Frame) -> Self {
        Self {
            name: "songs",
            frame,
            partition_by: &["year", "artist_id"],
        }
    }

    pub fn artists(frame: Frame) -> Self {
        Self {
            name: "artists",
            frame,
            partition_by: &[],
        }
    }

    pub fn users(frame: Frame) -> Self {
        Self {
            name: "users",
            frame,
            partition_by: &[],
        }
    }

    pub fn time(frame: Frame) -> Self {
        Self {
            name: "time",
            frame,
            partition_by: &["year", "month"],
        }
    }

    pub fn songplays(frame: Frame) -> Self {
        Self {
            name: "songplays",
            frame,
            partition_by: &["year", "month"],
        }
    }
}

impl DuplicatePolicy {
    /// Which row a keyed dedup keeps, or `None` to keep every row.
    pub fn keep(self) -> Option<Keep> {
        match self {
            DuplicatePolicy::Retain => None,
            DuplicatePolicy::KeepFirst => Some(Keep::First),
            DuplicatePolicy::KeepLast => Some(Keep::Last),
        }
    }
}
