//! Play-event filtering and the `users` dimension.

use arrow::datatypes::DataType;
use snafu::prelude::*;

use crate::config::DuplicatePolicy;
use crate::error::{TableSnafu, TransformError};
use crate::frame::{Column, Frame};

/// Page value that marks a song play.
pub const NEXT_SONG: &str = "NextSong";

fn event_columns() -> Vec<Column> {
    vec![
        Column::new("artist", DataType::Utf8),
        Column::new("firstName", DataType::Utf8),
        Column::new("gender", DataType::Utf8),
        Column::new("lastName", DataType::Utf8),
        Column::new("length", DataType::Float64),
        Column::new("level", DataType::Utf8),
        Column::new("location", DataType::Utf8),
        Column::new("sessionId", DataType::Int64),
        Column::new("song", DataType::Utf8),
        Column::new("ts", DataType::Int64),
        Column::new("userAgent", DataType::Utf8),
        Column::new("userId", DataType::Utf8),
    ]
}

fn user_columns() -> Vec<Column> {
    vec![
        Column::renamed("userId", "user_id", DataType::Utf8),
        Column::renamed("firstName", "first_name", DataType::Utf8),
        Column::renamed("lastName", "last_name", DataType::Utf8),
        Column::new("gender", DataType::Utf8),
        Column::new("level", DataType::Utf8),
    ]
}

/// Keep song plays, project the columns the tables need and drop exact
/// duplicate events.
pub fn filter_events(log_df: &Frame) -> Result<Frame, TransformError> {
    log_df
        .filter_eq("page", NEXT_SONG)
        .and_then(|plays| plays.project(&event_columns()))
        .and_then(|plays| plays.distinct())
        .context(TableSnafu { table: "events" })
}

/// One row per song-play event, or one per `user_id` when the policy keeps
/// the user's earliest or latest event.
///
/// Under `retain` the only deduplication is the exact-duplicate removal done
/// by [`filter_events`].
pub fn extract_users(filtered: &Frame, policy: DuplicatePolicy) -> Result<Frame, TransformError> {
    let users = match policy.keep() {
        None => filtered.project(&user_columns()),
        Some(keep) => filtered
            .sort_by(&["ts"])
            .and_then(|by_time| by_time.project(&user_columns()))
            .and_then(|users| users.dedup_by(&["user_id"], keep)),
    };
    users.context(TableSnafu { table: "users" })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::frame::tests::strings;
    use crate::source::{JsonReader, SourceFile};
    use bytes::Bytes;

    pub(crate) fn event(page: &str, user: &str, level: &str, song: &str, length: f64, ts: i64) -> String {
        format!(
            r#"{{"artist": "Casual", "auth": "Logged In", "firstName": "Lily", "gender": "F", "itemInSession": 0, "lastName": "Koch", "length": {length}, "level": "{level}", "location": "Chicago, IL", "method": "PUT", "page": "{page}", "registration": 1.541048010796E12, "sessionId": 172, "song": "{song}", "status": 200, "ts": {ts}, "userAgent": "Mozilla/5.0", "userId": "{user}"}}"#
        )
    }

    pub(crate) fn log_df(lines: &[String]) -> Frame {
        let file = SourceFile {
            path: "log_data/2018/11/2018-11-01-events.json".to_string(),
            data: Bytes::from(lines.join("\n")),
        };
        JsonReader::new(1024).read_files(&[file], "log_data").unwrap()
    }

    #[test]
    fn test_filter_keeps_only_song_plays() {
        let df = log_df(&[
            event("NextSong", "15", "paid", "Intro", 218.93179, 1541121934796),
            event("Home", "15", "paid", "", 0.0, 1541121934797),
            event("Logout", "15", "paid", "", 0.0, 1541121934798),
            event("NextSong", "26", "free", "Outro", 100.0, 1541121934799),
        ]);
        let filtered = filter_events(&df).unwrap();
        assert_eq!(filtered.num_rows(), 2);
        assert_eq!(filtered.column_names().len(), 12);
        assert!(filtered.column("page").is_none());
        assert_eq!(
            strings(&filtered, "userId"),
            vec![Some("15".into()), Some("26".into())]
        );
    }

    #[test]
    fn test_filter_removes_exact_duplicates() {
        let play = event("NextSong", "15", "paid", "Intro", 218.93179, 1541121934796);
        let df = log_df(&[play.clone(), play.clone(), play]);
        assert_eq!(filter_events(&df).unwrap().num_rows(), 1);
    }

    #[test]
    fn test_filter_without_page_column() {
        let df = log_df(&[r#"{"userId": "1"}"#.to_string()]);
        let filtered = filter_events(&df).unwrap();
        assert_eq!(filtered.num_rows(), 0);
        assert_eq!(filtered.column_names().len(), 12);
    }

    #[test]
    fn test_users_retain_keeps_a_row_per_play() {
        let df = log_df(&[
            event("NextSong", "15", "free", "A", 1.0, 3000),
            event("NextSong", "15", "paid", "B", 1.0, 2000),
            event("NextSong", "15", "paid", "C", 1.0, 1000),
        ]);
        let users = extract_users(&filter_events(&df).unwrap(), DuplicatePolicy::Retain).unwrap();
        assert_eq!(
            users.column_names(),
            vec!["user_id", "first_name", "last_name", "gender", "level"]
        );
        assert_eq!(
            strings(&users, "level"),
            vec![Some("free".into()), Some("paid".into()), Some("paid".into())]
        );
    }

    #[test]
    fn test_users_retain_same_tuple_from_separate_plays() {
        let df = log_df(&[
            event("NextSong", "15", "paid", "A", 1.0, 1000),
            event("NextSong", "15", "paid", "B", 2.0, 2000),
            event("NextSong", "15", "paid", "C", 3.0, 3000),
        ]);
        let filtered = filter_events(&df).unwrap();
        assert_eq!(filtered.num_rows(), 3);

        let users = extract_users(&filtered, DuplicatePolicy::Retain).unwrap();
        assert_eq!(users.num_rows(), 3);
        assert_eq!(strings(&users, "user_id"), vec![Some("15".into()); 3]);
    }

    #[test]
    fn test_users_keep_last_uses_latest_event() {
        let df = log_df(&[
            event("NextSong", "15", "free", "A", 1.0, 3000),
            event("NextSong", "15", "paid", "B", 1.0, 2000),
            event("NextSong", "26", "paid", "C", 1.0, 1000),
        ]);
        let filtered = filter_events(&df).unwrap();

        let last = extract_users(&filtered, DuplicatePolicy::KeepLast).unwrap();
        assert_eq!(last.num_rows(), 2);
        assert_eq!(
            strings(&last, "user_id"),
            vec![Some("26".into()), Some("15".into())]
        );
        assert_eq!(
            strings(&last, "level"),
            vec![Some("paid".into()), Some("free".into())]
        );

        let first = extract_users(&filtered, DuplicatePolicy::KeepFirst).unwrap();
        assert_eq!(
            strings(&first, "level"),
            vec![Some("paid".into()), Some("paid".into())]
        );
    }
}
