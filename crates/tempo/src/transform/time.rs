//! Timestamp decomposition and the `time` dimension.

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, AsArray, Int32Builder, StringArray, StringBuilder};
use arrow::datatypes::{DataType, Field, Int64Type, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Datelike, Timelike};
use chrono_tz::Tz;
use snafu::prelude::*;

use crate::config::{TimestampResolution, TransformConfig};
use crate::error::{
    ArrowSnafu, ColumnNotFoundSnafu, ConfigError, TableSnafu, TimestampColumnSnafu, TransformError,
};
use crate::frame::{Frame, Keep};

const SECONDS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const MILLIS_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Calendar fields of one event timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeParts {
    pub start_time: String,
    pub hour: i32,
    pub day: i32,
    /// ISO 8601 week number.
    pub week: i32,
    pub month: i32,
    pub year: i32,
    /// 1 = Sunday ... 7 = Saturday.
    pub weekday: i32,
}

/// Converts epoch-millisecond timestamps to local calendar fields.
#[derive(Debug, Clone, Copy)]
pub struct TimestampConverter {
    tz: Tz,
    resolution: TimestampResolution,
}

impl Default for TimestampConverter {
    fn default() -> Self {
        Self::new(Tz::UTC, TimestampResolution::Seconds)
    }
}

impl TimestampConverter {
    pub fn new(tz: Tz, resolution: TimestampResolution) -> Self {
        Self { tz, resolution }
    }

    pub fn from_config(config: &TransformConfig) -> Result<Self, ConfigError> {
        let tz = config
            .timezone
            .parse::<Tz>()
            .map_err(|_| ConfigError::UnknownTimezone {
                name: config.timezone.clone(),
            })?;
        Ok(Self::new(tz, config.timestamp_resolution))
    }

    fn local(&self, ts_ms: i64) -> Option<DateTime<Tz>> {
        let seconds = ts_ms.div_euclid(1000);
        let nanos = match self.resolution {
            TimestampResolution::Seconds => 0,
            TimestampResolution::Milliseconds => ts_ms.rem_euclid(1000) as u32 * 1_000_000,
        };
        DateTime::from_timestamp(seconds, nanos).map(|utc| utc.with_timezone(&self.tz))
    }

    fn format(&self, local: &DateTime<Tz>) -> String {
        let pattern = match self.resolution {
            TimestampResolution::Seconds => SECONDS_FORMAT,
            TimestampResolution::Milliseconds => MILLIS_FORMAT,
        };
        local.format(pattern).to_string()
    }

    /// The `start_time` key for a timestamp. `None` if it is out of range.
    pub fn start_time(&self, ts_ms: i64) -> Option<String> {
        self.local(ts_ms).map(|local| self.format(&local))
    }

    /// Decompose a timestamp. `None` if it is out of range.
    pub fn decompose(&self, ts_ms: i64) -> Option<TimeParts> {
        let local = self.local(ts_ms)?;
        Some(TimeParts {
            start_time: self.format(&local),
            hour: local.hour() as i32,
            day: local.day() as i32,
            week: local.iso_week().week() as i32,
            month: local.month() as i32,
            year: local.year(),
            weekday: local.weekday().number_from_sunday() as i32,
        })
    }

    /// `start_time` for every row of a `ts` column; null stays null.
    pub fn start_time_column(&self, ts: &dyn Array) -> Result<ArrayRef, TransformError> {
        let ts = ts
            .as_primitive_opt::<Int64Type>()
            .context(TimestampColumnSnafu { column: "ts" })?;
        let values: StringArray = ts
            .iter()
            .map(|value| value.and_then(|ms| self.start_time(ms)))
            .collect();
        Ok(Arc::new(values))
    }
}

fn time_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("start_time", DataType::Utf8, true),
        Field::new("hour", DataType::Int32, true),
        Field::new("day", DataType::Int32, true),
        Field::new("week", DataType::Int32, true),
        Field::new("month", DataType::Int32, true),
        Field::new("year", DataType::Int32, true),
        Field::new("weekday", DataType::Int32, true),
    ]))
}

/// One row per distinct `start_time` among the events. Events without a
/// timestamp produce no row.
pub fn extract_time(
    filtered: &Frame,
    converter: &TimestampConverter,
) -> Result<Frame, TransformError> {
    let ts = filtered
        .column("ts")
        .context(ColumnNotFoundSnafu { name: "ts" })
        .context(TableSnafu { table: "time" })?;
    let ts = ts
        .as_primitive_opt::<Int64Type>()
        .context(TimestampColumnSnafu { column: "ts" })?;

    let mut start_time = StringBuilder::new();
    let mut fields: [Int32Builder; 6] = Default::default();
    for parts in ts.iter().flatten().filter_map(|ms| converter.decompose(ms)) {
        start_time.append_value(&parts.start_time);
        let values = [
            parts.hour,
            parts.day,
            parts.week,
            parts.month,
            parts.year,
            parts.weekday,
        ];
        for (builder, value) in fields.iter_mut().zip(values) {
            builder.append_value(value);
        }
    }

    let mut columns: Vec<ArrayRef> = vec![Arc::new(start_time.finish())];
    columns.extend(
        fields
            .iter_mut()
            .map(|builder| Arc::new(builder.finish()) as ArrayRef),
    );
    let batch = RecordBatch::try_new(time_schema(), columns)
        .context(ArrowSnafu { operation: "time" })
        .context(TableSnafu { table: "time" })?;

    Frame::new(batch)
        .dedup_by(&["start_time"], Keep::First)
        .context(TableSnafu { table: "time" })
}
