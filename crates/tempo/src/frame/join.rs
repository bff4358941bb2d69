//! Hash equi-joins.

use std::collections::{HashMap, HashSet};

use arrow::array::{Array, ArrayRef, UInt64Array};
use arrow::compute::{cast, take};
use arrow::row::{RowConverter, Rows, SortField};
use snafu::prelude::*;

use super::Frame;
use crate::error::{ArrowSnafu, EmptyJoinKeysSnafu, FrameError};

/// Encoded join keys for one side, plus which rows have a null in any key.
struct JoinKeys {
    rows: Rows,
    has_null: Vec<bool>,
}

impl JoinKeys {
    fn matchable(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.rows.num_rows()).filter(|&i| !self.has_null[i])
    }
}

impl Frame {
    /// Inner join against `right` on pairs of `(left column, right column)`.
    ///
    /// Every left column is kept and the right columns named in `take` are
    /// appended, replacing a left column of the same name. A null in any key
    /// never matches. Output is in left order, then right order.
    pub fn inner_join(
        &self,
        right: &Frame,
        on: &[(&str, &str)],
        take_columns: &[&str],
    ) -> Result<Frame, FrameError> {
        let (left_keys, right_keys) = encode_keys(self, right, on)?;

        let mut index: HashMap<_, Vec<u64>> = HashMap::new();
        for j in right_keys.matchable() {
            index.entry(right_keys.rows.row(j)).or_default().push(j as u64);
        }

        let mut left_indices = Vec::new();
        let mut right_indices = Vec::new();
        for i in left_keys.matchable() {
            if let Some(matches) = index.get(&left_keys.rows.row(i)) {
                for &j in matches {
                    left_indices.push(i);
                    right_indices.push(j);
                }
            }
        }

        let mut joined = self.take(&left_indices)?;
        let right_indices = UInt64Array::from(right_indices);
        for name in take_columns {
            let array = right.require(name)?;
            let taken = take(array.as_ref(), &right_indices, None)
                .context(ArrowSnafu { operation: "take" })?;
            joined = joined.with_column(name, taken)?;
        }
        Ok(joined)
    }

    /// Keep the rows of `self` that have at least one match in `right`.
    pub fn semi_join(&self, right: &Frame, on: &[(&str, &str)]) -> Result<Frame, FrameError> {
        let (left_keys, right_keys) = encode_keys(self, right, on)?;

        let present: HashSet<_> = right_keys
            .matchable()
            .map(|j| right_keys.rows.row(j))
            .collect();
        let indices: Vec<usize> = left_keys
            .matchable()
            .filter(|&i| present.contains(&left_keys.rows.row(i)))
            .collect();
        self.take(&indices)
    }
}

/// Encode both sides' keys with one converter so rows compare across sides.
/// Right key columns are cast to the left key types.
fn encode_keys(
    left: &Frame,
    right: &Frame,
    on: &[(&str, &str)],
) -> Result<(JoinKeys, JoinKeys), FrameError> {
    ensure!(!on.is_empty(), EmptyJoinKeysSnafu);

    let left_arrays: Vec<ArrayRef> = on
        .iter()
        .map(|(name, _)| left.require(name).cloned())
        .collect::<Result<_, _>>()?;
    let right_arrays: Vec<ArrayRef> = on
        .iter()
        .zip(&left_arrays)
        .map(|((_, name), left_array)| {
            let array = right.require(name)?;
            if array.data_type() == left_array.data_type() {
                Ok(array.clone())
            } else {
                cast(array, left_array.data_type()).context(ArrowSnafu { operation: "cast" })
            }
        })
        .collect::<Result<_, FrameError>>()?;
    let fields = left_arrays
        .iter()
        .map(|array| SortField::new(array.data_type().clone()))
        .collect();
    let converter = RowConverter::new(fields).context(ArrowSnafu { operation: "rows" })?;

    let encode = |arrays: &[ArrayRef]| -> Result<JoinKeys, FrameError> {
        let rows = converter
            .convert_columns(arrays)
            .context(ArrowSnafu { operation: "rows" })?;
        let has_null = (0..rows.num_rows())
            .map(|i| arrays.iter().any(|array| array.is_null(i)))
            .collect();
        Ok(JoinKeys { rows, has_null })
    };

    Ok((encode(&left_arrays)?, encode(&right_arrays)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::tests::strings;
    use arrow::array::{Float64Array, RecordBatch, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use std::sync::Arc;

    fn events() -> Frame {
        let schema = Arc::new(Schema::new(vec![
            Field::new("song", DataType::Utf8, true),
            Field::new("length", DataType::Float64, true),
            Field::new("user", DataType::Utf8, true),
        ]));
        Frame::new(
            RecordBatch::try_new(
                schema,
                vec![
                    Arc::new(StringArray::from(vec![
                        Some("Intro"),
                        Some("Outro"),
                        None,
                        Some("Intro"),
                    ])),
                    Arc::new(Float64Array::from(vec![
                        Some(100.5),
                        Some(200.0),
                        Some(100.5),
                        Some(99.0),
                    ])),
                    Arc::new(StringArray::from(vec!["a", "b", "c", "d"])),
                ],
            )
            .unwrap(),
        )
    }

    fn songs() -> Frame {
        let schema = Arc::new(Schema::new(vec![
            Field::new("title", DataType::Utf8, true),
            Field::new("duration", DataType::Float64, true),
            Field::new("song_id", DataType::Utf8, true),
        ]));
        Frame::new(
            RecordBatch::try_new(
                schema,
                vec![
                    Arc::new(StringArray::from(vec![Some("Intro"), Some("Intro"), None])),
                    Arc::new(Float64Array::from(vec![Some(100.5), Some(100.5), Some(100.5)])),
                    Arc::new(StringArray::from(vec!["S1", "S2", "S3"])),
                ],
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_inner_join_multiplies_and_orders() {
        let joined = events()
            .inner_join(
                &songs(),
                &[("song", "title"), ("length", "duration")],
                &["song_id"],
            )
            .unwrap();
        assert_eq!(joined.column_names(), vec!["song", "length", "user", "song_id"]);
        assert_eq!(strings(&joined, "user"), vec![Some("a".into()), Some("a".into())]);
        assert_eq!(
            strings(&joined, "song_id"),
            vec![Some("S1".into()), Some("S2".into())]
        );
    }

    #[test]
    fn test_null_keys_never_match() {
        // event "c" and song "S3" both have a null title
        let joined = events()
            .inner_join(&songs(), &[("song", "title")], &["song_id"])
            .unwrap();
        assert!(!strings(&joined, "user").contains(&Some("c".into())));
        assert!(!strings(&joined, "song_id").contains(&Some("S3".into())));
    }

    #[test]
    fn test_semi_join_does_not_multiply() {
        let kept = events()
            .semi_join(&songs(), &[("song", "title"), ("length", "duration")])
            .unwrap();
        assert_eq!(strings(&kept, "user"), vec![Some("a".into())]);
        assert_eq!(kept.column_names(), vec!["song", "length", "user"]);
    }

    #[test]
    fn test_join_casts_right_keys() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("title", DataType::Utf8, true),
            Field::new("duration", DataType::Utf8, true),
        ]));
        let right = Frame::new(
            RecordBatch::try_new(
                schema,
                vec![
                    Arc::new(StringArray::from(vec!["Outro"])),
                    Arc::new(StringArray::from(vec!["200.0"])),
                ],
            )
            .unwrap(),
        );
        let kept = events()
            .semi_join(&right, &[("song", "title"), ("length", "duration")])
            .unwrap();
        assert_eq!(strings(&kept, "user"), vec![Some("b".into())]);
    }

    #[test]
    fn test_missing_key_column() {
        let result = events().inner_join(&songs(), &[("artist", "name")], &[]);
        assert!(matches!(result, Err(FrameError::ColumnNotFound { .. })));
    }

    #[test]
    fn test_join_against_empty_frame() {
        let empty = songs().filter_eq("title", "nothing").unwrap();
        let joined = events()
            .inner_join(&empty, &[("song", "title")], &["song_id"])
            .unwrap();
        assert_eq!(joined.num_rows(), 0);
        assert_eq!(joined.column_names(), vec!["song", "length", "user", "song_id"]);
    }
}
