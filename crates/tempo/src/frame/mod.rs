//! In-memory relational layer.
//!
//! A [`Frame`] is an immutable table backed by a single Arrow `RecordBatch`.
//! Every operation returns a new frame; row identity is positional and all
//! operations preserve input order unless they say otherwise.

mod join;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, RecordBatch, RecordBatchOptions, StringArray, UInt64Array};
use arrow::array::{new_null_array, AsArray};
use arrow::compute::kernels::cmp::eq;
use arrow::compute::{can_cast_types, cast, filter_record_batch, take_record_batch};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::row::{RowConverter, Rows, SortField};
use snafu::prelude::*;

use crate::error::{ArrowSnafu, ColumnLengthSnafu, ColumnNotFoundSnafu, FrameError};

/// Which row survives when several share a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keep {
    First,
    Last,
}

/// A projected output column: where it comes from, what it is called and
/// which Arrow type it has.
#[derive(Debug, Clone)]
pub struct Column {
    source: String,
    name: String,
    data_type: DataType,
}

impl Column {
    /// A column kept under its own name.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        let name = name.into();
        Self {
            source: name.clone(),
            name,
            data_type,
        }
    }

    /// A column read from `source` and written as `name`.
    pub fn renamed(source: impl Into<String>, name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            source: source.into(),
            name: name.into(),
            data_type,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }
}

/// One group of rows sharing the same partition values.
#[derive(Debug, Clone)]
pub struct Partition {
    /// Values in partition column order; `None` for null.
    pub values: Vec<Option<String>>,
    pub frame: Frame,
}

/// An immutable in-memory table.
#[derive(Debug, Clone)]
pub struct Frame {
    batch: RecordBatch,
}

impl Frame {
    pub fn new(batch: RecordBatch) -> Self {
        Self { batch }
    }

    /// A frame with no columns and no rows.
    pub fn empty() -> Self {
        Self::new(RecordBatch::new_empty(Arc::new(Schema::empty())))
    }

    pub fn schema(&self) -> SchemaRef {
        self.batch.schema()
    }

    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    pub fn is_empty(&self) -> bool {
        self.batch.num_rows() == 0
    }

    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    pub fn into_batch(self) -> RecordBatch {
        self.batch
    }

    pub fn column_names(&self) -> Vec<String> {
        self.batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect()
    }

    pub fn column(&self, name: &str) -> Option<&ArrayRef> {
        self.batch.column_by_name(name)
    }

    fn require(&self, name: &str) -> Result<&ArrayRef, FrameError> {
        self.column(name).context(ColumnNotFoundSnafu { name })
    }

    /// Select, rename and cast columns.
    ///
    /// A column missing from the input becomes all nulls of the requested
    /// type, and so does a column whose type cannot be cast. Individual values
    /// that fail to cast become null.
    pub fn project(&self, columns: &[Column]) -> Result<Frame, FrameError> {
        let num_rows = self.num_rows();
        let mut fields = Vec::with_capacity(columns.len());
        let mut arrays = Vec::with_capacity(columns.len());

        for column in columns {
            let array = match self.column(&column.source) {
                Some(array) if array.data_type() == &column.data_type => array.clone(),
                Some(array) if can_cast_types(array.data_type(), &column.data_type) => {
                    cast(array, &column.data_type).context(ArrowSnafu { operation: "cast" })?
                }
                _ => new_null_array(&column.data_type, num_rows),
            };
            fields.push(Field::new(&column.name, column.data_type.clone(), true));
            arrays.push(array);
        }

        let schema = Arc::new(Schema::new(fields));
        let options = RecordBatchOptions::new().with_row_count(Some(num_rows));
        let batch = RecordBatch::try_new_with_options(schema, arrays, &options)
            .context(ArrowSnafu { operation: "project" })?;
        Ok(Frame::new(batch))
    }

    /// Keep the rows whose `column` equals `value`. Null never matches and an
    /// absent column matches nothing.
    pub fn filter_eq(&self, column: &str, value: &str) -> Result<Frame, FrameError> {
        let Some(array) = self.column(column) else {
            return Ok(Frame::new(RecordBatch::new_empty(self.schema())));
        };
        let array = if array.data_type() == &DataType::Utf8 {
            array.clone()
        } else {
            cast(array, &DataType::Utf8).context(ArrowSnafu { operation: "cast" })?
        };

        let mask = eq(&array, &StringArray::new_scalar(value))
            .context(ArrowSnafu { operation: "filter" })?;
        let batch = filter_record_batch(&self.batch, &mask)
            .context(ArrowSnafu { operation: "filter" })?;
        Ok(Frame::new(batch))
    }

    /// Remove exact duplicate rows, keeping the first occurrence. Nulls
    /// compare equal to each other.
    pub fn distinct(&self) -> Result<Frame, FrameError> {
        if self.batch.num_columns() == 0 {
            return Ok(self.clone());
        }
        let rows = row_keys(self.batch.columns())?;
        let mut seen = HashSet::with_capacity(rows.num_rows());
        let indices: Vec<usize> = (0..rows.num_rows())
            .filter(|&i| seen.insert(rows.row(i)))
            .collect();
        self.take(&indices)
    }

    /// Keep one row per distinct combination of `keys`. Surviving rows stay
    /// in input order.
    pub fn dedup_by(&self, keys: &[&str], keep: Keep) -> Result<Frame, FrameError> {
        let arrays = self.key_arrays(keys)?;
        let rows = row_keys(&arrays)?;

        let mut chosen = HashMap::with_capacity(rows.num_rows());
        for i in 0..rows.num_rows() {
            match keep {
                Keep::First => {
                    chosen.entry(rows.row(i)).or_insert(i);
                }
                Keep::Last => {
                    chosen.insert(rows.row(i), i);
                }
            }
        }

        let mut indices: Vec<usize> = chosen.into_values().collect();
        indices.sort_unstable();
        self.take(&indices)
    }

    /// Stable ascending sort by `keys`, nulls first.
    pub fn sort_by(&self, keys: &[&str]) -> Result<Frame, FrameError> {
        let arrays = self.key_arrays(keys)?;
        let rows = row_keys(&arrays)?;
        let mut indices: Vec<usize> = (0..rows.num_rows()).collect();
        indices.sort_by(|&a, &b| rows.row(a).cmp(&rows.row(b)));
        self.take(&indices)
    }

    /// Append a column, or replace the one with the same name.
    pub fn with_column(&self, name: &str, array: ArrayRef) -> Result<Frame, FrameError> {
        ensure!(
            array.len() == self.num_rows(),
            ColumnLengthSnafu {
                name,
                expected: self.num_rows(),
                actual: array.len(),
            }
        );

        let schema = self.schema();
        let mut fields: Vec<Field> = schema.fields().iter().map(|f| f.as_ref().clone()).collect();
        let mut arrays = self.batch.columns().to_vec();
        let field = Field::new(name, array.data_type().clone(), true);

        match schema.index_of(name) {
            Ok(index) => {
                fields[index] = field;
                arrays[index] = array;
            }
            Err(_) => {
                fields.push(field);
                arrays.push(array);
            }
        }

        let options = RecordBatchOptions::new().with_row_count(Some(self.num_rows()));
        let batch = RecordBatch::try_new_with_options(Arc::new(Schema::new(fields)), arrays, &options)
            .context(ArrowSnafu {
                operation: "with_column",
            })?;
        Ok(Frame::new(batch))
    }

    /// Zero-copy slice of `length` rows starting at `offset`.
    pub fn slice(&self, offset: usize, length: usize) -> Frame {
        Frame::new(self.batch.slice(offset, length))
    }

    /// Split rows into groups sharing the same values of `columns`.
    ///
    /// Values are rendered as strings. Groups come back sorted by value with
    /// nulls first, and rows keep their input order inside a group.
    pub fn partitions(&self, columns: &[&str]) -> Result<Vec<Partition>, FrameError> {
        if columns.is_empty() {
            return Ok(vec![Partition {
                values: Vec::new(),
                frame: self.clone(),
            }]);
        }

        let rendered = columns
            .iter()
            .map(|name| {
                let array = self.require(name)?;
                cast(array, &DataType::Utf8).context(ArrowSnafu { operation: "cast" })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut groups: BTreeMap<Vec<Option<String>>, Vec<usize>> = BTreeMap::new();
        for row in 0..self.num_rows() {
            let key = rendered
                .iter()
                .map(|array| {
                    let strings = array.as_string::<i32>();
                    strings
                        .is_valid(row)
                        .then(|| strings.value(row).to_string())
                })
                .collect();
            groups.entry(key).or_default().push(row);
        }

        groups
            .into_iter()
            .map(|(values, indices)| {
                Ok(Partition {
                    values,
                    frame: self.take(&indices)?,
                })
            })
            .collect()
    }

    fn key_arrays(&self, keys: &[&str]) -> Result<Vec<ArrayRef>, FrameError> {
        keys.iter()
            .map(|name| self.require(name).cloned())
            .collect()
    }

    fn take(&self, indices: &[usize]) -> Result<Frame, FrameError> {
        let indices = UInt64Array::from_iter_values(indices.iter().map(|&i| i as u64));
        let batch = take_record_batch(&self.batch, &indices)
            .context(ArrowSnafu { operation: "take" })?;
        Ok(Frame::new(batch))
    }
}

impl From<RecordBatch> for Frame {
    fn from(batch: RecordBatch) -> Self {
        Frame::new(batch)
    }
}

/// Encode columns into comparable, hashable rows.
fn row_keys(arrays: &[ArrayRef]) -> Result<Rows, FrameError> {
    let fields = arrays
        .iter()
        .map(|array| SortField::new(array.data_type().clone()))
        .collect();
    let converter = RowConverter::new(fields).context(ArrowSnafu { operation: "rows" })?;
    converter
        .convert_columns(arrays)
        .context(ArrowSnafu { operation: "rows" })
}
