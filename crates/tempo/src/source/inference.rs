//! Schema inference from JSON-lines files.
//!
//! Each file is inferred with Arrow's JSON inference and the per-file
//! schemas are merged, so the result is the union of fields across files.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;

use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::json::reader::infer_json_schema;
use bytes::Bytes;
use snafu::prelude::*;
use tracing::debug;

use crate::error::{InferenceSnafu, ReaderError};

/// Infer the schema of one JSON-lines file. Blank lines are ignored.
pub fn infer_schema_from_bytes(bytes: &Bytes, path: &str) -> Result<Schema, ReaderError> {
    let (schema, records_read) =
        infer_json_schema(Cursor::new(bytes.as_ref()), None).context(InferenceSnafu { path })?;
    debug!(path, records = records_read, fields = schema.fields().len(), "Inferred file schema");
    Ok(schema)
}

/// Merge per-file schemas. Fields keep the order in which they first appear.
pub fn merge_schemas(schemas: &[Schema]) -> SchemaRef {
    let mut order: Vec<String> = Vec::new();
    let mut types: HashMap<String, DataType> = HashMap::new();

    for schema in schemas {
        for field in schema.fields() {
            match types.get_mut(field.name()) {
                Some(existing) => *existing = widen(existing, field.data_type()),
                None => {
                    order.push(field.name().clone());
                    types.insert(field.name().clone(), field.data_type().clone());
                }
            }
        }
    }

    let fields: Vec<Field> = order
        .into_iter()
        .map(|name| {
            let data_type = types.remove(&name).unwrap_or(DataType::Null);
            Field::new(name, data_type, true)
        })
        .collect();
    Arc::new(Schema::new(fields))
}

/// The narrowest type both sides decode into.
///
/// Integers widen to floats; any other disagreement falls back to strings.
fn widen(left: &DataType, right: &DataType) -> DataType {
    use DataType::*;
    match (left, right) {
        (a, b) if a == b => a.clone(),
        (Null, other) | (other, Null) => other.clone(),
        (Int64, Float64) | (Float64, Int64) => Float64,
        (List(a), List(b)) => {
            let item = widen(a.data_type(), b.data_type());
            List(Arc::new(Field::new_list_field(item, true)))
        }
        _ => Utf8,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema_of(json: &str) -> Schema {
        infer_schema_from_bytes(&Bytes::from(json.to_string()), "test.json").unwrap()
    }

    #[test]
    fn test_union_of_fields_in_first_seen_order() {
        let merged = merge_schemas(&[
            schema_of(r#"{"song_id": "S1", "year": 0}"#),
            schema_of(r#"{"song_id": "S2", "title": "Intro"}"#),
        ]);
        let names: Vec<&str> = merged.fields().iter().map(|f| f.name().as_str()).collect();
        assert_eq!(names, vec!["song_id", "year", "title"]);
        assert!(merged.fields().iter().all(|f| f.is_nullable()));
    }

    #[test]
    fn test_type_widening() {
        let merged = merge_schemas(&[
            schema_of(r#"{"lat": null, "duration": 218, "id": 5}"#),
            schema_of(r#"{"lat": 35.14968, "duration": 218.93179, "id": "ARX"}"#),
        ]);
        assert_eq!(merged.field_with_name("lat").unwrap().data_type(), &DataType::Float64);
        assert_eq!(
            merged.field_with_name("duration").unwrap().data_type(),
            &DataType::Float64
        );
        assert_eq!(merged.field_with_name("id").unwrap().data_type(), &DataType::Utf8);
    }

    #[test]
    fn test_blank_lines_are_ignored() {
        let schema = schema_of("\n{\"page\": \"NextSong\"}\n\n{\"page\": \"Home\"}\n");
        assert_eq!(schema.fields().len(), 1);
    }

    #[test]
    fn test_malformed_json_names_file() {
        let err = infer_schema_from_bytes(&Bytes::from_static(b"{\"page\": "), "log/bad.json")
            .unwrap_err();
        assert!(err.to_string().contains("log/bad.json"));
    }
}
