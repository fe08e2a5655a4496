//! Event table schema.
//!
//! # Schema: `xsec_events_v1`
//!
//! | Column   | Arrow type (accepted)                       | Description                    |
//! |----------|---------------------------------------------|--------------------------------|
//! | `id1`    | `Int8` / `Int16` / `Int32` / `Int64`        | first incoming parton id       |
//! | `id2`    | same as `id1`                               | second incoming parton id      |
//! | `kf`     | `List<int>` / `LargeList<int>`              | final-state flavor codes       |
//! | `weight` | `Float32` / `Float64`                       | event weight (name selectable) |
//!
//! Wider or narrower types are normalized to `Int32` / `List<Int32>` /
//! `Float64` when a batch is decoded. Other columns may be present and are
//! never read.
//!
//! ## Key-value metadata
//!
//! | Key           | Value                                                   |
//! |---------------|---------------------------------------------------------|
//! | `xsec.schema` | JSON: `{"version":"xsec_events_v1","weight_column":..}` |
//!
//! The metadata is written by [`crate::write_events_parquet`] and only checked
//! for the version when present; files produced by other tools are accepted
//! as long as the columns match.

use std::sync::Arc;

use arrow::datatypes::{DataType, Field, Schema};
use serde::{Deserialize, Serialize};

/// Schema version string embedded in key-value metadata.
pub const EVENTS_SCHEMA_V1: &str = "xsec_events_v1";

/// Metadata key for [`EventSchemaMeta`].
pub const META_KEY_SCHEMA: &str = "xsec.schema";

/// First incoming parton id.
pub const ID1_COLUMN: &str = "id1";
/// Second incoming parton id.
pub const ID2_COLUMN: &str = "id2";
/// Final-state flavor codes.
pub const KF_COLUMN: &str = "kf";

/// JSON descriptor stored under [`META_KEY_SCHEMA`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSchemaMeta {
    /// Schema version, [`EVENTS_SCHEMA_V1`].
    pub version: String,
    /// Name of the weight column written to the file.
    pub weight_column: String,
}

impl EventSchemaMeta {
    /// Descriptor for the current schema version.
    pub fn v1(weight_column: &str) -> Self {
        Self { version: EVENTS_SCHEMA_V1.to_string(), weight_column: weight_column.to_string() }
    }
}

fn is_integer(dt: &DataType) -> bool {
    matches!(dt, DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64)
}

fn is_integer_list(dt: &DataType) -> bool {
    match dt {
        DataType::List(f) | DataType::LargeList(f) => is_integer(f.data_type()),
        _ => false,
    }
}

fn is_float(dt: &DataType) -> bool {
    matches!(dt, DataType::Float32 | DataType::Float64)
}

fn require(
    schema: &Schema,
    name: &str,
    accept: fn(&DataType) -> bool,
    expected: &str,
) -> Result<usize, String> {
    let (idx, field) = schema
        .column_with_name(name)
        .ok_or_else(|| format!("missing required column `{name}`"))?;
    if !accept(field.data_type()) {
        return Err(format!("column `{name}` has type {}, expected {expected}", field.data_type()));
    }
    Ok(idx)
}

/// Check that `schema` carries the event columns and return their root indices
/// (`id1`, `id2`, `kf`, weight) for projection.
pub fn validate_event_schema(schema: &Schema, weight_column: &str) -> Result<[usize; 4], String> {
    Ok([
        require(schema, ID1_COLUMN, is_integer, "an integer")?,
        require(schema, ID2_COLUMN, is_integer, "an integer")?,
        require(schema, KF_COLUMN, is_integer_list, "a list of integers")?,
        require(schema, weight_column, is_float, "Float32 or Float64")?,
    ])
}

/// Decode the [`META_KEY_SCHEMA`] descriptor, if the file carries one.
pub fn schema_meta(schema: &Schema) -> Option<Result<EventSchemaMeta, serde_json::Error>> {
    schema.metadata().get(META_KEY_SCHEMA).map(|raw| serde_json::from_str(raw))
}

/// Normalized `kf` type after decoding.
pub fn kf_data_type() -> DataType {
    DataType::List(Arc::new(Field::new_list_field(DataType::Int32, true)))
}

/// Arrow schema written by [`crate::write_events_parquet`].
pub fn event_schema(weight_column: &str) -> Result<Schema, serde_json::Error> {
    let meta = serde_json::to_string(&EventSchemaMeta::v1(weight_column))?;
    let fields = vec![
        Field::new(ID1_COLUMN, DataType::Int32, false),
        Field::new(ID2_COLUMN, DataType::Int32, false),
        Field::new(KF_COLUMN, kf_data_type(), false),
        Field::new(weight_column, DataType::Float64, false),
    ];
    Ok(Schema::new(fields).with_metadata([(META_KEY_SCHEMA.to_string(), meta)].into()))
}
