//! # xs-events
//!
//! Parquet event store for xsec.
//!
//! Event files carry one row per event with the `id1`, `id2`, `kf` and weight
//! columns described in [`schema`]. [`EventChain`] concatenates any number of
//! such files into one lazy [`xs_core::EventSource`]; the writer functions
//! produce files in the same schema.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod chain;
pub mod schema;
pub mod writer;

pub use chain::{DEFAULT_BATCH_SIZE, EventChain, Opener};
pub use schema::{EVENTS_SCHEMA_V1, EventSchemaMeta, validate_event_schema};
pub use writer::{
    events_to_record_batch, write_batch, write_events_parquet, write_events_parquet_bytes,
};
