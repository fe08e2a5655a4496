//! Core traits for xsec
//!
//! The accumulation loop only sees [`EventSource`]; concrete event stores
//! (Parquet chains, in-memory fixtures) live in other crates.

use crate::{EventRecord, Result};

/// A single-pass, ordered stream of events.
///
/// Items are `Err` when a record cannot be decoded; the stream should not be
/// polled again after an error. Dropping the source releases every handle it
/// owns.
pub trait EventSource: Iterator<Item = Result<EventRecord>> {
    /// Number of entries the store declares up front, if known.
    fn declared_entries(&self) -> Option<u64> {
        None
    }
}
