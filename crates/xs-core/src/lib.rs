//! # xs-core
//!
//! Core types for xsec: the [`EventRecord`] read from event stores, the
//! [`RunningStats`] weight accumulator that turns a stream of events into a
//! cross section, the [`EventSource`] seam, and the shared [`Error`] type.
//!
//! ```
//! use xs_core::{Estimator, RunningStats};
//!
//! let stats: RunningStats = [2.0, 4.0].into_iter().collect();
//! let xs = stats.finalize(Estimator::Naive).unwrap();
//! assert_eq!(xs.to_string(), "XS 2 3 1.4142135623730951");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cancel;
pub mod error;
pub mod stats;
pub mod traits;
pub mod types;

pub use cancel::CancelToken;
pub use error::{Error, Result};
pub use stats::RunningStats;
pub use traits::EventSource;
pub use types::{DEFAULT_OUTPUT, DEFAULT_WEIGHT_COLUMN, Estimator, EventRecord, RunConfig, Summary};
