//! Common data types for xsec

use std::fmt;
use std::path::PathBuf;

use crate::{Error, Result};

/// Default output name accepted on the command line.
pub const DEFAULT_OUTPUT: &str = "test.root";

/// Default name of the per-event weight column.
pub const DEFAULT_WEIGHT_COLUMN: &str = "weight";

/// One event read from an event store.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    /// PDG id of the first incoming parton.
    pub id1: i32,
    /// PDG id of the second incoming parton.
    pub id2: i32,
    /// Flavor codes of the final-state particles, in stored order.
    pub kf: Vec<i32>,
    /// Event weight.
    pub weight: f64,
}

impl EventRecord {
    /// Create an event record
    pub fn new(id1: i32, id2: i32, kf: Vec<i32>, weight: f64) -> Self {
        Self { id1, id2, kf, weight }
    }

    /// Subprocess label, e.g. `"21 21 -> 25 21"`.
    pub fn process_label(&self) -> String {
        let mut label = format!("{} {} ->", self.id1, self.id2);
        for code in &self.kf {
            label.push(' ');
            label.push_str(&code.to_string());
        }
        label
    }
}

/// Error estimator used by [`crate::RunningStats::finalize`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Estimator {
    /// `sqrt(Σw² - (Σw)²/n) / (n - 1)` from raw sums; output-compatible reference formula.
    #[default]
    Naive,
    /// Same normalization, with the sum of squared deviations from Welford's update.
    Welford,
}

/// Configuration for a single cross-section run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Input event files, in chain order. Never empty.
    pub inputs: Vec<PathBuf>,
    /// Output name. Accepted for compatibility; the cross-section path never writes it.
    pub output: PathBuf,
    /// Verbose per-event diagnostics.
    pub debug: bool,
    /// Name of the weight column in the event store.
    pub weight_column: String,
    /// Error estimator.
    pub estimator: Estimator,
    /// Stop after this many events.
    pub max_events: Option<u64>,
}

impl RunConfig {
    /// Create a config with default options.
    ///
    /// Fails with [`Error::Argument`] if `inputs` is empty or contains an empty path.
    pub fn new<I, P>(inputs: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let inputs: Vec<PathBuf> = inputs.into_iter().map(Into::into).collect();
        if inputs.is_empty() {
            return Err(Error::Argument("missing input files".into()));
        }
        if let Some(i) = inputs.iter().position(|p| p.as_os_str().is_empty()) {
            return Err(Error::Argument(format!("input #{} is an empty path", i + 1)));
        }
        Ok(Self {
            inputs,
            output: PathBuf::from(DEFAULT_OUTPUT),
            debug: false,
            weight_column: DEFAULT_WEIGHT_COLUMN.to_string(),
            estimator: Estimator::default(),
            max_events: None,
        })
    }

    /// Set the output name.
    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = output.into();
        self
    }

    /// Enable or disable debug diagnostics.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Read weights from `column` instead of `weight`.
    pub fn with_weight_column(mut self, column: impl Into<String>) -> Result<Self> {
        let column = column.into();
        if column.trim().is_empty() {
            return Err(Error::Argument("weight column name must be non-empty".into()));
        }
        self.weight_column = column;
        Ok(self)
    }

    /// Select the error estimator.
    pub fn with_estimator(mut self, estimator: Estimator) -> Self {
        self.estimator = estimator;
        self
    }

    /// Limit the number of processed events.
    pub fn with_max_events(mut self, max_events: Option<u64>) -> Self {
        self.max_events = max_events;
        self
    }
}

/// Final cross-section estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    /// Number of events accumulated.
    pub count: u64,
    /// Weighted mean (the cross section).
    pub mean: f64,
    /// Statistical error estimate on the mean.
    pub error_estimate: f64,
    /// The stream was cut short by a cancellation request.
    pub interrupted: bool,
}

impl fmt::Display for Summary {
    /// Renders the `XS <count> <mean> <error>` report line.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "XS {} {} {}", self.count, self.mean, self.error_estimate)
    }
}
