//! Error types for xsec

use std::path::PathBuf;

use thiserror::Error;

/// xsec error type
#[derive(Error, Debug)]
pub enum Error {
    /// Bad or missing run configuration (e.g. no input files).
    #[error("Argument error: {0}")]
    Argument(String),

    /// An input could not be opened, read, or does not carry the event schema.
    #[error("cannot open event source {}: {reason}", path.display())]
    SourceOpen {
        /// Offending input.
        path: PathBuf,
        /// Human-readable cause.
        reason: String,
    },

    /// A record could not be decoded after the source was opened.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Events could not be encoded or written as Parquet.
    #[error("Encode error: {0}")]
    Encode(String),

    /// No events were processed, so the mean is undefined.
    #[error("no events in input: cross section is undefined")]
    EmptyStream,

    /// Too few events to estimate the error (needs at least two).
    #[error("only {count} event(s) in input: error estimate needs at least 2")]
    InsufficientSamples {
        /// Number of events seen.
        count: u64,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for [`Error::SourceOpen`].
    pub fn source_open(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        Error::SourceOpen { path: path.into(), reason: reason.to_string() }
    }

    /// `true` for failures caused by the caller's configuration rather than the data.
    pub fn is_usage(&self) -> bool {
        matches!(self, Error::Argument(_))
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_open_message_names_path() {
        let e = Error::source_open("missing.parquet", "No such file or directory");
        let msg = e.to_string();
        assert!(msg.contains("missing.parquet"), "{msg}");
        assert!(msg.contains("No such file"), "{msg}");
        assert!(!e.is_usage());
    }

    #[test]
    fn argument_is_usage() {
        assert!(Error::Argument("missing input files".into()).is_usage());
        assert!(!Error::EmptyStream.is_usage());
    }

    #[test]
    fn insufficient_samples_reports_count() {
        let msg = Error::InsufficientSamples { count: 1 }.to_string();
        assert!(msg.contains("only 1 event"), "{msg}");
    }

    #[test]
    fn encode_is_not_io() {
        let e = Error::Encode("Arrow: schema mismatch".into());
        assert_eq!(e.to_string(), "Encode error: Arrow: schema mismatch");
        assert!(!e.is_usage());
    }
}
