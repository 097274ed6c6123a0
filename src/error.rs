//! Error types for ethoscan

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading observations or computing tables
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Terminal I/O error: {0}")]
    Terminal(#[source] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Behavior {behavior:?} maps to both {first:?} and {second:?} in the ethogram")]
    EthogramConflict {
        behavior: String,
        first: String,
        second: String,
    },

    #[error("Behaviors missing from the ethogram: {0}")]
    UnmappedBehaviors(String),

    #[error("Individual not in roster: {0}")]
    UnknownIndividual(String),

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("{0:?} is not an alert number")]
    InvalidSelection(String),

    #[error("Alert {index} out of range (1..={len})")]
    AlertOutOfRange { index: usize, len: usize },

    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}

impl AnalysisError {
    /// Wrap an I/O error with the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AnalysisError::Io {
            path: path.into(),
            source,
        }
    }
}
