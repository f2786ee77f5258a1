//! Crate-wide error type.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Fatal simulation errors.
///
/// The engine is a pure computation over validated inputs: every variant
/// indicates a contract violation by the caller or corrupted input data,
/// never a transient condition, so there is no retry logic anywhere.
#[derive(Debug, Error)]
pub enum SimError {
    /// One or more scenario parameters are outside their allowed domain.
    /// Detected before any simulation work begins.
    #[error("invalid scenario: {0}")]
    InvalidScenario(String),

    /// Input matrices have incompatible shapes (block-size indivisibility,
    /// time-axis mismatch, too few meters to sample).
    #[error("data shape error: {0}")]
    DataShape(String),

    /// An input file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Offending file path.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// An input file could not be parsed.
    #[error("failed to parse {path}: {message}")]
    Parse {
        /// Offending file path.
        path: PathBuf,
        /// What went wrong.
        message: String,
    },
}
