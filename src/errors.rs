use std::io;

use thiserror::Error;

use crate::types::{PathString, Reason};

/// Error type for collection, comparison, and persistence failures.
#[derive(Debug, Error)]
pub enum CollectError {
    /// A result file could not be parsed.
    #[error("failed to parse '{path}': {reason}")]
    Parse {
        /// Path of the offending file.
        path: PathString,
        /// What went wrong.
        reason: Reason,
    },
    /// A required input file or directory does not exist.
    #[error("missing required input: {0}")]
    MissingInput(String),
    /// The output workbook could not be written.
    #[error("workbook write failure: {0}")]
    Workbook(String),
    /// The artifact manifest could not be read or written.
    #[error("manifest failure: {0}")]
    Manifest(String),
    /// Underlying filesystem failure.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
}
