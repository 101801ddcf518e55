//! Action table errors.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that make an action table unusable.
#[derive(Debug, Error)]
pub enum PlanError {
    /// The table file could not be opened or written.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The CSV layer failed.
    #[error("Malformed action table: {0}")]
    Csv(#[from] csv::Error),

    /// Header row does not list exactly the expected columns.
    #[error("Unexpected columns: expected [{expected}], found [{found}]")]
    Columns { expected: String, found: String },

    /// A row has an unusable Type or Status.
    #[error("Invalid row at line {line}: {message}")]
    InvalidRow { line: u64, message: String },
}

/// A recoverable problem found while loading a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanWarning {
    /// 1-based line in the CSV file.
    pub line: u64,
    pub relative_path: String,
    pub message: String,
}

impl std::fmt::Display for PlanWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {} ({}): {}", self.line, self.relative_path, self.message)
    }
}
