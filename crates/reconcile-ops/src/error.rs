//! Execution errors.
//!
//! [`ExecuteError`] aborts a run before any row is touched.
//! [`ItemFailure`] is recorded against a single row and never stops the run.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration-level failure; nothing is executed.
#[derive(Debug, Error)]
pub enum ExecuteError {
    /// The destination root cannot be listed or created.
    #[error("Destination unreachable: {path}: {source}")]
    DestinationUnreachable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The destination root exists but is not a directory.
    #[error("Destination is not a directory: {path}")]
    DestinationNotDirectory { path: PathBuf },

    /// Delete rows are present but no backup location was configured.
    #[error("{count} delete row(s) require a backup directory")]
    BackupRootRequired { count: usize },

    /// The backup location cannot hold backups.
    #[error("Invalid backup directory {path}: {message}")]
    BackupRootInvalid { path: PathBuf, message: String },
}

/// Why a single row failed.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ItemFailure {
    /// No existing source could be found for the row.
    #[error("source not found for {relative_path}")]
    IdentityAmbiguous { relative_path: String },

    /// The source exists but cannot be read.
    #[error("cannot read source {path}: {message}")]
    SourceUnreadable { path: PathBuf, message: String },

    /// A destination directory or file cannot be written or removed.
    #[error("cannot write {path}: {message}")]
    DestinationUnwritable { path: PathBuf, message: String },

    /// The backup copy could not be made or verified; nothing was deleted.
    #[error("backup of {path} failed: {message}")]
    BackupFailed { path: PathBuf, message: String },

    /// The entry to delete exists but cannot be inspected.
    #[error("cannot read target {path}: {message}")]
    TargetUnreadable { path: PathBuf, message: String },
}

impl ItemFailure {
    pub(crate) fn source_unreadable(path: impl Into<PathBuf>, error: impl ToString) -> Self {
        Self::SourceUnreadable {
            path: path.into(),
            message: error.to_string(),
        }
    }

    pub(crate) fn destination_unwritable(path: impl Into<PathBuf>, error: impl ToString) -> Self {
        Self::DestinationUnwritable {
            path: path.into(),
            message: error.to_string(),
        }
    }

    pub(crate) fn backup_failed(path: impl Into<PathBuf>, error: impl ToString) -> Self {
        Self::BackupFailed {
            path: path.into(),
            message: error.to_string(),
        }
    }

    pub(crate) fn target_unreadable(path: impl Into<PathBuf>, error: impl ToString) -> Self {
        Self::TargetUnreadable {
            path: path.into(),
            message: error.to_string(),
        }
    }
}
