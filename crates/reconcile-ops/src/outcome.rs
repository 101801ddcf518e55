//! Per-row outcomes, progress and the run summary.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use reconcile_core::{Action, DiffIdentity};

use crate::error::ItemFailure;

/// Result of executing one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowOutcome {
    Copied,
    Deleted,
    Skipped(String),
    Failed(ItemFailure),
}

impl RowOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

impl fmt::Display for RowOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Copied => write!(f, "copied"),
            Self::Deleted => write!(f, "deleted"),
            Self::Skipped(reason) => write!(f, "skipped: {reason}"),
            Self::Failed(failure) => write!(f, "failed: {failure}"),
        }
    }
}

/// Log record for one row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowReport {
    pub identity: DiffIdentity,
    pub action: Action,
    /// Resolved source (Copy) or the entry removed (Delete).
    pub source: Option<PathBuf>,
    /// Copy destination or backup location.
    pub destination: Option<PathBuf>,
    pub outcome: RowOutcome,
    /// Bytes copied, or that would have been copied in a dry run.
    pub bytes: u64,
    pub dry_run: bool,
}

impl RowReport {
    pub(crate) fn new(identity: DiffIdentity, action: Action, dry_run: bool) -> Self {
        Self {
            identity,
            action,
            source: None,
            destination: None,
            outcome: RowOutcome::Skipped(String::new()),
            bytes: 0,
            dry_run,
        }
    }

    pub(crate) fn finish(mut self, outcome: RowOutcome) -> Self {
        self.outcome = outcome;
        self
    }
}

impl fmt::Display for RowReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.dry_run {
            write!(f, "[dry-run] ")?;
        }
        write!(f, "{} {}", self.action, self.identity)?;
        match (&self.source, &self.destination) {
            (Some(src), Some(dst)) => write!(f, ": {} -> {}", src.display(), dst.display())?,
            (Some(path), None) | (None, Some(path)) => write!(f, ": {}", path.display())?,
            (None, None) => {}
        }
        write!(f, " ({})", self.outcome)
    }
}

/// Progress snapshot, sent before each row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionProgress {
    pub rows_completed: usize,
    pub rows_total: usize,
    pub bytes_processed: u64,
    /// Relative path of the row about to run.
    pub current: Option<String>,
}

impl ExecutionProgress {
    pub(crate) fn new(rows_total: usize) -> Self {
        Self {
            rows_completed: 0,
            rows_total,
            bytes_processed: 0,
            current: None,
        }
    }

    /// Get the progress as a percentage (0.0 to 100.0).
    pub fn percentage(&self) -> f64 {
        if self.rows_total > 0 {
            (self.rows_completed as f64 / self.rows_total as f64) * 100.0
        } else {
            0.0
        }
    }
}

/// Totals for a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionSummary {
    pub total: usize,
    pub copied: usize,
    pub deleted: usize,
    pub failed: usize,
    pub skipped: usize,
    pub bytes_copied: u64,
    pub dry_run: bool,
    /// Set when the run stopped early; remaining rows count as skipped.
    pub aborted: Option<String>,
}

impl ExecutionSummary {
    pub(crate) fn new(total: usize, dry_run: bool) -> Self {
        Self {
            total,
            dry_run,
            ..Self::default()
        }
    }

    pub(crate) fn record(&mut self, report: &RowReport) {
        match report.outcome {
            RowOutcome::Copied => {
                self.copied += 1;
                self.bytes_copied += report.bytes;
            }
            RowOutcome::Deleted => self.deleted += 1,
            RowOutcome::Skipped(_) => self.skipped += 1,
            RowOutcome::Failed(_) => self.failed += 1,
        }
    }

    /// Check if every attempted row succeeded.
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.aborted.is_none()
    }

    /// Get a human-readable summary of the run.
    pub fn summary(&self) -> String {
        let mut line = format!(
            "{}{} rows: {} copied, {} deleted, {} failed, {} skipped",
            if self.dry_run { "[dry-run] " } else { "" },
            self.total,
            self.copied,
            self.deleted,
            self.failed,
            self.skipped
        );
        if let Some(reason) = &self.aborted {
            line.push_str(&format!(" (aborted: {reason})"));
        }
        line
    }
}
