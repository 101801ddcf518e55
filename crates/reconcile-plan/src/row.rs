//! One reviewable row of the action table.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use reconcile_core::{Action, DiffIdentity, DiffStatus, Difference, Entry, EntryKind};

use crate::format::{format_size, format_size_delta, format_timestamp};

/// A difference flattened for human review.
///
/// Size and time columns hold display strings only; code that needs byte
/// counts reads them from the filesystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRow {
    pub action: Action,
    pub kind: EntryKind,
    pub status: DiffStatus,
    pub relative_path: String,
    pub name: String,
    pub extension: String,
    pub source_path: String,
    pub target_path: String,
    pub source_size: String,
    pub target_size: String,
    pub size_difference: String,
    pub source_modified: String,
    pub target_modified: String,
    pub recommendation: String,
    pub notes: String,
}

impl ActionRow {
    /// Flatten a difference into a row, keeping its action and notes.
    pub fn from_difference(diff: &Difference) -> Self {
        let is_file = diff.kind.is_file();
        let size_of = |entry: &Option<Entry>| match entry {
            Some(e) if is_file => format_size(e.size_bytes),
            _ => String::new(),
        };
        let path_of = |entry: &Option<Entry>| {
            entry
                .as_ref()
                .map(|e| e.absolute_path.to_string_lossy().into_owned())
                .unwrap_or_default()
        };
        let modified_of = |entry: &Option<Entry>| {
            entry
                .as_ref()
                .map(|e| format_timestamp(e.modified_at))
                .unwrap_or_default()
        };

        Self {
            action: diff.action,
            kind: diff.kind,
            status: diff.status,
            relative_path: diff.relative_path.clone(),
            name: diff.name().to_string(),
            extension: diff.extension().unwrap_or_default().to_string(),
            source_path: path_of(&diff.source_entry),
            target_path: path_of(&diff.target_entry),
            source_size: size_of(&diff.source_entry),
            target_size: size_of(&diff.target_entry),
            size_difference: if is_file {
                format_size_delta(diff.size_delta)
            } else {
                String::new()
            },
            source_modified: modified_of(&diff.source_entry),
            target_modified: modified_of(&diff.target_entry),
            recommendation: diff.recommendation.clone(),
            notes: diff.notes.clone(),
        }
    }

    /// Identity shared with the originating difference.
    pub fn identity(&self) -> DiffIdentity {
        DiffIdentity::new(self.kind, self.relative_path.clone())
    }

    /// Stored source path, if any.
    pub fn source(&self) -> Option<PathBuf> {
        non_empty_path(&self.source_path)
    }

    /// Stored target path, if any.
    pub fn target(&self) -> Option<PathBuf> {
        non_empty_path(&self.target_path)
    }

    /// Whether a human or the default pass has decided this row.
    pub fn is_decided(&self) -> bool {
        self.action != Action::Unset
    }
}

/// Action the default pass assigns for a status.
pub fn default_action(status: DiffStatus) -> Action {
    match status {
        DiffStatus::OnlyInSource => Action::Copy,
        DiffStatus::OnlyInTarget | DiffStatus::SizeDifference | DiffStatus::TimeDifference => {
            Action::Ignore
        }
    }
}

fn non_empty_path(raw: &str) -> Option<PathBuf> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
}
