//! Difference records produced by comparing two inventories.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::entry::{Entry, EntryKind};

/// How one relative path differs between source and target.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum DiffStatus {
    /// Present only in the source tree.
    OnlyInSource,
    /// Present only in the target tree.
    OnlyInTarget,
    /// Present in both with different sizes.
    SizeDifference,
    /// Present in both, same size, modification times outside tolerance.
    TimeDifference,
}

/// Disposition assigned to a difference, by a human or by the default pass.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum Action {
    /// No decision yet.
    #[default]
    Unset,
    /// Copy the source entry into the destination.
    Copy,
    /// Back up then delete the target entry.
    Delete,
    /// Leave untouched.
    Ignore,
}

/// Identity of a difference across runs: kind plus relative path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DiffIdentity {
    /// File or directory.
    pub kind: EntryKind,
    /// Canonical relative path.
    pub relative_path: String,
}

impl DiffIdentity {
    /// Create a new identity.
    pub fn new(kind: EntryKind, relative_path: impl Into<String>) -> Self {
        Self {
            kind,
            relative_path: relative_path.into(),
        }
    }
}

impl std::fmt::Display for DiffIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.kind, self.relative_path)
    }
}

/// One reconciliation unit for a single relative path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Difference {
    /// File or directory.
    pub kind: EntryKind,
    /// Classification.
    pub status: DiffStatus,
    /// Canonical relative path shared by both sides.
    pub relative_path: String,
    /// Entry on the source side, absent for `OnlyInTarget`.
    pub source_entry: Option<Entry>,
    /// Entry on the target side, absent for `OnlyInSource`.
    pub target_entry: Option<Entry>,
    /// Target size minus source size; a missing side counts as 0.
    pub size_delta: i64,
    /// Suggested disposition, for humans.
    pub recommendation: String,
    /// The only field expected to be edited between planning and execution.
    #[serde(default)]
    pub action: Action,
    /// Free text.
    #[serde(default)]
    pub notes: String,
}

impl Difference {
    /// Create a difference, deriving `size_delta` from the entries.
    pub fn new(
        kind: EntryKind,
        status: DiffStatus,
        relative_path: impl Into<String>,
        source_entry: Option<Entry>,
        target_entry: Option<Entry>,
        recommendation: impl Into<String>,
    ) -> Self {
        let source_size = source_entry.as_ref().map_or(0, |e| e.size_bytes);
        let target_size = target_entry.as_ref().map_or(0, |e| e.size_bytes);
        Self {
            kind,
            status,
            relative_path: relative_path.into(),
            source_entry,
            target_entry,
            size_delta: target_size as i64 - source_size as i64,
            recommendation: recommendation.into(),
            action: Action::Unset,
            notes: String::new(),
        }
    }

    /// Identity of this difference.
    pub fn identity(&self) -> DiffIdentity {
        DiffIdentity::new(self.kind, self.relative_path.clone())
    }

    /// Whichever entry is present, preferring the source.
    pub fn any_entry(&self) -> Option<&Entry> {
        self.source_entry.as_ref().or(self.target_entry.as_ref())
    }

    /// Entry name.
    pub fn name(&self) -> &str {
        self.any_entry().map_or("", |e| e.name.as_str())
    }

    /// File extension, if any.
    pub fn extension(&self) -> Option<&str> {
        self.any_entry().and_then(|e| e.extension.as_deref())
    }

    /// Source size in bytes, if the source entry exists.
    pub fn source_size(&self) -> Option<u64> {
        self.source_entry.as_ref().map(|e| e.size_bytes)
    }

    /// Target size in bytes, if the target entry exists.
    pub fn target_size(&self) -> Option<u64> {
        self.target_entry.as_ref().map(|e| e.size_bytes)
    }
}
