//! Tree inventory container and aggregates.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::entry::{Entry, EntryKind};
use crate::error::ScanWarning;

/// Which side of a comparison an inventory describes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum InventoryLabel {
    /// The reference tree.
    Source,
    /// The tree being reconciled.
    Target,
}

/// Complete result of one scan: files, directories and aggregates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Inventory {
    /// Source or target.
    pub label: InventoryLabel,

    /// Root path that was scanned.
    pub root_path: PathBuf,

    /// File entries, in scan order.
    pub files: Vec<Entry>,

    /// Directory entries, in scan order.
    pub directories: Vec<Entry>,

    /// Sum of all file sizes.
    pub total_size: u64,

    /// Number of file entries.
    pub file_count: u64,

    /// Number of directory entries.
    pub dir_count: u64,

    /// When this scan was performed.
    pub scanned_at: SystemTime,

    /// Duration of the scan.
    #[serde(default)]
    pub scan_duration: Duration,

    /// Warnings encountered during scan.
    #[serde(default)]
    pub warnings: Vec<ScanWarning>,
}

impl Inventory {
    /// Create an empty inventory.
    pub fn new(label: InventoryLabel, root_path: impl Into<PathBuf>) -> Self {
        Self {
            label,
            root_path: root_path.into(),
            files: Vec::new(),
            directories: Vec::new(),
            total_size: 0,
            file_count: 0,
            dir_count: 0,
            scanned_at: SystemTime::now(),
            scan_duration: Duration::ZERO,
            warnings: Vec::new(),
        }
    }

    /// Build an inventory from arbitrary entries.
    ///
    /// This is the entry point for collaborators that produce entry-shaped
    /// records without scanning a directory.
    pub fn from_entries(
        label: InventoryLabel,
        root_path: impl Into<PathBuf>,
        entries: impl IntoIterator<Item = Entry>,
    ) -> Self {
        let mut inventory = Self::new(label, root_path);
        for entry in entries {
            inventory.push(entry);
        }
        inventory
    }

    /// Add an entry, keeping aggregates consistent.
    pub fn push(&mut self, entry: Entry) {
        match entry.kind {
            EntryKind::File => {
                self.total_size += entry.size_bytes;
                self.file_count += 1;
                self.files.push(entry);
            }
            EntryKind::Directory => {
                self.dir_count += 1;
                self.directories.push(entry);
            }
        }
    }

    /// Record a non-fatal warning.
    pub fn warn(&mut self, warning: ScanWarning) {
        self.warnings.push(warning);
    }

    /// Iterate over every entry, files first.
    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.files.iter().chain(self.directories.iter())
    }

    /// Total number of entries.
    pub fn len(&self) -> usize {
        self.files.len() + self.directories.len()
    }

    /// Check if the inventory holds no entries.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.directories.is_empty()
    }

    /// Check if there were any warnings during scanning.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Check whether two entries share the same (kind, relative_path).
    pub fn has_duplicate_identities(&self) -> bool {
        let mut seen = HashSet::with_capacity(self.len());
        !self
            .entries()
            .all(|e| seen.insert((e.kind, e.relative_path.as_str())))
    }
}
