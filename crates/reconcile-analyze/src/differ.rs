//! Structural comparison of two inventories.
//!
//! Entries are matched purely by relative path, files and directories
//! independently:
//! 1. Paths only in the source become `OnlyInSource`
//! 2. Paths only in the target become `OnlyInTarget`
//! 3. Files in both are compared by size, then by modification time
//!
//! Directories present on both sides never produce a difference.

use std::collections::hash_map::{self, HashMap};
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use reconcile_core::{
    DEFAULT_TIME_TOLERANCE_SECS, DiffStatus, Difference, Entry, EntryKind, Inventory,
};

/// Recommendation for entries missing from the target.
pub const RECOMMEND_COPY: &str = "copy to target";
/// Recommendation for entries missing from the source.
pub const RECOMMEND_REVIEW_DELETE: &str = "review for deletion or keep";
/// Recommendation when the source copy is newer.
pub const RECOMMEND_UPDATE: &str = "update target (source is newer)";
/// Recommendation when the target copy is newer.
pub const RECOMMEND_SOURCE_OLDER: &str = "source is older - review";
/// Recommendation when only the size differs.
pub const RECOMMEND_REVIEW_SIZE: &str = "size difference - review content";

/// Configuration for tree comparison.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into))]
pub struct DiffConfig {
    /// Modification times at most this far apart are considered equal.
    #[builder(default = "Duration::from_secs(DEFAULT_TIME_TOLERANCE_SECS)")]
    pub time_tolerance: Duration,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            time_tolerance: Duration::from_secs(DEFAULT_TIME_TOLERANCE_SECS),
        }
    }
}

impl DiffConfig {
    /// Create a new config builder.
    pub fn builder() -> DiffConfigBuilder {
        DiffConfigBuilder::default()
    }
}

/// Results of comparing two inventories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffReport {
    /// Root of the source inventory.
    pub source_root: PathBuf,
    /// Root of the target inventory.
    pub target_root: PathBuf,
    /// Differences sorted by kind, status, then relative path.
    pub differences: Vec<Difference>,
}

impl DiffReport {
    /// Number of differences.
    pub fn count(&self) -> usize {
        self.differences.len()
    }

    /// Check if the trees are equivalent.
    pub fn is_empty(&self) -> bool {
        self.differences.is_empty()
    }

    /// Iterate over differences with the given status.
    pub fn by_status(&self, status: DiffStatus) -> impl Iterator<Item = &Difference> {
        self.differences.iter().filter(move |d| d.status == status)
    }

    /// Count differences of one kind and status.
    pub fn count_of(&self, kind: EntryKind, status: DiffStatus) -> usize {
        self.differences
            .iter()
            .filter(|d| d.kind == kind && d.status == status)
            .count()
    }
}

/// Compares a source inventory against a target inventory.
pub struct TreeDiffer {
    config: DiffConfig,
}

impl TreeDiffer {
    /// Create a new differ with default config.
    pub fn new() -> Self {
        Self {
            config: DiffConfig::default(),
        }
    }

    /// Create a new differ with custom config.
    pub fn with_config(config: DiffConfig) -> Self {
        Self { config }
    }

    /// Compare two inventories.
    pub fn diff(&self, source: &Inventory, target: &Inventory) -> DiffReport {
        let mut differences = Vec::new();

        self.compare(
            EntryKind::File,
            &source.files,
            &target.files,
            &mut differences,
        );
        self.compare(
            EntryKind::Directory,
            &source.directories,
            &target.directories,
            &mut differences,
        );

        differences.sort_by(|a, b| {
            a.kind
                .cmp(&b.kind)
                .then(a.status.cmp(&b.status))
                .then_with(|| a.relative_path.cmp(&b.relative_path))
        });

        info!(
            differences = differences.len(),
            source = %source.root_path.display(),
            target = %target.root_path.display(),
            "comparison complete"
        );

        DiffReport {
            source_root: source.root_path.clone(),
            target_root: target.root_path.clone(),
            differences,
        }
    }

    /// Compare one kind of entry from both sides.
    fn compare(
        &self,
        kind: EntryKind,
        source: &[Entry],
        target: &[Entry],
        out: &mut Vec<Difference>,
    ) {
        let source_lookup = build_lookup(source);
        let target_lookup = build_lookup(target);

        for (path, source_entry) in &source_lookup {
            match target_lookup.get(path) {
                None => out.push(Difference::new(
                    kind,
                    DiffStatus::OnlyInSource,
                    *path,
                    Some((*source_entry).clone()),
                    None,
                    RECOMMEND_COPY,
                )),
                Some(target_entry) if kind.is_file() => {
                    if let Some(diff) = self.compare_files(source_entry, target_entry) {
                        out.push(diff);
                    }
                }
                Some(_) => {}
            }
        }

        for (path, target_entry) in &target_lookup {
            if !source_lookup.contains_key(path) {
                out.push(Difference::new(
                    kind,
                    DiffStatus::OnlyInTarget,
                    *path,
                    None,
                    Some((*target_entry).clone()),
                    RECOMMEND_REVIEW_DELETE,
                ));
            }
        }
    }

    /// Compare a file present on both sides. Size wins over time.
    fn compare_files(&self, source: &Entry, target: &Entry) -> Option<Difference> {
        let status = if source.size_bytes != target.size_bytes {
            DiffStatus::SizeDifference
        } else if time_distance(source.modified_at, target.modified_at) > self.config.time_tolerance
        {
            DiffStatus::TimeDifference
        } else {
            debug!(path = %source.relative_path, "equal");
            return None;
        };

        let recommendation = if source.modified_at > target.modified_at {
            RECOMMEND_UPDATE
        } else if target.modified_at > source.modified_at {
            RECOMMEND_SOURCE_OLDER
        } else {
            RECOMMEND_REVIEW_SIZE
        };

        Some(Difference::new(
            EntryKind::File,
            status,
            source.relative_path.clone(),
            Some(source.clone()),
            Some(target.clone()),
            recommendation,
        ))
    }
}

impl Default for TreeDiffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Index entries by relative path. The first entry wins on a collision.
fn build_lookup(entries: &[Entry]) -> HashMap<&str, &Entry> {
    let mut lookup = HashMap::with_capacity(entries.len());
    for entry in entries {
        match lookup.entry(entry.relative_path.as_str()) {
            hash_map::Entry::Vacant(slot) => {
                slot.insert(entry);
            }
            hash_map::Entry::Occupied(_) => {
                warn!(path = %entry.relative_path, "duplicate relative path in inventory");
            }
        }
    }
    lookup
}

/// Absolute distance between two instants.
fn time_distance(a: SystemTime, b: SystemTime) -> Duration {
    a.duration_since(b).unwrap_or_else(|e| e.duration())
}
