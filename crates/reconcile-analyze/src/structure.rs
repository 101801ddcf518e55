//! Aggregated view of a difference list.
//!
//! Purely informational: counts per kind and status, the path prefixes
//! with the most differences, and the largest files missing from the
//! target.

use std::path::PathBuf;

use derive_builder::Builder;
use indexmap::IndexMap;
use itertools::{Itertools, iproduct};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use reconcile_core::{DiffStatus, Difference, EntryKind, PATH_SEPARATOR};

use crate::differ::DiffReport;

/// Configuration for the structure report.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into))]
pub struct StructureConfig {
    /// Number of leading directory segments used to group differences (0 = whole directory).
    #[builder(default = "2")]
    pub prefix_depth: usize,

    /// Maximum rows per ranking.
    #[builder(default = "20")]
    pub top_n: usize,

    /// Minimum size for a missing file to be listed.
    #[builder(default = "1024 * 1024")] // 1 MB
    pub min_missing_size: u64,
}

impl Default for StructureConfig {
    fn default() -> Self {
        Self {
            prefix_depth: 2,
            top_n: 20,
            min_missing_size: 1024 * 1024,
        }
    }
}

impl StructureConfig {
    /// Create a new config builder.
    pub fn builder() -> StructureConfigBuilder {
        StructureConfigBuilder::default()
    }
}

/// Number of differences for one kind and status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCount {
    pub kind: EntryKind,
    pub status: DiffStatus,
    pub count: usize,
}

/// Differences grouped under one path prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefixCount {
    /// Leading directory segments, or `.` for the root.
    pub prefix: String,
    /// Number of differences under this prefix.
    pub count: usize,
    /// Bytes involved (the larger side of each difference).
    pub bytes: u64,
}

/// A source file absent from the target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingFile {
    pub relative_path: String,
    pub size_bytes: u64,
    pub source_path: PathBuf,
}

/// Summary of a difference list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructureReport {
    /// Total number of differences.
    pub total: usize,
    /// Counts for every kind/status combination that can occur.
    pub counts: Vec<StatusCount>,
    /// Prefixes ranked by difference count.
    pub top_prefixes: Vec<PrefixCount>,
    /// Largest files only in the source, above the size threshold.
    pub largest_missing: Vec<MissingFile>,
    /// Bytes of every file only in the source.
    pub missing_bytes: u64,
}

impl StructureReport {
    /// Count for one kind/status pair.
    pub fn count_of(&self, kind: EntryKind, status: DiffStatus) -> usize {
        self.counts
            .iter()
            .find(|c| c.kind == kind && c.status == status)
            .map_or(0, |c| c.count)
    }
}

/// Builds a [`StructureReport`] from a [`DiffReport`].
pub struct StructureAnalyzer {
    config: StructureConfig,
}

impl StructureAnalyzer {
    /// Create a new analyzer with default config.
    pub fn new() -> Self {
        Self {
            config: StructureConfig::default(),
        }
    }

    /// Create a new analyzer with custom config.
    pub fn with_config(config: StructureConfig) -> Self {
        Self { config }
    }

    /// Summarize a difference list.
    pub fn analyze(&self, report: &DiffReport) -> StructureReport {
        let differences = &report.differences;

        let counts = iproduct!(EntryKind::iter(), DiffStatus::iter())
            .filter(|(kind, status)| {
                kind.is_file()
                    || matches!(status, DiffStatus::OnlyInSource | DiffStatus::OnlyInTarget)
            })
            .map(|(kind, status)| StatusCount {
                kind,
                status,
                count: report.count_of(kind, status),
            })
            .collect();

        let missing_bytes = differences
            .iter()
            .filter(|d| is_missing_file(d))
            .filter_map(Difference::source_size)
            .sum();

        StructureReport {
            total: differences.len(),
            counts,
            top_prefixes: self.top_prefixes(differences),
            largest_missing: self.largest_missing(differences),
            missing_bytes,
        }
    }

    /// Group differences by path prefix and rank by count.
    pub fn top_prefixes(&self, differences: &[Difference]) -> Vec<PrefixCount> {
        let mut groups: IndexMap<String, PrefixCount> = IndexMap::new();

        for diff in differences {
            let prefix = path_prefix(diff, self.config.prefix_depth);
            let bytes = diff
                .source_size()
                .unwrap_or(0)
                .max(diff.target_size().unwrap_or(0));

            let group = groups.entry(prefix.clone()).or_insert(PrefixCount {
                prefix,
                count: 0,
                bytes: 0,
            });
            group.count += 1;
            group.bytes += bytes;
        }

        groups
            .into_values()
            .sorted_by(|a, b| b.count.cmp(&a.count).then_with(|| a.prefix.cmp(&b.prefix)))
            .take(self.config.top_n)
            .collect()
    }

    /// Rank files missing from the target by size, largest first.
    pub fn largest_missing(&self, differences: &[Difference]) -> Vec<MissingFile> {
        differences
            .iter()
            .filter(|d| is_missing_file(d))
            .filter_map(|d| {
                let entry = d.source_entry.as_ref()?;
                (entry.size_bytes >= self.config.min_missing_size).then(|| MissingFile {
                    relative_path: d.relative_path.clone(),
                    size_bytes: entry.size_bytes,
                    source_path: entry.absolute_path.clone(),
                })
            })
            .sorted_by(|a, b| {
                b.size_bytes
                    .cmp(&a.size_bytes)
                    .then_with(|| a.relative_path.cmp(&b.relative_path))
            })
            .take(self.config.top_n)
            .collect()
    }
}

impl Default for StructureAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

fn is_missing_file(diff: &Difference) -> bool {
    diff.kind.is_file() && diff.status == DiffStatus::OnlyInSource
}

/// Directory portion of a difference, truncated to `depth` segments.
///
/// Directories group under themselves, files under their parent. Root-level
/// files group under `.`.
pub fn path_prefix(diff: &Difference, depth: usize) -> String {
    let mut segments: Vec<&str> = diff
        .relative_path
        .split(PATH_SEPARATOR)
        .filter(|s| !s.is_empty())
        .collect();

    if diff.kind.is_file() {
        segments.pop();
    }
    if depth > 0 {
        segments.truncate(depth);
    }

    if segments.is_empty() {
        ".".to_string()
    } else {
        segments.join("/")
    }
}
