//! Comparison algorithms for reconcile.
//!
//! This crate turns two scanned inventories into a difference list and
//! summarizes it:
//!
//! - **Tree diff** - match entries by relative path, classify what differs
//! - **Structure report** - counts, busiest path prefixes, largest missing files
//!
//! # Tree Diff
//!
//! Files present on both sides are compared by size first; only files of
//! equal size are compared by modification time, with a tolerance (2 seconds
//! by default) so copies made by tools that round timestamps are not flagged.
//!
//! ```rust,ignore
//! use reconcile_analyze::TreeDiffer;
//! use reconcile_scan::{InventoryLabel, ScanConfig, TreeScanner};
//!
//! let scanner = TreeScanner::new();
//! let source = scanner.scan(&ScanConfig::new("/backup/old"), InventoryLabel::Source).unwrap();
//! let target = scanner.scan(&ScanConfig::new("/backup/new"), InventoryLabel::Target).unwrap();
//!
//! let report = TreeDiffer::new().diff(&source, &target);
//! for diff in &report.differences {
//!     println!("{} {} - {}", diff.status, diff.relative_path, diff.recommendation);
//! }
//! ```
//!
//! # Structure Report
//!
//! ```rust,ignore
//! use reconcile_analyze::StructureAnalyzer;
//!
//! let summary = StructureAnalyzer::new().analyze(&report);
//! for prefix in &summary.top_prefixes {
//!     println!("{:>6}  {}", prefix.count, prefix.prefix);
//! }
//! ```

mod differ;
mod structure;

pub use differ::{
    DiffConfig, DiffConfigBuilder, DiffReport, RECOMMEND_COPY, RECOMMEND_REVIEW_DELETE,
    RECOMMEND_REVIEW_SIZE, RECOMMEND_SOURCE_OLDER, RECOMMEND_UPDATE, TreeDiffer,
};
pub use structure::{
    MissingFile, PrefixCount, StatusCount, StructureAnalyzer, StructureConfig,
    StructureConfigBuilder, StructureReport, path_prefix,
};

// Re-export core types
pub use reconcile_core::{Action, DiffIdentity, DiffStatus, Difference, EntryKind, Inventory};
