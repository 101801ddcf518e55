//! Directory scanning engine for reconcile.
//!
//! This crate walks a root directory with jwalk and produces a flat
//! [`Inventory`] of files and directories keyed by relative path.
//!
//! # Overview
//!
//! - **Order-tolerant**: entries are recorded in walk order; consumers re-key
//!   by relative path
//! - **Exclusions** are glob patterns tested against each entry's bare name
//! - **Depth limit** counts path segments below the root
//! - **Non-fatal errors**: unreadable entries become [`ScanWarning`]s
//!
//! # Example
//!
//! ```rust,no_run
//! use reconcile_scan::{InventoryLabel, ScanConfig, TreeScanner};
//!
//! let config = ScanConfig::new("/path/to/source");
//! let inventory = TreeScanner::new().scan(&config, InventoryLabel::Source).unwrap();
//!
//! println!("{} files, {} bytes", inventory.file_count, inventory.total_size);
//! ```

mod progress;
mod scanner;

pub use progress::ScanProgress;
pub use scanner::TreeScanner;

// Re-export core types for convenience
pub use reconcile_core::{
    Entry, EntryKind, Inventory, InventoryLabel, ScanConfig, ScanError, ScanWarning, WarningKind,
};
