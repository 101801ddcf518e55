//! Core types and configuration for reconcile.
//!
//! This crate provides the data model shared by every stage of the
//! pipeline: scanned entries and inventories, difference records and
//! their actions, scan configuration, run profiles and error types.

mod config;
mod difference;
mod entry;
mod error;
mod inventory;
mod profile;

pub use config::{ScanConfig, ScanConfigBuilder};
pub use difference::{Action, DiffIdentity, DiffStatus, Difference};
pub use entry::{
    Entry, EntryKind, PATH_SEPARATOR, normalize_relative, relative_key, relative_to_path,
    segment_count,
};
pub use error::{ConfigError, ScanError, ScanWarning, WarningKind};
pub use inventory::{Inventory, InventoryLabel};
pub use profile::{
    DEFAULT_TIME_TOLERANCE_SECS, DiffSection, ExecuteSection, Profile, ReportSection, ScanSection,
};
