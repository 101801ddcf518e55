//! Action table execution engine for reconcile.
//!
//! This crate replays a reviewed [`ActionTable`](reconcile_plan::ActionTable):
//! Copy rows copy their source into a destination root, Delete rows back the
//! target up and then remove it, Ignore and Unset rows are skipped. A dry run
//! makes the same decisions without touching the filesystem.
//!
//! Failures are isolated per row and collected in an [`ExecutionSummary`];
//! only configuration errors ([`ExecuteError`]) stop a run, and they are
//! detected before the first row executes.

mod config;
mod error;
mod executor;
mod outcome;
mod resolve;
mod stream;
mod transfer;

pub use config::{ExecuteConfig, ExecuteConfigBuilder, strip_leading_segments};
pub use error::{ExecuteError, ItemFailure};
pub use executor::ActionExecutor;
pub use outcome::{ExecutionProgress, ExecutionSummary, RowOutcome, RowReport};
pub use resolve::{Resolution, ResolvedBy, SourceResolver, strip_relative_suffix};
pub use stream::{ExecuteEvent, start_execute};

/// Default channel buffer size for execution events.
pub const EXECUTE_CHANNEL_SIZE: usize = 100;
