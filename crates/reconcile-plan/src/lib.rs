//! Reviewable action tables for reconcile.
//!
//! A [`DiffReport`](reconcile_analyze::DiffReport) becomes an [`ActionTable`]:
//! one row per difference, each with a mutable [`Action`]. The table is
//! saved as CSV for a human to edit, loaded back, and handed to the executor.
//!
//! ```rust,ignore
//! use reconcile_plan::ActionTable;
//!
//! let mut table = ActionTable::from_report(&report);
//! if let Ok(previous) = ActionTable::read_csv("actions.csv".as_ref()) {
//!     table.merge_previous(&previous);
//! }
//! table.apply_defaults();
//! table.write_csv("actions.csv".as_ref())?;
//! ```

mod error;
mod format;
mod persist;
mod row;
mod table;

pub use error::{PlanError, PlanWarning};
pub use format::{TIMESTAMP_FORMAT, format_size, format_size_delta, format_timestamp};
pub use persist::COLUMNS;
pub use row::{ActionRow, default_action};
pub use table::ActionTable;

// Re-export core types
pub use reconcile_core::{Action, DiffIdentity, DiffStatus, EntryKind};
