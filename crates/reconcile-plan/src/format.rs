//! Presentation helpers for table cells.
//!
//! Output of these functions is for review only and is never parsed back.

use std::time::SystemTime;

use chrono::{DateTime, Local};
use humansize::{DECIMAL, format_size as human_size};

/// Format used for timestamps in the action table.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Render a byte count, e.g. `12.34 MB`.
pub fn format_size(bytes: u64) -> String {
    human_size(bytes, DECIMAL)
}

/// Render a signed byte delta, e.g. `+100 B` or `-1.23 kB`.
pub fn format_size_delta(delta: i64) -> String {
    let magnitude = human_size(delta.unsigned_abs(), DECIMAL);
    match delta.signum() {
        1 => format!("+{magnitude}"),
        -1 => format!("-{magnitude}"),
        _ => magnitude,
    }
}

/// Render a timestamp in local time.
pub fn format_timestamp(time: SystemTime) -> String {
    DateTime::<Local>::from(time).format(TIMESTAMP_FORMAT).to_string()
}
