//! CSV persistence for action tables.
//!
//! The header row is fixed. `Action` is the only column a reviewer is
//! expected to edit; an unrecognized value is loaded as `Unset` and reported
//! as a [`PlanWarning`].

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use reconcile_core::{Action, DiffStatus, EntryKind};

use crate::error::{PlanError, PlanWarning};
use crate::row::ActionRow;
use crate::table::ActionTable;

/// Column header of the action table, in order.
pub const COLUMNS: [&str; 15] = [
    "Action",
    "Type",
    "Status",
    "RelativePath",
    "Name",
    "Extension",
    "SourcePath",
    "TargetPath",
    "SourceSize",
    "TargetSize",
    "SizeDifference",
    "SourceModified",
    "TargetModified",
    "Recommendation",
    "Notes",
];

/// Raw CSV record; every cell is text.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CsvRecord {
    action: String,
    #[serde(rename = "Type")]
    kind: String,
    status: String,
    relative_path: String,
    name: String,
    extension: String,
    source_path: String,
    target_path: String,
    source_size: String,
    target_size: String,
    size_difference: String,
    source_modified: String,
    target_modified: String,
    recommendation: String,
    notes: String,
}

impl From<&ActionRow> for CsvRecord {
    fn from(row: &ActionRow) -> Self {
        Self {
            action: row.action.to_string(),
            kind: row.kind.to_string(),
            status: row.status.to_string(),
            relative_path: row.relative_path.clone(),
            name: row.name.clone(),
            extension: row.extension.clone(),
            source_path: row.source_path.clone(),
            target_path: row.target_path.clone(),
            source_size: row.source_size.clone(),
            target_size: row.target_size.clone(),
            size_difference: row.size_difference.clone(),
            source_modified: row.source_modified.clone(),
            target_modified: row.target_modified.clone(),
            recommendation: row.recommendation.clone(),
            notes: row.notes.clone(),
        }
    }
}

impl CsvRecord {
    fn into_row(self, line: u64, warnings: &mut Vec<PlanWarning>) -> Result<ActionRow, PlanError> {
        let kind = EntryKind::from_str(self.kind.trim()).map_err(|_| PlanError::InvalidRow {
            line,
            message: format!("unknown Type '{}'", self.kind),
        })?;
        let status = DiffStatus::from_str(self.status.trim()).map_err(|_| PlanError::InvalidRow {
            line,
            message: format!("unknown Status '{}'", self.status),
        })?;
        if self.relative_path.trim().is_empty() {
            return Err(PlanError::InvalidRow {
                line,
                message: "empty RelativePath".to_string(),
            });
        }

        let action = parse_action(&self.action).unwrap_or_else(|| {
            warn!(line, value = %self.action, path = %self.relative_path, "unknown action, using Unset");
            warnings.push(PlanWarning {
                line,
                relative_path: self.relative_path.clone(),
                message: format!("unknown Action '{}' treated as Unset", self.action),
            });
            Action::Unset
        });

        Ok(ActionRow {
            action,
            kind,
            status,
            relative_path: self.relative_path,
            name: self.name,
            extension: self.extension,
            source_path: self.source_path,
            target_path: self.target_path,
            source_size: self.source_size,
            target_size: self.target_size,
            size_difference: self.size_difference,
            source_modified: self.source_modified,
            target_modified: self.target_modified,
            recommendation: self.recommendation,
            notes: self.notes,
        })
    }
}

/// Blank cells mean Unset; anything else must name an action.
fn parse_action(raw: &str) -> Option<Action> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Some(Action::Unset);
    }
    Action::from_str(trimmed).ok()
}

impl ActionTable {
    /// Write the table as CSV, header first.
    pub fn to_writer<W: Write>(&self, writer: W) -> Result<(), PlanError> {
        let mut csv = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);

        csv.write_record(COLUMNS)?;
        for row in &self.rows {
            csv.serialize(CsvRecord::from(row))?;
        }
        csv.flush().map_err(csv::Error::from)?;
        Ok(())
    }

    /// Write the table to a CSV file, replacing it.
    pub fn write_csv(&self, path: &Path) -> Result<(), PlanError> {
        let file = File::create(path).map_err(|source| PlanError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.to_writer(file)?;
        info!(path = %path.display(), rows = self.len(), "action table written");
        Ok(())
    }

    /// Read a table from CSV.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, PlanError> {
        let mut csv = csv::ReaderBuilder::new().from_reader(reader);

        let headers = csv.headers()?.clone();
        if !headers.iter().eq(COLUMNS.iter().copied()) {
            return Err(PlanError::Columns {
                expected: COLUMNS.join(", "),
                found: headers.iter().collect::<Vec<_>>().join(", "),
            });
        }

        let mut table = ActionTable::default();
        for result in csv.records() {
            let record = result?;
            let line = record.position().map_or(0, |p| p.line());
            let raw: CsvRecord = record.deserialize(Some(&headers))?;
            let row = raw.into_row(line, &mut table.warnings)?;
            table.rows.push(row);
        }

        Ok(table)
    }

    /// Read a table from a CSV file.
    pub fn read_csv(path: &Path) -> Result<Self, PlanError> {
        let file = File::open(path).map_err(|source| PlanError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::from_reader(file)?;
        info!(
            path = %path.display(),
            rows = table.len(),
            warnings = table.warnings.len(),
            "action table loaded"
        );
        Ok(table)
    }
}
