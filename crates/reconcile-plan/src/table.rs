//! The action table and its in-memory passes.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use tracing::{debug, info};

use reconcile_analyze::DiffReport;
use reconcile_core::{Action, DiffIdentity, Difference};

use crate::error::PlanWarning;
use crate::row::{ActionRow, default_action};

/// Rows to review and execute, keyed by (kind, relative path).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionTable {
    pub rows: Vec<ActionRow>,
    /// Problems normalized away while loading.
    #[serde(default)]
    pub warnings: Vec<PlanWarning>,
}

impl ActionTable {
    /// Create a table from rows.
    pub fn new(rows: Vec<ActionRow>) -> Self {
        Self {
            rows,
            warnings: Vec::new(),
        }
    }

    /// One row per difference, in the given order.
    pub fn from_differences(differences: &[Difference]) -> Self {
        Self::new(differences.iter().map(ActionRow::from_difference).collect())
    }

    /// One row per difference of a report.
    pub fn from_report(report: &DiffReport) -> Self {
        Self::from_differences(&report.differences)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActionRow> {
        self.rows.iter()
    }

    /// Find a row by identity.
    pub fn get(&self, identity: &DiffIdentity) -> Option<&ActionRow> {
        self.rows.iter().find(|row| row.identity() == *identity)
    }

    /// Fill undecided rows with the default action for their status.
    ///
    /// Rows that already carry an action are left alone, so running this
    /// again changes nothing. Returns the number of rows filled.
    pub fn apply_defaults(&mut self) -> usize {
        let mut filled = 0;
        for row in self.rows.iter_mut().filter(|row| !row.is_decided()) {
            row.action = default_action(row.status);
            filled += 1;
        }
        info!(filled, "default actions applied");
        filled
    }

    /// Carry actions and notes from a previous review onto matching rows.
    ///
    /// Matching is by identity. A decision already present on this table wins
    /// over the previous one. Returns the number of rows that changed.
    pub fn merge_previous(&mut self, previous: &ActionTable) -> usize {
        let lookup: HashMap<DiffIdentity, &ActionRow> = previous
            .rows
            .iter()
            .map(|row| (row.identity(), row))
            .collect();

        let mut merged = 0;
        for row in &mut self.rows {
            let Some(old) = lookup.get(&row.identity()) else {
                continue;
            };

            let mut changed = false;
            if !row.is_decided() && old.is_decided() {
                row.action = old.action;
                changed = true;
            }
            if row.notes.is_empty() && !old.notes.is_empty() {
                row.notes = old.notes.clone();
                changed = true;
            }
            if changed {
                debug!(path = %row.relative_path, action = %row.action, "carried over");
                merged += 1;
            }
        }

        info!(merged, previous = previous.len(), "previous review merged");
        merged
    }

    /// Number of rows per action, every action listed.
    pub fn counts_by_action(&self) -> IndexMap<Action, usize> {
        let mut counts: IndexMap<Action, usize> = Action::iter().map(|a| (a, 0)).collect();
        for row in &self.rows {
            *counts.entry(row.action).or_default() += 1;
        }
        counts
    }

    /// Rows carrying the given action.
    pub fn with_action(&self, action: Action) -> impl Iterator<Item = &ActionRow> {
        self.rows.iter().filter(move |row| row.action == action)
    }
}
