//! Locating the source of a Copy row.
//!
//! Tables are often replayed on a different machine or after the source
//! tree moved, so a stored `SourcePath` may be blank or stale. Resolution
//! tries, in order:
//! 1. The stored path
//! 2. The row's relative path under the reconstructed source base
//! 3. The row's file name directly under the base
//! 4. A recursive search under the base for the best trailing-path match

use std::path::{Path, PathBuf};

use jwalk::WalkDir;
use serde::{Deserialize, Serialize};
use tracing::debug;

use reconcile_core::{EntryKind, PATH_SEPARATOR, relative_to_path};
use reconcile_plan::{ActionRow, ActionTable};

use crate::error::ItemFailure;

/// Which step found the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolvedBy {
    Stored,
    Reconstructed,
    FileName,
    Search,
}

/// A resolved source path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub path: PathBuf,
    pub resolved_by: ResolvedBy,
}

/// Resolves row sources against a common base directory.
#[derive(Debug, Clone, Default)]
pub struct SourceResolver {
    base: Option<PathBuf>,
}

impl SourceResolver {
    /// Derive the base from the first row whose stored source exists and ends
    /// with its own relative path.
    pub fn from_table(table: &ActionTable) -> Self {
        let base = table.iter().find_map(|row| {
            let stored = row.source()?;
            if !stored.exists() {
                return None;
            }
            strip_relative_suffix(&stored, &row.relative_path)
        });

        match &base {
            Some(base) => debug!(base = %base.display(), "source base reconstructed"),
            None => debug!("no row yields a source base"),
        }
        Self { base }
    }

    /// Use a known base directory.
    pub fn with_base(base: impl Into<PathBuf>) -> Self {
        Self {
            base: Some(base.into()),
        }
    }

    pub fn base(&self) -> Option<&Path> {
        self.base.as_deref()
    }

    /// Find an existing source for a row.
    pub fn resolve(&self, row: &ActionRow) -> Result<Resolution, ItemFailure> {
        let found = |path: PathBuf, resolved_by: ResolvedBy| -> Result<Resolution, ItemFailure> {
            debug!(path = %row.relative_path, source = %path.display(), ?resolved_by, "source resolved");
            Ok(Resolution { path, resolved_by })
        };

        if let Some(stored) = row.source() {
            if matches_kind(&stored, row.kind) {
                return found(stored, ResolvedBy::Stored);
            }
        }

        let Some(base) = self.base.as_deref() else {
            return Err(ambiguous(row));
        };

        let rebuilt = base.join(relative_to_path(&row.relative_path));
        if matches_kind(&rebuilt, row.kind) {
            return found(rebuilt, ResolvedBy::Reconstructed);
        }

        let name = file_name(row);
        if name.is_empty() {
            return Err(ambiguous(row));
        }

        let direct = base.join(name);
        if matches_kind(&direct, row.kind) {
            return found(direct, ResolvedBy::FileName);
        }

        match search(base, name, row) {
            Some(path) => found(path, ResolvedBy::Search),
            None => Err(ambiguous(row)),
        }
    }
}

fn ambiguous(row: &ActionRow) -> ItemFailure {
    ItemFailure::IdentityAmbiguous {
        relative_path: row.relative_path.clone(),
    }
}

fn matches_kind(path: &Path, kind: EntryKind) -> bool {
    match kind {
        EntryKind::File => path.is_file(),
        EntryKind::Directory => path.is_dir(),
    }
}

fn file_name(row: &ActionRow) -> &str {
    if !row.name.is_empty() {
        return &row.name;
    }
    row.relative_path
        .rsplit(['\\', PATH_SEPARATOR])
        .find(|s| !s.is_empty())
        .unwrap_or("")
}

/// Remove the segments of `relative_path` from the end of `path`.
pub fn strip_relative_suffix(path: &Path, relative_path: &str) -> Option<PathBuf> {
    let suffix = relative_to_path(relative_path);
    let depth = suffix.components().count();
    if depth == 0 || !path.ends_with(&suffix) {
        return None;
    }

    let mut base = path.to_path_buf();
    for _ in 0..depth {
        base.pop();
    }
    Some(base)
}

/// Number of trailing segments `candidate` shares with `relative_path`.
fn trailing_match(candidate: &Path, relative_path: &str) -> usize {
    let wanted = relative_to_path(relative_path);
    candidate
        .components()
        .rev()
        .zip(wanted.components().rev())
        .take_while(|(a, b)| a.as_os_str().eq_ignore_ascii_case(b.as_os_str()))
        .count()
}

/// Search under `base` for entries named `name` of the row's kind. The
/// candidate sharing the most trailing segments wins; a tie is ambiguous.
fn search(base: &Path, name: &str, row: &ActionRow) -> Option<PathBuf> {
    let mut best: Option<(usize, PathBuf)> = None;
    let mut tied = false;

    for entry in WalkDir::new(base).skip_hidden(false).sort(true) {
        let Ok(entry) = entry else { continue };
        if !entry.file_name().eq_ignore_ascii_case(name) {
            continue;
        }
        let is_match = match row.kind {
            EntryKind::File => entry.file_type().is_file(),
            EntryKind::Directory => entry.file_type().is_dir(),
        };
        if !is_match {
            continue;
        }

        let path = entry.path();
        let score = trailing_match(&path, &row.relative_path);
        match best.as_ref().map(|(top, _)| *top) {
            Some(top) if score < top => {}
            Some(top) if score == top => tied = true,
            _ => {
                best = Some((score, path));
                tied = false;
            }
        }
    }

    if tied {
        debug!(path = %row.relative_path, "search found several equally good candidates");
        return None;
    }
    best.map(|(_, path)| path)
}
