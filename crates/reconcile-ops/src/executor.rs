//! Replays an action table against the filesystem.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use reconcile_core::{Action, EntryKind, segment_count};
use reconcile_plan::{ActionRow, ActionTable};

use crate::config::ExecuteConfig;
use crate::error::{ExecuteError, ItemFailure};
use crate::outcome::{ExecutionProgress, ExecutionSummary, RowOutcome, RowReport};
use crate::resolve::SourceResolver;
use crate::stream::ExecuteEvent;
use crate::transfer::{copy_any, copy_file, lies_under, remove_any, same_entry, verify_copy};

/// Executes the Copy and Delete rows of an action table.
///
/// Rows run one at a time. A failing row is recorded and the run moves on;
/// only configuration problems found before the first row abort the run.
#[derive(Debug, Clone)]
pub struct ActionExecutor {
    config: ExecuteConfig,
}

impl ActionExecutor {
    pub fn new(config: ExecuteConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExecuteConfig {
        &self.config
    }

    /// Execute a table.
    pub fn execute(&self, table: &ActionTable) -> Result<ExecutionSummary, ExecuteError> {
        self.execute_with(table, |_| {})
    }

    /// Execute a table, reporting progress and each finished row.
    pub fn execute_with(
        &self,
        table: &ActionTable,
        mut on_event: impl FnMut(ExecuteEvent),
    ) -> Result<ExecutionSummary, ExecuteError> {
        self.preflight(table)?;

        let dry_run = self.config.dry_run;
        let resolver = SourceResolver::from_table(table);
        let ordered = execution_order(table);

        let mut summary = ExecutionSummary::new(table.len(), dry_run);
        let mut progress = ExecutionProgress::new(table.len());

        info!(
            rows = table.len(),
            scheduled = ordered.len(),
            dry_run,
            destination = %self.config.destination_root.display(),
            "execution started"
        );

        for (step, row) in ordered {
            if summary.aborted.is_none() {
                if let Some(reason) = self.destination_lost() {
                    error!(%reason, "stopping run");
                    summary.aborted = Some(reason);
                }
            }

            progress.current = Some(row.relative_path.clone());
            on_event(ExecuteEvent::Progress(progress.clone()));

            let report = match &summary.aborted {
                Some(_) => RowReport::new(row.identity(), row.action, dry_run)
                    .finish(RowOutcome::Skipped("run aborted".to_string())),
                None => match step {
                    Step::Copy => self.copy_row(row, &resolver),
                    Step::Delete => self.delete_row(row),
                },
            };

            log_report(&report);
            summary.record(&report);
            progress.rows_completed += 1;
            progress.bytes_processed = summary.bytes_copied;
            on_event(ExecuteEvent::Row(report));
        }

        for row in table.iter().filter(|r| !is_scheduled(r)) {
            let reason = if row.is_decided() { "ignored" } else { "no action set" };
            let report = RowReport::new(row.identity(), row.action, dry_run)
                .finish(RowOutcome::Skipped(reason.to_string()));
            debug!("{report}");
            summary.record(&report);
            progress.rows_completed += 1;
            on_event(ExecuteEvent::Row(report));
        }

        info!("{}", summary.summary());
        Ok(summary)
    }

    /// Checks that abort the run before any row executes.
    fn preflight(&self, table: &ActionTable) -> Result<(), ExecuteError> {
        let root = &self.config.destination_root;

        match fs::metadata(root) {
            Ok(meta) if !meta.is_dir() => {
                return Err(ExecuteError::DestinationNotDirectory { path: root.clone() });
            }
            Ok(_) => {
                fs::read_dir(root).map_err(|source| ExecuteError::DestinationUnreachable {
                    path: root.clone(),
                    source,
                })?;
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                if self.config.dry_run {
                    info!(path = %root.display(), "destination would be created");
                } else {
                    fs::create_dir_all(root).map_err(|source| {
                        ExecuteError::DestinationUnreachable {
                            path: root.clone(),
                            source,
                        }
                    })?;
                    info!(path = %root.display(), "destination created");
                }
            }
            Err(source) => {
                return Err(ExecuteError::DestinationUnreachable {
                    path: root.clone(),
                    source,
                });
            }
        }

        let deletes = table.with_action(Action::Delete).count();
        if deletes == 0 {
            return Ok(());
        }

        let Some(backup_root) = &self.config.backup_root else {
            return Err(ExecuteError::BackupRootRequired { count: deletes });
        };
        if lies_under(backup_root, root) {
            return Err(ExecuteError::BackupRootInvalid {
                path: backup_root.clone(),
                message: format!("inside the destination root {}", root.display()),
            });
        }
        match fs::metadata(backup_root) {
            Ok(meta) if !meta.is_dir() => Err(ExecuteError::BackupRootInvalid {
                path: backup_root.clone(),
                message: "not a directory".to_string(),
            }),
            Ok(_) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                if let Some(parent) = backup_root.parent().filter(|p| !p.as_os_str().is_empty()) {
                    if parent.exists() && !parent.is_dir() {
                        return Err(ExecuteError::BackupRootInvalid {
                            path: backup_root.clone(),
                            message: format!("{} is not a directory", parent.display()),
                        });
                    }
                }
                Ok(())
            }
            Err(e) => Err(ExecuteError::BackupRootInvalid {
                path: backup_root.clone(),
                message: e.to_string(),
            }),
        }
    }

    /// Reason to stop when the destination root disappears mid-run.
    fn destination_lost(&self) -> Option<String> {
        let root = &self.config.destination_root;
        if self.config.dry_run || root.is_dir() {
            return None;
        }
        Some(format!("destination {} is no longer reachable", root.display()))
    }

    fn copy_row(&self, row: &ActionRow, resolver: &SourceResolver) -> RowReport {
        let dry_run = self.config.dry_run;
        let mut report = RowReport::new(row.identity(), row.action, dry_run);
        let destination = self.config.destination_for(&row.relative_path);
        report.destination = Some(destination.clone());

        let source = match resolver.resolve(row) {
            Ok(resolution) => resolution.path,
            Err(failure) => return report.finish(RowOutcome::Failed(failure)),
        };
        report.source = Some(source.clone());

        if row.kind == EntryKind::Directory {
            if !dry_run {
                if let Err(e) = fs::create_dir_all(&destination) {
                    return report.finish(RowOutcome::Failed(ItemFailure::destination_unwritable(
                        &destination,
                        e,
                    )));
                }
            }
            return report.finish(RowOutcome::Copied);
        }

        let size = match fs::File::open(&source).and_then(|f| f.metadata()) {
            Ok(meta) => meta.len(),
            Err(e) => {
                return report.finish(RowOutcome::Failed(ItemFailure::source_unreadable(
                    &source, e,
                )));
            }
        };
        if destination.is_dir() {
            return report.finish(RowOutcome::Failed(ItemFailure::destination_unwritable(
                &destination,
                "a directory is in the way",
            )));
        }

        if same_entry(&source, &destination) {
            return report.finish(RowOutcome::Skipped(
                "source and destination are the same file".to_string(),
            ));
        }

        if !dry_run {
            if let Err(e) = copy_file(&source, &destination) {
                return report.finish(RowOutcome::Failed(ItemFailure::destination_unwritable(
                    &destination,
                    e,
                )));
            }
        }
        report.bytes = size;
        report.finish(RowOutcome::Copied)
    }

    fn delete_row(&self, row: &ActionRow) -> RowReport {
        let dry_run = self.config.dry_run;
        let mut report = RowReport::new(row.identity(), row.action, dry_run);

        let target = self.delete_target(row);
        report.source = Some(target.clone());

        let is_dir = match fs::symlink_metadata(&target) {
            Ok(meta) => meta.is_dir(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return report.finish(RowOutcome::Skipped("target does not exist".to_string()));
            }
            Err(e) => {
                return report.finish(RowOutcome::Failed(ItemFailure::target_unreadable(
                    &target, e,
                )));
            }
        };
        if is_dir != (row.kind == EntryKind::Directory) {
            return report.finish(RowOutcome::Failed(ItemFailure::target_unreadable(
                &target,
                format!("expected a {}", row.kind.to_string().to_lowercase()),
            )));
        }

        // Checked in preflight whenever a Delete row exists.
        let Some(backup) = self.config.backup_for(&row.relative_path) else {
            return report.finish(RowOutcome::Failed(ItemFailure::backup_failed(
                &target,
                "no backup directory configured",
            )));
        };
        report.destination = Some(backup.clone());

        if dry_run {
            return report.finish(RowOutcome::Deleted);
        }

        if let Err(failure) = self.back_up(&target, &backup) {
            return report.finish(RowOutcome::Failed(failure));
        }
        if let Err(e) = remove_any(&target, is_dir) {
            return report.finish(RowOutcome::Failed(ItemFailure::destination_unwritable(
                &target, e,
            )));
        }
        report.finish(RowOutcome::Deleted)
    }

    /// The entry a Delete row removes: the stored target path when it lies under
    /// the destination root, otherwise the row's path under the destination root.
    fn delete_target(&self, row: &ActionRow) -> PathBuf {
        let destination = self.config.destination_for(&row.relative_path);
        match row.target() {
            Some(stored) if lies_under(&stored, &self.config.destination_root) => stored,
            Some(stored) => {
                debug!(
                    stored = %stored.display(),
                    destination = %destination.display(),
                    "stored target is outside the destination root"
                );
                destination
            }
            None => destination,
        }
    }

    /// Copy `target` to `backup` and confirm the copy before anything is removed.
    fn back_up(&self, target: &Path, backup: &Path) -> Result<(), ItemFailure> {
        copy_any(target, backup).map_err(|e| ItemFailure::backup_failed(target, e))?;
        if self.config.verify_backups {
            verify_copy(target, backup).map_err(|e| ItemFailure::backup_failed(target, e))?;
        }
        debug!(target = %target.display(), backup = %backup.display(), "backup verified");
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Copy,
    Delete,
}

fn is_scheduled(row: &ActionRow) -> bool {
    matches!(row.action, Action::Copy | Action::Delete)
}

/// Copy directories shallow first, then files; delete files, then
/// directories deepest first.
fn execution_order(table: &ActionTable) -> Vec<(Step, &ActionRow)> {
    let mut copy_dirs: Vec<&ActionRow> = Vec::new();
    let mut copy_files = Vec::new();
    let mut delete_files = Vec::new();
    let mut delete_dirs: Vec<&ActionRow> = Vec::new();

    for row in table.iter() {
        match (row.action, row.kind) {
            (Action::Copy, EntryKind::Directory) => copy_dirs.push(row),
            (Action::Copy, EntryKind::File) => copy_files.push(row),
            (Action::Delete, EntryKind::File) => delete_files.push(row),
            (Action::Delete, EntryKind::Directory) => delete_dirs.push(row),
            _ => {}
        }
    }

    copy_dirs.sort_by_key(|row| segment_count(&row.relative_path));
    delete_dirs.sort_by_key(|row| std::cmp::Reverse(segment_count(&row.relative_path)));

    let copies = copy_dirs.into_iter().chain(copy_files).map(|row| (Step::Copy, row));
    let deletes = delete_files
        .into_iter()
        .chain(delete_dirs)
        .map(|row| (Step::Delete, row));
    copies.chain(deletes).collect()
}

fn log_report(report: &RowReport) {
    match &report.outcome {
        RowOutcome::Failed(_) => error!("{report}"),
        RowOutcome::Skipped(_) => warn!("{report}"),
        RowOutcome::Copied | RowOutcome::Deleted => info!("{report}"),
    }
}
