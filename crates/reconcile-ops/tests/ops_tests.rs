use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use reconcile_core::{Action, DiffStatus, EntryKind};
use reconcile_ops::{
    ActionExecutor, ExecuteConfig, ExecuteError, ExecuteEvent, ItemFailure, RowOutcome,
    start_execute,
};
use reconcile_plan::{ActionRow, ActionTable};
use tempfile::TempDir;

fn row(action: Action, kind: EntryKind, status: DiffStatus, relative_path: &str) -> ActionRow {
    ActionRow {
        action,
        kind,
        status,
        relative_path: relative_path.to_string(),
        name: relative_path.rsplit('/').next().unwrap_or_default().to_string(),
        extension: String::new(),
        source_path: String::new(),
        target_path: String::new(),
        source_size: String::new(),
        target_size: String::new(),
        size_difference: String::new(),
        source_modified: String::new(),
        target_modified: String::new(),
        recommendation: String::new(),
        notes: String::new(),
    }
}

fn copy_file_row(relative_path: &str, source: Option<PathBuf>) -> ActionRow {
    let mut r = row(Action::Copy, EntryKind::File, DiffStatus::OnlyInSource, relative_path);
    if let Some(source) = source {
        r.source_path = source.to_string_lossy().into_owned();
    }
    r
}

fn delete_row(kind: EntryKind, relative_path: &str, target: &Path) -> ActionRow {
    let mut r = row(Action::Delete, kind, DiffStatus::OnlyInTarget, relative_path);
    r.target_path = target.to_string_lossy().into_owned();
    r
}

fn write(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

/// Every path under `root` with file contents, for before/after comparison.
fn snapshot(root: &Path) -> BTreeMap<PathBuf, Option<Vec<u8>>> {
    let mut out = BTreeMap::new();
    if !root.exists() {
        return out;
    }
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                out.insert(path.clone(), None);
                stack.push(path);
            } else {
                out.insert(path.clone(), Some(fs::read(&path).unwrap()));
            }
        }
    }
    out
}

struct Fixture {
    _temp: TempDir,
    source: PathBuf,
    target: PathBuf,
    backup: PathBuf,
}

fn fixture() -> Fixture {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("source");
    let target = temp.path().join("target");
    let backup = temp.path().join("backup");

    write(&source.join("docs/a.txt"), "alpha");
    write(&source.join("img/b.png"), "png-bytes");
    write(&target.join("stale.log"), "old log");
    write(&target.join("old/keep.txt"), "kept");
    write(&target.join("old/deep/gone.txt"), "gone");

    Fixture {
        source,
        target,
        backup,
        _temp: temp,
    }
}

#[test]
fn test_copy_rows() {
    let fx = fixture();
    let table = ActionTable::new(vec![copy_file_row(
        "docs/a.txt",
        Some(fx.source.join("docs/a.txt")),
    )]);

    let summary = ActionExecutor::new(ExecuteConfig::new(&fx.target))
        .execute(&table)
        .unwrap();

    assert_eq!(summary.copied, 1);
    assert_eq!(summary.bytes_copied, 5);
    assert!(summary.is_success());
    assert_eq!(fs::read_to_string(fx.target.join("docs/a.txt")).unwrap(), "alpha");
}

#[test]
fn test_copy_overwrites_existing_destination() {
    let fx = fixture();
    write(&fx.target.join("docs/a.txt"), "outdated and longer");
    let mut r = copy_file_row("docs/a.txt", Some(fx.source.join("docs/a.txt")));
    r.status = DiffStatus::SizeDifference;

    ActionExecutor::new(ExecuteConfig::new(&fx.target))
        .execute(&ActionTable::new(vec![r]))
        .unwrap();

    assert_eq!(fs::read_to_string(fx.target.join("docs/a.txt")).unwrap(), "alpha");
}

#[test]
fn test_missing_source_path_is_reconstructed() {
    let fx = fixture();
    let table = ActionTable::new(vec![
        copy_file_row("docs/a.txt", Some(fx.source.join("docs/a.txt"))),
        copy_file_row("img/b.png", None),
    ]);

    let mut reports = Vec::new();
    let summary = ActionExecutor::new(ExecuteConfig::new(&fx.target))
        .execute_with(&table, |event| {
            if let ExecuteEvent::Row(report) = event {
                reports.push(report);
            }
        })
        .unwrap();

    assert_eq!(summary.copied, 2);
    assert_eq!(summary.failed, 0);
    assert_eq!(fs::read_to_string(fx.target.join("img/b.png")).unwrap(), "png-bytes");

    let rebuilt = reports
        .iter()
        .find(|r| r.identity.relative_path == "img/b.png")
        .unwrap();
    assert_eq!(rebuilt.outcome, RowOutcome::Copied);
    assert_eq!(rebuilt.source.as_deref(), Some(fx.source.join("img/b.png").as_path()));
}

#[test]
fn test_moved_source_is_found_by_search() {
    let fx = fixture();
    write(&fx.source.join("archive/2021/notes/c.txt"), "moved");
    let stale = fx.source.join("notes/c.txt");

    let table = ActionTable::new(vec![
        copy_file_row("docs/a.txt", Some(fx.source.join("docs/a.txt"))),
        copy_file_row("notes/c.txt", Some(stale)),
    ]);

    let summary = ActionExecutor::new(ExecuteConfig::new(&fx.target))
        .execute(&table)
        .unwrap();

    assert_eq!(summary.copied, 2);
    assert_eq!(fs::read_to_string(fx.target.join("notes/c.txt")).unwrap(), "moved");
}

#[test]
fn test_unresolvable_row_fails_alone() {
    let fx = fixture();
    let table = ActionTable::new(vec![
        copy_file_row("missing/nowhere.bin", None),
        copy_file_row("docs/a.txt", Some(fx.source.join("docs/a.txt"))),
    ]);

    let mut failures = Vec::new();
    let summary = ActionExecutor::new(ExecuteConfig::new(&fx.target))
        .execute_with(&table, |event| {
            if let ExecuteEvent::Row(report) = event {
                if let RowOutcome::Failed(failure) = report.outcome {
                    failures.push(failure);
                }
            }
        })
        .unwrap();

    assert_eq!(summary.total, 2);
    assert_eq!(summary.copied, 1);
    assert_eq!(summary.failed, 1);
    assert!(!summary.is_success());
    assert_eq!(
        failures,
        vec![ItemFailure::IdentityAmbiguous {
            relative_path: "missing/nowhere.bin".to_string()
        }]
    );
}

#[test]
fn test_delete_backs_up_first() {
    let fx = fixture();
    let table = ActionTable::new(vec![
        delete_row(EntryKind::File, "stale.log", &fx.target.join("stale.log")),
        delete_row(EntryKind::Directory, "old/deep", &fx.target.join("old/deep")),
    ]);

    let config = ExecuteConfig::builder()
        .destination_root(&fx.target)
        .backup_root(&fx.backup)
        .build()
        .unwrap();
    let summary = ActionExecutor::new(config).execute(&table).unwrap();

    assert_eq!(summary.deleted, 2);
    assert!(!fx.target.join("stale.log").exists());
    assert!(!fx.target.join("old/deep").exists());
    assert!(fx.target.join("old/keep.txt").exists());

    assert_eq!(fs::read_to_string(fx.backup.join("stale.log")).unwrap(), "old log");
    assert_eq!(fs::read_to_string(fx.backup.join("old/deep/gone.txt")).unwrap(), "gone");
}

#[test]
fn test_delete_of_missing_target_is_skipped() {
    let fx = fixture();
    let table = ActionTable::new(vec![delete_row(
        EntryKind::File,
        "never.txt",
        &fx.target.join("never.txt"),
    )]);
    let config = ExecuteConfig::builder()
        .destination_root(&fx.target)
        .backup_root(&fx.backup)
        .build()
        .unwrap();

    let summary = ActionExecutor::new(config).execute(&table).unwrap();
    assert_eq!(summary.skipped, 1);
    assert!(!fx.backup.exists());
}

#[test]
fn test_delete_without_backup_root_is_refused() {
    let fx = fixture();
    let table = ActionTable::new(vec![
        copy_file_row("docs/a.txt", Some(fx.source.join("docs/a.txt"))),
        delete_row(EntryKind::File, "stale.log", &fx.target.join("stale.log")),
    ]);

    let err = ActionExecutor::new(ExecuteConfig::new(&fx.target))
        .execute(&table)
        .unwrap_err();

    assert!(matches!(err, ExecuteError::BackupRootRequired { count: 1 }));
    assert!(fx.target.join("stale.log").exists());
    assert!(!fx.target.join("docs/a.txt").exists());
}

#[test]
fn test_destination_that_is_a_file_is_fatal() {
    let fx = fixture();
    let not_a_dir = fx.target.join("stale.log");
    let table = ActionTable::new(vec![copy_file_row(
        "docs/a.txt",
        Some(fx.source.join("docs/a.txt")),
    )]);

    let err = ActionExecutor::new(ExecuteConfig::new(&not_a_dir))
        .execute(&table)
        .unwrap_err();
    assert!(matches!(err, ExecuteError::DestinationNotDirectory { .. }));
}

#[test]
fn test_dry_run_changes_nothing() {
    let fx = fixture();
    let table = ActionTable::new(vec![
        row(Action::Copy, EntryKind::Directory, DiffStatus::OnlyInSource, "docs"),
        copy_file_row("docs/a.txt", Some(fx.source.join("docs/a.txt"))),
        copy_file_row("img/b.png", None),
        copy_file_row("missing.bin", None),
        delete_row(EntryKind::File, "stale.log", &fx.target.join("stale.log")),
        delete_row(EntryKind::Directory, "old", &fx.target.join("old")),
        row(Action::Ignore, EntryKind::File, DiffStatus::TimeDifference, "x.txt"),
    ]);

    let parent = fx.target.parent().unwrap().to_path_buf();
    let before = snapshot(&parent);

    let config = ExecuteConfig::builder()
        .destination_root(&fx.target)
        .backup_root(&fx.backup)
        .dry_run(true)
        .build()
        .unwrap();
    let summary = ActionExecutor::new(config).execute(&table).unwrap();

    assert_eq!(snapshot(&parent), before);
    assert!(summary.dry_run);
    assert_eq!(summary.total, 7);
    assert_eq!(summary.copied, 3);
    assert_eq!(summary.deleted, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.bytes_copied, 14);
}

#[test]
fn test_dry_run_does_not_create_destination() {
    let fx = fixture();
    let fresh_destination = fx.target.join("renamed-root");
    let table = ActionTable::new(vec![copy_file_row(
        "docs/a.txt",
        Some(fx.source.join("docs/a.txt")),
    )]);

    let config = ExecuteConfig::builder()
        .destination_root(&fresh_destination)
        .dry_run(true)
        .build()
        .unwrap();
    let summary = ActionExecutor::new(config).execute(&table).unwrap();

    assert_eq!(summary.copied, 1);
    assert!(!fresh_destination.exists());
}

#[test]
fn test_copy_onto_itself_is_skipped() {
    let fx = fixture();
    let table = ActionTable::new(vec![copy_file_row(
        "docs/a.txt",
        Some(fx.source.join("docs/a.txt")),
    )]);

    for dry_run in [true, false] {
        let config = ExecuteConfig::builder()
            .destination_root(&fx.source)
            .dry_run(dry_run)
            .build()
            .unwrap();

        let mut outcomes = Vec::new();
        let summary = ActionExecutor::new(config)
            .execute_with(&table, |event| {
                if let ExecuteEvent::Row(report) = event {
                    outcomes.push(report.outcome);
                }
            })
            .unwrap();

        assert_eq!(summary.copied, 0);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.bytes_copied, 0);
        assert_eq!(
            outcomes,
            vec![RowOutcome::Skipped(
                "source and destination are the same file".to_string()
            )]
        );
    }
    assert_eq!(fs::read_to_string(fx.source.join("docs/a.txt")).unwrap(), "alpha");
}

#[test]
fn test_delete_targets_destination_root() {
    let temp = TempDir::new().unwrap();
    let old_target = temp.path().join("old_target");
    let new_dest = temp.path().join("new_dest");
    let backup = temp.path().join("backup");
    write(&old_target.join("x.txt"), "compared copy");
    write(&new_dest.join("x.txt"), "live copy");

    let table = ActionTable::new(vec![delete_row(
        EntryKind::File,
        "x.txt",
        &old_target.join("x.txt"),
    )]);
    let config = ExecuteConfig::builder()
        .destination_root(&new_dest)
        .backup_root(&backup)
        .build()
        .unwrap();

    let summary = ActionExecutor::new(config).execute(&table).unwrap();

    assert_eq!(summary.deleted, 1);
    assert!(old_target.join("x.txt").exists());
    assert!(!new_dest.join("x.txt").exists());
    assert_eq!(fs::read_to_string(backup.join("x.txt")).unwrap(), "live copy");
}

#[test]
fn test_failed_backup_keeps_target() {
    let fx = fixture();
    // A directory where the backup file must go makes the copy fail.
    fs::create_dir_all(fx.backup.join("stale.log")).unwrap();

    let table = ActionTable::new(vec![delete_row(
        EntryKind::File,
        "stale.log",
        &fx.target.join("stale.log"),
    )]);
    let config = ExecuteConfig::builder()
        .destination_root(&fx.target)
        .backup_root(&fx.backup)
        .build()
        .unwrap();

    let mut outcomes = Vec::new();
    let summary = ActionExecutor::new(config)
        .execute_with(&table, |event| {
            if let ExecuteEvent::Row(report) = event {
                outcomes.push(report.outcome);
            }
        })
        .unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.deleted, 0);
    assert!(matches!(
        outcomes.as_slice(),
        [RowOutcome::Failed(ItemFailure::BackupFailed { .. })]
    ));
    assert_eq!(fs::read_to_string(fx.target.join("stale.log")).unwrap(), "old log");
}

#[test]
fn test_backup_root_inside_destination_is_refused() {
    let fx = fixture();
    let table = ActionTable::new(vec![delete_row(
        EntryKind::File,
        "stale.log",
        &fx.target.join("stale.log"),
    )]);
    let config = ExecuteConfig::builder()
        .destination_root(&fx.target)
        .backup_root(fx.target.join("backups"))
        .build()
        .unwrap();

    let err = ActionExecutor::new(config).execute(&table).unwrap_err();

    assert!(matches!(err, ExecuteError::BackupRootInvalid { .. }));
    assert!(fx.target.join("stale.log").exists());
    assert!(!fx.target.join("backups").exists());
}

#[test]
fn test_lost_destination_aborts_remaining_rows() {
    let fx = fixture();
    let table = ActionTable::new(vec![
        copy_file_row("docs/a.txt", Some(fx.source.join("docs/a.txt"))),
        copy_file_row("img/b.png", Some(fx.source.join("img/b.png"))),
    ]);

    let mut outcomes = Vec::new();
    let summary = ActionExecutor::new(ExecuteConfig::new(&fx.target))
        .execute_with(&table, |event| {
            if let ExecuteEvent::Row(report) = event {
                if outcomes.is_empty() {
                    fs::remove_dir_all(&fx.target).unwrap();
                }
                outcomes.push(report.outcome);
            }
        })
        .unwrap();

    assert_eq!(summary.copied, 1);
    assert_eq!(summary.skipped, 1);
    assert!(summary.aborted.is_some());
    assert!(!summary.is_success());
    assert_eq!(
        outcomes,
        vec![
            RowOutcome::Copied,
            RowOutcome::Skipped("run aborted".to_string())
        ]
    );
    assert!(!fx.target.exists());
}

#[test]
fn test_strip_prefix_rewrites_destination() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("old-pc");
    let dest = temp.path().join("new-pc");
    write(&source.join("Users/ann/Documents/cv.pdf"), "pdf");

    let table = ActionTable::new(vec![copy_file_row(
        "Users/ann/Documents/cv.pdf",
        Some(source.join("Users/ann/Documents/cv.pdf")),
    )]);
    let config = ExecuteConfig::builder()
        .destination_root(&dest)
        .strip_prefix("users/ANN")
        .build()
        .unwrap();

    ActionExecutor::new(config).execute(&table).unwrap();
    assert_eq!(fs::read_to_string(dest.join("Documents/cv.pdf")).unwrap(), "pdf");
}

#[test]
fn test_unset_and_ignore_rows_are_untouched() {
    let fx = fixture();
    let mut ignored = delete_row(EntryKind::File, "stale.log", &fx.target.join("stale.log"));
    ignored.action = Action::Ignore;
    let unset = copy_file_row("docs/a.txt", Some(fx.source.join("docs/a.txt")));
    let unset = ActionRow {
        action: Action::Unset,
        ..unset
    };

    let summary = ActionExecutor::new(ExecuteConfig::new(&fx.target))
        .execute(&ActionTable::new(vec![ignored, unset]))
        .unwrap();

    assert_eq!(summary.skipped, 2);
    assert!(fx.target.join("stale.log").exists());
    assert!(!fx.target.join("docs/a.txt").exists());
}

#[tokio::test]
async fn test_start_execute_streams_events() {
    let fx = fixture();
    let table = ActionTable::new(vec![
        copy_file_row("docs/a.txt", Some(fx.source.join("docs/a.txt"))),
        copy_file_row("img/b.png", Some(fx.source.join("img/b.png"))),
        row(Action::Ignore, EntryKind::File, DiffStatus::OnlyInTarget, "x"),
    ]);

    let mut rx = start_execute(table, ExecuteConfig::new(&fx.target));
    let mut rows = 0;
    let mut progress = 0;
    let mut summary = None;

    while let Some(event) = rx.recv().await {
        match event {
            ExecuteEvent::Progress(_) => progress += 1,
            ExecuteEvent::Row(_) => rows += 1,
            ExecuteEvent::Complete(result) => summary = Some(result.unwrap()),
        }
    }

    let summary = summary.unwrap();
    assert_eq!(rows, 3);
    assert_eq!(progress, 2);
    assert_eq!(summary.copied, 2);
    assert_eq!(summary.skipped, 1);
    assert!(fx.target.join("img/b.png").exists());
}
