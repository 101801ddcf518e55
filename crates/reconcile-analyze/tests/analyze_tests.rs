use std::fs;
use std::time::{Duration, SystemTime};

use filetime::FileTime;
use reconcile_analyze::{
    DiffStatus, Difference, EntryKind, Inventory, RECOMMEND_COPY, RECOMMEND_REVIEW_DELETE,
    RECOMMEND_SOURCE_OLDER, RECOMMEND_UPDATE, StructureAnalyzer, StructureConfig, TreeDiffer,
};
use reconcile_core::{Entry, InventoryLabel, ScanConfig};
use reconcile_scan::TreeScanner;
use tempfile::TempDir;

fn at(secs: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000 + secs)
}

fn file(root: &str, path: &str, size: u64, modified: SystemTime) -> Entry {
    Entry::file(path, size, modified, format!("{root}/{path}"))
}

fn dir(root: &str, path: &str) -> Entry {
    Entry::directory(path, at(0), format!("{root}/{path}"))
}

fn source(entries: Vec<Entry>) -> Inventory {
    Inventory::from_entries(InventoryLabel::Source, "/src", entries)
}

fn target(entries: Vec<Entry>) -> Inventory {
    Inventory::from_entries(InventoryLabel::Target, "/dst", entries)
}

fn find<'a>(diffs: &'a [Difference], path: &str) -> Option<&'a Difference> {
    diffs.iter().find(|d| d.relative_path == path)
}

#[test]
fn test_file_only_in_source() {
    let src = source(vec![dir("/src", "docs"), file("/src", "docs/a.txt", 10, at(0))]);
    let dst = target(vec![dir("/dst", "docs")]);

    let report = TreeDiffer::new().diff(&src, &dst);
    assert_eq!(report.count(), 1);

    let diff = &report.differences[0];
    assert_eq!(diff.kind, EntryKind::File);
    assert_eq!(diff.status, DiffStatus::OnlyInSource);
    assert_eq!(diff.relative_path, "docs/a.txt");
    assert_eq!(diff.recommendation, RECOMMEND_COPY);
    assert_eq!(diff.size_delta, -10);
    assert!(diff.target_entry.is_none());
}

#[test]
fn test_size_difference_newer_source() {
    let src = source(vec![file("/src", "img/x.png", 100, at(50))]);
    let dst = target(vec![file("/dst", "img/x.png", 200, at(0))]);

    let report = TreeDiffer::new().diff(&src, &dst);
    let diff = find(&report.differences, "img/x.png").unwrap();

    assert_eq!(diff.status, DiffStatus::SizeDifference);
    assert_eq!(diff.size_delta, 100);
    assert_eq!(diff.recommendation, RECOMMEND_UPDATE);
    assert_eq!(diff.source_size(), Some(100));
    assert_eq!(diff.target_size(), Some(200));
}

#[test]
fn test_time_within_tolerance_is_equal() {
    let src = source(vec![file("/src", "notes.txt", 5, at(0))]);
    let dst = target(vec![file("/dst", "notes.txt", 5, at(1))]);

    assert!(TreeDiffer::new().diff(&src, &dst).is_empty());
}

#[test]
fn test_time_difference_target_newer() {
    let src = source(vec![file("/src", "notes.txt", 5, at(0))]);
    let dst = target(vec![file("/dst", "notes.txt", 5, at(10))]);

    let report = TreeDiffer::new().diff(&src, &dst);
    assert_eq!(report.count(), 1);

    let diff = &report.differences[0];
    assert_eq!(diff.status, DiffStatus::TimeDifference);
    assert_eq!(diff.recommendation, RECOMMEND_SOURCE_OLDER);
    assert_eq!(diff.size_delta, 0);
}

#[test]
fn test_size_takes_precedence_over_time() {
    let src = source(vec![file("/src", "a.bin", 1, at(0))]);
    let dst = target(vec![file("/dst", "a.bin", 2, at(3600))]);

    let report = TreeDiffer::new().diff(&src, &dst);
    assert_eq!(report.count(), 1);
    assert_eq!(report.differences[0].status, DiffStatus::SizeDifference);
    assert_eq!(report.differences[0].recommendation, RECOMMEND_SOURCE_OLDER);
}

#[test]
fn test_directories_only_differ_by_presence() {
    let src = source(vec![dir("/src", "shared"), dir("/src", "old")]);
    let dst = target(vec![dir("/dst", "shared"), dir("/dst", "new")]);

    let report = TreeDiffer::new().diff(&src, &dst);
    assert_eq!(report.count(), 2);

    let old = find(&report.differences, "old").unwrap();
    assert_eq!(old.kind, EntryKind::Directory);
    assert_eq!(old.status, DiffStatus::OnlyInSource);
    assert_eq!(old.recommendation, RECOMMEND_COPY);

    let new = find(&report.differences, "new").unwrap();
    assert_eq!(new.status, DiffStatus::OnlyInTarget);
    assert_eq!(new.recommendation, RECOMMEND_REVIEW_DELETE);
    assert!(find(&report.differences, "shared").is_none());
}

#[test]
fn test_file_and_directory_with_same_path_are_distinct() {
    let src = source(vec![file("/src", "thing", 1, at(0))]);
    let dst = target(vec![dir("/dst", "thing")]);

    let report = TreeDiffer::new().diff(&src, &dst);
    assert_eq!(report.count(), 2);
    assert_eq!(report.count_of(EntryKind::File, DiffStatus::OnlyInSource), 1);
    assert_eq!(report.count_of(EntryKind::Directory, DiffStatus::OnlyInTarget), 1);
}

#[test]
fn test_every_identity_is_classified_once() {
    let src = source(vec![
        file("/src", "same", 1, at(0)),
        file("/src", "gone", 1, at(0)),
        file("/src", "grown", 1, at(0)),
        file("/src", "touched", 1, at(0)),
    ]);
    let dst = target(vec![
        file("/dst", "same", 1, at(0)),
        file("/dst", "extra", 1, at(0)),
        file("/dst", "grown", 9, at(0)),
        file("/dst", "touched", 1, at(100)),
    ]);

    let report = TreeDiffer::new().diff(&src, &dst);
    let mut identities: Vec<_> = report.differences.iter().map(Difference::identity).collect();
    identities.dedup();

    assert_eq!(identities.len(), report.count());
    assert_eq!(report.count(), 4);
    assert!(find(&report.differences, "same").is_none());
}

#[test]
fn test_empty_trees() {
    let report = TreeDiffer::new().diff(&source(vec![]), &target(vec![]));
    assert!(report.is_empty());

    let report = TreeDiffer::new().diff(
        &source(vec![]),
        &target(vec![dir("/dst", "a"), file("/dst", "a/b", 3, at(0))]),
    );
    assert_eq!(report.count(), 2);
    assert_eq!(report.by_status(DiffStatus::OnlyInTarget).count(), 2);
}

#[test]
fn test_differences_are_sorted() {
    let src = source(vec![
        file("/src", "z.txt", 1, at(0)),
        file("/src", "m.txt", 1, at(0)),
        dir("/src", "d"),
        file("/src", "a.txt", 1, at(0)),
    ]);
    let dst = target(vec![
        file("/dst", "b.txt", 1, at(0)),
        file("/dst", "m.txt", 2, at(0)),
        file("/dst", "a.txt", 1, at(100)),
    ]);

    let report = TreeDiffer::new().diff(&src, &dst);
    let order: Vec<(EntryKind, DiffStatus, &str)> = report
        .differences
        .iter()
        .map(|d| (d.kind, d.status, d.relative_path.as_str()))
        .collect();

    assert_eq!(
        order,
        vec![
            (EntryKind::File, DiffStatus::OnlyInSource, "z.txt"),
            (EntryKind::File, DiffStatus::OnlyInTarget, "b.txt"),
            (EntryKind::File, DiffStatus::SizeDifference, "m.txt"),
            (EntryKind::File, DiffStatus::TimeDifference, "a.txt"),
            (EntryKind::Directory, DiffStatus::OnlyInSource, "d"),
        ]
    );
}

#[test]
fn test_structure_report() {
    let src = source(vec![
        file("/src", "photos/2020/a.jpg", 5_000_000, at(0)),
        file("/src", "photos/2020/b.jpg", 2_000_000, at(0)),
        file("/src", "photos/2021/c.jpg", 10, at(0)),
        file("/src", "readme.txt", 3_000_000, at(0)),
        file("/src", "shared.txt", 1, at(0)),
    ]);
    let dst = target(vec![
        file("/dst", "shared.txt", 2, at(0)),
        file("/dst", "old/stale.txt", 1, at(0)),
    ]);

    let report = TreeDiffer::new().diff(&src, &dst);
    let config = StructureConfig::builder()
        .prefix_depth(2usize)
        .top_n(2usize)
        .min_missing_size(1_000_000u64)
        .build()
        .unwrap();
    let summary = StructureAnalyzer::with_config(config).analyze(&report);

    assert_eq!(summary.total, 6);
    assert_eq!(summary.count_of(EntryKind::File, DiffStatus::OnlyInSource), 4);
    assert_eq!(summary.count_of(EntryKind::File, DiffStatus::OnlyInTarget), 1);
    assert_eq!(summary.count_of(EntryKind::File, DiffStatus::SizeDifference), 1);
    assert_eq!(summary.count_of(EntryKind::Directory, DiffStatus::SizeDifference), 0);
    assert_eq!(summary.counts.len(), 6);
    assert_eq!(summary.missing_bytes, 10_000_010);

    assert_eq!(summary.top_prefixes[0].prefix, ".");
    assert_eq!(summary.top_prefixes[0].count, 2);
    assert_eq!(summary.top_prefixes[1].prefix, "photos/2020");
    assert_eq!(summary.top_prefixes.len(), 2);

    let largest: Vec<&str> = summary
        .largest_missing
        .iter()
        .map(|m| m.relative_path.as_str())
        .collect();
    assert_eq!(largest, vec!["photos/2020/a.jpg", "readme.txt"]);
}

#[test]
fn test_scan_then_diff() {
    let src_dir = TempDir::new().unwrap();
    let dst_dir = TempDir::new().unwrap();

    fs::create_dir_all(src_dir.path().join("docs")).unwrap();
    fs::create_dir_all(dst_dir.path().join("docs")).unwrap();
    fs::write(src_dir.path().join("docs/a.txt"), "alpha").unwrap();
    fs::write(src_dir.path().join("notes.txt"), "same").unwrap();
    fs::write(dst_dir.path().join("notes.txt"), "same").unwrap();
    fs::write(dst_dir.path().join("extra.txt"), "x").unwrap();

    let pinned = FileTime::from_unix_time(1_600_000_000, 0);
    filetime::set_file_mtime(src_dir.path().join("notes.txt"), pinned).unwrap();
    filetime::set_file_mtime(
        dst_dir.path().join("notes.txt"),
        FileTime::from_unix_time(1_600_000_001, 0),
    )
    .unwrap();

    let scanner = TreeScanner::new();
    let src = scanner
        .scan(&ScanConfig::new(src_dir.path()), InventoryLabel::Source)
        .unwrap();
    let dst = scanner
        .scan(&ScanConfig::new(dst_dir.path()), InventoryLabel::Target)
        .unwrap();

    let report = TreeDiffer::new().diff(&src, &dst);
    let paths: Vec<&str> = report
        .differences
        .iter()
        .map(|d| d.relative_path.as_str())
        .collect();

    assert_eq!(paths, vec!["docs/a.txt", "extra.txt"]);
}
