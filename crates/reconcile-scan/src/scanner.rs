//! JWalk-based directory scanner producing a flat inventory.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, UNIX_EPOCH};

use jwalk::{Parallelism, WalkDir};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use reconcile_core::{
    Entry, Inventory, InventoryLabel, ScanConfig, ScanError, ScanWarning, WarningKind,
    relative_key,
};

use crate::progress::ScanProgress;

/// How many entries between progress broadcasts.
const PROGRESS_INTERVAL: u64 = 1000;

/// Scanner that walks a root directory with jwalk.
pub struct TreeScanner {
    progress_tx: broadcast::Sender<ScanProgress>,
}

impl TreeScanner {
    /// Create a new scanner.
    pub fn new() -> Self {
        let (progress_tx, _) = broadcast::channel(100);
        Self { progress_tx }
    }

    /// Subscribe to scan progress updates.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanProgress> {
        self.progress_tx.subscribe()
    }

    /// Scan the configured root into an inventory.
    ///
    /// Only a missing or non-directory root is fatal; unreadable entries
    /// below it become warnings and the walk continues.
    pub fn scan(&self, config: &ScanConfig, label: InventoryLabel) -> Result<Inventory, ScanError> {
        let start = Instant::now();
        let root_path = config
            .root
            .canonicalize()
            .map_err(|e| ScanError::io(&config.root, e))?;

        if !root_path.is_dir() {
            return Err(ScanError::NotADirectory { path: root_path });
        }

        let excluded = config
            .exclusion_matcher()
            .map_err(|e| ScanError::InvalidConfig {
                message: e.to_string(),
            })?;

        info!(root = %root_path.display(), %label, "scanning");

        let parallelism = match config.threads {
            0 => Parallelism::RayonDefaultPool {
                busy_timeout: Duration::from_millis(100),
            },
            1 => Parallelism::Serial,
            n => Parallelism::RayonNewPool(n),
        };

        let mut walker = WalkDir::new(&root_path)
            .parallelism(parallelism)
            .skip_hidden(!config.include_hidden)
            .follow_links(config.follow_symlinks)
            .sort(true)
            .min_depth(1);

        if let Some(limit) = config.depth_limit() {
            walker = walker.max_depth(limit);
        }

        if config.exclude_subtrees {
            let pruned = excluded.clone();
            walker = walker.process_read_dir(move |_depth, _path, _state, children| {
                for child in children.iter_mut().flatten() {
                    if child.file_type.is_dir() && pruned.is_match(&child.file_name) {
                        child.read_children_path = None;
                    }
                }
            });
        }

        let mut inventory = Inventory::new(label, &root_path);
        let mut seen: u64 = 0;
        // jwalk may surface a failed `read_dir` both as an error item and on
        // the parent entry; report it once.
        let mut warned: HashSet<(PathBuf, WarningKind)> = HashSet::new();

        for entry_result in walker {
            let entry = match entry_result {
                Ok(e) => e,
                Err(err) => {
                    let path = err.path().map(Path::to_path_buf).unwrap_or_default();
                    let warning = match err.io_error() {
                        Some(io) => ScanWarning::from_io(path, io, WarningKind::ReadError),
                        None => ScanWarning::new(path, err.to_string(), WarningKind::ReadError),
                    };
                    if warned.insert((warning.path.clone(), warning.kind)) {
                        warn!(path = %warning.path.display(), "{}", warning.message);
                        inventory.warn(warning);
                    }
                    continue;
                }
            };

            let path = entry.path();

            if let Some(err) = &entry.read_children_error {
                let warning = match err.io_error() {
                    Some(io) => ScanWarning::from_io(&path, io, WarningKind::ReadError),
                    None => ScanWarning::new(&path, err.to_string(), WarningKind::ReadError),
                };
                if warned.insert((warning.path.clone(), warning.kind)) {
                    warn!(path = %path.display(), "subtree skipped: {}", warning.message);
                    inventory.warn(warning);
                }
            }

            // Each entry is matched on its own name; see `ScanConfig::exclude_subtrees`.
            if excluded.is_match(entry.file_name()) {
                debug!(path = %path.display(), "excluded");
                continue;
            }

            let Some(relative_path) = relative_key(&root_path, &path) else {
                continue;
            };

            let file_type = entry.file_type();
            if file_type.is_symlink() {
                if !path.exists() {
                    let warning = ScanWarning::broken_symlink(&path);
                    warn!(path = %path.display(), "broken symlink");
                    inventory.warn(warning);
                }
                continue;
            }

            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(err) => {
                    let warning = match err.io_error() {
                        Some(io) => ScanWarning::from_io(&path, io, WarningKind::MetadataError),
                        None => ScanWarning::new(&path, err.to_string(), WarningKind::MetadataError),
                    };
                    warn!(path = %path.display(), "metadata unreadable: {}", warning.message);
                    inventory.warn(warning);
                    continue;
                }
            };

            let modified = metadata.modified().unwrap_or(UNIX_EPOCH);
            let created = metadata.created().ok();

            if metadata.is_dir() {
                inventory.push(Entry::directory(relative_path, modified, &path).with_created(created));
            } else if metadata.is_file() {
                inventory.push(
                    Entry::file(relative_path, metadata.len(), modified, &path).with_created(created),
                );
            } else {
                continue;
            }

            seen += 1;
            if seen % PROGRESS_INTERVAL == 0 {
                let _ = self.progress_tx.send(ScanProgress {
                    files_scanned: inventory.file_count,
                    dirs_scanned: inventory.dir_count,
                    bytes_scanned: inventory.total_size,
                    current_path: path.clone(),
                    errors_count: inventory.warnings.len() as u64,
                    elapsed: start.elapsed(),
                });
            }
        }

        inventory.scan_duration = start.elapsed();

        info!(
            files = inventory.file_count,
            dirs = inventory.dir_count,
            bytes = inventory.total_size,
            warnings = inventory.warnings.len(),
            "scan complete in {:.2}s",
            inventory.scan_duration.as_secs_f64()
        );

        Ok(inventory)
    }
}

impl Default for TreeScanner {
    fn default() -> Self {
        Self::new()
    }
}
