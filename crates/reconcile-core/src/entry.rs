//! File and directory entry types.

use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Separator used in every `relative_path`, regardless of platform.
pub const PATH_SEPARATOR: char = '/';

/// Type of file system entry.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum EntryKind {
    /// Regular file.
    File,
    /// Directory.
    Directory,
}

impl EntryKind {
    /// Check if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, EntryKind::Directory)
    }

    /// Check if this is a regular file.
    pub fn is_file(&self) -> bool {
        matches!(self, EntryKind::File)
    }
}

/// A single file or directory observed during a scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Entry {
    /// File or directory.
    pub kind: EntryKind,

    /// Path relative to the scan root, `/`-separated. Unique within one inventory.
    pub relative_path: String,

    /// Entry name (last path segment).
    pub name: CompactString,

    /// File extension without the dot (files only).
    pub extension: Option<CompactString>,

    /// Size in bytes (0 for directories).
    pub size_bytes: u64,

    /// Last modification time.
    pub modified_at: SystemTime,

    /// Creation time (if available, platform-dependent).
    pub created_at: Option<SystemTime>,

    /// Absolute path for later I/O.
    pub absolute_path: PathBuf,
}

impl Entry {
    /// Create a new file entry.
    pub fn file(
        relative_path: impl Into<String>,
        size_bytes: u64,
        modified_at: SystemTime,
        absolute_path: impl Into<PathBuf>,
    ) -> Self {
        let relative_path = relative_path.into();
        let name = CompactString::new(last_segment(&relative_path));
        let extension = Path::new(name.as_str())
            .extension()
            .map(|e| CompactString::new(e.to_string_lossy()));

        Self {
            kind: EntryKind::File,
            relative_path,
            name,
            extension,
            size_bytes,
            modified_at,
            created_at: None,
            absolute_path: absolute_path.into(),
        }
    }

    /// Create a new directory entry.
    pub fn directory(
        relative_path: impl Into<String>,
        modified_at: SystemTime,
        absolute_path: impl Into<PathBuf>,
    ) -> Self {
        let relative_path = relative_path.into();
        let name = CompactString::new(last_segment(&relative_path));

        Self {
            kind: EntryKind::Directory,
            relative_path,
            name,
            extension: None,
            size_bytes: 0,
            modified_at,
            created_at: None,
            absolute_path: absolute_path.into(),
        }
    }

    /// Attach a creation timestamp.
    pub fn with_created(mut self, created_at: Option<SystemTime>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Check if this entry is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }

    /// Check if this entry is a file.
    pub fn is_file(&self) -> bool {
        self.kind.is_file()
    }

    /// Number of path segments relative to the scan root.
    pub fn depth(&self) -> usize {
        segment_count(&self.relative_path)
    }
}

fn last_segment(relative_path: &str) -> &str {
    relative_path
        .rsplit(PATH_SEPARATOR)
        .next()
        .unwrap_or(relative_path)
}

/// Count the segments of a `/`-separated relative path.
pub fn segment_count(relative_path: &str) -> usize {
    relative_path
        .split(PATH_SEPARATOR)
        .filter(|s| !s.is_empty())
        .count()
}

/// Build the canonical relative key of `path` under `root`.
///
/// Returns `None` for the root itself or for paths outside `root`.
pub fn relative_key(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let key = normalize_relative(relative);
    if key.is_empty() { None } else { Some(key) }
}

/// Render a relative path with the canonical separator.
///
/// Accepts either separator on input, so table values written on Windows
/// (`docs\a.txt`) resolve the same as `docs/a.txt`.
pub fn normalize_relative(path: &Path) -> String {
    let mut key = String::new();
    for component in path.components() {
        if let Component::Normal(segment) = component {
            for part in segment
                .to_string_lossy()
                .split(['\\', PATH_SEPARATOR])
                .filter(|p| !p.is_empty())
            {
                if !key.is_empty() {
                    key.push(PATH_SEPARATOR);
                }
                key.push_str(part);
            }
        }
    }
    key
}

/// Convert a canonical relative path into a native path fragment.
pub fn relative_to_path(relative_path: &str) -> PathBuf {
    relative_path
        .split(['\\', PATH_SEPARATOR])
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .collect()
}
