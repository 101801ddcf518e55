//! Persistent run profile loaded from TOML.
//!
//! Every field is optional; command-line flags override whatever the
//! profile provides.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default tolerance for modification-time comparison, in seconds.
pub const DEFAULT_TIME_TOLERANCE_SECS: u64 = 2;

/// Scan settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanSection {
    /// Glob patterns matched against entry names.
    pub exclude: Vec<String>,
    /// Maximum depth (0 = unlimited).
    pub max_depth: Option<u32>,
    /// Include dot-files.
    pub include_hidden: Option<bool>,
    /// Exclude whole subtrees under a matching directory.
    pub exclude_subtrees: Option<bool>,
}

/// Diff settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiffSection {
    /// Modification times closer than this are considered equal.
    pub time_tolerance_secs: u64,
}

impl Default for DiffSection {
    fn default() -> Self {
        Self {
            time_tolerance_secs: DEFAULT_TIME_TOLERANCE_SECS,
        }
    }
}

/// Structure report settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportSection {
    /// Number of leading path segments used to group differences.
    pub prefix_depth: usize,
    /// Number of rows in each ranking.
    pub top: usize,
    /// Minimum size for a missing file to be listed.
    pub min_missing_size: u64,
}

impl Default for ReportSection {
    fn default() -> Self {
        Self {
            prefix_depth: 2,
            top: 20,
            min_missing_size: 1024 * 1024,
        }
    }
}

/// Executor settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExecuteSection {
    /// Leading relative-path prefix removed before joining with the destination.
    pub strip_prefix: Option<String>,
    /// Where originals are copied before deletion.
    pub backup_root: Option<PathBuf>,
}

/// A complete profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Profile {
    pub scan: ScanSection,
    pub diff: DiffSection,
    pub report: ReportSection,
    pub execute: ExecuteSection,
}

impl Profile {
    /// Parse a profile from TOML text.
    pub fn from_toml(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Load a profile from an explicit file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text, path)
    }

    /// Load from `path` if given, else from the default location if it exists.
    pub fn discover(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(default) if default.is_file() => {
                tracing::debug!(path = %default.display(), "loading default profile");
                Self::load(&default)
            }
            _ => Ok(Self::default()),
        }
    }

    /// `<config_dir>/reconcile/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("reconcile").join("config.toml"))
    }
}
