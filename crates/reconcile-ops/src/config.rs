//! Executor configuration.

use std::path::PathBuf;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use reconcile_core::{PATH_SEPARATOR, relative_to_path};

/// Configuration for replaying an action table.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct ExecuteConfig {
    /// Root that copied entries land under.
    pub destination_root: PathBuf,

    /// Leading path segments removed from each relative path before joining
    /// it to the destination root.
    #[builder(default, setter(into, strip_option))]
    #[serde(default)]
    pub strip_prefix: Option<String>,

    /// Where targets are copied before they are deleted.
    #[builder(default, setter(into, strip_option))]
    #[serde(default)]
    pub backup_root: Option<PathBuf>,

    /// Compute and report everything without touching the filesystem.
    #[builder(default = "false")]
    #[serde(default)]
    pub dry_run: bool,

    /// Hash-compare each backup against its original before deleting.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub verify_backups: bool,
}

fn default_true() -> bool {
    true
}

impl ExecuteConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        match self.destination_root {
            Some(ref root) if root.as_os_str().is_empty() => {
                Err("Destination root cannot be empty".to_string())
            }
            None => Err("Destination root is required".to_string()),
            _ => Ok(()),
        }
    }
}

impl ExecuteConfig {
    /// Create a new config builder.
    pub fn builder() -> ExecuteConfigBuilder {
        ExecuteConfigBuilder::default()
    }

    /// Create a config that copies into `destination_root`.
    pub fn new(destination_root: impl Into<PathBuf>) -> Self {
        Self {
            destination_root: destination_root.into(),
            strip_prefix: None,
            backup_root: None,
            dry_run: false,
            verify_backups: true,
        }
    }

    /// Relative path after the prefix rewrite.
    pub fn rewrite_relative(&self, relative_path: &str) -> String {
        match self.strip_prefix.as_deref() {
            Some(prefix) => strip_leading_segments(relative_path, prefix),
            None => relative_path.to_string(),
        }
    }

    /// Destination of a row.
    pub fn destination_for(&self, relative_path: &str) -> PathBuf {
        self.destination_root
            .join(relative_to_path(&self.rewrite_relative(relative_path)))
    }

    /// Backup location of a row, if backups are configured.
    pub fn backup_for(&self, relative_path: &str) -> Option<PathBuf> {
        self.backup_root
            .as_ref()
            .map(|root| root.join(relative_to_path(relative_path)))
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split(['\\', PATH_SEPARATOR]).filter(|s| !s.is_empty())
}

/// Remove `prefix` from the front of `path` when it matches whole segments,
/// ignoring ASCII case. Otherwise `path` is returned normalized but unchanged.
pub fn strip_leading_segments(path: &str, prefix: &str) -> String {
    let prefix: Vec<&str> = segments(prefix).collect();
    let parts: Vec<&str> = segments(path).collect();

    let matches = !prefix.is_empty()
        && parts.len() >= prefix.len()
        && parts
            .iter()
            .zip(&prefix)
            .all(|(a, b)| a.eq_ignore_ascii_case(b));

    let kept = if matches { &parts[prefix.len()..] } else { &parts[..] };
    kept.join("/")
}
