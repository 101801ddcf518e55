//! Scan configuration types.

use std::path::PathBuf;

use derive_builder::Builder;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};

/// Configuration for scanning operations.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct ScanConfig {
    /// Root path to scan.
    pub root: PathBuf,

    /// Follow symbolic links.
    #[builder(default = "false")]
    #[serde(default)]
    pub follow_symlinks: bool,

    /// Maximum depth to traverse (None or 0 = unlimited).
    #[builder(default)]
    #[serde(default)]
    pub max_depth: Option<u32>,

    /// Glob patterns matched against each entry's bare name (`*`, `?`).
    #[builder(default)]
    #[serde(default)]
    pub exclude_patterns: Vec<String>,

    /// Drop the descendants of an excluded directory as well.
    ///
    /// Off by default: each entry is tested against the patterns on its own,
    /// so the children of an excluded directory are still reported unless
    /// their own names match.
    #[builder(default = "false")]
    #[serde(default)]
    pub exclude_subtrees: bool,

    /// Number of threads for scanning (0 = auto-detect).
    #[builder(default = "0")]
    #[serde(default)]
    pub threads: usize,

    /// Include hidden files (starting with .).
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub include_hidden: bool,
}

fn default_true() -> bool {
    true
}

impl ScanConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        match self.root {
            Some(ref root) if root.as_os_str().is_empty() => {
                return Err("Root path cannot be empty".to_string());
            }
            None => return Err("Root path is required".to_string()),
            _ => {}
        }
        if let Some(ref patterns) = self.exclude_patterns {
            build_glob_set(patterns).map_err(|e| e.to_string())?;
        }
        Ok(())
    }
}

impl ScanConfig {
    /// Create a new scan config builder.
    pub fn builder() -> ScanConfigBuilder {
        ScanConfigBuilder::default()
    }

    /// Create a simple config for scanning a path.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            follow_symlinks: false,
            max_depth: None,
            exclude_patterns: Vec::new(),
            exclude_subtrees: false,
            threads: 0,
            include_hidden: true,
        }
    }

    /// Effective depth limit, treating 0 as unlimited.
    pub fn depth_limit(&self) -> Option<usize> {
        self.max_depth.filter(|d| *d > 0).map(|d| d as usize)
    }

    /// Compile the exclusion patterns. Match the result against bare entry names.
    pub fn exclusion_matcher(&self) -> Result<GlobSet, globset::Error> {
        build_glob_set(&self.exclude_patterns)
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::new(".")
    }
}

/// Names are matched case-insensitively, as on the Windows hosts these trees come from.
fn build_glob_set(patterns: &[String]) -> Result<GlobSet, globset::Error> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(GlobBuilder::new(pattern).case_insensitive(true).build()?);
    }
    builder.build()
}
