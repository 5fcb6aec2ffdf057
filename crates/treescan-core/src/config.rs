//! Scan configuration types.

use std::path::PathBuf;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::error::ScanError;

/// What a scan collects for each entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScanMode {
    /// Structure only: name, path, type and children.
    Basic {
        /// Exclude non-directory entries at every level.
        #[serde(default)]
        hide_files: bool,
    },
    /// Structure plus size, content hash, timestamps and permissions.
    Detailed,
}

impl ScanMode {
    /// Whether file contents are streamed through the hasher.
    pub fn hashes_content(&self) -> bool {
        matches!(self, ScanMode::Detailed)
    }

    /// Whether non-directory entries are left out of the tree.
    pub fn hides_files(&self) -> bool {
        matches!(self, ScanMode::Basic { hide_files: true })
    }
}

impl Default for ScanMode {
    fn default() -> Self {
        ScanMode::Basic { hide_files: false }
    }
}

/// Configuration for scanning operations.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct ScanConfig {
    /// Root path to scan. Relative paths resolve against the working directory.
    pub root: PathBuf,

    /// Basic or detailed scan.
    #[builder(default)]
    #[serde(default)]
    pub mode: ScanMode,

    /// Report symlinks as their targets instead of as leaves.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub follow_symlinks: bool,

    /// Sort siblings by name instead of keeping enumeration order.
    #[builder(default = "false")]
    #[serde(default)]
    pub sort_by_name: bool,

    /// Maximum depth to traverse (None = unlimited).
    ///
    /// Directories at the limit are reported with no children.
    #[builder(default)]
    #[serde(default)]
    pub max_depth: Option<u32>,
}

fn default_true() -> bool {
    true
}

impl ScanConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        match self.root {
            Some(ref root) if root.as_os_str().is_empty() => {
                Err("Root path cannot be empty".to_string())
            }
            Some(_) => Ok(()),
            None => Err("Root path is required".to_string()),
        }
    }

    /// Build the config, reporting validation failures as [`ScanError`].
    pub fn try_build(&self) -> Result<ScanConfig, ScanError> {
        Ok(self.build()?)
    }
}

impl From<ScanConfigBuilderError> for ScanError {
    fn from(err: ScanConfigBuilderError) -> Self {
        ScanError::InvalidConfig {
            message: err.to_string(),
        }
    }
}

impl ScanConfig {
    /// Create a new scan config builder.
    pub fn builder() -> ScanConfigBuilder {
        ScanConfigBuilder::default()
    }

    /// Create a basic-mode config for a path.
    pub fn basic(root: impl Into<PathBuf>, hide_files: bool) -> Self {
        Self {
            root: root.into(),
            mode: ScanMode::Basic { hide_files },
            follow_symlinks: true,
            sort_by_name: false,
            max_depth: None,
        }
    }

    /// Create a detailed-mode config for a path.
    pub fn detailed(root: impl Into<PathBuf>) -> Self {
        Self {
            mode: ScanMode::Detailed,
            ..Self::basic(root, false)
        }
    }

    /// Check whether a directory at `depth` may be listed.
    pub fn within_depth(&self, depth: u32) -> bool {
        self.max_depth.is_none_or(|max| depth < max)
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::basic(".", false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = ScanConfig::builder()
            .root("/home/user")
            .mode(ScanMode::Detailed)
            .follow_symlinks(false)
            .build()
            .unwrap();

        assert_eq!(config.root, PathBuf::from("/home/user"));
        assert_eq!(config.mode, ScanMode::Detailed);
        assert!(!config.follow_symlinks);
        assert!(!config.sort_by_name);
    }

    #[test]
    fn test_builder_rejects_empty_root() {
        assert!(ScanConfig::builder().root("").build().is_err());
        assert!(ScanConfig::builder().build().is_err());
    }

    #[test]
    fn test_try_build_reports_invalid_config() {
        let err = ScanConfig::builder().root("").try_build().unwrap_err();
        assert!(matches!(err, ScanError::InvalidConfig { .. }));
        assert!(err.to_string().contains("Root path cannot be empty"));
        assert_eq!(err.path(), None);

        let err = ScanConfig::builder().try_build().unwrap_err();
        assert!(err.to_string().contains("Root path is required"));

        let config = ScanConfig::builder().root("/srv").try_build().unwrap();
        assert_eq!(config.root, PathBuf::from("/srv"));
    }

    #[test]
    fn test_mode_capabilities() {
        assert!(ScanMode::Detailed.hashes_content());
        assert!(!ScanMode::Detailed.hides_files());
        assert!(ScanMode::Basic { hide_files: true }.hides_files());
        assert!(!ScanMode::Basic { hide_files: false }.hashes_content());
    }

    #[test]
    fn test_within_depth() {
        let mut config = ScanConfig::detailed("/test");
        assert!(config.within_depth(1000));

        config.max_depth = Some(2);
        assert!(config.within_depth(1));
        assert!(!config.within_depth(2));
    }
}
