//! File and directory node types.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use compact_str::CompactString;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::tree::TreeEntry;

/// XXH64 content hash for change detection and deduplication.
///
/// Not suitable for security purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash(pub u64);

impl ContentHash {
    /// Create a new ContentHash from a raw digest.
    pub fn new(digest: u64) -> Self {
        Self(digest)
    }

    /// Get the hash as a 16-digit lowercase hex string.
    pub fn to_hex(&self) -> String {
        format!("{:016x}", self.0)
    }

    /// Parse a hash from its 16-digit hex form.
    pub fn from_hex(hex: &str) -> Option<Self> {
        if hex.len() != 16 {
            return None;
        }
        u64::from_str_radix(hex, 16).ok().map(Self)
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl Serialize for ContentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Self::from_hex(&hex)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid content hash: {hex}")))
    }
}

/// Raw permission bits as reported by the OS.
///
/// On Unix this is the full `st_mode`, including the file type bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permissions(pub u32);

impl Permissions {
    /// Create from raw mode bits.
    pub fn new(mode: u32) -> Self {
        Self(mode)
    }

    /// Raw mode bits.
    pub fn mode(&self) -> u32 {
        self.0
    }

    /// Check if no write bit is set.
    pub fn is_readonly(&self) -> bool {
        self.0 & 0o222 == 0
    }

    /// Check if any execute bit is set.
    pub fn is_executable(&self) -> bool {
        self.0 & 0o111 != 0
    }
}

impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04o}", self.0 & 0o7777)
    }
}

/// File metadata timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamps {
    /// Last modification time.
    #[serde(rename = "mod_time")]
    pub modified: DateTime<Utc>,
    /// Creation time, or the modification time where the platform has none.
    #[serde(rename = "created_time")]
    pub created: DateTime<Utc>,
}

impl Timestamps {
    /// Create timestamps with only modified time; creation falls back to it.
    pub fn with_modified(modified: SystemTime) -> Self {
        Self::new(modified, None)
    }

    /// Create timestamps from the values the platform reported.
    ///
    /// Times outside the range `DateTime<Utc>` can represent are clamped to
    /// its minimum or maximum.
    pub fn new(modified: SystemTime, created: Option<SystemTime>) -> Self {
        let modified = to_utc(modified);
        Self {
            modified,
            created: created.map(to_utc).unwrap_or(modified),
        }
    }
}

/// Convert a platform time to UTC, saturating at chrono's bounds.
fn to_utc(time: SystemTime) -> DateTime<Utc> {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => i64::try_from(after.as_secs())
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, after.subsec_nanos()))
            .unwrap_or(DateTime::<Utc>::MAX_UTC),
        Err(err) => {
            let before = err.duration();
            i64::try_from(before.as_secs())
                .ok()
                .and_then(|secs| match before.subsec_nanos() {
                    0 => DateTime::from_timestamp(-secs, 0),
                    nanos => DateTime::from_timestamp(-secs - 1, 1_000_000_000 - nanos),
                })
                .unwrap_or(DateTime::<Utc>::MIN_UTC)
        }
    }
}

/// A single file or directory in a basic scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    /// File/directory name (not full path).
    pub name: CompactString,

    /// Absolute path.
    pub path: PathBuf,

    /// Whether this entry is a directory.
    #[serde(rename = "is_dir")]
    pub is_directory: bool,

    /// Children in enumeration order. `Some` exactly for directories.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<TreeNode>>,
}

impl TreeNode {
    /// Create a new file node.
    pub fn new_file(name: impl Into<CompactString>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            is_directory: false,
            children: None,
        }
    }

    /// Create a new, empty directory node.
    pub fn new_directory(name: impl Into<CompactString>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            is_directory: true,
            children: Some(Vec::new()),
        }
    }
}

impl TreeEntry for TreeNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn is_dir(&self) -> bool {
        self.is_directory
    }

    fn children(&self) -> Option<&[Self]> {
        self.children.as_deref()
    }
}

/// A single file or directory in a detailed scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailedTreeNode {
    /// File/directory name (not full path).
    pub name: CompactString,

    /// Absolute path.
    pub path: PathBuf,

    /// Whether this entry is a directory.
    #[serde(rename = "is_dir")]
    pub is_directory: bool,

    /// Size in bytes; 0 for directories.
    #[serde(rename = "size")]
    pub size_bytes: u64,

    /// Content hash, present exactly for non-directories.
    #[serde(rename = "hash", default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<ContentHash>,

    /// Modification and creation times.
    #[serde(flatten)]
    pub timestamps: Timestamps,

    /// Permission bits.
    pub permissions: Permissions,

    /// Children in enumeration order. `Some` exactly for directories.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<DetailedTreeNode>>,
}

impl DetailedTreeNode {
    /// Create a new file node.
    pub fn new_file(
        name: impl Into<CompactString>,
        path: impl Into<PathBuf>,
        size_bytes: u64,
        content_hash: ContentHash,
        timestamps: Timestamps,
        permissions: Permissions,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            is_directory: false,
            size_bytes,
            content_hash: Some(content_hash),
            timestamps,
            permissions,
            children: None,
        }
    }

    /// Create a new, empty directory node.
    pub fn new_directory(
        name: impl Into<CompactString>,
        path: impl Into<PathBuf>,
        timestamps: Timestamps,
        permissions: Permissions,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            is_directory: true,
            size_bytes: 0,
            content_hash: None,
            timestamps,
            permissions,
            children: Some(Vec::new()),
        }
    }

    /// Last modification time.
    pub fn modified_time(&self) -> DateTime<Utc> {
        self.timestamps.modified
    }

    /// Creation time (falls back to modification time).
    pub fn created_time(&self) -> DateTime<Utc> {
        self.timestamps.created
    }

    /// Sum of the sizes of every file in this subtree.
    pub fn total_size(&self) -> u64 {
        self.walk().map(|(_, node)| node.size_bytes).sum()
    }
}

impl TreeEntry for DetailedTreeNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn is_dir(&self) -> bool {
        self.is_directory
    }

    fn children(&self) -> Option<&[Self]> {
        self.children.as_deref()
    }
}
