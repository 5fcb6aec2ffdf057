//! Directory identity tracking for symlink cycle detection.

use std::collections::HashSet;
use std::fs::Metadata;
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::fs::MetadataExt;

/// Identifies a directory independently of the path used to reach it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DirIdentity {
    /// Device and inode number.
    Inode { device: u64, inode: u64 },
    /// Canonical path, where the platform has no inode numbers.
    Canonical(PathBuf),
}

impl DirIdentity {
    /// Identify the directory at `path` with the given (followed) metadata.
    #[cfg(unix)]
    pub fn of(_path: &Path, metadata: &Metadata) -> std::io::Result<Self> {
        Ok(Self::Inode {
            device: metadata.dev(),
            inode: metadata.ino(),
        })
    }

    #[cfg(not(unix))]
    pub fn of(path: &Path, _metadata: &Metadata) -> std::io::Result<Self> {
        path.canonicalize().map(Self::Canonical)
    }
}

/// Tracks the directories on the current descent path.
///
/// A directory reached through a followed symlink that is already on the
/// path would recurse forever; `enter` reports it instead.
#[derive(Debug, Default)]
pub struct AncestorTracker {
    active: HashSet<DirIdentity>,
}

impl AncestorTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self {
            active: HashSet::new(),
        }
    }

    /// Enter a directory. Returns `false` if it is already an ancestor.
    pub fn enter(&mut self, identity: DirIdentity) -> bool {
        self.active.insert(identity)
    }

    /// Leave a directory entered earlier.
    pub fn leave(&mut self, identity: &DirIdentity) {
        self.active.remove(identity);
    }

    /// Current descent depth in tracked directories.
    pub fn len(&self) -> usize {
        self.active.len()
    }

    /// Check if no directory is being tracked.
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}
