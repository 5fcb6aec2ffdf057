//! Error types for scanning operations.

use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Filesystem primitive that was being performed when an error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    /// Turning the input into an absolute path.
    Resolve,
    /// Querying metadata.
    Stat,
    /// Enumerating a directory.
    ListDirectory,
    /// Opening a file for hashing.
    Open,
    /// Reading file content for hashing.
    Read,
    /// Reading a symbolic link target.
    ReadLink,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Resolve => "resolve",
            Operation::Stat => "stat",
            Operation::ListDirectory => "list directory",
            Operation::Open => "open",
            Operation::Read => "read",
            Operation::ReadLink => "read link",
        };
        f.write_str(name)
    }
}

/// Errors that can occur during scanning.
///
/// Any of these aborts the whole scan; no partial tree is produced.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Input path could not be made absolute.
    #[error("Cannot resolve path {path:?}: {reason}")]
    PathResolution { path: PathBuf, reason: String },

    /// Path or a descendant does not exist.
    #[error("Path not found ({op}): {path}")]
    NotFound { path: PathBuf, op: Operation },

    /// Path or a descendant cannot be statted or listed.
    #[error("Access denied ({op}): {path}")]
    Access { path: PathBuf, op: Operation },

    /// File content could not be fully read while hashing.
    #[error("Read error ({op}) at {path}: {source}")]
    Read {
        path: PathBuf,
        op: Operation,
        #[source]
        source: std::io::Error,
    },

    /// Generic I/O error.
    #[error("I/O error ({op}) at {path}: {source}")]
    Io {
        path: PathBuf,
        op: Operation,
        #[source]
        source: std::io::Error,
    },

    /// A followed symlink leads back to one of its ancestors.
    #[error("Symlink cycle detected at {path}")]
    SymlinkCycle { path: PathBuf },

    /// Scan was cancelled.
    #[error("Operation interrupted")]
    Interrupted,

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl ScanError {
    /// Classify an I/O error raised by `op` on `path`.
    ///
    /// Open and read failures while hashing are always [`ScanError::Read`],
    /// whatever their kind.
    pub fn io(path: impl Into<PathBuf>, op: Operation, source: std::io::Error) -> Self {
        let path = path.into();
        match op {
            Operation::Open | Operation::Read => Self::Read { path, op, source },
            _ => match source.kind() {
                ErrorKind::NotFound => Self::NotFound { path, op },
                ErrorKind::PermissionDenied => Self::Access { path, op },
                _ => Self::Io { path, op, source },
            },
        }
    }

    /// Create a path resolution error.
    pub fn resolution(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::PathResolution {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Path at which the scan failed, if the error has one.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::PathResolution { path, .. }
            | Self::NotFound { path, .. }
            | Self::Access { path, .. }
            | Self::Read { path, .. }
            | Self::Io { path, .. }
            | Self::SymlinkCycle { path } => Some(path),
            Self::Interrupted | Self::InvalidConfig { .. } => None,
        }
    }

    /// Operation that failed, if the error has one.
    pub fn operation(&self) -> Option<Operation> {
        match self {
            Self::PathResolution { .. } => Some(Operation::Resolve),
            Self::NotFound { op, .. }
            | Self::Access { op, .. }
            | Self::Read { op, .. }
            | Self::Io { op, .. } => Some(*op),
            _ => None,
        }
    }

    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_error_io_classification() {
        let err = ScanError::io(
            "/test/path",
            Operation::Stat,
            std::io::Error::new(ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(err, ScanError::Access { op: Operation::Stat, .. }));

        let err = ScanError::io(
            "/test/path",
            Operation::ListDirectory,
            std::io::Error::new(ErrorKind::NotFound, "gone"),
        );
        assert!(err.is_not_found());

        let err = ScanError::io(
            "/test/path",
            Operation::Stat,
            std::io::Error::other("disk on fire"),
        );
        assert!(matches!(err, ScanError::Io { .. }));
    }

    #[test]
    fn test_hashing_failures_are_read_errors() {
        let err = ScanError::io(
            "/test/file",
            Operation::Open,
            std::io::Error::new(ErrorKind::NotFound, "vanished"),
        );
        assert!(matches!(err, ScanError::Read { op: Operation::Open, .. }));
        assert_eq!(err.operation(), Some(Operation::Open));
    }

    #[test]
    fn test_error_context() {
        let err = ScanError::io(
            "/a/b",
            Operation::ListDirectory,
            std::io::Error::new(ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.path(), Some(Path::new("/a/b")));
        let message = err.to_string();
        assert!(message.contains("/a/b"));
        assert!(message.contains("list directory"));

        assert!(ScanError::Interrupted.path().is_none());
    }
}
