//! Root path resolution.

use std::path::{Component, Path, PathBuf};

use treescan_core::ScanError;

/// Make `path` absolute and lexically normalized.
///
/// Relative paths resolve against the current working directory. `.`
/// components are dropped and `..` removes the preceding component without
/// consulting the filesystem, so symlinks in the input are not resolved.
pub fn resolve_root(path: &Path) -> Result<PathBuf, ScanError> {
    if path.as_os_str().is_empty() {
        return Err(ScanError::resolution(path, "path is empty"));
    }
    if path.as_os_str().as_encoded_bytes().contains(&0) {
        return Err(ScanError::resolution(path, "path contains a NUL byte"));
    }

    let absolute =
        std::path::absolute(path).map_err(|e| ScanError::resolution(path, e.to_string()))?;
    Ok(normalize(&absolute))
}

/// Remove `.` and `..` components from an absolute path.
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            // Popping the root is a no-op, so `/..` stays `/`.
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
