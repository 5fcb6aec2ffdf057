//! Depth-first tree scanner.
//!
//! Both scan modes run the same traversal. The node type being built
//! decides what is collected per entry: [`TreeNode`] needs only the
//! structure, [`DetailedTreeNode`] also needs metadata and a content hash.

use std::fs::{self, Metadata};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::UNIX_EPOCH;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use compact_str::CompactString;
use tokio::sync::broadcast;

use treescan_core::{
    ContentHash, DetailedTreeNode, Operation, Permissions, ScanConfig, ScanError, ScanTree,
    Timestamps, TreeEntry, TreeNode,
};

use crate::hash::{hash_bytes, hash_file};
use crate::inode::{AncestorTracker, DirIdentity};
use crate::path::resolve_root;
use crate::progress::{ProgressTracker, ScanProgress};

/// Number of visited entries between progress updates.
pub const PROGRESS_INTERVAL: u64 = 256;

/// Single-threaded depth-first scanner.
///
/// A scanner holds no per-scan state, so one instance can run several
/// scans, including concurrently from different threads.
pub struct TreeScanner {
    progress_tx: broadcast::Sender<ScanProgress>,
    cancel: Option<Arc<AtomicBool>>,
}

impl TreeScanner {
    /// Create a new scanner.
    pub fn new() -> Self {
        let (progress_tx, _) = broadcast::channel(100);
        Self {
            progress_tx,
            cancel: None,
        }
    }

    /// Abort scans with [`ScanError::Interrupted`] once `flag` is set.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Subscribe to scan progress updates.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanProgress> {
        self.progress_tx.subscribe()
    }

    /// Scan in the mode given by `config`.
    pub fn scan(&self, config: &ScanConfig) -> Result<ScanTree, ScanError> {
        if config.mode.hashes_content() {
            self.run::<DetailedTreeNode>(config).map(ScanTree::Detailed)
        } else {
            self.run::<TreeNode>(config).map(ScanTree::Basic)
        }
    }

    /// Scan structure only, optionally leaving out every non-directory.
    pub fn scan_basic(
        &self,
        root: impl AsRef<Path>,
        hide_files: bool,
    ) -> Result<TreeNode, ScanError> {
        self.run(&ScanConfig::basic(root.as_ref(), hide_files))
    }

    /// Scan with sizes, content hashes, timestamps and permissions.
    pub fn scan_detailed(&self, root: impl AsRef<Path>) -> Result<DetailedTreeNode, ScanError> {
        self.run(&ScanConfig::detailed(root.as_ref()))
    }

    fn run<N: ScanNode>(&self, config: &ScanConfig) -> Result<N, ScanError> {
        let root = resolve_root(&config.root)?;
        tracing::debug!(root = %root.display(), mode = ?config.mode, "starting scan");

        let mut walker = Walker {
            scanner: self,
            config,
            progress: ProgressTracker::new(),
            ancestors: AncestorTracker::new(),
        };
        let tree = walker.visit_root(&root)?;

        let progress = walker.progress.snapshot();
        tracing::debug!(
            root = %root.display(),
            files = progress.files_scanned,
            dirs = progress.dirs_scanned,
            bytes_hashed = progress.bytes_hashed,
            elapsed_ms = progress.elapsed.as_millis() as u64,
            "scan complete"
        );
        let _ = self.progress_tx.send(progress);

        Ok(tree)
    }

    fn check_cancelled(&self) -> Result<(), ScanError> {
        match &self.cancel {
            Some(flag) if flag.load(Ordering::Relaxed) => Err(ScanError::Interrupted),
            _ => Ok(()),
        }
    }
}

impl Default for TreeScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Scan structure only using a default scanner.
pub fn scan_basic(root: impl AsRef<Path>, hide_files: bool) -> Result<TreeNode, ScanError> {
    TreeScanner::new().scan_basic(root, hide_files)
}

/// Detailed scan using a default scanner.
pub fn scan_detailed(root: impl AsRef<Path>) -> Result<DetailedTreeNode, ScanError> {
    TreeScanner::new().scan_detailed(root)
}

/// Everything known about an entry before it becomes a node.
struct EntryInfo<'a> {
    name: CompactString,
    path: &'a Path,
    metadata: Metadata,
}

impl<'a> EntryInfo<'a> {
    fn new(path: &'a Path, metadata: Metadata) -> Self {
        let name = path
            .file_name()
            .map(|n| CompactString::new(n.to_string_lossy()))
            .unwrap_or_else(|| CompactString::new(path.to_string_lossy()));
        Self {
            name,
            path,
            metadata,
        }
    }

    fn is_dir(&self) -> bool {
        self.metadata.is_dir()
    }

    /// A platform without modification times reports the Unix epoch;
    /// a missing creation time falls back to the modification time.
    fn timestamps(&self) -> Timestamps {
        Timestamps::new(
            self.metadata.modified().unwrap_or(UNIX_EPOCH),
            self.metadata.created().ok(),
        )
    }
}

/// A node type the traversal can build.
trait ScanNode: TreeEntry {
    /// Build a non-directory node.
    fn leaf(entry: &EntryInfo<'_>, progress: &mut ProgressTracker) -> Result<Self, ScanError>;

    /// Build a directory node from its already-built children.
    fn directory(entry: &EntryInfo<'_>, children: Vec<Self>) -> Self;
}

impl ScanNode for TreeNode {
    fn leaf(entry: &EntryInfo<'_>, _progress: &mut ProgressTracker) -> Result<Self, ScanError> {
        Ok(TreeNode::new_file(entry.name.clone(), entry.path))
    }

    fn directory(entry: &EntryInfo<'_>, children: Vec<Self>) -> Self {
        let mut node = TreeNode::new_directory(entry.name.clone(), entry.path);
        node.children = Some(children);
        node
    }
}

impl ScanNode for DetailedTreeNode {
    fn leaf(entry: &EntryInfo<'_>, progress: &mut ProgressTracker) -> Result<Self, ScanError> {
        let content_hash = content_hash(entry, progress)?;
        Ok(DetailedTreeNode::new_file(
            entry.name.clone(),
            entry.path,
            entry.metadata.len(),
            content_hash,
            entry.timestamps(),
            permissions(&entry.metadata),
        ))
    }

    fn directory(entry: &EntryInfo<'_>, children: Vec<Self>) -> Self {
        let mut node = DetailedTreeNode::new_directory(
            entry.name.clone(),
            entry.path,
            entry.timestamps(),
            permissions(&entry.metadata),
        );
        node.children = Some(children);
        node
    }
}

/// Hash a non-directory entry.
///
/// Unfollowed symlinks hash their target path. Special files (pipes,
/// sockets, devices) are not opened and get the digest of empty content.
fn content_hash(
    entry: &EntryInfo<'_>,
    progress: &mut ProgressTracker,
) -> Result<ContentHash, ScanError> {
    let file_type = entry.metadata.file_type();
    if file_type.is_symlink() {
        let target = fs::read_link(entry.path)
            .map_err(|e| ScanError::io(entry.path, Operation::ReadLink, e))?;
        return Ok(hash_bytes(target.as_os_str().as_encoded_bytes()));
    }
    if !file_type.is_file() {
        return Ok(hash_bytes(&[]));
    }

    let (hash, bytes) = hash_file(entry.path)?;
    progress.record_bytes(bytes);
    Ok(hash)
}

/// State of one scan in progress.
struct Walker<'s> {
    scanner: &'s TreeScanner,
    config: &'s ScanConfig,
    progress: ProgressTracker,
    ancestors: AncestorTracker,
}

impl Walker<'_> {
    /// The root is always followed, even when symlinks below it are not.
    fn visit_root<N: ScanNode>(&mut self, root: &Path) -> Result<N, ScanError> {
        let metadata = fs::metadata(root).map_err(|e| ScanError::io(root, Operation::Stat, e))?;
        self.visit_with(root, metadata, 0)
    }

    fn visit<N: ScanNode>(&mut self, path: &Path, depth: u32) -> Result<N, ScanError> {
        let metadata = if self.config.follow_symlinks {
            fs::metadata(path)
        } else {
            fs::symlink_metadata(path)
        }
        .map_err(|e| ScanError::io(path, Operation::Stat, e))?;
        self.visit_with(path, metadata, depth)
    }

    fn visit_with<N: ScanNode>(
        &mut self,
        path: &Path,
        metadata: Metadata,
        depth: u32,
    ) -> Result<N, ScanError> {
        self.scanner.check_cancelled()?;
        let entry = EntryInfo::new(path, metadata);

        if !entry.is_dir() {
            self.progress.record_file();
            let node = N::leaf(&entry, &mut self.progress)?;
            self.report(path);
            return Ok(node);
        }

        self.progress.record_dir();
        self.report(path);

        if !self.config.within_depth(depth) {
            return Ok(N::directory(&entry, Vec::new()));
        }

        tracing::trace!(path = %path.display(), depth, "entering directory");

        let identity = if self.config.follow_symlinks {
            let identity = DirIdentity::of(path, &entry.metadata)
                .map_err(|e| ScanError::io(path, Operation::Stat, e))?;
            if !self.ancestors.enter(identity.clone()) {
                return Err(ScanError::SymlinkCycle {
                    path: path.to_path_buf(),
                });
            }
            Some(identity)
        } else {
            None
        };

        let children = self.visit_children(path, depth)?;

        if let Some(identity) = identity {
            self.ancestors.leave(&identity);
        }
        Ok(N::directory(&entry, children))
    }

    fn visit_children<N: ScanNode>(&mut self, dir: &Path, depth: u32) -> Result<Vec<N>, ScanError> {
        let list_error = |e| ScanError::io(dir, Operation::ListDirectory, e);
        let hide_files = self.config.mode.hides_files();

        let mut children = Vec::new();
        for dir_entry in fs::read_dir(dir).map_err(list_error)? {
            let dir_entry = dir_entry.map_err(list_error)?;
            let child_path = dir.join(dir_entry.file_name());

            if hide_files && !self.lists_as_directory(&dir_entry, &child_path)? {
                continue;
            }

            children.push(self.visit(&child_path, depth + 1)?);
        }

        if self.config.sort_by_name {
            children.sort_by(|a: &N, b: &N| a.name().cmp(b.name()));
        }
        Ok(children)
    }

    /// Whether an enumerated entry survives `hide_files`.
    ///
    /// A symlink counts as a directory only when symlinks are followed and
    /// it resolves to one; a dangling link is a non-directory.
    fn lists_as_directory(&self, dir_entry: &fs::DirEntry, path: &Path) -> Result<bool, ScanError> {
        let file_type = dir_entry
            .file_type()
            .map_err(|e| ScanError::io(path, Operation::Stat, e))?;

        if file_type.is_dir() {
            return Ok(true);
        }
        if !(file_type.is_symlink() && self.config.follow_symlinks) {
            return Ok(false);
        }
        match fs::metadata(path) {
            Ok(metadata) => Ok(metadata.is_dir()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(ScanError::io(path, Operation::Stat, e)),
        }
    }

    fn report(&mut self, path: &Path) {
        if self.progress.total_items() % PROGRESS_INTERVAL == 0 {
            self.progress.set_current_path(PathBuf::from(path));
            let _ = self.scanner.progress_tx.send(self.progress.snapshot());
        }
    }
}

/// Raw permission bits (Unix).
#[cfg(unix)]
fn permissions(metadata: &Metadata) -> Permissions {
    Permissions::new(metadata.permissions().mode())
}

/// Synthesized permission bits from the read-only flag.
#[cfg(not(unix))]
fn permissions(metadata: &Metadata) -> Permissions {
    let mut mode = if metadata.permissions().readonly() {
        0o444
    } else {
        0o666
    };
    if metadata.is_dir() {
        mode |= 0o111;
    }
    Permissions::new(mode)
}
