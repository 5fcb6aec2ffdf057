//! Filesystem tree scanning engine for treescan.
//!
//! # Overview
//!
//! `treescan-scan` walks a directory hierarchy depth-first on the calling
//! thread and returns an owned snapshot of it. Key features:
//!
//! - **One traversal, two modes**: basic trees carry structure only,
//!   detailed trees add size, XXH64 content hash, timestamps and permissions
//! - **All-or-nothing**: any error anywhere aborts the scan; a partial tree
//!   is never returned
//! - **Progress updates** via broadcast channels
//! - **Cancellation** through a shared flag
//!
//! Sibling order is the order the OS enumerates directory entries in, which
//! is platform-dependent and not necessarily alphabetical. Set
//! `ScanConfig::sort_by_name` for a stable order.
//!
//! # Example
//!
//! ```rust,no_run
//! use treescan_scan::{TreeEntry, TreeScanner};
//!
//! let scanner = TreeScanner::new();
//! let tree = scanner.scan_detailed("/path/to/scan").unwrap();
//!
//! println!("Total size: {} bytes", tree.total_size());
//! println!("Total files: {}", tree.file_count());
//! ```
//!
//! # Progress Monitoring
//!
//! ```rust,no_run
//! use treescan_scan::{ScanConfig, TreeScanner};
//!
//! let scanner = TreeScanner::new();
//! let mut progress_rx = scanner.subscribe();
//!
//! let _tree = scanner.scan(&ScanConfig::detailed("/path/to/scan")).unwrap();
//! while let Ok(progress) = progress_rx.try_recv() {
//!     println!("Scanned {} files", progress.files_scanned);
//! }
//! ```

mod hash;
mod inode;
mod path;
mod progress;
mod scanner;

pub use hash::{HASH_BUFFER_SIZE, HASH_SEED, hash_bytes, hash_file, hash_reader};
pub use inode::{AncestorTracker, DirIdentity};
pub use path::resolve_root;
pub use progress::ScanProgress;
pub use scanner::{PROGRESS_INTERVAL, TreeScanner, scan_basic, scan_detailed};

// Re-export core types for convenience
pub use treescan_core::{
    ContentHash, DetailedTreeNode, Operation, Permissions, ScanConfig, ScanError, ScanMode,
    ScanTree, Timestamps, TreeEntry, TreeNode, TreeStats,
};
