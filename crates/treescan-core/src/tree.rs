//! Tree queries shared by both node variants, plus summary statistics.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::node::{DetailedTreeNode, TreeNode};

/// Read-only view over a scanned entry and its subtree.
pub trait TreeEntry: Sized {
    /// Base name of the entry.
    fn name(&self) -> &str;

    /// Absolute path of the entry.
    fn path(&self) -> &Path;

    /// Whether the entry is a directory.
    fn is_dir(&self) -> bool;

    /// Children, present only for directories.
    fn children(&self) -> Option<&[Self]>;

    /// Check if this entry is not a directory.
    fn is_file(&self) -> bool {
        !self.is_dir()
    }

    /// Get the number of direct children.
    fn child_count(&self) -> usize {
        self.children().map_or(0, <[Self]>::len)
    }

    /// Number of non-directory entries in this subtree, including self.
    fn file_count(&self) -> u64 {
        self.walk().filter(|(_, node)| node.is_file()).count() as u64
    }

    /// Number of directories below this entry, excluding self.
    fn dir_count(&self) -> u64 {
        self.walk().skip(1).filter(|(_, node)| node.is_dir()).count() as u64
    }

    /// Locate the entry with the given absolute path in this subtree.
    fn find(&self, path: &Path) -> Option<&Self> {
        if self.path() == path {
            return Some(self);
        }
        self.children()?
            .iter()
            .find(|child| path.starts_with(child.path()))
            .and_then(|child| child.find(path))
    }

    /// Pre-order iterator over `(depth, entry)`, starting at this entry with depth 0.
    fn walk(&self) -> Walk<'_, Self> {
        Walk {
            stack: vec![(0, self)],
        }
    }
}

/// Pre-order traversal produced by [`TreeEntry::walk`].
pub struct Walk<'a, N> {
    stack: Vec<(u32, &'a N)>,
}

impl<'a, N: TreeEntry> Iterator for Walk<'a, N> {
    type Item = (u32, &'a N);

    fn next(&mut self) -> Option<Self::Item> {
        let (depth, node) = self.stack.pop()?;
        if let Some(children) = node.children() {
            // Reverse so the first child is visited first.
            self.stack
                .extend(children.iter().rev().map(|child| (depth + 1, child)));
        }
        Some((depth, node))
    }
}

/// Result of a scan in either mode.
///
/// Serializes as the bare root node; the detailed variant is tried first
/// when deserializing since a detailed node also parses as a basic one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScanTree {
    /// Detailed-mode tree.
    Detailed(DetailedTreeNode),
    /// Basic-mode tree.
    Basic(TreeNode),
}

impl ScanTree {
    /// Root path of the tree.
    pub fn root_path(&self) -> &Path {
        match self {
            ScanTree::Detailed(node) => node.path(),
            ScanTree::Basic(node) => node.path(),
        }
    }

    /// Compute summary statistics.
    pub fn stats(&self) -> TreeStats {
        match self {
            ScanTree::Detailed(node) => TreeStats::collect(node),
            ScanTree::Basic(node) => TreeStats::collect(node),
        }
    }

    /// Get the basic tree, if this is one.
    pub fn as_basic(&self) -> Option<&TreeNode> {
        match self {
            ScanTree::Basic(node) => Some(node),
            ScanTree::Detailed(_) => None,
        }
    }

    /// Get the detailed tree, if this is one.
    pub fn as_detailed(&self) -> Option<&DetailedTreeNode> {
        match self {
            ScanTree::Detailed(node) => Some(node),
            ScanTree::Basic(_) => None,
        }
    }
}

impl From<TreeNode> for ScanTree {
    fn from(node: TreeNode) -> Self {
        ScanTree::Basic(node)
    }
}

impl From<DetailedTreeNode> for ScanTree {
    fn from(node: DetailedTreeNode) -> Self {
        ScanTree::Detailed(node)
    }
}

/// Summary statistics for a scanned tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeStats {
    /// Total number of non-directory entries.
    pub total_files: u64,
    /// Total number of directories, including the root.
    pub total_dirs: u64,
    /// Maximum depth reached.
    pub max_depth: u32,
}

impl TreeStats {
    /// Create new empty stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect stats over a whole tree.
    pub fn collect<N: TreeEntry>(root: &N) -> Self {
        let mut stats = Self::new();
        for (depth, node) in root.walk() {
            if node.is_dir() {
                stats.record_dir(depth);
            } else {
                stats.record_file(depth);
            }
        }
        stats
    }

    /// Record a file.
    pub fn record_file(&mut self, depth: u32) {
        self.total_files += 1;
        self.max_depth = self.max_depth.max(depth);
    }

    /// Record a directory.
    pub fn record_dir(&mut self, depth: u32) {
        self.total_dirs += 1;
        self.max_depth = self.max_depth.max(depth);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TreeNode {
        let mut root = TreeNode::new_directory("root", "/root");
        let mut sub = TreeNode::new_directory("sub", "/root/sub");
        sub.children
            .get_or_insert_with(Vec::new)
            .push(TreeNode::new_file("deep.txt", "/root/sub/deep.txt"));
        let children = root.children.get_or_insert_with(Vec::new);
        children.push(TreeNode::new_file("a.txt", "/root/a.txt"));
        children.push(sub);
        root
    }

    #[test]
    fn test_walk_is_preorder() {
        let root = sample();
        let names: Vec<_> = root.walk().map(|(d, n)| (d, n.name().to_string())).collect();
        assert_eq!(
            names,
            vec![
                (0, "root".to_string()),
                (1, "a.txt".to_string()),
                (1, "sub".to_string()),
                (2, "deep.txt".to_string()),
            ]
        );
    }

    #[test]
    fn test_counts_and_find() {
        let root = sample();
        assert_eq!(root.child_count(), 2);
        assert_eq!(root.file_count(), 2);
        assert_eq!(root.dir_count(), 1);

        let deep = root.find(Path::new("/root/sub/deep.txt")).unwrap();
        assert_eq!(deep.name(), "deep.txt");
        assert!(root.find(Path::new("/root/missing")).is_none());
    }

    #[test]
    fn test_tree_stats_collect() {
        let stats = TreeStats::collect(&sample());
        assert_eq!(stats.total_files, 2);
        assert_eq!(stats.total_dirs, 2);
        assert_eq!(stats.max_depth, 2);
    }
}
