//! Core types for treescan.
//!
//! This crate provides the data structures shared by the scanner and its
//! hosts: the basic and detailed tree nodes, content hashes, the error
//! taxonomy, and scan configuration. It performs no I/O.

mod config;
mod error;
mod node;
mod tree;

pub use config::{ScanConfig, ScanConfigBuilder, ScanConfigBuilderError, ScanMode};
pub use error::{Operation, ScanError};
pub use node::{ContentHash, DetailedTreeNode, Permissions, Timestamps, TreeNode};
pub use tree::{ScanTree, TreeEntry, TreeStats, Walk};
