//! treescan - filesystem tree scanner with content fingerprints.
//!
//! Usage:
//!   treescan [PATH]              Print the directory tree
//!   treescan tree [PATH]         Print the tree (optionally detailed)
//!   treescan export [PATH]       Export the tree as JSON
//!   treescan hash FILE...        Print content hashes
//!   treescan --help              Show help

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Context, Result};
use tracing_subscriber::EnvFilter;

use treescan_core::{DetailedTreeNode, ScanConfig, ScanMode, TreeEntry, TreeNode};
use treescan_scan::{TreeScanner, hash_file};

#[derive(Parser)]
#[command(
    name = "treescan",
    version,
    about = "Filesystem tree scanner with content fingerprints",
    long_about = "treescan walks a directory and builds a snapshot of its tree.\n\n\
                  Basic scans record structure only; detailed scans add size, \
                  XXH64 content hash, timestamps and permissions for every entry."
)]
struct Cli {
    /// Path to scan (defaults to current directory)
    #[arg(default_value = ".")]
    path: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Print the directory tree
    Tree {
        /// Path to scan
        #[arg(default_value = ".")]
        path: PathBuf,

        #[command(flatten)]
        scan: ScanArgs,

        /// Maximum depth to display
        #[arg(short, long)]
        depth: Option<u32>,
    },

    /// Export the scanned tree to JSON
    Export {
        /// Path to scan
        #[arg(default_value = ".")]
        path: PathBuf,

        #[command(flatten)]
        scan: ScanArgs,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the content hash of each file
    Hash {
        /// Files to hash
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

#[derive(clap::Args)]
struct ScanArgs {
    /// Collect size, hash, timestamps and permissions
    #[arg(short = 'D', long, conflicts_with = "hide_files")]
    detailed: bool,

    /// Leave out everything that is not a directory
    #[arg(short = 'H', long)]
    hide_files: bool,

    /// Report symlinks as links instead of following them
    #[arg(long)]
    no_follow: bool,

    /// Sort siblings by name
    #[arg(short, long)]
    sort: bool,
}

impl ScanArgs {
    fn config(&self, path: &Path) -> Result<ScanConfig> {
        let mode = if self.detailed {
            ScanMode::Detailed
        } else {
            ScanMode::Basic {
                hide_files: self.hide_files,
            }
        };
        let config = ScanConfig::builder()
            .root(path)
            .mode(mode)
            .follow_symlinks(!self.no_follow)
            .sort_by_name(self.sort)
            .try_build()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Command::Tree { path, scan, depth }) => {
            run_tree(&scan.config(&path)?, depth)?;
        }
        Some(Command::Export { path, scan, output }) => {
            run_export(&scan.config(&path)?, output)?;
        }
        Some(Command::Hash { files }) => {
            run_hash(&files)?;
        }
        None => {
            run_tree(&ScanConfig::basic(&cli.path, false), None)?;
        }
    }

    Ok(())
}

/// Scan and print the tree.
fn run_tree(config: &ScanConfig, max_depth: Option<u32>) -> Result<()> {
    eprintln!("Scanning {}...", config.root.display());

    let scanner = TreeScanner::new();
    let tree = scanner.scan(config).context("Scan failed")?;
    let stats = tree.stats();

    println!();
    println!("{}", "─".repeat(60));
    println!(" {}", tree.root_path().display());
    println!(
        " {} files, {} directories",
        stats.total_files, stats.total_dirs
    );
    if let Some(root) = tree.as_detailed() {
        println!(" {} total", format_size(root.total_size()));
    }
    println!("{}", "─".repeat(60));
    println!();

    let max_depth = max_depth.unwrap_or(u32::MAX);
    if let Some(root) = tree.as_basic() {
        print_basic(root, max_depth);
    }
    if let Some(root) = tree.as_detailed() {
        print_detailed(root, max_depth);
    }

    Ok(())
}

/// Scan and write the tree as JSON.
fn run_export(config: &ScanConfig, output: Option<PathBuf>) -> Result<()> {
    eprintln!("Scanning {}...", config.root.display());

    let scanner = TreeScanner::new();
    let tree = scanner.scan(config).context("Scan failed")?;

    let json = serde_json::to_string_pretty(&tree)?;

    match output {
        Some(output_path) => {
            std::fs::write(&output_path, json)
                .with_context(|| format!("Cannot write {}", output_path.display()))?;
            eprintln!("Exported to {}", output_path.display());
        }
        None => {
            println!("{}", json);
        }
    }

    Ok(())
}

/// Print the content hash of each file.
fn run_hash(files: &[PathBuf]) -> Result<()> {
    for file in files {
        let (hash, bytes) = hash_file(file)?;
        println!("{}  {:>10}  {}", hash, format_size(bytes), file.display());
    }
    Ok(())
}

/// Print a basic tree, one entry per line.
fn print_basic(root: &TreeNode, max_depth: u32) {
    for (depth, node) in root.walk().filter(|(depth, _)| *depth <= max_depth) {
        let indent = "  ".repeat(depth as usize);
        let dir_marker = if node.is_dir() { "/" } else { "" };
        println!("{}{}{}", indent, display_name(node, depth), dir_marker);
    }
}

/// Print a detailed tree with size, permissions and hash columns.
fn print_detailed(root: &DetailedTreeNode, max_depth: u32) {
    for (depth, node) in root.walk().filter(|(depth, _)| *depth <= max_depth) {
        let indent = "  ".repeat(depth as usize);
        let name = format!(
            "{}{}{}",
            indent,
            display_name(node, depth),
            if node.is_dir() { "/" } else { "" }
        );
        let hash = node
            .content_hash
            .map(|h| h.to_hex())
            .unwrap_or_else(|| "-".repeat(16));

        println!(
            "{:<48} {:>10} {} {} {}",
            truncate(&name, 48),
            if node.is_dir() {
                String::new()
            } else {
                format_size(node.size_bytes)
            },
            node.permissions,
            node.modified_time().format("%Y-%m-%d %H:%M"),
            hash
        );
    }
}

/// The root shows its full path, everything else its name.
fn display_name<N: TreeEntry>(node: &N, depth: u32) -> String {
    if depth == 0 {
        node.path().display().to_string()
    } else {
        node.name().to_string()
    }
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

/// Truncate a string to max length in characters.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len - 1).collect();
        format!("{kept}…")
    }
}
