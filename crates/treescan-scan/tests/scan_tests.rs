use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use tempfile::TempDir;
use treescan_scan::{
    Operation, ScanConfig, ScanError, ScanTree, TreeEntry, TreeNode, TreeScanner, hash_bytes,
    scan_basic, scan_detailed,
};

/// Root with `a.txt` ("hello") and an empty directory `b`.
fn hello_tree() -> TempDir {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("a.txt"), "hello").unwrap();
    fs::create_dir(temp.path().join("b")).unwrap();
    temp
}

fn sorted_children(node: &TreeNode) -> Vec<&TreeNode> {
    let mut children: Vec<_> = node.children.as_ref().unwrap().iter().collect();
    children.sort_by(|a, b| a.name.cmp(&b.name));
    children
}

#[test]
fn test_basic_scan_scenario() {
    let temp = hello_tree();
    let tree = scan_basic(temp.path(), false).unwrap();

    assert_eq!(tree.path, std::path::absolute(temp.path()).unwrap());
    let children = sorted_children(&tree);
    assert_eq!(children.len(), 2);

    assert_eq!(children[0].name, "a.txt");
    assert!(!children[0].is_directory);
    assert!(children[0].children.is_none());

    assert_eq!(children[1].name, "b");
    assert!(children[1].is_directory);
    assert_eq!(children[1].children, Some(Vec::new()));
}

#[test]
fn test_hide_files_scenario() {
    let temp = hello_tree();
    let tree = scan_basic(temp.path(), true).unwrap();

    let children = tree.children.as_ref().unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].name, "b");
    assert_eq!(children[0].children, Some(Vec::new()));
}

#[test]
fn test_hide_files_still_recurses_into_directories() {
    let temp = TempDir::new().unwrap();
    fs::create_dir_all(temp.path().join("x/y/z")).unwrap();
    fs::write(temp.path().join("x/y/file.bin"), [0u8; 8]).unwrap();

    let tree = scan_basic(temp.path(), true).unwrap();
    assert!(tree.walk().all(|(_, node)| node.is_dir()));
    assert!(tree.find(&tree.path.join("x/y/z")).is_some());
    assert!(tree.find(&tree.path.join("x/y/file.bin")).is_none());
}

#[test]
fn test_child_count_matches_enumeration() {
    let temp = TempDir::new().unwrap();
    for i in 0..25 {
        fs::write(temp.path().join(format!("f{i}")), i.to_string()).unwrap();
    }
    fs::create_dir(temp.path().join("d")).unwrap();

    let tree = scan_basic(temp.path(), false).unwrap();
    let enumerated = fs::read_dir(temp.path()).unwrap().count();
    assert_eq!(tree.child_count(), enumerated);
}

#[test]
fn test_detailed_single_file() {
    let temp = hello_tree();
    let file = scan_detailed(temp.path().join("a.txt")).unwrap();

    assert_eq!(file.name, "a.txt");
    assert_eq!(file.size_bytes, 5);
    assert!(!file.is_directory);
    assert!(file.children.is_none());

    let hash = file.content_hash.unwrap();
    assert_eq!(hash, hash_bytes(b"hello"));
    assert_eq!(hash.to_hex().len(), 16);
    assert!(hash.to_hex().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
}

#[test]
fn test_detailed_directories_never_carry_hashes() {
    let temp = hello_tree();
    let tree = scan_detailed(temp.path()).unwrap();

    for (_, node) in tree.walk() {
        if node.is_dir() {
            assert!(node.content_hash.is_none());
            assert!(node.children.is_some());
            assert_eq!(node.size_bytes, 0);
        } else {
            assert!(node.content_hash.is_some());
            assert!(node.children.is_none());
        }
    }
}

#[test]
fn test_hash_is_deterministic_and_content_addressed() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("one"), b"same bytes").unwrap();
    fs::write(temp.path().join("two"), b"same bytes").unwrap();
    fs::write(temp.path().join("three"), b"same bytez").unwrap();

    let first = scan_detailed(temp.path()).unwrap();
    let second = scan_detailed(temp.path()).unwrap();

    let hash_of = |tree: &treescan_scan::DetailedTreeNode, name: &str| {
        tree.find(&tree.path.join(name)).unwrap().content_hash.unwrap()
    };

    assert_eq!(hash_of(&first, "one"), hash_of(&second, "one"));
    assert_eq!(hash_of(&first, "one"), hash_of(&first, "two"));
    assert_ne!(hash_of(&first, "one"), hash_of(&first, "three"));
}

#[test]
fn test_timestamps_and_permissions_are_populated() {
    let temp = hello_tree();
    let file = scan_detailed(temp.path().join("a.txt")).unwrap();

    assert!(file.modified_time().timestamp() > 0);
    assert!(file.created_time().timestamp() > 0);
    assert!(!file.permissions.is_readonly());
}

#[test]
fn test_missing_root_returns_not_found() {
    let temp = TempDir::new().unwrap();
    let err = scan_basic(temp.path().join("does-not-exist"), false).unwrap_err();
    assert!(matches!(err, ScanError::NotFound { op: Operation::Stat, .. }));
}

#[test]
fn test_empty_root_is_resolution_error() {
    let err = scan_detailed("").unwrap_err();
    assert!(matches!(err, ScanError::PathResolution { .. }));
}

#[test]
fn test_relative_root_is_made_absolute() {
    let tree = scan_basic(".", true).unwrap();
    assert!(tree.path.is_absolute());
    assert!(!tree.path.ends_with("."));
}

#[test]
fn test_scan_dispatches_on_mode() {
    let temp = hello_tree();
    let scanner = TreeScanner::new();

    let basic = scanner.scan(&ScanConfig::basic(temp.path(), false)).unwrap();
    assert!(matches!(basic, ScanTree::Basic(_)));

    let detailed = scanner.scan(&ScanConfig::detailed(temp.path())).unwrap();
    assert!(matches!(detailed, ScanTree::Detailed(_)));
    assert_eq!(detailed.stats().total_files, 1);
    assert_eq!(detailed.stats().total_dirs, 2);
}

#[test]
fn test_serialized_tree_shape() {
    let temp = hello_tree();
    let tree = scan_detailed(temp.path()).unwrap();
    let value = serde_json::to_value(&tree).unwrap();

    assert!(value.get("hash").is_none());
    for child in value["children"].as_array().unwrap() {
        if child["is_dir"].as_bool().unwrap() {
            assert_eq!(child["children"], serde_json::json!([]));
            assert!(child.get("hash").is_none());
        } else {
            assert_eq!(child["size"], serde_json::json!(5));
            assert!(child.get("children").is_none());
            assert_eq!(child["hash"].as_str().unwrap().len(), 16);
        }
    }
}

#[test]
fn test_progress_is_broadcast() {
    let temp = hello_tree();
    let scanner = TreeScanner::new();
    let mut progress_rx = scanner.subscribe();

    scanner.scan_detailed(temp.path()).unwrap();

    let mut last = None;
    while let Ok(progress) = progress_rx.try_recv() {
        last = Some(progress);
    }
    let last = last.expect("final progress update");
    assert_eq!(last.files_scanned, 1);
    assert_eq!(last.dirs_scanned, 2);
    assert_eq!(last.bytes_hashed, 5);
}

#[test]
fn test_cancel_flag_aborts_without_tree() {
    let temp = hello_tree();
    let flag = Arc::new(AtomicBool::new(true));
    let scanner = TreeScanner::new().with_cancel_flag(flag);

    assert!(matches!(
        scanner.scan_detailed(temp.path()),
        Err(ScanError::Interrupted)
    ));
}

#[test]
fn test_concurrent_scans_are_independent() {
    let first = hello_tree();
    let second = TempDir::new().unwrap();
    fs::create_dir(second.path().join("only")).unwrap();

    let scanner = Arc::new(TreeScanner::new());
    let handles: Vec<_> = [first.path().to_path_buf(), second.path().to_path_buf()]
        .into_iter()
        .map(|root| {
            let scanner = Arc::clone(&scanner);
            std::thread::spawn(move || scanner.scan_basic(root, false).unwrap())
        })
        .collect();

    let trees: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(trees[0].child_count(), 2);
    assert_eq!(trees[1].child_count(), 1);
}

#[cfg(unix)]
mod unix {
    use super::*;
    use std::os::unix::fs::{PermissionsExt, symlink};

    /// Whether permission bits are enforced for this process (not root).
    fn permissions_enforced(locked: &Path) -> bool {
        fs::read_dir(locked).is_err()
    }

    #[test]
    fn test_unreadable_subdirectory_aborts_whole_scan() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("ok.txt"), "fine").unwrap();
        let locked = temp.path().join("deep/locked");
        fs::create_dir_all(&locked).unwrap();
        fs::write(locked.join("secret"), "x").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        let enforced = permissions_enforced(&locked);
        let result = scan_basic(temp.path(), false);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        if !enforced {
            return;
        }
        match result {
            Err(ScanError::Access { path, op }) => {
                assert_eq!(path, std::path::absolute(&locked).unwrap());
                assert_eq!(op, Operation::ListDirectory);
            }
            other => panic!("expected access error, got {other:?}"),
        }
    }

    #[test]
    fn test_unreadable_file_fails_detailed_scan_only() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("private");
        fs::write(&file, "data").unwrap();
        fs::set_permissions(&file, fs::Permissions::from_mode(0o000)).unwrap();

        let enforced = fs::File::open(&file).is_err();
        let basic = scan_basic(temp.path(), false);
        let detailed = scan_detailed(temp.path());
        fs::set_permissions(&file, fs::Permissions::from_mode(0o644)).unwrap();

        assert!(basic.is_ok());
        if enforced {
            assert!(matches!(
                detailed,
                Err(ScanError::Read { op: Operation::Open, .. })
            ));
        }
    }

    #[test]
    fn test_permissions_are_raw_mode_bits() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("script.sh");
        fs::write(&file, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&file, fs::Permissions::from_mode(0o750)).unwrap();

        let node = scan_detailed(&file).unwrap();
        assert_eq!(node.permissions.mode() & 0o777, 0o750);
        // Regular file type bit is kept.
        assert_eq!(node.permissions.mode() & 0o170000, 0o100000);
        assert!(node.permissions.is_executable());
    }

    #[test]
    fn test_symlink_cycle_is_an_error() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("loop")).unwrap();
        symlink(temp.path(), temp.path().join("loop/back")).unwrap();

        let err = scan_basic(temp.path(), false).unwrap_err();
        assert!(matches!(err, ScanError::SymlinkCycle { .. }));
    }

    #[test]
    fn test_unfollowed_symlinks_are_leaves() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("real")).unwrap();
        symlink("real", temp.path().join("alias")).unwrap();

        let config = ScanConfig::builder()
            .root(temp.path())
            .mode(treescan_scan::ScanMode::Detailed)
            .follow_symlinks(false)
            .build()
            .unwrap();
        let tree = TreeScanner::new().scan(&config).unwrap();
        let tree = tree.as_detailed().unwrap();

        let alias = tree.find(&tree.path.join("alias")).unwrap();
        assert!(!alias.is_directory);
        assert_eq!(alias.content_hash, Some(hash_bytes(b"real")));
    }

    #[test]
    fn test_followed_symlink_to_directory_survives_hide_files() {
        let temp = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        fs::create_dir(target.path().join("inner")).unwrap();
        symlink(target.path(), temp.path().join("linked")).unwrap();
        symlink(temp.path().join("missing"), temp.path().join("dangling")).unwrap();

        let tree = scan_basic(temp.path(), true).unwrap();
        let names: Vec<_> = tree.children.as_ref().unwrap().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["linked"]);
        assert!(tree.find(&tree.path.join("linked/inner")).is_some());
    }

    #[test]
    fn test_dangling_symlink_aborts_followed_scan() {
        let temp = TempDir::new().unwrap();
        symlink(temp.path().join("missing"), temp.path().join("dangling")).unwrap();

        let err = scan_basic(temp.path(), false).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_detailed_scan_clamps_far_future_mtime() {
        use std::time::{Duration, UNIX_EPOCH};

        // tmpfs keeps 64-bit seconds; other filesystems clamp on write.
        let shm = Path::new("/dev/shm");
        let temp = if shm.is_dir() {
            TempDir::new_in(shm).unwrap()
        } else {
            TempDir::new().unwrap()
        };
        let path = temp.path().join("future.bin");
        fs::write(&path, "x").unwrap();
        let file = fs::File::options().write(true).open(&path).unwrap();
        file.set_modified(UNIX_EPOCH + Duration::from_secs(1 << 60))
            .unwrap();
        drop(file);

        let tree = scan_detailed(temp.path()).unwrap();
        let node = tree.find(&tree.path.join("future.bin")).unwrap();
        assert_eq!(node.content_hash, Some(hash_bytes(b"x")));
        assert!(node.modified_time() > tree.modified_time());
    }
}
