//! End-to-end composition/teardown scenarios that issue real `mount(2)` /
//! `umount(2)` calls, covering the concrete scenarios from the base design's
//! testable-properties section: single bind, two-lower overlay, writable
//! overlay, nested mount requiring a scaffold, and teardown across a bind.
//!
//! These need `CAP_SYS_ADMIN` (root, or a user namespace with mount
//! delegation) and are not run by a plain `cargo test`; run with
//! `cargo test -- --ignored` as root, mirroring how other privileged-syscall
//! tests in this corpus are gated.

use std::fs;

use tempfile::tempdir;
use viewfs_core::dir::Dir;
use viewfs_core::driver::{init_root_dir, make_sub_mount_points, new_root, prepare_sub_mounts};
use viewfs_core::planner::add_dir;
use viewfs_core::teardown::rmtree;

fn build_view(view_root: &std::path::Path, dirs: Vec<(Dir, String)>) {
    init_root_dir(view_root).unwrap();
    let mut root = new_root(view_root.to_path_buf());
    for (dir, target) in dirs {
        add_dir(&mut root.sub_mount_points, dir, target).unwrap();
    }
    prepare_sub_mounts(&mut root, view_root).unwrap();
    make_sub_mount_points(&mut root, view_root).unwrap();
}

fn plain_dir(source: std::path::PathBuf, target: &str) -> (Dir, String) {
    (
        Dir {
            arg: source.to_string_lossy().into_owned(),
            source,
            workdir: None,
            target_relative: target.to_string(),
        },
        target.to_string(),
    )
}

#[test]
#[ignore = "requires CAP_SYS_ADMIN to mount/unmount"]
fn single_bind_is_visible_and_reverts_on_teardown() {
    let a = tempdir().unwrap();
    fs::write(a.path().join("hello"), b"hi").unwrap();
    let v = tempdir().unwrap();

    build_view(v.path(), vec![plain_dir(a.path().to_path_buf(), "data")]);

    let seen = fs::read_to_string(v.path().join("data/hello")).unwrap();
    assert_eq!(seen, "hi");

    let errors = rmtree(v.path()).unwrap();
    assert_eq!(errors, 0);
    assert!(!v.path().exists());
    assert_eq!(fs::read_to_string(a.path().join("hello")).unwrap(), "hi");
}

#[test]
#[ignore = "requires CAP_SYS_ADMIN to mount/unmount"]
fn two_lower_overlay_unions_both_sources() {
    let a = tempdir().unwrap();
    let b = tempdir().unwrap();
    fs::write(a.path().join("x"), b"x").unwrap();
    fs::write(b.path().join("y"), b"y").unwrap();
    let v = tempdir().unwrap();

    build_view(
        v.path(),
        vec![
            plain_dir(a.path().to_path_buf(), "share"),
            plain_dir(b.path().to_path_buf(), "share"),
        ],
    );

    assert!(v.path().join("share/x").is_file());
    assert!(v.path().join("share/y").is_file());

    rmtree(v.path()).unwrap();
}

#[test]
#[ignore = "requires CAP_SYS_ADMIN to mount/unmount"]
fn writable_overlay_copies_up_into_upperdir() {
    let lower = tempdir().unwrap();
    let upper = tempdir().unwrap();
    let workdir = tempdir().unwrap();
    let v = tempdir().unwrap();

    let upper_dir = Dir {
        arg: upper.path().to_string_lossy().into_owned(),
        source: upper.path().to_path_buf(),
        workdir: Some(workdir.path().to_path_buf()),
        target_relative: "share".to_string(),
    };

    build_view(
        v.path(),
        vec![
            plain_dir(lower.path().to_path_buf(), "share"),
            (upper_dir, "share".to_string()),
        ],
    );

    fs::write(v.path().join("share/new"), b"hi").unwrap();
    assert_eq!(fs::read_to_string(upper.path().join("new")).unwrap(), "hi");

    rmtree(v.path()).unwrap();
}

#[test]
#[ignore = "requires CAP_SYS_ADMIN to mount/unmount"]
fn nested_mount_gets_a_tmpfs_scaffold_when_unhosted() {
    let a = tempdir().unwrap(); // has no "bin" subdir
    let b = tempdir().unwrap(); // becomes target "bin"
    fs::write(b.path().join("tool"), b"#!/bin/sh\n").unwrap();
    let v = tempdir().unwrap();

    build_view(
        v.path(),
        vec![
            plain_dir(a.path().to_path_buf(), ""),
            plain_dir(b.path().to_path_buf(), "bin"),
        ],
    );

    assert!(v.path().join("bin/tool").is_file());

    rmtree(v.path()).unwrap();
}

#[test]
#[ignore = "requires CAP_SYS_ADMIN to mount/unmount"]
fn teardown_unmounts_a_bind_before_descending_into_it() {
    let a = tempdir().unwrap();
    fs::write(a.path().join("keep"), b"keep me").unwrap();
    let v = tempdir().unwrap();

    build_view(v.path(), vec![plain_dir(a.path().to_path_buf(), "mnt")]);

    let errors = rmtree(v.path()).unwrap();
    assert_eq!(errors, 0);
    assert!(!v.path().exists());
    // The bind's backing directory is untouched: rmr unmounted it rather
    // than traversing and deleting through it.
    assert_eq!(fs::read_to_string(a.path().join("keep")).unwrap(), "keep me");
}
