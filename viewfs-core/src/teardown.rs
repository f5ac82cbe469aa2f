//! Recursive unmount-and-delete teardown engine (`rmr`'s `rmtree`).
//!
//! Grounded on `clean.c`: `loggy_rmtree`, `clean_dir`, `clean_dir_entries`,
//! `try_clean_mounts`, `get_biggest_mount` and the `is_bind_mount` rename
//! heuristic.

use std::os::unix::fs::MetadataExt;
use std::path::Path;

use anyhow::{Context, Result, bail};
use rustix::mount::{UnmountFlags, unmount};

use crate::procmounts::biggest_mount_under;

/// Detect whether `dir` is itself a mount point (bind mount or otherwise)
/// by attempting an always-invalid rename across it.
///
/// <http://blog.schmorp.de/2016-03-03-detecting-a-mount-point.html>:
/// `rename(dir/../., dir/.)` can never legitimately succeed, but the kernel
/// only reports it as a cross-device rename (`EXDEV`) when `dir` is a mount
/// point; otherwise it fails with a different errno.
fn is_bind_mount(dir: &Path) -> Result<bool> {
    let from = dir.join("../.");
    let to = dir.join(".");
    match rustix::fs::rename(&from, &to) {
        Ok(()) => bail!(
            "code bug: rename '{}' to '{}' should not have worked",
            from.display(),
            to.display()
        ),
        Err(rustix::io::Errno::XDEV) => Ok(true),
        Err(_) => Ok(false),
    }
}

fn loggy_umount(dir: &Path) -> Result<()> {
    log::info!("umount {}", dir.display());
    unmount(dir, UnmountFlags::empty())
        .with_context(|| format!("umount '{}' failed", dir.display()))
}

/// Repeatedly unmount the longest-path live mount under `dir` until none
/// remain. Longest-first matters: a mount with live submounts under it
/// refuses to unmount.
fn try_clean_mounts(dir: &Path) -> u32 {
    let prefix = dir.to_string_lossy().into_owned();
    let mut unmounted = 0;
    loop {
        let biggest = match biggest_mount_under(&prefix) {
            Ok(Some(path)) => path,
            Ok(None) => break,
            Err(e) => {
                log::error!("{e:#}");
                break;
            }
        };
        if loggy_umount(&biggest).is_err() {
            break;
        }
        unmounted += 1;
    }
    unmounted
}

fn loggy_remove_file(path: &Path) -> Result<()> {
    log::debug!("remove '{}'", path.display());
    std::fs::remove_file(path).with_context(|| format!("remove '{}' failed", path.display()))
}

fn loggy_rmdir(path: &Path) -> Result<()> {
    log::debug!("rmdir '{}'", path.display());
    std::fs::remove_dir(path).with_context(|| format!("rmdir '{}' failed", path.display()))
}

fn clean_dir_entries(root_dev: u64, dir: &Path) -> u32 {
    let mut error_count = 0;
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::error!("opendir '{}' failed: {e}", dir.display());
            return 1;
        }
    };
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::error!("readdir '{}' failed: {e}", dir.display());
                error_count += 1;
                continue;
            }
        };
        let entry_path = entry.path();
        let metadata = match std::fs::symlink_metadata(&entry_path) {
            Ok(metadata) => metadata,
            Err(e) => {
                log::error!("lstat on '{}' failed: {e}", entry_path.display());
                error_count += 1;
                continue;
            }
        };
        if metadata.is_dir() {
            match clean_dir(root_dev, &entry_path, metadata.dev()) {
                Ok(n) => error_count += n,
                Err(e) => {
                    log::error!("{e:#}");
                    error_count += 1;
                }
            }
        } else if let Err(e) = loggy_remove_file(&entry_path) {
            log::error!("{e:#}");
            error_count += 1;
        }
    }
    error_count
}

/// Recursively unmount and remove everything under `dir`.
///
/// `root_dev` is the device number of the tree's top directory; `dir_dev`
/// is `dir`'s own device. Whenever `dir`'s device differs from `root_dev`,
/// or `dir` is itself a bind mount (same device, different mount instance),
/// `dir` is unmounted — draining any live submounts first via
/// [`try_clean_mounts`] if the direct unmount reports busy — before
/// descending into it. This is what keeps `rmr` from ever deleting files on
/// a foreign filesystem or destructively traversing into a bind-mounted
/// source directory.
///
/// `opendir`/post-unmount-`stat` failures and a failing recursive call into a
/// child entry are all logged and folded into the returned error count —
/// they never abort the walk of siblings or of the rest of the tree; only
/// the impossible-rename assertion inside [`is_bind_mount`] is a hard `Err`.
fn clean_dir(root_dev: u64, dir: &Path, mut dir_dev: u64) -> Result<u32> {
    while dir_dev != root_dev || is_bind_mount(dir)? {
        if loggy_umount(dir).is_err() {
            if try_clean_mounts(dir) == 0 {
                return Ok(1);
            }
            continue;
        }
        match std::fs::metadata(dir) {
            Ok(metadata) => dir_dev = metadata.dev(),
            Err(e) => {
                log::error!("stat on '{}' failed after unmounting it: {e}", dir.display());
                return Ok(1);
            }
        }
    }

    let mut error_count = clean_dir_entries(root_dev, dir);
    if let Err(e) = loggy_rmdir(dir) {
        log::error!("{e:#}");
        error_count += 1;
    }
    Ok(error_count)
}

/// Entry point: unmount and delete the entire tree rooted at `dir`.
///
/// Returns the number of entries that could not be removed (mirroring the
/// original's `unsigned` error tally); a hard `Err` is reserved for `dir`
/// not existing, not being a directory, or the rename-trick invariant being
/// violated, none of which leave partial work worth counting.
pub fn rmtree(dir: &Path) -> Result<u32> {
    log::debug!("rmtree '{}'", dir.display());
    let metadata =
        std::fs::metadata(dir).with_context(|| format!("stat '{}' failed", dir.display()))?;
    if !metadata.is_dir() {
        bail!("'{}' exists but is not a directory", dir.display());
    }

    let real_dir = std::fs::canonicalize(dir)
        .with_context(|| format!("realpath '{}' failed", dir.display()))?;

    try_clean_mounts(&real_dir);

    let metadata = std::fs::metadata(&real_dir)
        .with_context(|| format!("stat '{}' failed", real_dir.display()))?;
    let root_dev = metadata.dev();

    clean_dir(root_dev, &real_dir, root_dev)
}
