//! Builds the mount-point tree from the flat list of `dir_spec` arguments,
//! and later finds which contributing dir already hosts a given child
//! mount point's backing directory.

use anyhow::{Context, Result, bail};

use crate::dir::Dir;
use crate::mount_point::MountPoint;
use crate::pathutil::{PrefixRelation, compare_relative};

/// Insert `dir` at `target_relative` into the forest rooted at
/// `mount_points`.
///
/// At each level, `target_relative` is classified against every sibling's
/// own target using a four-way prefix compare (see [`compare_relative`]):
///
/// - *equal* — append `dir` to the sibling's `dirs`.
/// - *disjoint* — keep scanning siblings.
/// - `target_relative` is a strict prefix of the sibling's — splice a fresh
///   node in at `target_relative`, demoting the existing sibling to a child
///   of it.
/// - the sibling's target is a strict prefix of `target_relative` —
///   recurse into that sibling's own children.
///
/// If no sibling matches any of the above, a fresh single-dir node is
/// appended.
pub fn add_dir(mount_points: &mut Vec<MountPoint>, dir: Dir, target_relative: String) -> Result<()> {
    for i in 0..mount_points.len() {
        match compare_relative(&target_relative, &mount_points[i].target_relative) {
            PrefixRelation::Disjoint => continue,
            PrefixRelation::Equal => {
                mount_points[i].dirs.push(dir);
                return Ok(());
            }
            PrefixRelation::LeftPrefixOfRight => {
                let old_sibling = mount_points.remove(i);
                let mut new_node = MountPoint::new(dir, target_relative);
                new_node.sub_mount_points.push(old_sibling);
                mount_points.insert(i, new_node);
                return Ok(());
            }
            PrefixRelation::RightPrefixOfLeft => {
                return add_dir(&mut mount_points[i].sub_mount_points, dir, target_relative);
            }
        }
    }
    mount_points.push(MountPoint::new(dir, target_relative));
    Ok(())
}

/// Among `parent`'s contributing dirs, find the one that already has a
/// directory at `child`'s relative path, i.e. the dir that should "host"
/// the child mount point once the parent is itself mounted.
///
/// Returns `Ok(Some(index))` for the hosting dir's index in `parent.dirs`,
/// `Ok(None)` if none of them has it (the driver must then scaffold a
/// tmpfs), or `Err` if a candidate path exists but is not a directory — an
/// invalid view, since a file can't host a mount point.
///
/// Follows symlinks (`stat`, not `lstat`): a symlink named like the child's
/// relative path that points at a real directory is a valid host, matching
/// `get_mount_parent_for`'s own `stat` call in the original `mkview.c`.
pub fn resolve_hosting_dir(parent: &MountPoint, child: &MountPoint) -> Result<Option<usize>> {
    let diff = parent.diff_to(&child.target_relative);
    for (index, dir) in parent.dirs.iter().enumerate() {
        let candidate = if diff.is_empty() {
            dir.source.clone()
        } else {
            dir.source.join(diff)
        };
        match std::fs::metadata(&candidate) {
            Ok(meta) if meta.is_dir() => return Ok(Some(index)),
            Ok(_) => bail!(
                "invalid view: '{}' is not a directory, cannot mount '{}' over it",
                candidate.display(),
                child.target_relative
            ),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => {
                return Err(e).with_context(|| format!("stat '{}' failed", candidate.display()));
            }
        }
    }
    Ok(None)
}
