//! The mount driver: walks a built mount-point tree and actually issues the
//! bind/overlay/tmpfs mounts and `mkdir`s needed to realize it on disk.
//!
//! Grounded directly on `init_root_dir`, `prepare_sub_mounts(_helper)`,
//! `make_mount_point` and `make_sub_mount_points` in the original `mkview.c`.

use std::path::Path;

use anyhow::{Context, Result, bail};

use crate::dir::Dir;
use crate::mount_ops;
use crate::mount_point::{MountPoint, MountPointFlags};
use crate::planner::resolve_hosting_dir;

/// Status of the view root directory, checked before anything is mounted.
enum RootStatus {
    DoesNotExist,
    Empty,
    NotEmpty,
}

fn root_status(view_root: &Path) -> Result<RootStatus> {
    let metadata = match std::fs::symlink_metadata(view_root) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(RootStatus::DoesNotExist),
        Err(e) => {
            return Err(e).with_context(|| format!("stat '{}' failed", view_root.display()));
        }
    };
    if !metadata.is_dir() {
        bail!("view root '{}' is not a directory", view_root.display());
    }
    let mut entries = std::fs::read_dir(view_root)
        .with_context(|| format!("opendir '{}' failed", view_root.display()))?;
    Ok(if entries.next().is_some() {
        RootStatus::NotEmpty
    } else {
        RootStatus::Empty
    })
}

/// Verify the view root either doesn't exist yet (and create it) or is an
/// empty existing directory. A non-empty root, or a path that exists but
/// isn't a directory, is rejected — `mkview` refuses to build a view on top
/// of unrelated content.
pub fn init_root_dir(view_root: &Path) -> Result<()> {
    match root_status(view_root)? {
        RootStatus::DoesNotExist => mount_ops::mkdir_p(view_root),
        RootStatus::Empty => Ok(()),
        RootStatus::NotEmpty => bail!("view root '{}' is not empty", view_root.display()),
    }
}

/// Build the root node of the mount-point tree: an always-present node at
/// the view root itself, flagged [`MountPointFlags::CAN_MKDIRS`] since the
/// view root is real, writable, durable storage — sub-mount directories can
/// be created directly in it rather than needing a tmpfs scaffold.
///
/// The root node is never itself mounted: `view_root` already exists on
/// disk (see [`init_root_dir`]) and stays exactly as it is; only its
/// `sub_mount_points` get bind/overlay-mounted.
pub fn new_root(view_root: std::path::PathBuf) -> MountPoint {
    let mut root = MountPoint::new(Dir::view_root(view_root), String::new());
    root.flags |= MountPointFlags::CAN_MKDIRS;
    root
}

/// Log the mount-point tree, depth-first, the way `print_mount_points` does
/// in the original — useful for `-v` diagnostics before anything is mounted.
pub fn log_tree(mount_points: &[MountPoint], depth: usize) {
    for mount_point in mount_points {
        let indent = " ".repeat(depth * 2);
        log::info!("{indent}target /{}", mount_point.target_relative);
        for dir in &mount_point.dirs {
            log::info!("{indent}  source {}", dir.source.display());
        }
        log_tree(&mount_point.sub_mount_points, depth + 1);
    }
}

/// Ensure every `sub_mount_point` of `mount_point` has somewhere to land:
/// either a directory already hosted by one of `mount_point`'s own
/// contributing dirs, or — when `mount_point` is allowed to create
/// directories directly (the root) — a freshly `mkdir -p`'d one, or — when
/// it's not and no contributing dir can host it — a tmpfs scaffold mounted
/// over `mount_point`'s own target, large enough to hold every otherwise
/// unhosted sub-mount-point.
///
/// The scaffold tmpfs is appended at the *end* of `mount_point.dirs`, i.e.
/// it's the last (lowest-priority) entry in the eventual overlay lower
/// stack, not the first — mirroring the original's choice to leave this as
/// the simple case rather than risk masking a contributing dir that
/// legitimately owns the same path.
pub fn prepare_sub_mounts(mount_point: &mut MountPoint, view_root: &Path) -> Result<()> {
    if mount_point.flags.contains(MountPointFlags::CAN_MKDIRS) {
        for index in 0..mount_point.sub_mount_points.len() {
            let sub_target = mount_point.sub_mount_points[index]
                .absolute_target(view_root)
                .to_path_buf();
            mount_ops::mkdir_p(&sub_target)?;
        }
        return Ok(());
    }

    let mut need_scaffold = Vec::new();
    for index in 0..mount_point.sub_mount_points.len() {
        match resolve_hosting_dir(mount_point, &mount_point.sub_mount_points[index])? {
            Some(host_index) => log::debug!(
                "mount parent for '{}' is '{}'",
                mount_point.sub_mount_points[index].target_relative,
                mount_point.dirs[host_index].source.display()
            ),
            None => need_scaffold.push(index),
        }
    }
    if need_scaffold.is_empty() {
        return Ok(());
    }

    let target_dir = mount_point.absolute_target(view_root).to_path_buf();
    mount_ops::mount_tmpfs(&target_dir)?;
    for index in need_scaffold {
        let sub_target = mount_point.sub_mount_points[index]
            .absolute_target(view_root)
            .to_path_buf();
        mount_ops::mkdir_p(&sub_target)?;
    }
    mount_point.dirs.push(Dir::scaffold(target_dir));
    Ok(())
}

/// Mount `mount_point` itself: a plain bind mount if it has exactly one
/// contributing dir, otherwise an overlay over all of them. At most one
/// contributing dir may carry a `workdir` (and so become the overlay's
/// `upperdir`); more than one is an invalid view.
fn mount_self(mount_point: &MountPoint, target_dir: &Path) -> Result<()> {
    if mount_point.dirs.len() == 1 {
        return mount_ops::bind_mount(&mount_point.dirs[0].source, target_dir);
    }

    let mut upper: Option<(&Path, &Path)> = None;
    let mut lower_dirs = Vec::with_capacity(mount_point.dirs.len());
    for dir in &mount_point.dirs {
        match &dir.workdir {
            Some(_) if upper.is_some() => bail!(
                "mount point at '{}' has multiple upper directories ('{}' and '{}')",
                target_dir.display(),
                upper.unwrap().0.display(),
                dir.source.display(),
            ),
            Some(workdir) => upper = Some((dir.source.as_path(), workdir.as_path())),
            None => lower_dirs.push(dir.source.clone()),
        }
    }
    mount_ops::mount_overlay(&lower_dirs, upper, target_dir)
}

/// Recursively mount `mount_point` and all of its descendants: prepare
/// directories for children first, mount `mount_point` itself, then recurse.
pub fn make_mount_point(mount_point: &mut MountPoint, view_root: &Path) -> Result<()> {
    prepare_sub_mounts(mount_point, view_root)?;

    let target_dir = mount_point.absolute_target(view_root).to_path_buf();
    mount_self(mount_point, &target_dir)?;

    make_sub_mount_points(mount_point, view_root)
}

/// Mount every direct child of `mount_point` (and, transitively, their own
/// children). Used both for the root node (whose own target is never
/// itself mounted) and recursively by [`make_mount_point`].
pub fn make_sub_mount_points(mount_point: &mut MountPoint, view_root: &Path) -> Result<()> {
    for sub_mount_point in &mut mount_point.sub_mount_points {
        make_mount_point(sub_mount_point, view_root)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::add_dir;
    use tempfile::tempdir;

    #[test]
    fn init_root_dir_creates_missing_root() {
        let base = tempdir().unwrap();
        let root = base.path().join("view");
        init_root_dir(&root).unwrap();
        assert!(root.is_dir());
    }

    #[test]
    fn init_root_dir_accepts_existing_empty_dir() {
        let root = tempdir().unwrap();
        init_root_dir(root.path()).unwrap();
    }

    #[test]
    fn init_root_dir_rejects_nonempty_dir() {
        let root = tempdir().unwrap();
        std::fs::write(root.path().join("stray"), b"x").unwrap();
        assert!(init_root_dir(root.path()).is_err());
    }

    #[test]
    fn prepare_sub_mounts_creates_dirs_directly_under_writable_root() {
        let view = tempdir().unwrap();
        let src = tempdir().unwrap();

        let mut root = new_root(view.path().to_path_buf());
        add_dir(
            &mut root.sub_mount_points,
            Dir {
                arg: "a".into(),
                source: src.path().to_path_buf(),
                workdir: None,
                target_relative: "etc".into(),
            },
            "etc".to_string(),
        )
        .unwrap();

        prepare_sub_mounts(&mut root, view.path()).unwrap();
        assert!(view.path().join("etc").is_dir());
    }
}
