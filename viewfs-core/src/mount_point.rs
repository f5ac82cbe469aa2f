//! The mount-point tree: a forest of [`MountPoint`] nodes, each owning an
//! ordered stack of contributing [`Dir`]s and an ordered list of child
//! mount points strictly nested under it.

use std::path::PathBuf;

use bitflags::bitflags;

use crate::dir::Dir;

bitflags! {
    /// Per-node flags. Only one is meaningful today, but it is modeled as a
    /// bitset (as the original design does) rather than a lone bool so a
    /// future flag doesn't force a struct-shape change.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MountPointFlags: u8 {
        /// Set only on the root node: its own storage is writable and
        /// durable, so sub-mount directories can be `mkdir -p`'d directly
        /// against it instead of needing a tmpfs scaffold.
        const CAN_MKDIRS = 0x01;
    }
}

/// A node in the composition tree.
#[derive(Debug)]
pub struct MountPoint {
    /// Position within the view; empty string for the root.
    pub target_relative: String,
    /// Contributing source directories, in insertion order — this order is
    /// the overlay lower-stack order.
    pub dirs: Vec<Dir>,
    /// Child mount points, each strictly nested under this node.
    pub sub_mount_points: Vec<MountPoint>,
    pub flags: MountPointFlags,
    absolute_target: std::cell::OnceCell<PathBuf>,
}

impl MountPoint {
    /// Create a fresh single-dir node at `target_relative`.
    pub fn new(first_dir: Dir, target_relative: String) -> Self {
        Self {
            target_relative,
            dirs: vec![first_dir],
            sub_mount_points: Vec::new(),
            flags: MountPointFlags::empty(),
            absolute_target: std::cell::OnceCell::new(),
        }
    }

    /// The memoised absolute target path: the view root's own `source`
    /// joined with this node's `target_relative`.
    pub fn absolute_target(&self, view_root: &std::path::Path) -> &std::path::Path {
        self.absolute_target.get_or_init(|| {
            if self.target_relative.is_empty() {
                view_root.to_path_buf()
            } else {
                view_root.join(&self.target_relative)
            }
        })
    }

    /// Relative path of `descendant_target` with respect to `self`'s own
    /// target, leading `/` stripped. Used by `resolve_hosting_dir` to find
    /// where within each contributing dir a child mount point's content
    /// should already live.
    pub fn diff_to(&self, descendant_target: &str) -> &str {
        crate::pathutil::lstrip(&descendant_target[self.target_relative.len()..], '/')
    }
}
