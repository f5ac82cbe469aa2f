//! Planning and mount-driving logic shared by `mkview` and `rmr`.
//!
//! A view is built from a flat list of source directories, each mapped to a
//! path relative to a fresh view root. [`planner`] and [`mount_point`] turn
//! that flat list into a tree of [`mount_point::MountPoint`]s; [`driver`]
//! walks the tree issuing the `mkdir`/bind-mount/overlay-mount calls needed
//! to realize it; [`teardown`] walks an existing view back down, unmounting
//! and deleting as it goes.

pub mod dir;
pub mod driver;
pub mod logging;
pub mod mount_ops;
pub mod mount_point;
pub mod pathutil;
pub mod planner;
pub mod procmounts;
pub mod teardown;

pub use dir::{Dir, parse_dir_spec};
pub use driver::{init_root_dir, log_tree, make_sub_mount_points, new_root};
pub use mount_point::MountPoint;
pub use planner::add_dir;
pub use teardown::rmtree;
