//! `mkview` — build a root-filesystem view out of bind and overlay mounts.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use viewfs_core::dir::parse_dir_spec;
use viewfs_core::driver::{init_root_dir, log_tree, make_sub_mount_points, new_root, prepare_sub_mounts};
use viewfs_core::pathutil::rstrip;
use viewfs_core::planner::add_dir;

/// Create a "root-filesystem view" out of the given directories.
///
/// The view is made up of various bind and overlay mounts. It can be torn
/// down again with `rmr <view_dir>` without removing anything from the
/// source directories.
#[derive(Parser)]
#[command(name = "mkview", version, about, long_about = None)]
struct Args {
    /// Directory to create the view in. Must not already exist, or must be
    /// an empty directory.
    view_dir: String,

    /// One or more `[<workdir>,]<dir>[:<target_relative>]` directory specs.
    ///
    /// If <workdir> is given, <dir> is writable and becomes the upper
    /// directory of an overlay. <target_relative> is where <dir> is exposed
    /// in the view; if omitted it defaults to <dir>'s own absolute path
    /// with the leading '/' stripped. <target_relative> must not itself
    /// begin with '/'.
    #[arg(required = true, value_name = "DIR")]
    dirs: Vec<String>,

    /// Enable debug-level logging.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    viewfs_core::logging::init(args.verbose);

    let view_root = PathBuf::from(rstrip(&args.view_dir, '/'));

    init_root_dir(&view_root)
        .with_context(|| format!("could not prepare view root '{}'", view_root.display()))?;

    let mut root = new_root(view_root.clone());
    for arg in &args.dirs {
        let dir = parse_dir_spec(arg).with_context(|| format!("invalid directory spec '{arg}'"))?;
        let target_relative = dir.target_relative.clone();
        add_dir(&mut root.sub_mount_points, dir, target_relative)?;
    }

    log::info!("{}", "-".repeat(80));
    log::info!("MOUNT TREE");
    log::info!("{}", "-".repeat(80));
    log_tree(&root.sub_mount_points, 0);
    log::info!("{}", "-".repeat(80));

    prepare_sub_mounts(&mut root, &view_root)?;
    make_sub_mount_points(&mut root, &view_root)?;

    Ok(())
}
