//! `rmr` — unmount and recursively remove a view tree built by `mkview`,
//! without crossing into foreign filesystems or destructively traversing
//! into bind-mounted source directories.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;

use viewfs_core::teardown::rmtree;

/// Unmount and remove all directories/files in each given directory.
#[derive(Parser)]
#[command(name = "rmr", version, about, long_about = None)]
struct Args {
    /// View directories to tear down.
    #[arg(required = true, value_name = "DIR")]
    dirs: Vec<String>,

    /// Enable debug-level logging.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    viewfs_core::logging::init(args.verbose);

    let mut error_count: u32 = 0;

    for dir_arg in &args.dirs {
        let path = Path::new(dir_arg);
        match std::fs::symlink_metadata(path) {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // A missing argument is not an error here: unlike the base
                // design (which stopped at the first missing argument),
                // this skips it and keeps tearing down the rest.
                log::info!("'{}' does not exist, skipping", path.display());
                continue;
            }
            Err(e) => {
                return Err(e).with_context(|| format!("stat '{}' failed", path.display()));
            }
        }

        match rmtree(path) {
            Ok(n) => error_count += n,
            Err(e) => {
                log::error!("{e:#}");
                error_count += 1;
            }
        }
    }

    if error_count == 0 {
        log::info!("Success");
    } else {
        log::warn!("{error_count} errors");
    }

    if error_count > 0 {
        std::process::exit(error_count.min(255) as i32);
    }
    Ok(())
}
