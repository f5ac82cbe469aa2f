//! `inroot` — run a command with a view directory as its apparent root.

use std::env;
use std::ffi::CString;
use std::os::unix::process::CommandExt;
use std::process::Command;

use anyhow::{Context, Result};
use clap::Parser;

/// Run the given command as if <root_dir> were its root directory.
#[derive(Parser)]
#[command(name = "inroot", version, about, long_about = None)]
struct Args {
    /// Directory to chroot into.
    root_dir: String,

    /// Command (and its own arguments) to run inside <root_dir>.
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let args = Args::parse();
    let cwd = env::current_dir().context("getcwd failed")?;

    rustix::process::chdir(&args.root_dir)
        .with_context(|| format!("chdir '{}' failed", args.root_dir))?;

    // rustix has no chroot wrapper; it's a rare enough syscall that libc's
    // raw binding is the pragmatic choice here.
    let dot = CString::new(".").expect("no interior NUL");
    if unsafe { libc::chroot(dot.as_ptr()) } != 0 {
        return Err(std::io::Error::last_os_error())
            .with_context(|| format!("chroot '{}' failed", args.root_dir));
    }

    rustix::process::chdir(&cwd)
        .with_context(|| format!("chdir '{}' after chroot failed", cwd.display()))?;

    let error = Command::new(&args.command[0]).args(&args.command[1..]).exec();
    Err(error).context("execvp failed")
}
