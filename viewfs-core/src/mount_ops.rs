//! Thin, logged wrappers around the handful of `mount(2)`/`mkdir(2)` calls
//! the driver needs, built on `rustix`'s mount bindings (the same crate the
//! teacher codebase uses for its own bind/overlay/tmpfs mounts).

use std::ffi::CString;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rustix::fs::{Mode, mkdir};
use rustix::mount::{MountFlags, mount, mount_bind};

/// `mkdir -p <path>` at mode `0755`.
///
/// Mirrors `mkdirs_helper` from the original `mkview.c`: if `path` already
/// exists and is a directory, this is a no-op success; if it exists and is
/// not a directory, it's an error; otherwise the parent is ensured first
/// and then `path` itself is created. Reaching the filesystem root without
/// finding an existing directory along the way is a failure — `/` itself
/// is never created.
pub fn mkdir_p(path: &Path) -> Result<()> {
    match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => return Ok(()),
        Ok(_) => anyhow::bail!("'{}' exists but is not a directory", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e).with_context(|| format!("stat '{}' failed", path.display())),
    }

    match path.parent() {
        None => anyhow::bail!(
            "failed to create directory '{}': reached the filesystem root",
            path.display()
        ),
        Some(parent) if parent.as_os_str().is_empty() => {}
        Some(parent) => mkdir_p(parent)?,
    }

    log::info!("mkdir -m 0755 {}", path.display());
    mkdir(path, Mode::from_raw_mode(0o755))
        .with_context(|| format!("mkdir '{}' failed", path.display()))?;
    Ok(())
}

/// Bind-mount `source` onto `target`.
pub fn bind_mount(source: &Path, target: &Path) -> Result<()> {
    log::info!("mount --bind {} {}", source.display(), target.display());
    mount_bind(source, target)
        .with_context(|| format!("bind mount {} -> {} failed", source.display(), target.display()))
}

/// Mount an anonymous `tmpfs` at `target`, used as a scaffold to hold
/// directories for sub-mount-points when no contributing dir already hosts
/// them.
pub fn mount_tmpfs(target: &Path) -> Result<()> {
    log::info!("mount -t tmpfs tmpfs {}", target.display());
    mount(
        "tmpfs",
        target,
        "tmpfs",
        MountFlags::empty(),
        None::<&std::ffi::CStr>,
    )
    .with_context(|| format!("mount tmpfs on '{}' failed", target.display()))
}

/// Mount an overlay at `target` over `lower_dirs` (insertion order), with
/// an optional `(upperdir, workdir)` pair.
///
/// Options string is bit-exact: `lowerdir=<a>:<b>:…[,upperdir=<u>,workdir=<w>]`,
/// filesystem type `overlay`, source the literal `none`, flags zero — the
/// single `mount(2)` call form, not the newer `fsopen`/`fsmount` API.
pub fn mount_overlay(
    lower_dirs: &[PathBuf],
    upper: Option<(&Path, &Path)>,
    target: &Path,
) -> Result<()> {
    let lowerdir_list = lower_dirs
        .iter()
        .map(|p| p.to_string_lossy())
        .collect::<Vec<_>>()
        .join(":");
    let mut options = format!("lowerdir={lowerdir_list}");
    if let Some((upperdir, workdir)) = upper {
        options.push_str(&format!(
            ",upperdir={},workdir={}",
            upperdir.display(),
            workdir.display()
        ));
    }

    log::info!(
        "mount -t overlay none {} -o {}",
        target.display(),
        options
    );

    let data = CString::new(options.clone()).context("overlay options contain a NUL byte")?;
    mount(
        "none",
        target,
        "overlay",
        MountFlags::empty(),
        Some(data.as_c_str()),
    )
    .with_context(|| format!("overlay mount on '{}' failed (options: {options})", target.display()))
}

/// Remount a bind mount read-only (`MS_REMOUNT | MS_BIND | MS_RDONLY`).
///
/// Not called anywhere yet: per the base design, lower (non-upper) bind
/// mounts remain writable through the view even though they conceptually
/// shouldn't be. This wrapper exists so the follow-up is a one-line call
/// site change rather than a new syscall wrapper.
#[allow(dead_code)]
pub fn remount_bind_readonly(target: &Path) -> Result<()> {
    use rustix::mount::mount_remount;
    mount_remount(target, MountFlags::BIND | MountFlags::RDONLY, "")
        .with_context(|| format!("remount '{}' read-only failed", target.display()))
}
