//! A single contributing source directory (`Dir`) and parsing of the
//! `mkview` command-line `dir_spec` grammar:
//! `[<workdir> ','] <source> [ ':' <target_relative> ]`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use crate::pathutil::{lstrip, normalize_relative};

/// A contributing source directory, parsed from one `dir_spec` argument.
#[derive(Debug, Clone)]
pub struct Dir {
    /// The unparsed token as given on the command line, kept for diagnostics.
    pub arg: String,
    /// Canonical absolute path of an existing directory (symlinks resolved).
    pub source: PathBuf,
    /// When present, this dir is writable and is the overlay's `upperdir`;
    /// `workdir` is overlay scratch space colocated with `source`.
    pub workdir: Option<PathBuf>,
    /// Slash-separated path relative to the view root. Never starts with
    /// `/`, contains no `.`/`..` components and no empty segments.
    pub target_relative: String,
}

impl Dir {
    /// Build the view root's special `Dir`: `source` is the user-supplied
    /// view directory, `target_relative` is empty, and `workdir` is never
    /// meaningful for it.
    pub fn view_root(source: PathBuf) -> Self {
        Self {
            arg: source.to_string_lossy().into_owned(),
            source,
            workdir: None,
            target_relative: String::new(),
        }
    }

    /// A synthesized `Dir` standing in for a tmpfs scaffold mounted to hold
    /// directories for otherwise-unhosted sub-mount-points. `source` is the
    /// scaffold's own absolute target — it is now one of the node's own
    /// backing directories.
    pub fn scaffold(absolute_target: PathBuf) -> Self {
        let arg = absolute_target.to_string_lossy().into_owned();
        Self {
            arg,
            source: absolute_target,
            workdir: None,
            target_relative: String::new(),
        }
    }
}

/// Parse one `dir_spec` command-line token into a `Dir` plus the
/// `target_relative` the planner should insert it at.
///
/// Grammar: `[<workdir> ','] <source> [ ':' <target_relative> ]`. If
/// `:<target_relative>` is absent, the target defaults to `<source>`
/// (canonicalized) with any leading `/` stripped.
pub fn parse_dir_spec(arg: &str) -> Result<Dir> {
    let mut rest = arg;

    let workdir = if let Some(comma_at) = rest.find(',') {
        let workdir_str = &rest[..comma_at];
        rest = &rest[comma_at + 1..];
        Some(PathBuf::from(workdir_str))
    } else {
        None
    };

    let (source_str, explicit_target) = match rest.find(':') {
        Some(colon_at) => (&rest[..colon_at], Some(&rest[colon_at + 1..])),
        None => (rest, None),
    };

    if source_str.is_empty() {
        bail!("invalid dir spec '{arg}': empty source path");
    }

    let source_path = Path::new(source_str);
    let metadata = std::fs::metadata(source_path)
        .with_context(|| format!("source directory '{source_str}' does not exist"))?;
    if !metadata.is_dir() {
        bail!("source '{source_str}' is not a directory");
    }

    let source = std::fs::canonicalize(source_path)
        .with_context(|| format!("realpath('{source_str}') failed"))?;

    let target_relative = match explicit_target {
        Some(t) => normalize_relative(t)
            .with_context(|| format!("invalid target in dir spec '{arg}'"))?,
        None => lstrip(&source.to_string_lossy(), '/').to_string(),
    };

    if let Some(workdir) = &workdir
        && !workdir.is_dir()
    {
        bail!("workdir '{}' is not a directory", workdir.display());
    }

    Ok(Dir {
        arg: arg.to_string(),
        source,
        workdir,
        target_relative,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn plain_source_defaults_target_to_realpath() {
        let tmp = tempdir().unwrap();
        let spec = tmp.path().to_string_lossy().into_owned();
        let dir = parse_dir_spec(&spec).unwrap();
        assert!(dir.workdir.is_none());
        assert_eq!(dir.target_relative, lstrip(&dir.source.to_string_lossy(), '/'));
    }

    #[test]
    fn explicit_target_is_used() {
        let tmp = tempdir().unwrap();
        let spec = format!("{}:data", tmp.path().display());
        let dir = parse_dir_spec(&spec).unwrap();
        assert_eq!(dir.target_relative, "data");
    }

    #[test]
    fn workdir_prefix_is_parsed() {
        let tmp_src = tempdir().unwrap();
        let tmp_work = tempdir().unwrap();
        let spec = format!("{},{}:share", tmp_work.path().display(), tmp_src.path().display());
        let dir = parse_dir_spec(&spec).unwrap();
        assert_eq!(dir.workdir.as_deref(), Some(tmp_work.path()));
        assert_eq!(dir.target_relative, "share");
    }

    #[test]
    fn target_cannot_start_with_slash() {
        let tmp = tempdir().unwrap();
        let spec = format!("{}:/abs", tmp.path().display());
        assert!(parse_dir_spec(&spec).is_err());
    }

    #[test]
    fn missing_source_is_an_error() {
        assert!(parse_dir_spec("/does/not/exist").is_err());
    }
}
