//! Minimal `/proc/mounts` reader.
//!
//! Only one query is needed anywhere in this crate — "what's the longest
//! mount point path under this prefix" — so this hand-rolls that instead of
//! pulling in a full mount-table crate; grounded on `get_biggest_mount` in
//! the original `clean.c`, which does the same linear scan over `setmntent`.

use std::path::PathBuf;

use anyhow::{Context, Result};

/// Unescape the octal escapes (`\040`, `\011`, `\012`, `\134`) `/proc/mounts`
/// uses for spaces, tabs, newlines and backslashes in paths — the same
/// encoding `getmntent(3)` decodes for its callers.
fn unescape_field(raw: &str) -> String {
    let chars: Vec<char> = raw.chars().collect();
    let mut out = String::with_capacity(raw.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '\\'
            && i + 4 <= chars.len()
            && chars[i + 1..i + 4].iter().all(|c| c.is_digit(8))
        {
            let octal: String = chars[i + 1..i + 4].iter().collect();
            if let Ok(value) = u8::from_str_radix(&octal, 8) {
                out.push(value as char);
                i += 4;
                continue;
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

/// Among all mount points currently under `/proc/mounts` whose path starts
/// with `prefix` (a raw byte-prefix test, same as the original's `strncmp`),
/// return the longest one — the mount deepest in the tree, which must be
/// unmounted before anything above it can be.
pub fn biggest_mount_under(prefix: &str) -> Result<Option<PathBuf>> {
    let contents =
        std::fs::read_to_string("/proc/mounts").context("reading /proc/mounts failed")?;

    let mut biggest: Option<String> = None;
    for line in contents.lines() {
        let mut fields = line.split(' ');
        let Some(_device) = fields.next() else {
            continue;
        };
        let Some(raw_mount_point) = fields.next() else {
            continue;
        };
        let mount_point = unescape_field(raw_mount_point);
        if !mount_point.starts_with(prefix) {
            continue;
        }
        if biggest.as_ref().is_none_or(|b| mount_point.len() > b.len()) {
            biggest = Some(mount_point);
        }
    }

    Ok(biggest.map(PathBuf::from))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unescape_decodes_space() {
        assert_eq!(unescape_field(r"/mnt/my\040dir"), "/mnt/my dir");
    }

    #[test]
    fn unescape_leaves_plain_paths_alone() {
        assert_eq!(unescape_field("/mnt/plain"), "/mnt/plain");
    }
}
