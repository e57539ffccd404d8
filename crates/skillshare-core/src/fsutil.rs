//! Small filesystem helpers shared across the engine, backup, and collection.

use std::fs::{self, Metadata};
use std::io;
use std::path::Path;
use std::time::UNIX_EPOCH;

use crate::paths;

/// Modification time as nanoseconds since the Unix epoch, or 0 when the
/// platform cannot report one.
pub fn mtime_ns(meta: &Metadata) -> i64 {
    meta.modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map_or(0, |d| d.as_nanos() as i64)
}

/// Returns true iff `path` is a directory with no entries at all.
pub fn dir_is_empty(path: &Path) -> io::Result<bool> {
    Ok(fs::read_dir(path)?.next().is_none())
}

/// Removes whatever sits at `path`: a link is unlinked, a directory is
/// removed recursively, a file is deleted. Missing paths are a no-op.
pub fn remove_entry(path: &Path) -> io::Result<()> {
    let meta = match fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    if meta.file_type().is_symlink() {
        paths::remove_link(path)
    } else if meta.is_dir() {
        #[cfg(windows)]
        {
            // Junctions stat as directories; unlink them instead of recursing
            // into the link target.
            if paths::is_link(path) {
                return paths::remove_link(path);
            }
        }
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

/// Recursively copies `src` into `dst`, skipping symlinks at every depth.
///
/// Returns the number of bytes copied. `dst` is created if missing; existing
/// files are overwritten, extra files in `dst` are left alone.
pub fn copy_tree(src: &Path, dst: &Path) -> io::Result<u64> {
    let mut copied = 0;
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let from = entry.path();
        let meta = fs::symlink_metadata(&from)?;
        if meta.file_type().is_symlink() {
            continue;
        }
        let to = dst.join(entry.file_name());
        if meta.is_dir() {
            copied += copy_tree(&from, &to)?;
        } else {
            copied += fs::copy(&from, &to)?;
        }
    }
    Ok(copied)
}

/// Total size in bytes of all regular files under `path` (symlinks skipped).
pub fn tree_size(path: &Path) -> u64 {
    walkdir::WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}
