//! Content fingerprints for copy mode.
//!
//! A skill's checksum is the SHA-256 over its sorted `(rel_path, content)`
//! pairs, `.git` excluded. Directory symlinks are dereferenced, with cycle
//! detection via the set of canonicalized paths in the current recursion
//! stack. The companion [`dir_max_mtime`] feeds the copy-mode fast path and
//! is disabled the moment any symlink appears (a link target's mtime does
//! not propagate to the link).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::fsutil;

/// Errors from checksum computation.
#[derive(Error, Debug)]
pub enum ChecksumError {
    /// A directory-symlink cycle; fatal for the skill, reported with the
    /// first offending path.
    #[error("symlink cycle detected at {0}")]
    LinkCycle(PathBuf),

    /// Any other filesystem failure.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// SHA-256 hex over the directory's sorted `(rel_path, content)` pairs.
pub fn dir_checksum(dir: &Path) -> Result<String, ChecksumError> {
    let mut files: Vec<(String, PathBuf)> = Vec::new();
    let mut stack: Vec<PathBuf> = Vec::new();
    push_dir(dir, &mut stack)?;
    collect_files(dir, "", &mut files, &mut stack)?;
    files.sort_by(|a, b| a.0.cmp(&b.0));

    let mut hasher = Sha256::new();
    for (rel, path) in files {
        hasher.update(rel.as_bytes());
        hasher.update([0u8]);
        hasher.update(fs::read(&path)?);
        hasher.update([0u8]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Maximum mtime (nanoseconds since epoch) among all files under `dir`,
/// `.git` skipped. Returns `None` when the skill contains any symbolic
/// link, which disables the copy-mode fast path for that skill.
pub fn dir_max_mtime(dir: &Path) -> io::Result<Option<i64>> {
    let mut max = 0i64;
    for entry in walkdir::WalkDir::new(dir)
        .min_depth(1)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| !(e.file_type().is_dir() && e.file_name() == ".git"))
    {
        let entry = entry.map_err(io::Error::other)?;
        if entry.file_type().is_symlink() {
            return Ok(None);
        }
        if entry.file_type().is_file() {
            let meta = entry.metadata().map_err(io::Error::other)?;
            max = max.max(fsutil::mtime_ns(&meta));
        }
    }
    Ok(Some(max))
}

fn push_dir(dir: &Path, stack: &mut Vec<PathBuf>) -> Result<(), ChecksumError> {
    let canon = fs::canonicalize(dir)?;
    if stack.contains(&canon) {
        return Err(ChecksumError::LinkCycle(dir.to_path_buf()));
    }
    stack.push(canon);
    Ok(())
}

fn collect_files(
    dir: &Path,
    prefix: &str,
    out: &mut Vec<(String, PathBuf)>,
    stack: &mut Vec<PathBuf>,
) -> Result<(), ChecksumError> {
    let mut entries: Vec<_> = fs::read_dir(dir)?.collect::<Result<_, _>>()?;
    entries.sort_by_key(std::fs::DirEntry::file_name);

    for entry in entries {
        let name = entry.file_name();
        if name == ".git" {
            continue;
        }
        let path = entry.path();
        let name = name.to_string_lossy();
        let rel = if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{prefix}/{name}")
        };

        let meta = fs::symlink_metadata(&path)?;
        if meta.file_type().is_symlink() {
            // Dereference: a link to a directory recurses (guarded), a link
            // to a file contributes the pointed-to content.
            let target_meta = fs::metadata(&path)?;
            if target_meta.is_dir() {
                push_dir(&path, stack)?;
                collect_files(&path, &rel, out, stack)?;
                stack.pop();
            } else {
                out.push((rel, path));
            }
        } else if meta.is_dir() {
            push_dir(&path, stack)?;
            collect_files(&path, &rel, out, stack)?;
            stack.pop();
        } else {
            out.push((rel, path));
        }
    }
    Ok(())
}
