//! Copy mode: one content copy per skill, fingerprinted in the manifest.
//!
//! The per-skill fast path compares the recorded max source mtime before
//! hashing anything; a skill containing symlinks opts out of it because a
//! link target's mtime does not propagate to the link.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::checksum::{self, ChecksumError};
use crate::discover::Skill;
use crate::manifest::Manifest;
use crate::paths;

use super::{EngineError, ProjectReport, SkillFailure, SyncOptions};

pub(crate) fn project(
    target_path: &Path,
    skills: &[&Skill],
    man: &mut Manifest,
    opts: SyncOptions,
) -> Result<ProjectReport, EngineError> {
    let mut report = ProjectReport::default();
    if !opts.dry_run {
        fs::create_dir_all(target_path)?;
    }

    for skill in skills {
        let name = skill.flat_name.as_str();
        match project_one(target_path, skill, man, opts) {
            Ok(Outcome::Copied) => report.copied.push(name.to_string()),
            Ok(Outcome::Updated) => report.updated.push(name.to_string()),
            Ok(Outcome::Skipped) => report.skipped.push(name.to_string()),
            Err(err) => report.failed.push(SkillFailure {
                name: name.to_string(),
                error: err.to_string(),
            }),
        }
    }

    Ok(report)
}

enum Outcome {
    Copied,
    Updated,
    Skipped,
}

fn project_one(
    target_path: &Path,
    skill: &Skill,
    man: &mut Manifest,
    opts: SyncOptions,
) -> Result<Outcome, EngineError> {
    let name = skill.flat_name.as_str();
    let entry = target_path.join(name);

    let current_mtime = checksum::dir_max_mtime(&skill.source_path)?;
    let old_mtime = man.mtimes.get(name).copied().unwrap_or(0);

    // Fast path: managed, mtime recorded and unchanged, and the target entry
    // is still a real directory. No hashing, no reads.
    if !opts.force
        && man.is_managed(name)
        && old_mtime > 0
        && current_mtime == Some(old_mtime)
        && entry.is_dir()
        && !paths::is_link(&entry)
    {
        return Ok(Outcome::Skipped);
    }

    let source_checksum = checksum::dir_checksum(&skill.source_path)?;
    let old_checksum = man.managed.get(name).cloned();

    let meta = fs::symlink_metadata(&entry);
    let outcome = match meta {
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            copy_in(&entry, skill, opts)?;
            Outcome::Copied
        }
        Err(e) => return Err(e.into()),
        Ok(_) if paths::is_link(&entry) => {
            // Copy mode owns a real directory; a link gives way.
            if !opts.dry_run {
                paths::remove_link(&entry)?;
            }
            copy_in(&entry, skill, opts)?;
            Outcome::Updated
        }
        Ok(meta) if !meta.is_dir() => {
            if man.is_managed(name) || opts.force {
                if !opts.dry_run {
                    fs::remove_file(&entry)?;
                }
                copy_in(&entry, skill, opts)?;
                Outcome::Updated
            } else {
                return Ok(Outcome::Skipped);
            }
        }
        Ok(_) => {
            // Real directory.
            if !opts.force && old_checksum.as_deref() == Some(source_checksum.as_str()) {
                // Content identical; just refresh the recorded mtime.
                if !opts.dry_run {
                    set_mtime(man, name, current_mtime);
                }
                return Ok(Outcome::Skipped);
            }
            if man.is_managed(name) || opts.force {
                if !opts.dry_run {
                    fs::remove_dir_all(&entry)?;
                }
                copy_in(&entry, skill, opts)?;
                Outcome::Updated
            } else {
                // Unmanaged local directory: preserved.
                return Ok(Outcome::Skipped);
            }
        }
    };

    if !opts.dry_run {
        man.managed.insert(name.to_string(), source_checksum);
        set_mtime(man, name, current_mtime);
    }
    Ok(outcome)
}

fn set_mtime(man: &mut Manifest, name: &str, current: Option<i64>) {
    match current {
        Some(ns) => {
            man.mtimes.insert(name.to_string(), ns);
        }
        // Symlinks in the source disable the fast path entirely.
        None => {
            man.mtimes.remove(name);
        }
    }
}

fn copy_in(entry: &Path, skill: &Skill, opts: SyncOptions) -> Result<(), EngineError> {
    if opts.dry_run {
        return Ok(());
    }
    copy_skill_tree(&skill.source_path, entry).map_err(|err| match err {
        ChecksumError::LinkCycle(p) => EngineError::LinkCycle(p),
        ChecksumError::Io(e) => EngineError::Io(e),
    })
}

/// Recursively copies a skill, dereferencing directory symlinks once each
/// (guarded against cycles by the canonicalized recursion stack) and
/// reading file symlinks through to their content. `.git` never copies.
fn copy_skill_tree(src: &Path, dst: &Path) -> Result<(), ChecksumError> {
    let mut stack: Vec<PathBuf> = vec![fs::canonicalize(src)?];
    copy_level(src, dst, &mut stack)
}

fn copy_level(src: &Path, dst: &Path, stack: &mut Vec<PathBuf>) -> Result<(), ChecksumError> {
    fs::create_dir_all(dst)?;
    let mut entries: Vec<_> = fs::read_dir(src)?.collect::<Result<_, _>>()?;
    entries.sort_by_key(std::fs::DirEntry::file_name);

    for entry in entries {
        let name = entry.file_name();
        if name == ".git" {
            continue;
        }
        let from = entry.path();
        let to = dst.join(&name);
        let meta = fs::symlink_metadata(&from)?;

        if meta.file_type().is_symlink() {
            let target_meta = fs::metadata(&from)?;
            if target_meta.is_dir() {
                let canon = fs::canonicalize(&from)?;
                if stack.contains(&canon) {
                    return Err(ChecksumError::LinkCycle(from));
                }
                stack.push(canon);
                copy_level(&from, &to, stack)?;
                stack.pop();
            } else {
                fs::copy(&from, &to)?;
            }
        } else if meta.is_dir() {
            copy_level(&from, &to, stack)?;
        } else {
            fs::copy(&from, &to)?;
        }
    }
    Ok(())
}
