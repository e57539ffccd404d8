//! Symlink mode: the whole target path is one link to the source root.

use std::fs;
use std::io;
use std::path::Path;

use crate::manifest;
use crate::paths;

use super::{EngineError, ProjectReport, SyncOptions};

/// Drives the whole-target state machine.
///
/// | state       | action                                              |
/// |-------------|-----------------------------------------------------|
/// | `not_exist` | create the link                                     |
/// | `linked`    | no-op                                               |
/// | `broken`    | remove, recreate                                    |
/// | `conflict`  | fail without `force`; replace with it               |
/// | `has_files` | migrate contents into source, then link             |
pub(crate) fn project(
    target_path: &Path,
    source_root: &Path,
    opts: SyncOptions,
) -> Result<ProjectReport, EngineError> {
    let mut report = ProjectReport::default();
    let label = target_path.to_string_lossy().into_owned();

    let meta = match fs::symlink_metadata(target_path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            if !opts.dry_run {
                if let Some(parent) = target_path.parent() {
                    fs::create_dir_all(parent)?;
                }
                paths::create_link(target_path, source_root)?;
            }
            report.linked.push(label);
            return Ok(report);
        }
        Err(e) => return Err(e.into()),
        Ok(meta) => meta,
    };

    if paths::is_link(target_path) {
        match paths::resolve_link(target_path) {
            Ok(dest) if dest.exists() => {
                if paths::paths_equal(&dest, source_root) {
                    report.linked.push(label);
                } else if opts.force {
                    if !opts.dry_run {
                        paths::remove_link(target_path)?;
                        paths::create_link(target_path, source_root)?;
                    }
                    report.updated.push(label);
                } else {
                    return Err(EngineError::Conflict {
                        path: target_path.to_path_buf(),
                        reason: format!("symlink points elsewhere: {}", dest.display()),
                    });
                }
            }
            // Broken: the link exists but its target does not resolve.
            _ => {
                if !opts.dry_run {
                    paths::remove_link(target_path)?;
                    paths::create_link(target_path, source_root)?;
                }
                report.updated.push(label);
            }
        }
        return Ok(report);
    }

    if meta.is_dir() {
        if !opts.dry_run {
            migrate_into_source(target_path, source_root)?;
            fs::remove_dir_all(target_path)?;
            paths::create_link(target_path, source_root)?;
        }
        report.updated.push(label);
        return Ok(report);
    }

    Err(EngineError::Conflict {
        path: target_path.to_path_buf(),
        reason: "target exists and is not a directory".into(),
    })
}

/// Moves the target's contents into the source before conversion.
///
/// Merging: entries already present in source are skipped, nothing is
/// overwritten. The manifest file never migrates. Rename first; a
/// cross-device failure falls back to copy-then-remove.
fn migrate_into_source(target_path: &Path, source_root: &Path) -> Result<(), EngineError> {
    fs::create_dir_all(source_root)?;
    for entry in fs::read_dir(target_path)? {
        let entry = entry?;
        let name = entry.file_name();
        if name == manifest::MANIFEST_FILE {
            fs::remove_file(entry.path())?;
            continue;
        }
        let dest = source_root.join(&name);
        if dest.exists() {
            tracing::debug!(entry = %name.to_string_lossy(), "exists in source, not migrated");
            continue;
        }
        let from = entry.path();
        if fs::rename(&from, &dest).is_err() {
            // Cross-device move: copy then remove.
            let meta = fs::symlink_metadata(&from)?;
            if meta.is_dir() && !meta.file_type().is_symlink() {
                crate::fsutil::copy_tree(&from, &dest)?;
                fs::remove_dir_all(&from)?;
            } else if meta.file_type().is_symlink() {
                // A link is cheap to recreate on the other device.
                let link_dest = paths::resolve_link(&from)?;
                paths::create_link(&dest, &link_dest)?;
                paths::remove_link(&from)?;
            } else {
                fs::copy(&from, &dest)?;
                fs::remove_file(&from)?;
            }
        }
    }
    Ok(())
}
