//! Merge mode: one link per skill inside a real target directory.

use std::fs;
use std::io;
use std::path::Path;

use crate::discover::Skill;
use crate::fsutil;
use crate::manifest::{MANAGED_SYMLINK, Manifest};
use crate::paths;

use super::{EngineError, ProjectReport, SkillFailure, SyncOptions};

/// Projects the filtered skill set as per-skill links.
///
/// | observed state at `<target>/<flat_name>` | no force        | force    |
/// |------------------------------------------|-----------------|----------|
/// | absent                                   | link, record    | same     |
/// | link to the exact source skill           | linked          | same     |
/// | link pointing elsewhere                  | replace, update | same     |
/// | real directory or file                   | skip            | replace  |
///
/// Entries outside the filtered set are prune's business, not ours.
pub(crate) fn project(
    target_path: &Path,
    source_root: &Path,
    skills: &[&Skill],
    man: &mut Manifest,
    opts: SyncOptions,
) -> Result<ProjectReport, EngineError> {
    let mut report = ProjectReport::default();

    let converted = convert_self_link(target_path, source_root, opts)?;
    if !opts.dry_run {
        fs::create_dir_all(target_path)?;
    }

    for skill in skills {
        let name = skill.flat_name.as_str();
        let entry = target_path.join(name);
        if converted && opts.dry_run {
            // The self-link would have been replaced by an empty directory,
            // so every skill classifies as a fresh link. Probing through the
            // still-present link would misreport real source dirs as local.
            report.linked.push(name.to_string());
            man.managed
                .insert(name.to_string(), MANAGED_SYMLINK.to_string());
            continue;
        }
        match project_one(&entry, skill, opts) {
            Ok(outcome) => {
                match outcome {
                    Outcome::Linked => report.linked.push(name.to_string()),
                    Outcome::Updated => report.updated.push(name.to_string()),
                    Outcome::Skipped => {
                        report.skipped.push(name.to_string());
                        // A skipped entry is user-local; it must not linger
                        // in the manifest as ours.
                        man.forget(name);
                        continue;
                    }
                }
                man.managed
                    .insert(name.to_string(), MANAGED_SYMLINK.to_string());
                man.mtimes.remove(name);
            }
            Err(err) => report.failed.push(SkillFailure {
                name: name.to_string(),
                error: err.to_string(),
            }),
        }
    }

    Ok(report)
}

enum Outcome {
    Linked,
    Updated,
    Skipped,
}

fn project_one(entry: &Path, skill: &Skill, opts: SyncOptions) -> io::Result<Outcome> {
    let meta = match fs::symlink_metadata(entry) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            if !opts.dry_run {
                paths::create_link(entry, &skill.source_path)?;
            }
            return Ok(Outcome::Linked);
        }
        Err(e) => return Err(e),
        Ok(meta) => meta,
    };

    if meta.file_type().is_symlink() || paths::is_link(entry) {
        let correct = paths::resolve_link(entry)
            .is_ok_and(|dest| paths::paths_equal(&dest, &skill.source_path));
        if correct {
            return Ok(Outcome::Linked);
        }
        // Wrong or broken link: ours to fix regardless of force.
        if !opts.dry_run {
            paths::remove_link(entry)?;
            paths::create_link(entry, &skill.source_path)?;
        }
        return Ok(Outcome::Updated);
    }

    // Real directory or file.
    if opts.force {
        if !opts.dry_run {
            fsutil::remove_entry(entry)?;
            paths::create_link(entry, &skill.source_path)?;
        }
        Ok(Outcome::Updated)
    } else {
        Ok(Outcome::Skipped)
    }
}

/// Pre-step: a whole-target symlink pointing at the source must give way to
/// a real directory before per-skill links can exist. An external symlink
/// is preserved — the engine then operates through it.
fn convert_self_link(
    target_path: &Path,
    source_root: &Path,
    opts: SyncOptions,
) -> Result<bool, EngineError> {
    if !paths::is_link(target_path) {
        return Ok(false);
    }
    let to_source = paths::resolve_link(target_path)
        .is_ok_and(|dest| paths::paths_equal(&dest, source_root));
    if to_source && !opts.dry_run {
        paths::remove_link(target_path)?;
        fs::create_dir_all(target_path)?;
    }
    Ok(to_source)
}
