//! Prune: removal of target entries the engine no longer owns or the
//! filters no longer admit.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::filter::SkillFilter;
use crate::fsutil;
use crate::manifest::Manifest;
use crate::paths;

use super::{EngineError, link_into_source};

/// The four disjoint prune outcomes (the fourth — kept because still
/// valid — is implicit).
#[derive(Debug, Clone, Default, Serialize)]
pub struct PruneReport {
    /// Entries removed: orphaned links, filtered-out managed entries,
    /// tracked orphan directories.
    pub removed: Vec<String>,
    /// External symlinks kept but flagged (removed under force).
    pub warnings: Vec<String>,
    /// Acknowledged user-local directories, kept.
    pub local_dirs: Vec<String>,
}

/// Inputs for one prune pass.
#[derive(Debug)]
pub struct PruneInput<'a> {
    /// Target directory.
    pub target_path: &'a Path,
    /// Source root links are judged against.
    pub source_root: &'a Path,
    /// Flat names of the current filtered skill set.
    pub valid_names: &'a HashSet<String>,
    /// The same compiled filter used for projection.
    pub filter: &'a SkillFilter,
    /// Tracked-repo names from lite discovery; part of the
    /// flat-name-shaped heuristic.
    pub tracked_repos: &'a [String],
    /// Remove external links instead of warning.
    pub force: bool,
    /// Classify without removing.
    pub dry_run: bool,
}

/// Walks every non-hidden entry of the target and applies the prune rules.
///
/// Never removes an entry whose name is in the current filtered set, and
/// never removes an unmanaged real directory unless its name is
/// flat-name-shaped (contains `__` or matches a tracked repo).
pub(crate) fn prune(
    input: &PruneInput<'_>,
    man: &mut Manifest,
) -> Result<PruneReport, EngineError> {
    let mut report = PruneReport::default();

    let entries = match fs::read_dir(input.target_path) {
        Ok(entries) => entries,
        // A target that does not exist has nothing to prune.
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(report),
        Err(e) => return Err(e.into()),
    };
    let mut names: Vec<String> = entries
        .filter_map(Result::ok)
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| !n.starts_with('.'))
        .collect();
    names.sort();

    for name in names {
        if input.valid_names.contains(&name) {
            continue;
        }
        let entry_path = input.target_path.join(&name);
        let is_link = paths::is_link(&entry_path);
        let into_source = is_link && link_into_source(&entry_path, input.source_root);

        if !input.filter.matches(&name) {
            // Outside the filter: only engine-owned entries go.
            if into_source || (!is_link && entry_path.is_dir() && man.is_managed(&name)) {
                remove(&entry_path, input.dry_run)?;
                man.forget(&name);
                report.removed.push(name);
            }
            continue;
        }

        // Inside the filter but no longer a known skill.
        if is_link {
            if into_source {
                // Orphan (live or broken) pointing at a skill that is gone.
                remove(&entry_path, input.dry_run)?;
                man.forget(&name);
                report.removed.push(name);
            } else if input.force {
                remove(&entry_path, input.dry_run)?;
                man.forget(&name);
                report.removed.push(name);
            } else {
                tracing::warn!(
                    entry = name.as_str(),
                    "external symlink in target, not removing"
                );
                report.warnings.push(name);
            }
        } else if entry_path.is_dir() {
            if man.is_managed(&name) {
                // Tracked orphan: a copy we made for a skill that is gone.
                remove(&entry_path, input.dry_run)?;
                man.forget(&name);
                report.removed.push(name);
            } else if looks_flat(&name, input.tracked_repos) {
                remove(&entry_path, input.dry_run)?;
                report.removed.push(name);
            } else {
                report.local_dirs.push(name);
            }
        }
        // Plain files are user-local; leave them.
    }

    Ok(report)
}

fn remove(path: &Path, dry_run: bool) -> std::io::Result<()> {
    if dry_run {
        return Ok(());
    }
    fsutil::remove_entry(path)
}

/// The flat-name-shaped heuristic: nested skills flatten with `__`, and a
/// tracked repo projects under its own name.
fn looks_flat(name: &str, tracked_repos: &[String]) -> bool {
    name.contains("__") || tracked_repos.iter().any(|r| r == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    struct Fixture {
        td: tempfile::TempDir,
        target: std::path::PathBuf,
        source: std::path::PathBuf,
    }

    fn fixture() -> Fixture {
        let td = tempdir().unwrap();
        let target = td.path().join("target");
        let source = td.path().join("source");
        fs::create_dir_all(&target).unwrap();
        fs::create_dir_all(&source).unwrap();
        Fixture {
            td,
            target,
            source,
        }
    }

    fn run(
        fx: &Fixture,
        valid: &[&str],
        man: &mut Manifest,
        force: bool,
    ) -> PruneReport {
        let valid: HashSet<String> = valid.iter().map(|v| (*v).to_string()).collect();
        let filter = SkillFilter::new(&[], &[]).unwrap();
        prune(
            &PruneInput {
                target_path: &fx.target,
                source_root: &fx.source,
                valid_names: &valid,
                filter: &filter,
                tracked_repos: &[],
                force,
                dry_run: false,
            },
            man,
        )
        .unwrap()
    }

    #[test]
    fn valid_names_are_never_touched() {
        let fx = fixture();
        fs::create_dir_all(fx.target.join("alpha")).unwrap();
        let mut man = Manifest::default();
        man.managed.insert("alpha".into(), "symlink".into());

        let report = run(&fx, &["alpha"], &mut man, false);
        assert!(report.removed.is_empty());
        assert!(fx.target.join("alpha").exists());
        assert!(man.is_managed("alpha"));
    }

    #[cfg(unix)]
    #[test]
    fn orphan_scenario_with_external_link_and_local_dir() {
        let fx = fixture();
        // X: link into source whose skill is gone.
        fs::create_dir_all(fx.source.join("gone")).unwrap();
        std::os::unix::fs::symlink(fx.source.join("gone"), fx.target.join("X")).unwrap();
        // Y: link to an unrelated location.
        let outside = fx.td.path().join("outside");
        fs::create_dir_all(&outside).unwrap();
        std::os::unix::fs::symlink(&outside, fx.target.join("Y")).unwrap();
        // Z: real user directory.
        fs::create_dir_all(fx.target.join("Z")).unwrap();

        let mut man = Manifest::default();
        let report = run(&fx, &[], &mut man, false);
        assert_eq!(report.removed, ["X"]);
        assert_eq!(report.warnings, ["Y"]);
        assert_eq!(report.local_dirs, ["Z"]);
        assert!(fx.target.join("Y").exists());
        assert!(fx.target.join("Z").exists());

        let forced = run(&fx, &[], &mut man, true);
        assert_eq!(forced.removed, ["Y"]);
        assert!(!fx.target.join("Y").exists());
    }

    #[cfg(unix)]
    #[test]
    fn broken_link_into_source_is_removed() {
        let fx = fixture();
        std::os::unix::fs::symlink(fx.source.join("vanished"), fx.target.join("stale"))
            .unwrap();

        let mut man = Manifest::default();
        let report = run(&fx, &[], &mut man, false);
        assert_eq!(report.removed, ["stale"]);
        assert!(!paths::is_link(&fx.target.join("stale")));
    }

    #[test]
    fn managed_directory_outside_skill_set_is_a_tracked_orphan() {
        let fx = fixture();
        fs::create_dir_all(fx.target.join("old-copy")).unwrap();
        let mut man = Manifest::default();
        man.managed.insert("old-copy".into(), "ab".repeat(32));
        man.mtimes.insert("old-copy".into(), 7);

        let report = run(&fx, &[], &mut man, false);
        assert_eq!(report.removed, ["old-copy"]);
        assert!(!man.is_managed("old-copy"));
        assert!(man.mtimes.is_empty());
    }

    #[test]
    fn flat_shaped_unmanaged_directory_is_removed() {
        let fx = fixture();
        fs::create_dir_all(fx.target.join("team__coding")).unwrap();
        fs::create_dir_all(fx.target.join("plain")).unwrap();

        let mut man = Manifest::default();
        let report = run(&fx, &[], &mut man, false);
        assert_eq!(report.removed, ["team__coding"]);
        assert_eq!(report.local_dirs, ["plain"]);
    }

    #[test]
    fn tracked_repo_names_count_as_flat_shaped() {
        let fx = fixture();
        fs::create_dir_all(fx.target.join("_team")).unwrap();

        let valid = HashSet::new();
        let filter = SkillFilter::new(&[], &[]).unwrap();
        let mut man = Manifest::default();
        let report = prune(
            &PruneInput {
                target_path: &fx.target,
                source_root: &fx.source,
                valid_names: &valid,
                filter: &filter,
                tracked_repos: &["_team".to_string()],
                force: false,
                dry_run: false,
            },
            &mut man,
        )
        .unwrap();
        assert_eq!(report.removed, ["_team"]);
    }

    #[cfg(unix)]
    #[test]
    fn filtered_out_entries_only_remove_engine_owned_state() {
        let fx = fixture();
        // An excluded skill that is still linked.
        fs::create_dir_all(fx.source.join("wip")).unwrap();
        std::os::unix::fs::symlink(fx.source.join("wip"), fx.target.join("wip")).unwrap();
        // An excluded user directory.
        fs::create_dir_all(fx.target.join("wip-local")).unwrap();

        let valid = HashSet::new();
        let filter = SkillFilter::new(&[], &["wip*".to_string()]).unwrap();
        let mut man = Manifest::default();
        man.managed.insert("wip".into(), "symlink".into());

        let report = prune(
            &PruneInput {
                target_path: &fx.target,
                source_root: &fx.source,
                valid_names: &valid,
                filter: &filter,
                tracked_repos: &[],
                force: false,
                dry_run: false,
            },
            &mut man,
        )
        .unwrap();
        assert_eq!(report.removed, ["wip"]);
        assert!(!man.is_managed("wip"));
        assert!(fx.target.join("wip-local").exists());
        assert!(report.local_dirs.is_empty());
    }

    #[test]
    fn hidden_entries_and_files_are_invisible() {
        let fx = fixture();
        fs::write(fx.target.join(".hidden"), b"x").unwrap();
        fs::write(fx.target.join("notes.txt"), b"x").unwrap();

        let mut man = Manifest::default();
        let report = run(&fx, &[], &mut man, false);
        assert!(report.removed.is_empty());
        assert!(fx.target.join(".hidden").exists());
        assert!(fx.target.join("notes.txt").exists());
    }

    #[cfg(unix)]
    #[test]
    fn dry_run_reports_without_removing() {
        let fx = fixture();
        fs::create_dir_all(fx.source.join("gone")).unwrap();
        std::os::unix::fs::symlink(fx.source.join("gone"), fx.target.join("X")).unwrap();

        let mut man = Manifest::default();
        let valid = HashSet::new();
        let filter = SkillFilter::new(&[], &[]).unwrap();
        let report = prune(
            &PruneInput {
                target_path: &fx.target,
                source_root: &fx.source,
                valid_names: &valid,
                filter: &filter,
                tracked_repos: &[],
                force: false,
                dry_run: true,
            },
            &mut man,
        )
        .unwrap();
        assert_eq!(report.removed, ["X"]);
        assert!(paths::is_link(&fx.target.join("X")));
    }
}
