//! End-to-end projection flows through the public engine API.

#![cfg(unix)]

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use skillshare_core::config::{Config, Mode, TargetConfig};
use skillshare_core::engine::{self, SyncOptions, TargetState, TargetSync};
use skillshare_core::{discover, manifest, paths};
use tempfile::TempDir;

struct Fixture {
    td: TempDir,
    source: PathBuf,
    target: PathBuf,
}

impl Fixture {
    fn new(skills: &[&str]) -> Self {
        let td = TempDir::new().unwrap();
        let source = td.path().join("source");
        let target = td.path().join("target");
        for rel in skills {
            let dir = source.join(rel);
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join("SKILL.md"), format!("# {rel}\n")).unwrap();
        }
        Fixture {
            td,
            source,
            target,
        }
    }

    fn config(&self, name: &str, mode: Mode) -> Config {
        let mut targets = BTreeMap::new();
        targets.insert(
            name.to_string(),
            TargetConfig {
                path: self.target.clone(),
                mode: Some(mode),
                ..TargetConfig::default()
            },
        );
        Config {
            source: self.source.clone(),
            targets,
            ..Config::default()
        }
    }

    fn sync(&self, name: &str, mode: Mode, opts: SyncOptions) -> engine::TargetReport {
        let skills = discover::discover(&self.source).unwrap();
        let lite = discover::discover_lite(&self.source).unwrap();
        let config = self.config(name, mode);
        engine::sync_target(&TargetSync {
            name,
            target: &config.targets[name],
            mode,
            source_root: &self.source,
            skills: &skills,
            tracked_repos: &lite.tracked_repos,
            opts,
        })
        .unwrap()
    }
}

fn assert_linked(target: &Path, source: &Path, rel: &str, flat: &str) {
    let entry = target.join(flat);
    assert!(paths::is_link(&entry), "{flat} should be a link");
    assert!(
        paths::paths_equal(&entry, &source.join(rel)),
        "{flat} should resolve to {rel}"
    );
}

#[test]
fn symlink_to_merge_conversion() {
    let fx = Fixture::new(&["alpha", "beta"]);
    std::os::unix::fs::symlink(&fx.source, &fx.target).unwrap();

    let report = fx.sync("claude", Mode::Merge, SyncOptions::default());

    assert!(!paths::is_link(&fx.target));
    assert!(fx.target.is_dir());
    assert_linked(&fx.target, &fx.source, "alpha", "alpha");
    assert_linked(&fx.target, &fx.source, "beta", "beta");
    assert_eq!(report.report.linked, ["alpha", "beta"]);

    let man = manifest::read(&fx.target);
    assert_eq!(man.managed["alpha"], "symlink");
    assert_eq!(man.managed["beta"], "symlink");
}

#[test]
fn local_directory_preserved_then_replaced_with_force() {
    let fx = Fixture::new(&["alpha"]);
    fs::create_dir_all(fx.target.join("alpha")).unwrap();
    fs::write(fx.target.join("alpha/SKILL.md"), b"local").unwrap();
    fs::write(fx.target.join("alpha/notes.md"), b"mine").unwrap();

    let report = fx.sync("claude", Mode::Merge, SyncOptions::default());
    assert_eq!(report.report.skipped, ["alpha"]);
    assert!(fx.target.join("alpha/notes.md").exists());
    assert!(!manifest::read(&fx.target).is_managed("alpha"));

    let forced = fx.sync(
        "claude",
        Mode::Merge,
        SyncOptions {
            force: true,
            dry_run: false,
        },
    );
    assert_eq!(forced.report.updated, ["alpha"]);
    assert_linked(&fx.target, &fx.source, "alpha", "alpha");
    assert_eq!(manifest::read(&fx.target).managed["alpha"], "symlink");
}

#[test]
fn merge_sync_is_idempotent() {
    let fx = Fixture::new(&["alpha", "group/beta"]);
    fx.sync("claude", Mode::Merge, SyncOptions::default());

    let entries_before: Vec<_> = fs::read_dir(&fx.target)
        .unwrap()
        .filter_map(Result::ok)
        .map(|e| e.file_name())
        .collect();

    let second = fx.sync("claude", Mode::Merge, SyncOptions::default());
    assert_eq!(second.report.linked, ["alpha", "group__beta"]);
    assert!(second.report.updated.is_empty());

    let entries_after: Vec<_> = fs::read_dir(&fx.target)
        .unwrap()
        .filter_map(Result::ok)
        .map(|e| e.file_name())
        .collect();
    assert_eq!(entries_before.len(), entries_after.len());
}

#[test]
fn copy_fast_path_recomputes_only_on_mtime_drift() {
    let fx = Fixture::new(&["alpha"]);

    let first = fx.sync("claude", Mode::Copy, SyncOptions::default());
    assert_eq!(first.report.copied, ["alpha"]);
    let man = manifest::read(&fx.target);
    let h0 = man.managed["alpha"].clone();
    let t0 = man.mtimes["alpha"];

    // Undisturbed source: pure fast-path skip.
    let second = fx.sync("claude", Mode::Copy, SyncOptions::default());
    assert_eq!(second.report.skipped, ["alpha"]);

    // Touch an unrelated file: mtime drifts, content checksum does not.
    std::thread::sleep(std::time::Duration::from_millis(20));
    fs::write(fx.source.join("alpha/extra.md"), b"unrelated").unwrap();

    let third = fx.sync("claude", Mode::Copy, SyncOptions::default());
    // Content changed (a new file), so this is an update.
    assert_eq!(third.report.updated, ["alpha"]);
    let man = manifest::read(&fx.target);
    assert_ne!(man.managed["alpha"], h0);
    assert!(man.mtimes["alpha"] >= t0);
    assert!(fx.target.join("alpha/extra.md").exists());
}

#[test]
fn orphan_prune_with_external_link_and_local_dir() {
    let fx = Fixture::new(&["alpha"]);
    fx.sync("claude", Mode::Merge, SyncOptions::default());

    // X: our link whose skill is then removed from source.
    let x_source = fx.source.join("x-skill");
    fs::create_dir_all(&x_source).unwrap();
    fs::write(x_source.join("SKILL.md"), b"x").unwrap();
    std::os::unix::fs::symlink(&x_source, fx.target.join("X")).unwrap();
    fs::remove_dir_all(&x_source).unwrap();
    // Y: external link.
    let outside = fx.td.path().join("outside");
    fs::create_dir_all(&outside).unwrap();
    std::os::unix::fs::symlink(&outside, fx.target.join("Y")).unwrap();
    // Z: real user directory.
    fs::create_dir_all(fx.target.join("Z")).unwrap();

    let report = fx.sync("claude", Mode::Merge, SyncOptions::default());
    let prune = report.prune.unwrap();
    assert_eq!(prune.removed, ["X"]);
    assert_eq!(prune.warnings, ["Y"]);
    assert_eq!(prune.local_dirs, ["Z"]);
    assert!(fx.target.join("Y").exists());
    assert!(fx.target.join("Z").exists());

    let forced = fx.sync(
        "claude",
        Mode::Merge,
        SyncOptions {
            force: true,
            dry_run: false,
        },
    );
    let prune = forced.prune.unwrap();
    assert!(prune.removed.contains(&"Y".to_string()));
    assert!(!fx.target.join("Y").exists());
    assert!(fx.target.join("Z").exists());
}

#[test]
fn prune_never_removes_current_skills() {
    let fx = Fixture::new(&["alpha", "group/beta"]);
    fx.sync("claude", Mode::Merge, SyncOptions::default());
    let report = fx.sync(
        "claude",
        Mode::Merge,
        SyncOptions {
            force: true,
            dry_run: false,
        },
    );
    let prune = report.prune.unwrap();
    assert!(prune.removed.is_empty());
    assert!(fx.target.join("alpha").exists());
    assert!(fx.target.join("group__beta").exists());
}

#[test]
fn include_exclude_filters_shape_projection_and_prune() {
    let fx = Fixture::new(&["alpha", "wip"]);

    // First sync everything.
    fx.sync("claude", Mode::Merge, SyncOptions::default());
    assert!(fx.target.join("wip").exists());

    // Then exclude wip: its link must be pruned away.
    let skills = discover::discover(&fx.source).unwrap();
    let lite = discover::discover_lite(&fx.source).unwrap();
    let target_cfg = TargetConfig {
        path: fx.target.clone(),
        mode: Some(Mode::Merge),
        exclude: vec!["wip".to_string()],
        ..TargetConfig::default()
    };
    let report = engine::sync_target(&TargetSync {
        name: "claude",
        target: &target_cfg,
        mode: Mode::Merge,
        source_root: &fx.source,
        skills: &skills,
        tracked_repos: &lite.tracked_repos,
        opts: SyncOptions::default(),
    })
    .unwrap();

    assert_eq!(report.report.linked, ["alpha"]);
    assert_eq!(report.prune.unwrap().removed, ["wip"]);
    assert!(!fx.target.join("wip").exists());
    assert!(!manifest::read(&fx.target).is_managed("wip"));
}

#[test]
fn invalid_filter_fails_before_any_filesystem_action() {
    let fx = Fixture::new(&["alpha"]);
    let skills = discover::discover(&fx.source).unwrap();
    let target_cfg = TargetConfig {
        path: fx.target.clone(),
        mode: Some(Mode::Merge),
        include: vec!["[".to_string()],
        ..TargetConfig::default()
    };
    let err = engine::sync_target(&TargetSync {
        name: "claude",
        target: &target_cfg,
        mode: Mode::Merge,
        source_root: &fx.source,
        skills: &skills,
        tracked_repos: &[],
        opts: SyncOptions::default(),
    })
    .unwrap_err();
    assert!(matches!(err, engine::EngineError::Filter(_)));
    assert!(!fx.target.exists());
}

#[test]
fn per_skill_targets_gate_projection() {
    let fx = Fixture::new(&[]);
    for (rel, fm) in [
        ("everywhere", None),
        ("claude-only", Some("targets: [claude]")),
        ("cursor-only", Some("targets: [cursor]")),
    ] {
        let dir = fx.source.join(rel);
        fs::create_dir_all(&dir).unwrap();
        let body = match fm {
            Some(fm) => format!("---\n{fm}\n---\n# {rel}\n"),
            None => format!("# {rel}\n"),
        };
        fs::write(dir.join("SKILL.md"), body).unwrap();
    }

    let report = fx.sync("claude", Mode::Merge, SyncOptions::default());
    assert_eq!(report.report.linked, ["claude-only", "everywhere"]);
    assert!(!fx.target.join("cursor-only").exists());
}

#[test]
fn status_reflects_each_projection_mode() {
    let fx = Fixture::new(&["alpha"]);
    let config = fx.config("claude", Mode::Merge);

    let statuses = engine::status_all(&config);
    assert_eq!(statuses[0].1.state, TargetState::NotExist);

    fx.sync("claude", Mode::Merge, SyncOptions::default());
    let statuses = engine::status_all(&config);
    assert_eq!(statuses[0].1.state, TargetState::Merged);
    assert_eq!(statuses[0].1.linked, 1);

    fs::remove_dir_all(&fx.target).unwrap();
    fx.sync("claude", Mode::Copy, SyncOptions::default());
    let statuses = engine::status_all(&config);
    assert_eq!(statuses[0].1.state, TargetState::Copied);

    fs::remove_dir_all(&fx.target).unwrap();
    fx.sync("claude", Mode::Symlink, SyncOptions::default());
    let statuses = engine::status_all(&config);
    assert_eq!(statuses[0].1.state, TargetState::Linked);
}

#[test]
fn sync_all_processes_targets_sequentially_and_aggregates() {
    let td = TempDir::new().unwrap();
    let source = td.path().join("source");
    for rel in ["alpha", "beta"] {
        let dir = source.join(rel);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("SKILL.md"), format!("# {rel}\n")).unwrap();
    }

    let mut targets = BTreeMap::new();
    targets.insert(
        "claude".to_string(),
        TargetConfig {
            path: td.path().join("t-claude"),
            ..TargetConfig::default()
        },
    );
    targets.insert(
        "cursor".to_string(),
        TargetConfig {
            path: td.path().join("t-cursor"),
            mode: Some(Mode::Copy),
            ..TargetConfig::default()
        },
    );
    let config = Config {
        source: source.clone(),
        targets,
        ..Config::default()
    };

    let skills = discover::discover(&source).unwrap();
    let summary = engine::sync_all(&config, &skills, &[], SyncOptions::default());
    assert_eq!(summary.status(), engine::OpStatus::Ok);
    assert_eq!(summary.targets.len(), 2);
    assert!(paths::is_link(&td.path().join("t-claude/alpha")));
    assert!(td.path().join("t-cursor/alpha").is_dir());

    // The diff preview classifies identically without mutating.
    let diff = engine::diff_all(&config, &skills, &[], false);
    assert_eq!(diff.status(), engine::OpStatus::Ok);
}

#[test]
fn pull_then_sync_is_idempotent() {
    use skillshare_core::collect;
    use std::collections::HashSet;

    let fx = Fixture::new(&["alpha"]);
    fx.sync("claude", Mode::Merge, SyncOptions::default());

    // A user creates a skill directly in the target.
    fs::create_dir_all(fx.target.join("handmade")).unwrap();
    fs::write(fx.target.join("handmade/SKILL.md"), b"# handmade").unwrap();

    let man = manifest::read(&fx.target);
    let source_names: HashSet<String> = discover::discover(&fx.source)
        .unwrap()
        .iter()
        .map(|s| s.flat_name.clone())
        .collect();
    let found = collect::scan(&fx.target, &man, &source_names).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "handmade");
    collect::pull_skill(&found[0], &fx.source, false).unwrap();
    assert!(fx.source.join("handmade/SKILL.md").exists());

    // Without force the local copy stays; the pulled source is authoritative
    // only under force.
    let second = fx.sync("claude", Mode::Merge, SyncOptions::default());
    assert!(second.report.skipped.contains(&"handmade".to_string()));
    assert!(!paths::is_link(&fx.target.join("handmade")));

    let forced = fx.sync(
        "claude",
        Mode::Merge,
        SyncOptions {
            force: true,
            dry_run: false,
        },
    );
    assert!(forced.report.updated.contains(&"handmade".to_string()));
    assert_linked(&fx.target, &fx.source, "handmade", "handmade");
}
