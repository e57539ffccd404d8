//! Reverse collection: skills that exist only in a target get pulled back
//! into the source.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;
use thiserror::Error;

use crate::fsutil;
use crate::manifest::Manifest;
use crate::paths;

/// A target-local skill candidate.
#[derive(Debug, Clone, Serialize)]
pub struct LocalSkill {
    /// Entry name inside the target (already a flat name).
    pub name: String,
    /// Full path inside the target.
    pub path: PathBuf,
    /// Last modification time.
    pub modified: Option<DateTime<Local>>,
    /// Total size of regular files.
    pub size_bytes: u64,
}

/// Collection failures.
#[derive(Error, Debug)]
pub enum CollectError {
    /// The skill already exists in the source and `force` was not given.
    #[error("'{0}' already exists in source (use force to overwrite)")]
    Exists(String),

    /// Filesystem failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Scans a target for user-created skills: non-hidden, non-symlink
/// directories that are neither in the copy-mode manifest nor already
/// present in the source.
pub fn scan(
    target_path: &Path,
    man: &Manifest,
    source_names: &HashSet<String>,
) -> std::io::Result<Vec<LocalSkill>> {
    let mut found = Vec::new();
    let entries = match fs::read_dir(target_path) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(found),
        Err(e) => return Err(e),
    };
    for entry in entries.filter_map(Result::ok) {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        let path = entry.path();
        if paths::is_link(&path) || !path.is_dir() {
            continue;
        }
        if man.is_managed(&name) || source_names.contains(&name) {
            continue;
        }
        let modified = fs::metadata(&path)
            .ok()
            .and_then(|m| m.modified().ok())
            .map(DateTime::<Local>::from);
        found.push(LocalSkill {
            size_bytes: fsutil::tree_size(&path),
            name,
            path,
            modified,
        });
    }
    found.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(found)
}

/// Copies collected skills into the source root.
///
/// Without `force` an existing source skill refuses the pull. With `force`
/// the content is overwritten in place: files are copied over, unrelated
/// files under the source skill are never deleted.
pub fn pull(
    skills: &[LocalSkill],
    source_root: &Path,
    force: bool,
) -> Vec<(String, Result<(), CollectError>)> {
    skills
        .iter()
        .map(|skill| (skill.name.clone(), pull_skill(skill, source_root, force)))
        .collect()
}

/// Pulls one skill; see [`pull`].
pub fn pull_skill(
    skill: &LocalSkill,
    source_root: &Path,
    force: bool,
) -> Result<(), CollectError> {
    let dest = source_root.join(&skill.name);
    if dest.exists() && !force {
        return Err(CollectError::Exists(skill.name.clone()));
    }
    fs::create_dir_all(source_root)?;
    fsutil::copy_tree(&skill.path, &dest)?;
    tracing::info!(skill = skill.name.as_str(), dest = %dest.display(), "pulled local skill");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn mk_dir(root: &Path, rel: &str, files: &[(&str, &str)]) {
        let dir = root.join(rel);
        fs::create_dir_all(&dir).unwrap();
        for (name, content) in files {
            let path = dir.join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(path, content).unwrap();
        }
    }

    #[test]
    fn scan_finds_only_unmanaged_local_directories() {
        let td = tempdir().unwrap();
        let target = td.path().join("target");
        mk_dir(&target, "mine", &[("SKILL.md", "# mine")]);
        mk_dir(&target, "managed-copy", &[("SKILL.md", "# copy")]);
        mk_dir(&target, "in-source", &[("SKILL.md", "# src")]);
        mk_dir(&target, ".hidden", &[]);
        fs::write(target.join("loose.md"), "x").unwrap();
        #[cfg(unix)]
        std::os::unix::fs::symlink(td.path(), target.join("linked")).unwrap();

        let mut man = Manifest::default();
        man.managed.insert("managed-copy".into(), "ab".repeat(32));
        let source_names: HashSet<String> = ["in-source".to_string()].into();

        let found = scan(&target, &man, &source_names).unwrap();
        let names: Vec<&str> = found.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["mine"]);
        assert!(found[0].size_bytes > 0);
        assert!(found[0].modified.is_some());
    }

    #[test]
    fn scan_of_missing_target_is_empty() {
        let td = tempdir().unwrap();
        let found = scan(
            &td.path().join("nope"),
            &Manifest::default(),
            &HashSet::new(),
        )
        .unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn pull_refuses_existing_without_force() {
        let td = tempdir().unwrap();
        let target = td.path().join("target");
        let source = td.path().join("source");
        mk_dir(&target, "alpha", &[("SKILL.md", "# target version")]);
        mk_dir(&source, "alpha", &[("SKILL.md", "# source version"), ("extra.md", "keep")]);

        let found = scan(&target, &Manifest::default(), &HashSet::new()).unwrap();
        let err = pull_skill(&found[0], &source, false).unwrap_err();
        assert!(matches!(err, CollectError::Exists(_)));
        assert_eq!(
            fs::read(source.join("alpha/SKILL.md")).unwrap(),
            b"# source version"
        );

        // Force overwrites content but never deletes unrelated files.
        pull_skill(&found[0], &source, true).unwrap();
        assert_eq!(
            fs::read(source.join("alpha/SKILL.md")).unwrap(),
            b"# target version"
        );
        assert_eq!(fs::read(source.join("alpha/extra.md")).unwrap(), b"keep");
    }

    #[test]
    fn pull_copies_new_skill_into_source() {
        let td = tempdir().unwrap();
        let target = td.path().join("target");
        let source = td.path().join("source");
        mk_dir(&target, "fresh", &[("SKILL.md", "# fresh"), ("data/notes.md", "n")]);
        fs::create_dir_all(&source).unwrap();

        let found = scan(&target, &Manifest::default(), &HashSet::new()).unwrap();
        let results = pull(&found, &source, false);
        assert!(results.iter().all(|(_, r)| r.is_ok()));
        assert_eq!(fs::read(source.join("fresh/SKILL.md")).unwrap(), b"# fresh");
        assert_eq!(fs::read(source.join("fresh/data/notes.md")).unwrap(), b"n");
    }
}
