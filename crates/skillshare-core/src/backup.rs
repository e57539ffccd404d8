//! Backup & restore of target state.
//!
//! A backup is an append-only snapshot at
//! `<backup_root>/<YYYY-MM-DD_HH-MM-SS>/<target_name>/…` (local time). The
//! copy never follows symlinks — except the first level of a merge-mode
//! target, where following materializes the skill contents instead of
//! snapshotting dangling links. Snapshots are immutable after creation;
//! cleanup deletes whole timestamp directories only.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use serde::Serialize;
use thiserror::Error;

use crate::config::Mode;
use crate::fsutil;
use crate::paths;
use crate::{DISPLAY_TIME_FORMAT, FILE_TIME_FORMAT};

/// Backup failures.
#[derive(Error, Debug)]
pub enum BackupError {
    /// The timestamp directory already exists: a concurrent create won the
    /// race. Fatal for this call, safe to retry; snapshots never merge.
    #[error("backup snapshot already exists: {0}")]
    SnapshotExists(PathBuf),

    /// Filesystem failure.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Restore pre-flight failures; also the HTTP 4xx surface for restores.
#[derive(Error, Debug)]
pub enum RestoreError {
    /// `<backup>/<target>` does not exist.
    #[error("backup not found: {backup}/{target}")]
    NotFound {
        /// Snapshot timestamp.
        backup: String,
        /// Target name within the snapshot.
        target: String,
    },

    /// Destination is a non-empty directory and `force` was not given.
    #[error("destination not empty: {0}")]
    NotEmpty(PathBuf),

    /// Destination exists and is neither a directory nor a symlink.
    #[error("destination is not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Filesystem failure.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// One listed snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct BackupInfo {
    /// Timestamp directory name (`YYYY-MM-DD_HH-MM-SS`).
    pub timestamp: String,
    /// Parsed local time.
    pub time: DateTime<Local>,
    /// Target names captured in this snapshot.
    pub targets: Vec<String>,
}

/// Aggregated per-target backup metadata.
#[derive(Debug, Clone, Serialize)]
pub struct TargetBackups {
    /// Target name.
    pub target: String,
    /// Number of snapshots containing this target.
    pub count: usize,
    /// Oldest snapshot timestamp.
    pub oldest: Option<String>,
    /// Latest snapshot timestamp.
    pub latest: Option<String>,
    /// Skill names present in the latest snapshot.
    pub skills: Vec<String>,
    /// Total bytes across all snapshots of this target.
    pub total_bytes: u64,
    /// Human-readable label of the latest snapshot (display layout).
    pub label: Option<String>,
}

/// Backup store rooted at a directory.
#[derive(Debug, Clone)]
pub struct BackupStore {
    root: PathBuf,
}

impl BackupStore {
    /// Store at the default location (`<data_dir>/skillshare/backups`).
    pub fn new() -> Self {
        Self::with_root(crate::backups_root())
    }

    /// Store at an explicit root (tests use a tempdir).
    pub fn with_root(root: PathBuf) -> Self {
        Self { root }
    }

    /// The backup root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Snapshots one target. Returns `None` (skipped) when the target is a
    /// symlink or an empty/missing directory.
    ///
    /// Merge-mode targets follow their first level of links so the snapshot
    /// holds materialized skill contents; deeper levels never follow.
    pub fn create(
        &self,
        target_name: &str,
        target_path: &Path,
        mode: Mode,
    ) -> Result<Option<PathBuf>, BackupError> {
        if paths::is_link(target_path) {
            tracing::debug!(target_name, "target is a symlink, backup skipped");
            return Ok(None);
        }
        match fs::symlink_metadata(target_path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
            Ok(meta) if !meta.is_dir() => return Ok(None),
            Ok(_) => {}
        }
        if fsutil::dir_is_empty(target_path)? {
            return Ok(None);
        }

        let timestamp = Local::now().format(FILE_TIME_FORMAT).to_string();
        let snapshot = self.root.join(&timestamp);
        fs::create_dir_all(&self.root)?;
        // Never merge into an existing snapshot: a same-second sibling is a
        // race, not a home.
        if let Err(e) = fs::create_dir(&snapshot) {
            return if e.kind() == io::ErrorKind::AlreadyExists {
                Err(BackupError::SnapshotExists(snapshot))
            } else {
                Err(e.into())
            };
        }

        let dest = snapshot.join(target_name);
        let follow_first = mode == Mode::Merge;
        copy_backup_level(target_path, &dest, follow_first)?;
        tracing::info!(target_name, snapshot = %snapshot.display(), "backup created");
        Ok(Some(dest))
    }

    /// Enumerates snapshots, newest first. Directories whose names do not
    /// parse with the filename layout are ignored.
    pub fn list(&self) -> io::Result<Vec<BackupInfo>> {
        let mut out = Vec::new();
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(out),
            Err(e) => return Err(e),
        };
        for entry in entries.filter_map(Result::ok) {
            if !entry.path().is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            let Some(time) = parse_timestamp(&name) else {
                continue;
            };
            let mut targets: Vec<String> = fs::read_dir(entry.path())?
                .filter_map(Result::ok)
                .filter(|e| e.path().is_dir())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect();
            targets.sort();
            out.push(BackupInfo {
                timestamp: name,
                time,
                targets,
            });
        }
        out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(out)
    }

    /// Non-mutating restore pre-flight.
    ///
    /// The destination check is non-dereferencing: a symlink destination is
    /// accepted without `force` (it will be replaced atomically), an empty
    /// directory is accepted, a non-empty one needs `force`, anything else
    /// is an error.
    pub fn validate_restore(
        &self,
        backup: &str,
        target: &str,
        dest: &Path,
        force: bool,
    ) -> Result<(), RestoreError> {
        if !self.root.join(backup).join(target).is_dir() {
            return Err(RestoreError::NotFound {
                backup: backup.to_string(),
                target: target.to_string(),
            });
        }
        let meta = match fs::symlink_metadata(dest) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
            Ok(meta) => meta,
        };
        if meta.file_type().is_symlink() || paths::is_link(dest) {
            return Ok(());
        }
        if !meta.is_dir() {
            return Err(RestoreError::NotADirectory(dest.to_path_buf()));
        }
        if !force && !fsutil::dir_is_empty(dest)? {
            return Err(RestoreError::NotEmpty(dest.to_path_buf()));
        }
        Ok(())
    }

    /// Restores `<backup>/<target>` over `dest`: validate, remove whatever
    /// sits at `dest` (a symlink is unlinked, a directory removed
    /// recursively), then copy the snapshot in.
    pub fn restore_to_path(
        &self,
        backup: &str,
        target: &str,
        dest: &Path,
        force: bool,
    ) -> Result<(), RestoreError> {
        self.validate_restore(backup, target, dest, force)?;
        fsutil::remove_entry(dest)?;
        fsutil::copy_tree(&self.root.join(backup).join(target), dest)?;
        tracing::info!(backup, target_name = target, dest = %dest.display(), "restored");
        Ok(())
    }

    /// Aggregated metadata for one target across all snapshots.
    pub fn list_target_backups(&self, target: &str) -> io::Result<TargetBackups> {
        let with_target: Vec<BackupInfo> = self
            .list()?
            .into_iter()
            .filter(|b| b.targets.iter().any(|t| t == target))
            .collect();
        // list() is newest first.
        let latest = with_target.first().map(|b| b.timestamp.clone());
        let oldest = with_target.last().map(|b| b.timestamp.clone());
        let label = with_target
            .first()
            .map(|b| b.time.format(DISPLAY_TIME_FORMAT).to_string());

        let skills = match &latest {
            Some(ts) => {
                let mut names: Vec<String> = fs::read_dir(self.root.join(ts).join(target))?
                    .filter_map(Result::ok)
                    .filter(|e| e.path().is_dir())
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect();
                names.sort();
                names
            }
            None => Vec::new(),
        };
        let total_bytes = with_target
            .iter()
            .map(|b| fsutil::tree_size(&self.root.join(&b.timestamp).join(target)))
            .sum();

        Ok(TargetBackups {
            target: target.to_string(),
            count: with_target.len(),
            oldest,
            latest,
            skills,
            total_bytes,
            label,
        })
    }

    /// Deletes all but the newest `keep` snapshots. Whole timestamp
    /// directories only; returns the removed timestamps.
    pub fn cleanup(&self, keep: usize) -> io::Result<Vec<String>> {
        let snapshots = self.list()?;
        let mut removed = Vec::new();
        for info in snapshots.into_iter().skip(keep) {
            fs::remove_dir_all(self.root.join(&info.timestamp))?;
            removed.push(info.timestamp);
        }
        Ok(removed)
    }
}

impl Default for BackupStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Aggregated metadata for `target` under an explicit backup root.
pub fn list_backup_versions(backup_root: &Path, target: &str) -> io::Result<TargetBackups> {
    BackupStore::with_root(backup_root.to_path_buf()).list_target_backups(target)
}

fn parse_timestamp(name: &str) -> Option<DateTime<Local>> {
    let naive = NaiveDateTime::parse_from_str(name, FILE_TIME_FORMAT).ok()?;
    Local.from_local_datetime(&naive).single()
}

/// Backup copy. Symlinks never copy — except, when `follow_first` is set,
/// first-level directory links, whose contents are materialized. A link
/// whose target no longer exists is silently skipped either way.
fn copy_backup_level(src: &Path, dst: &Path, follow_first: bool) -> io::Result<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let from = entry.path();
        let to = dst.join(entry.file_name());
        let meta = fs::symlink_metadata(&from)?;

        if meta.file_type().is_symlink() || paths::is_link(&from) {
            if !follow_first {
                continue;
            }
            match fs::metadata(&from) {
                Ok(target_meta) if target_meta.is_dir() => {
                    // Materialize the linked skill; below this point links
                    // are skipped again.
                    fsutil::copy_tree(&from, &to)?;
                }
                Ok(_) => {
                    fs::copy(&from, &to)?;
                }
                // Dangling link: skipped, not copied.
                Err(_) => {}
            }
        } else if meta.is_dir() {
            copy_backup_level(&from, &to, false)?;
        } else {
            fs::copy(&from, &to)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store(td: &tempfile::TempDir) -> BackupStore {
        BackupStore::with_root(td.path().join("backups"))
    }

    fn mk_target(td: &tempfile::TempDir, name: &str) -> PathBuf {
        let target = td.path().join(name);
        fs::create_dir_all(target.join("alpha")).unwrap();
        fs::write(target.join("alpha/SKILL.md"), b"alpha").unwrap();
        target
    }

    #[test]
    fn create_and_list_roundtrip() {
        let td = tempdir().unwrap();
        let store = store(&td);
        let target = mk_target(&td, "claude");

        let dest = store.create("claude", &target, Mode::Copy).unwrap().unwrap();
        assert!(dest.join("alpha/SKILL.md").exists());

        let listed = store.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].targets, ["claude"]);
        assert!(parse_timestamp(&listed[0].timestamp).is_some());
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_or_empty_targets_are_skipped() {
        let td = tempdir().unwrap();
        let store = store(&td);

        let empty = td.path().join("empty");
        fs::create_dir(&empty).unwrap();
        assert!(store.create("empty", &empty, Mode::Copy).unwrap().is_none());

        let real = mk_target(&td, "real");
        let link = td.path().join("link");
        std::os::unix::fs::symlink(&real, &link).unwrap();
        assert!(store.create("link", &link, Mode::Copy).unwrap().is_none());

        assert!(
            store
                .create("missing", &td.path().join("nope"), Mode::Copy)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn same_second_snapshot_is_a_fatal_race() {
        let td = tempdir().unwrap();
        let store = store(&td);
        let target = mk_target(&td, "claude");

        // Pre-create the timestamp directory the next create will want.
        let ts = Local::now().format(FILE_TIME_FORMAT).to_string();
        fs::create_dir_all(store.root().join(&ts)).unwrap();

        let err = store.create("claude", &target, Mode::Copy).unwrap_err();
        assert!(matches!(err, BackupError::SnapshotExists(_)));
    }

    #[cfg(unix)]
    #[test]
    fn merge_mode_backup_materializes_first_level_links() {
        let td = tempdir().unwrap();
        let store = store(&td);
        let source = td.path().join("source");
        fs::create_dir_all(source.join("alpha")).unwrap();
        fs::write(source.join("alpha/SKILL.md"), b"alpha").unwrap();

        let target = td.path().join("target");
        fs::create_dir_all(&target).unwrap();
        std::os::unix::fs::symlink(source.join("alpha"), target.join("alpha")).unwrap();
        std::os::unix::fs::symlink(td.path().join("gone"), target.join("dangling")).unwrap();
        // A deep link inside a real dir must not follow.
        fs::create_dir_all(target.join("local")).unwrap();
        std::os::unix::fs::symlink(source.join("alpha"), target.join("local/deep")).unwrap();

        let dest = store.create("t", &target, Mode::Merge).unwrap().unwrap();
        assert!(!paths::is_link(&dest.join("alpha")));
        assert_eq!(fs::read(dest.join("alpha/SKILL.md")).unwrap(), b"alpha");
        assert!(!dest.join("dangling").exists());
        assert!(!dest.join("local/deep").exists());
    }

    #[cfg(unix)]
    #[test]
    fn copy_mode_backup_never_follows_links() {
        let td = tempdir().unwrap();
        let store = store(&td);
        let target = mk_target(&td, "t");
        std::os::unix::fs::symlink(target.join("alpha"), target.join("linked")).unwrap();

        let dest = store.create("t", &target, Mode::Copy).unwrap().unwrap();
        assert!(dest.join("alpha/SKILL.md").exists());
        assert!(!dest.join("linked").exists());
    }

    #[test]
    fn validate_restore_covers_the_four_destinations() {
        let td = tempdir().unwrap();
        let store = store(&td);
        let target = mk_target(&td, "claude");
        store.create("claude", &target, Mode::Copy).unwrap();
        let ts = store.list().unwrap()[0].timestamp.clone();

        // Unknown backup or target name.
        assert!(matches!(
            store.validate_restore("2000-01-01_00-00-00", "claude", &target, false),
            Err(RestoreError::NotFound { .. })
        ));
        assert!(matches!(
            store.validate_restore(&ts, "other", &target, false),
            Err(RestoreError::NotFound { .. })
        ));

        // Missing and empty destinations are fine.
        store
            .validate_restore(&ts, "claude", &td.path().join("new"), false)
            .unwrap();
        let empty = td.path().join("empty");
        fs::create_dir(&empty).unwrap();
        store.validate_restore(&ts, "claude", &empty, false).unwrap();

        // Non-empty needs force.
        assert!(matches!(
            store.validate_restore(&ts, "claude", &target, false),
            Err(RestoreError::NotEmpty(_))
        ));
        store.validate_restore(&ts, "claude", &target, true).unwrap();

        // A plain file is never acceptable.
        let file = td.path().join("file");
        fs::write(&file, b"x").unwrap();
        assert!(matches!(
            store.validate_restore(&ts, "claude", &file, false),
            Err(RestoreError::NotADirectory(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn restore_over_symlinked_target_unlinks_first() {
        let td = tempdir().unwrap();
        let store = store(&td);
        let real = mk_target(&td, "real-t");
        let link = td.path().join("t");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        // Snapshot through the link's content (use the real dir; create on a
        // symlink is skipped by design).
        store.create("t", &real, Mode::Copy).unwrap();
        let ts = store.list().unwrap()[0].timestamp.clone();

        // Mutate the linked content after the snapshot.
        fs::write(real.join("alpha/SKILL.md"), b"mutated").unwrap();

        // A symlink destination is accepted without force.
        store.restore_to_path(&ts, "t", &link, false).unwrap();
        assert!(!paths::is_link(&link));
        assert_eq!(fs::read(link.join("alpha/SKILL.md")).unwrap(), b"alpha");
        // The previously linked directory keeps its mutated copy.
        assert_eq!(fs::read(real.join("alpha/SKILL.md")).unwrap(), b"mutated");
    }

    #[test]
    fn restore_roundtrip_reproduces_the_snapshot_exactly() {
        let td = tempdir().unwrap();
        let store = store(&td);
        let target = mk_target(&td, "claude");
        fs::write(target.join("alpha/notes.md"), b"notes").unwrap();
        store.create("claude", &target, Mode::Copy).unwrap();
        let ts = store.list().unwrap()[0].timestamp.clone();

        fs::remove_dir_all(&target).unwrap();
        fs::create_dir_all(target.join("junk")).unwrap();
        fs::write(target.join("junk/x.md"), b"x").unwrap();

        store.restore_to_path(&ts, "claude", &target, true).unwrap();
        assert_eq!(fs::read(target.join("alpha/SKILL.md")).unwrap(), b"alpha");
        assert_eq!(fs::read(target.join("alpha/notes.md")).unwrap(), b"notes");
        assert!(!target.join("junk").exists());
    }

    #[test]
    fn target_metadata_aggregates_across_snapshots() {
        let td = tempdir().unwrap();
        let store = store(&td);
        let target = mk_target(&td, "claude");
        store.create("claude", &target, Mode::Copy).unwrap();

        // A second snapshot at a distinct (synthetic) timestamp.
        let older = store.root().join("2020-01-02_03-04-05/claude/beta");
        fs::create_dir_all(&older).unwrap();
        fs::write(older.join("SKILL.md"), b"beta").unwrap();

        let meta = store.list_target_backups("claude").unwrap();
        assert_eq!(meta.count, 2);
        assert_eq!(meta.oldest.as_deref(), Some("2020-01-02_03-04-05"));
        assert!(meta.latest.as_deref() > meta.oldest.as_deref());
        assert_eq!(meta.skills, ["alpha"]);
        assert!(meta.total_bytes > 0);
        assert_eq!(meta.label.as_deref().map(str::len), Some(19));
    }

    #[test]
    fn unparseable_directories_are_ignored_by_listers() {
        let td = tempdir().unwrap();
        let store = store(&td);
        fs::create_dir_all(store.root().join("not-a-timestamp/claude")).unwrap();
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn cleanup_keeps_the_newest_snapshots() {
        let td = tempdir().unwrap();
        let store = store(&td);
        for ts in ["2020-01-01_00-00-00", "2021-01-01_00-00-00", "2022-01-01_00-00-00"] {
            fs::create_dir_all(store.root().join(ts).join("claude")).unwrap();
        }

        let removed = store.cleanup(2).unwrap();
        assert_eq!(removed, ["2020-01-01_00-00-00"]);
        assert_eq!(store.list().unwrap().len(), 2);
    }
}
