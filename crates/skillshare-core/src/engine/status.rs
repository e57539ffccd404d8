//! Read-only target status.

use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::manifest::Manifest;
use crate::paths;

use super::link_into_source;

/// Coarse state of one target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetState {
    /// Path does not exist.
    NotExist,
    /// Whole-target link pointing at the source.
    Linked,
    /// Real directory with at least one of our per-skill links.
    Merged,
    /// Real directory with manifest-managed copies.
    Copied,
    /// Real directory with none of ours.
    HasFiles,
    /// Symlink pointing somewhere other than the source.
    Conflict,
    /// Symlink that does not resolve.
    Broken,
    /// Something else entirely (a plain file).
    Unknown,
}

/// Status of one target, with entry counts where a directory exists.
#[derive(Debug, Clone, Serialize)]
pub struct TargetStatus {
    /// Coarse state.
    pub state: TargetState,
    /// Entries the engine owns (links into source, or managed copies).
    pub linked: usize,
    /// Non-hidden entries that are not ours.
    pub local: usize,
}

/// Classifies `target_path` against `source_root` and its manifest.
pub fn check_status(target_path: &Path, source_root: &Path, man: &Manifest) -> TargetStatus {
    let meta = match fs::symlink_metadata(target_path) {
        Err(_) => {
            return TargetStatus {
                state: TargetState::NotExist,
                linked: 0,
                local: 0,
            };
        }
        Ok(meta) => meta,
    };

    if paths::is_link(target_path) {
        let state = match paths::resolve_link(target_path) {
            // The source root always exists when it compares equal, so the
            // equality check can safely run first.
            Ok(dest) => {
                if paths::paths_equal(&dest, source_root) {
                    TargetState::Linked
                } else if dest.exists() {
                    TargetState::Conflict
                } else {
                    TargetState::Broken
                }
            }
            Err(_) => TargetState::Broken,
        };
        return TargetStatus {
            state,
            linked: 0,
            local: 0,
        };
    }

    if !meta.is_dir() {
        return TargetStatus {
            state: TargetState::Unknown,
            linked: 0,
            local: 0,
        };
    }

    let mut ours = 0;
    let mut managed_dirs = 0;
    let mut local = 0;
    if let Ok(entries) = fs::read_dir(target_path) {
        for entry in entries.filter_map(Result::ok) {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            let path = entry.path();
            if link_into_source(&path, source_root) {
                ours += 1;
            } else if man.is_managed(&name) && path.is_dir() {
                managed_dirs += 1;
            } else {
                local += 1;
            }
        }
    }

    let state = if ours > 0 {
        TargetState::Merged
    } else if managed_dirs > 0 || (local == 0 && !man.managed.is_empty()) {
        TargetState::Copied
    } else {
        TargetState::HasFiles
    };
    TargetStatus {
        state,
        linked: ours + managed_dirs,
        local,
    }
}
