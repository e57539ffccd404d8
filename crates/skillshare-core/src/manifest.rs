//! Per-target manifest store.
//!
//! Each non-symlink target carries a `.skillshare-manifest.json` recording
//! which entries the engine placed there and still considers itself owner of.
//! Merge mode records the literal value `"symlink"`; copy mode records the
//! SHA-256 of the source directory contents plus (when available) the
//! maximum source mtime used by the fast path.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Manifest file name inside a target directory.
pub const MANIFEST_FILE: &str = ".skillshare-manifest.json";

/// Managed-entry value recorded by merge mode.
pub const MANAGED_SYMLINK: &str = "symlink";

/// The on-disk manifest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Flat name → `"symlink"` (merge mode) or SHA-256 hex (copy mode).
    #[serde(default)]
    pub managed: BTreeMap<String, String>,

    /// Flat name → max source-file mtime in nanoseconds (copy mode only).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub mtimes: BTreeMap<String, i64>,

    /// Timestamp of the last write.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Manifest {
    /// Returns true iff the engine considers `name` managed in this target.
    pub fn is_managed(&self, name: &str) -> bool {
        self.managed.contains_key(name)
    }

    /// Drops `name` from both maps.
    pub fn forget(&mut self, name: &str) {
        self.managed.remove(name);
        self.mtimes.remove(name);
    }
}

/// Reads the manifest inside `target_path`.
///
/// Absence and corruption are both equivalent to an empty manifest; callers
/// never see a decoding error. A corrupt file is rewritten on the next sync.
pub fn read(target_path: &Path) -> Manifest {
    let path = target_path.join(MANIFEST_FILE);
    match fs::read(&path) {
        Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|err| {
            tracing::warn!(path = %path.display(), %err, "manifest unreadable, treating as empty");
            Manifest::default()
        }),
        Err(_) => Manifest::default(),
    }
}

/// Writes the manifest inside `target_path`, stamping `updated_at`.
///
/// The write serializes the whole file; it is intentionally not atomic
/// because the manifest is rebuildable from a sync.
pub fn write(target_path: &Path, manifest: &Manifest) -> io::Result<()> {
    let mut stamped = manifest.clone();
    stamped.updated_at = Some(Utc::now());
    let json = serde_json::to_vec_pretty(&stamped).map_err(io::Error::other)?;
    fs::write(target_path.join(MANIFEST_FILE), json)
}

/// Removes the manifest file; a no-op when absent.
pub fn remove(target_path: &Path) -> io::Result<()> {
    match fs::remove_file(target_path.join(MANIFEST_FILE)) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
