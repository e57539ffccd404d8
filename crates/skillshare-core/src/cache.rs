//! Two-layer discovery cache.
//!
//! L1 is a pair of in-process maps (full and lite results kept strictly
//! separate) behind a reader/writer lock with the classic double-checked
//! miss. L2 is one postcard-encoded file per source root, written atomically
//! and validated on load by a version gate, a byte-equal root check, a
//! `SKILL.md` count sweep, and a per-entry stat comparison. Only full
//! results are persisted; lite discovery is cheap enough to recompute.
//!
//! Tests construct isolated instances via [`DiscoveryCache::with_dir`];
//! there is no singleton.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::discover::{self, DiscoverError, LiteDiscovery, Skill};
use crate::fsutil;

/// Current on-disk cache schema version. Any mismatch rejects the file.
pub const CACHE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct DiskRecord {
    root: String,
    entries: Vec<CacheEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    rel_path: String,
    flat_name: String,
    is_in_repo: bool,
    targets: Option<Vec<String>>,
    mtime_ns: i64,
    size_bytes: u64,
}

/// Inspector output for one on-disk cache file.
#[derive(Debug, Clone, Serialize)]
pub struct CacheFileInfo {
    /// Cache file path.
    pub file: PathBuf,
    /// Recorded source root, when the file decodes.
    pub root: Option<PathBuf>,
    /// Number of cached entries.
    pub entries: usize,
    /// File size in bytes.
    pub size_bytes: u64,
    /// True when the recorded root no longer exists. Orphans are kept, not
    /// deleted; `clear` removes them.
    pub orphaned: bool,
    /// False when the file fails the version gate or does not decode.
    pub valid: bool,
}

/// The discovery cache. In-memory maps are owned by the instance; the
/// on-disk layer lives under a directory chosen at construction.
#[derive(Debug)]
pub struct DiscoveryCache {
    dir: PathBuf,
    full: RwLock<HashMap<PathBuf, Arc<Vec<Skill>>>>,
    lite: RwLock<HashMap<PathBuf, Arc<LiteDiscovery>>>,
}

impl DiscoveryCache {
    /// Cache writing to the user cache directory.
    pub fn new() -> Self {
        Self::with_dir(crate::cache_dir())
    }

    /// Cache writing to an explicit directory (tests use a tempdir).
    pub fn with_dir(dir: PathBuf) -> Self {
        Self {
            dir,
            full: RwLock::new(HashMap::new()),
            lite: RwLock::new(HashMap::new()),
        }
    }

    /// Full discovery with targets parsed, via L1 → L2 → walk.
    pub fn discover_full(&self, root: &Path) -> Result<Arc<Vec<Skill>>, DiscoverError> {
        let key = root.to_path_buf();
        if let Some(hit) = self.full.read().expect("cache lock poisoned").get(&key) {
            return Ok(Arc::clone(hit));
        }

        let mut map = self.full.write().expect("cache lock poisoned");
        // Another writer may have filled the slot while we waited.
        if let Some(hit) = map.get(&key) {
            return Ok(Arc::clone(hit));
        }

        let skills = match self.load_validated(root) {
            Some(cached) => Arc::new(cached),
            None => {
                let walked = Arc::new(discover::discover(root)?);
                // Persistence failures are non-fatal: the cache is an
                // optimization, never a source of truth.
                let _ = self.store(root, &walked);
                walked
            }
        };
        map.insert(key, Arc::clone(&skills));
        Ok(skills)
    }

    /// Lite discovery (names plus tracked repos). Never persisted, never
    /// served from the full map: a lite result's `None` targets must not
    /// masquerade as a parsed full result, and vice versa.
    pub fn discover_lite(&self, root: &Path) -> Result<Arc<LiteDiscovery>, DiscoverError> {
        let key = root.to_path_buf();
        if let Some(hit) = self.lite.read().expect("cache lock poisoned").get(&key) {
            return Ok(Arc::clone(hit));
        }

        let mut map = self.lite.write().expect("cache lock poisoned");
        if let Some(hit) = map.get(&key) {
            return Ok(Arc::clone(hit));
        }

        let lite = Arc::new(discover::discover_lite(root)?);
        map.insert(key, Arc::clone(&lite));
        Ok(lite)
    }

    /// Drops both layers for `root`.
    pub fn invalidate(&self, root: &Path) {
        self.full.write().expect("cache lock poisoned").remove(root);
        self.lite.write().expect("cache lock poisoned").remove(root);
        let _ = fs::remove_file(self.file_for(root));
    }

    /// Enumerates on-disk cache files, flagging orphans and rejects.
    pub fn info(&self) -> Vec<CacheFileInfo> {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for entry in entries.filter_map(Result::ok) {
            let file = entry.path();
            if !is_cache_file(&file) {
                continue;
            }
            let size_bytes = entry.metadata().map_or(0, |m| m.len());
            match fs::read(&file).ok().and_then(|b| decode(&b)) {
                Some(record) => {
                    let root = PathBuf::from(&record.root);
                    out.push(CacheFileInfo {
                        orphaned: !root.exists(),
                        root: Some(root),
                        entries: record.entries.len(),
                        size_bytes,
                        valid: true,
                        file,
                    });
                }
                None => out.push(CacheFileInfo {
                    file,
                    root: None,
                    entries: 0,
                    size_bytes,
                    orphaned: false,
                    valid: false,
                }),
            }
        }
        out.sort_by(|a, b| a.file.cmp(&b.file));
        out
    }

    /// Removes every on-disk cache file and empties both in-memory maps.
    pub fn clear(&self) -> std::io::Result<usize> {
        self.full.write().expect("cache lock poisoned").clear();
        self.lite.write().expect("cache lock poisoned").clear();
        let mut removed = 0;
        if let Ok(entries) = fs::read_dir(&self.dir) {
            for entry in entries.filter_map(Result::ok) {
                if is_cache_file(&entry.path()) {
                    fs::remove_file(entry.path())?;
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }

    fn file_for(&self, root: &Path) -> PathBuf {
        let digest = Sha256::digest(root.to_string_lossy().as_bytes());
        self.dir
            .join(format!("discovery-{}.bin", &hex::encode(digest)[..16]))
    }

    /// Loads and fully validates the on-disk record for `root`, returning
    /// the reconstructed skills without re-parsing any frontmatter.
    fn load_validated(&self, root: &Path) -> Option<Vec<Skill>> {
        let bytes = fs::read(self.file_for(root)).ok()?;
        let record = decode(&bytes)?;

        // The recorded root must be byte-identical to the request; an alias
        // of the same directory gets its own cache file.
        if Path::new(&record.root) != root {
            return None;
        }

        // Cheap guard first: the SKILL.md population must be unchanged.
        let count = discover::count_skill_files(root).ok()?;
        if count != record.entries.len() {
            tracing::debug!(root = %root.display(), "discovery cache stale: count drift");
            return None;
        }

        // Then the per-entry stat sweep: any mtime/size drift rejects the
        // whole file (a nested edit keeps the count identical).
        let mut skills = Vec::with_capacity(record.entries.len());
        for entry in record.entries {
            let skill_dir = root.join(Path::new(&entry.rel_path));
            let meta = fs::metadata(skill_dir.join(discover::SKILL_FILE)).ok()?;
            if fsutil::mtime_ns(&meta) != entry.mtime_ns || meta.len() != entry.size_bytes {
                tracing::debug!(
                    root = %root.display(),
                    rel = entry.rel_path,
                    "discovery cache stale: entry drift"
                );
                return None;
            }
            skills.push(Skill {
                source_path: skill_dir,
                rel_path: entry.rel_path,
                flat_name: entry.flat_name,
                is_in_repo: entry.is_in_repo,
                targets: entry.targets,
            });
        }
        Some(skills)
    }

    /// Persists a full result atomically (temp file + rename).
    fn store(&self, root: &Path, skills: &[Skill]) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let mut entries = Vec::with_capacity(skills.len());
        for skill in skills {
            let meta = fs::metadata(skill.source_path.join(discover::SKILL_FILE))?;
            entries.push(CacheEntry {
                rel_path: skill.rel_path.clone(),
                flat_name: skill.flat_name.clone(),
                is_in_repo: skill.is_in_repo,
                targets: skill.targets.clone(),
                mtime_ns: fsutil::mtime_ns(&meta),
                size_bytes: meta.len(),
            });
        }
        let record = DiskRecord {
            root: root.to_string_lossy().into_owned(),
            entries,
        };

        let mut bytes =
            postcard::to_allocvec(&CACHE_VERSION).map_err(std::io::Error::other)?;
        bytes.extend(postcard::to_allocvec(&record).map_err(std::io::Error::other)?);

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&bytes)?;
        tmp.persist(self.file_for(root)).map_err(|e| e.error)?;
        Ok(())
    }
}

impl Default for DiscoveryCache {
    fn default() -> Self {
        Self::new()
    }
}

fn is_cache_file(path: &Path) -> bool {
    let name = path.file_name().map(|n| n.to_string_lossy().into_owned());
    name.is_some_and(|n| n.starts_with("discovery-"))
        && path.extension().is_some_and(|ext| ext == "bin")
}

/// Decodes a cache file, enforcing the version-first rule: the version
/// integer is read before anything else and any mismatch rejects the file.
fn decode(bytes: &[u8]) -> Option<DiskRecord> {
    let (version, rest) = postcard::take_from_bytes::<u32>(bytes).ok()?;
    if version != CACHE_VERSION {
        tracing::debug!(version, expected = CACHE_VERSION, "discovery cache version mismatch");
        return None;
    }
    postcard::from_bytes(rest).ok()
}
