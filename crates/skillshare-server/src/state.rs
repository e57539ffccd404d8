//! Shared server state.

use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::Instant;

use skillshare_core::backup::BackupStore;
use skillshare_core::cache::DiscoveryCache;
use skillshare_core::config::Config;

/// Process-wide state behind the router.
///
/// `ops_lock` is the single legitimate global of the system: every mutating
/// request holds it for its whole duration, so there is never a partial
/// concurrent write to the same target. The discovery cache is an owned
/// instance — tests construct isolated ones.
#[derive(Debug)]
pub struct AppState {
    /// Config file location (reloads re-read this path).
    pub config_path: PathBuf,
    /// Currently loaded configuration.
    pub config: RwLock<Config>,
    /// Two-layer discovery cache.
    pub cache: DiscoveryCache,
    /// Backup store.
    pub backups: BackupStore,
    /// Serialization lock for mutating requests.
    pub ops_lock: tokio::sync::Mutex<()>,
    /// Server start time, for `/api/health`.
    pub started: Instant,
}

/// State as shared with handlers.
pub type SharedState = Arc<AppState>;

impl AppState {
    /// State over the default cache and backup locations.
    pub fn new(config_path: PathBuf, config: Config) -> Self {
        Self::with_stores(config_path, config, DiscoveryCache::new(), BackupStore::new())
    }

    /// State over explicit stores (tests use tempdirs).
    pub fn with_stores(
        config_path: PathBuf,
        config: Config,
        cache: DiscoveryCache,
        backups: BackupStore,
    ) -> Self {
        Self {
            config_path,
            config: RwLock::new(config),
            cache,
            backups,
            ops_lock: tokio::sync::Mutex::new(()),
            started: Instant::now(),
        }
    }

    /// Snapshot of the current config.
    pub fn config_snapshot(&self) -> Config {
        self.config.read().expect("config lock poisoned").clone()
    }

    /// Drops both discovery cache layers for the active source root.
    /// Called by every mutation that can change the skill set, before the
    /// operations lock is released.
    pub fn invalidate_discovery(&self) {
        let source = self.config_snapshot().source;
        self.cache.invalidate(&source);
    }
}
