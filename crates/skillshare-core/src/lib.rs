//! skillshare-core - the Skillshare engine
//!
//! Skillshare maintains a single source-of-truth directory of skills (each a
//! folder containing `SKILL.md` plus auxiliary files) and projects them into
//! one or more target directories consumed by external AI/editor tools.
//!
//! # Architecture
//!
//! - **Sum type over projection modes**: `symlink`, `merge`, and `copy` are a
//!   [`config::Mode`] enum with dedicated routines, not trait objects. Each
//!   mode consumes the same inputs and produces the same report shape.
//! - **Two-layer discovery cache**: [`cache::DiscoveryCache`] holds in-process
//!   maps behind a reader/writer lock and persists full results per source
//!   root, validated by a count sweep plus a per-entry stat check.
//! - **Two-phase path comparison**: every identity check in
//!   [`paths`] has a byte-equal fast path and a canonicalized fallback, so
//!   symlink aliases of the same physical directory compare equal.
//!
//! # Directory layout
//!
//! ```text
//! $XDG_CONFIG_HOME/skillshare/config.yaml   # target configuration
//! $XDG_CACHE_HOME/skillshare/               # discovery-<hex>.bin caches
//! $XDG_DATA_HOME/skillshare/backups/        # timestamped target snapshots
//! ```

pub mod backup;
pub mod cache;
pub mod checksum;
pub mod collect;
pub mod config;
pub mod discover;
pub mod engine;
pub mod filter;
pub mod fsutil;
pub mod manifest;
pub mod paths;

use std::path::PathBuf;

/// Display timestamp layout, interpreted in local time.
pub const DISPLAY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Filename timestamp layout, interpreted in local time.
pub const FILE_TIME_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

fn xdg_dir(env_var: &str, fallback: fn() -> Option<PathBuf>) -> Option<PathBuf> {
    match std::env::var_os(env_var) {
        Some(v) if !v.is_empty() => Some(PathBuf::from(v)),
        _ => fallback(),
    }
}

/// User data directory: `${XDG_DATA_HOME}/skillshare` (platform default otherwise).
///
/// # Panics
/// Panics if no user data directory can be determined.
pub fn data_dir() -> PathBuf {
    xdg_dir("XDG_DATA_HOME", dirs::data_dir)
        .expect("Could not determine user data directory")
        .join("skillshare")
}

/// Discovery cache directory: `${XDG_CACHE_HOME}/skillshare`.
///
/// # Panics
/// Panics if no user cache directory can be determined.
pub fn cache_dir() -> PathBuf {
    xdg_dir("XDG_CACHE_HOME", dirs::cache_dir)
        .expect("Could not determine user cache directory")
        .join("skillshare")
}

/// Config directory: `${XDG_CONFIG_HOME}/skillshare`.
///
/// # Panics
/// Panics if no user config directory can be determined.
pub fn config_dir() -> PathBuf {
    xdg_dir("XDG_CONFIG_HOME", dirs::config_dir)
        .expect("Could not determine user config directory")
        .join("skillshare")
}

/// Backup root: `${XDG_DATA_HOME}/skillshare/backups`.
pub fn backups_root() -> PathBuf {
    data_dir().join("backups")
}

/// Config file path, honoring the `SKILLSHARE_CONFIG` override.
pub fn config_path() -> PathBuf {
    match std::env::var_os("SKILLSHARE_CONFIG") {
        Some(v) if !v.is_empty() => PathBuf::from(v),
        _ => config_dir().join("config.yaml"),
    }
}
