//! One module per subcommand.

pub mod backup;
pub mod cache;
pub mod collect;
pub mod completions;
pub mod config;
pub mod diff;
pub mod init;
pub mod restore;
pub mod serve;
pub mod status;
pub mod sync;
pub mod target;

use std::path::Path;

use anyhow::{Context, Result};
use skillshare_core::config::Config;
use skillshare_core::discover::{LiteDiscovery, Skill};

pub(crate) fn load_config(path: &Path) -> Result<Config> {
    skillshare_core::config::load(path)
        .with_context(|| format!("load config from {}", path.display()))
}

/// Full + lite discovery straight off the walker; the CLI is one-shot, so
/// the on-disk cache layer is the only one worth consulting.
pub(crate) fn discover(config: &Config) -> Result<(Vec<Skill>, LiteDiscovery)> {
    let cache = skillshare_core::cache::DiscoveryCache::new();
    let skills = cache
        .discover_full(&config.source)
        .with_context(|| format!("discover skills under {}", config.source.display()))?;
    let lite = cache
        .discover_lite(&config.source)
        .context("lite discovery")?;
    Ok(((*skills).clone(), (*lite).clone()))
}
