//! `skillshare restore` — restore a snapshot over a target.

use std::path::Path;

use anyhow::{Result, bail};
use skillshare_core::backup::BackupStore;
use skillshare_core::cache::DiscoveryCache;

pub fn restore(config_path: &Path, backup: &str, target: &str, force: bool) -> Result<()> {
    let config = super::load_config(config_path)?;
    let Some(target_cfg) = config.targets.get(target) else {
        bail!("target not found: {target}");
    };

    let store = BackupStore::new();
    store.restore_to_path(backup, target, &target_cfg.path, force)?;
    DiscoveryCache::new().invalidate(&config.source);
    println!("restored {backup}/{target} -> {}", target_cfg.path.display());
    Ok(())
}
