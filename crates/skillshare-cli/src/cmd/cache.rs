//! `skillshare cache` — discovery cache inspection.

use anyhow::Result;
use skillshare_core::cache::DiscoveryCache;

use crate::ui;

pub fn info() -> Result<()> {
    let cache = DiscoveryCache::new();
    let infos = cache.info();
    if infos.is_empty() {
        println!("No discovery caches.");
        return Ok(());
    }
    for info in infos {
        let flag = if info.valid {
            if info.orphaned {
                " (orphaned: source root is gone)"
            } else {
                ""
            }
        } else {
            " (invalid)"
        };
        let root = info
            .root
            .as_ref()
            .map_or_else(|| "?".to_string(), |r| r.display().to_string());
        println!(
            "  {root}: {} entries, {}{flag}",
            info.entries,
            ui::human_bytes(info.size_bytes)
        );
    }
    Ok(())
}

pub fn clear() -> Result<()> {
    let removed = DiscoveryCache::new().clear()?;
    println!("removed {removed} cache file(s)");
    Ok(())
}
