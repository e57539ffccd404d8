//! `skillshare backup` — snapshot targets, list and trim snapshots.

use std::path::Path;

use anyhow::{Result, bail};
use skillshare_core::backup::BackupStore;

use crate::ui;

pub fn create(config_path: &Path, only_target: Option<&str>) -> Result<()> {
    let config = super::load_config(config_path)?;
    if let Some(name) = only_target {
        if !config.targets.contains_key(name) {
            bail!("target not found: {name}");
        }
    }

    let store = BackupStore::new();
    for (name, target) in &config.targets {
        if only_target.is_some_and(|t| t != name) {
            continue;
        }
        match store.create(name, &target.path, config.mode_for(target))? {
            Some(path) => println!("backed up {name} -> {}", path.display()),
            None => println!("skipped {name} (symlink, empty, or missing)"),
        }
    }
    Ok(())
}

pub fn list() -> Result<()> {
    let store = BackupStore::new();
    let backups = store.list()?;
    if backups.is_empty() {
        println!("No backups under {}", store.root().display());
        return Ok(());
    }
    ui::header(&format!("Backups in {}", store.root().display()));
    for info in backups {
        println!(
            "  {}  [{}]",
            info.time.format(skillshare_core::DISPLAY_TIME_FORMAT),
            info.targets.join(", ")
        );
    }
    Ok(())
}

pub fn cleanup(keep: usize) -> Result<()> {
    let store = BackupStore::new();
    let removed = store.cleanup(keep)?;
    if removed.is_empty() {
        println!("Nothing to remove (keeping {keep}).");
    } else {
        for timestamp in removed {
            println!("removed {timestamp}");
        }
    }
    Ok(())
}
