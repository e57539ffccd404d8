//! `skillshare init` — write a starter config.

use std::path::Path;

use anyhow::{Result, bail};
use skillshare_core::config::{self, Config};

pub fn init(config_path: &Path, source: &Path) -> Result<()> {
    if config_path.exists() {
        bail!("config already exists at {}", config_path.display());
    }
    if !source.is_dir() {
        bail!("source directory does not exist: {}", source.display());
    }

    let cfg = Config {
        source: source.to_path_buf(),
        ..Config::default()
    };
    config::save(config_path, &cfg)?;
    println!("Wrote {}", config_path.display());
    println!("Add targets with: skillshare target add <name> <path>");
    Ok(())
}
