//! `skillshare config` — show the effective configuration.

use std::path::Path;

use anyhow::Result;

pub fn show(config_path: &Path, path_only: bool) -> Result<()> {
    if path_only {
        println!("{}", config_path.display());
        return Ok(());
    }
    let config = super::load_config(config_path)?;
    print!("{}", serde_yaml::to_string(&config)?);
    Ok(())
}
