//! `skillshare status` — per-target state.

use std::path::Path;

use anyhow::Result;
use skillshare_core::engine;

use crate::ui;

pub fn status(config_path: &Path) -> Result<()> {
    let config = super::load_config(config_path)?;
    let (skills, _) = super::discover(&config)?;

    println!("source: {} ({} skills)", config.source.display(), skills.len());
    for (name, status) in engine::status_all(&config) {
        let counts = if status.linked + status.local > 0 {
            format!(" [{} ours, {} local]", status.linked, status.local)
        } else {
            String::new()
        };
        println!("  {name}: {}{counts}", ui::state_label(status.state));
    }
    Ok(())
}
