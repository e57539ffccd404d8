//! `skillshare diff` — dry-run classification of the next sync.

use std::path::Path;

use anyhow::Result;
use skillshare_core::engine;

use crate::ui;

pub fn diff(config_path: &Path) -> Result<()> {
    let config = super::load_config(config_path)?;
    let (skills, lite) = super::discover(&config)?;

    let summary = engine::diff_all(&config, &skills, &lite.tracked_repos, false);
    if summary.targets.is_empty() {
        println!("No targets configured.");
        return Ok(());
    }
    for report in &summary.targets {
        ui::print_target_report(report);
    }
    Ok(())
}
