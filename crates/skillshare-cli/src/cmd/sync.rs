//! `skillshare sync` — project skills into the configured targets.

use std::path::Path;

use anyhow::{Result, bail};
use skillshare_core::cache::DiscoveryCache;
use skillshare_core::engine::{self, OpStatus, SyncOptions, TargetSync};

use crate::ui;

pub fn sync(
    config_path: &Path,
    dry_run: bool,
    force: bool,
    only_target: Option<&str>,
) -> Result<()> {
    let config = super::load_config(config_path)?;
    let (skills, lite) = super::discover(&config)?;
    let opts = SyncOptions { force, dry_run };

    if dry_run {
        ui::header("Dry run (nothing will change)");
    }

    let summary = match only_target {
        Some(name) => {
            let Some(target) = config.targets.get(name) else {
                bail!("target not found: {name}");
            };
            let report = engine::sync_target(&TargetSync {
                name,
                target,
                mode: config.mode_for(target),
                source_root: &config.source,
                skills: &skills,
                tracked_repos: &lite.tracked_repos,
                opts,
            })?;
            engine::SyncSummary {
                targets: vec![report],
                errors: vec![],
            }
        }
        None => engine::sync_all(&config, &skills, &lite.tracked_repos, opts),
    };

    for report in &summary.targets {
        ui::print_target_report(report);
    }
    for err in &summary.errors {
        eprintln!("error: target {}: {}", err.name, err.error);
    }

    if !dry_run {
        DiscoveryCache::new().invalidate(&config.source);
    }

    match summary.status() {
        OpStatus::Ok => Ok(()),
        OpStatus::Partial => bail!("sync finished with failures"),
        OpStatus::Error => bail!("sync failed"),
    }
}
