//! `skillshare collect` — pull target-local skills back into source.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Result, bail};
use chrono::Local;
use skillshare_core::cache::DiscoveryCache;
use skillshare_core::{collect, manifest};

use crate::ui;

pub fn collect(
    config_path: &Path,
    apply: bool,
    force: bool,
    only_target: Option<&str>,
) -> Result<()> {
    let config = super::load_config(config_path)?;
    let (skills, _) = super::discover(&config)?;
    let source_names: HashSet<String> = skills.iter().map(|s| s.flat_name.clone()).collect();

    if let Some(name) = only_target {
        if !config.targets.contains_key(name) {
            bail!("target not found: {name}");
        }
    }

    let mut found_any = false;
    let mut failures = 0;
    for (name, target) in &config.targets {
        if only_target.is_some_and(|t| t != name) {
            continue;
        }
        let man = manifest::read(&target.path);
        let local = collect::scan(&target.path, &man, &source_names)?;
        if local.is_empty() {
            continue;
        }
        found_any = true;

        ui::header(&format!("{name} ({})", target.path.display()));
        for skill in &local {
            let when = skill.modified.map_or_else(
                || "-".to_string(),
                |t| {
                    t.with_timezone(&Local)
                        .format(skillshare_core::DISPLAY_TIME_FORMAT)
                        .to_string()
                },
            );
            println!(
                "  {}  {}  {}",
                skill.name,
                ui::human_bytes(skill.size_bytes),
                when
            );
        }

        if apply {
            for (skill, outcome) in collect::pull(&local, &config.source, force) {
                match outcome {
                    Ok(()) => println!("  pulled {skill}"),
                    Err(err) => {
                        failures += 1;
                        eprintln!("  failed {skill}: {err}");
                    }
                }
            }
        }
    }

    if found_any {
        if apply {
            DiscoveryCache::new().invalidate(&config.source);
        } else {
            println!("\nRe-run with --apply to pull these into the source.");
        }
    } else {
        println!("No target-local skills found.");
    }
    if failures > 0 {
        bail!("{failures} skill(s) failed to pull");
    }
    Ok(())
}
