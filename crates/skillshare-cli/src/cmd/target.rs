//! `skillshare target` — target configuration CRUD.

use std::path::Path;

use anyhow::{Result, bail};
use skillshare_core::config::{self, Mode, TargetConfig};

pub fn add(
    config_path: &Path,
    name: &str,
    path: &Path,
    mode: Option<&str>,
) -> Result<()> {
    let mut config = super::load_config(config_path)?;
    if config.targets.contains_key(name) {
        bail!("target already exists: {name}");
    }
    let mode = mode.map(parse_mode).transpose()?;
    config.targets.insert(
        name.to_string(),
        TargetConfig {
            path: path.to_path_buf(),
            mode,
            ..TargetConfig::default()
        },
    );
    config::validate(&config)?;
    config::save(config_path, &config)?;
    println!("added target {name} -> {}", path.display());
    Ok(())
}

pub fn remove(config_path: &Path, name: &str) -> Result<()> {
    let mut config = super::load_config(config_path)?;
    if config.targets.remove(name).is_none() {
        bail!("target not found: {name}");
    }
    config::save(config_path, &config)?;
    println!("removed target {name}");
    Ok(())
}

pub fn list(config_path: &Path) -> Result<()> {
    let config = super::load_config(config_path)?;
    if config.targets.is_empty() {
        println!("No targets configured.");
        return Ok(());
    }
    for (name, target) in &config.targets {
        let mut extras = Vec::new();
        if !target.include.is_empty() {
            extras.push(format!("include={}", target.include.join(",")));
        }
        if !target.exclude.is_empty() {
            extras.push(format!("exclude={}", target.exclude.join(",")));
        }
        let extras = if extras.is_empty() {
            String::new()
        } else {
            format!("  ({})", extras.join(" "))
        };
        println!(
            "  {name}: {} [{}]{extras}",
            target.path.display(),
            config.mode_for(target)
        );
    }
    Ok(())
}

fn parse_mode(value: &str) -> Result<Mode> {
    match value {
        "symlink" => Ok(Mode::Symlink),
        "merge" => Ok(Mode::Merge),
        "copy" => Ok(Mode::Copy),
        other => bail!("unknown mode '{other}' (expected symlink, merge, or copy)"),
    }
}
