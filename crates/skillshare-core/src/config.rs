//! Configuration model.
//!
//! The config file is YAML at `${XDG_CONFIG_HOME}/skillshare/config.yaml`
//! (override with `SKILLSHARE_CONFIG`): a source root, a global default
//! mode, and a named target table.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Projection mode for a target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Whole-directory link from target to source.
    Symlink,
    /// Per-skill links inside a real target directory.
    #[default]
    Merge,
    /// Per-skill content copies inside a real target directory.
    Copy,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Symlink => "symlink",
            Self::Merge => "merge",
            Self::Copy => "copy",
        })
    }
}

/// One named projection target.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Directory the target projects into.
    pub path: PathBuf,

    /// Projection mode; absent inherits the global default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<Mode>,

    /// Include globs over flat names; empty accepts everything.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,

    /// Exclude globs over flat names.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
}

/// The whole config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Source-of-truth skills directory.
    pub source: PathBuf,

    /// Mode used by targets that do not set their own.
    #[serde(default)]
    pub default_mode: Mode,

    /// Named targets.
    #[serde(default)]
    pub targets: BTreeMap<String, TargetConfig>,
}

impl Config {
    /// Effective mode for a target: its own, or the global default.
    pub fn mode_for(&self, target: &TargetConfig) -> Mode {
        target.mode.unwrap_or(self.default_mode)
    }
}

/// Config load/store failures.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file does not exist yet.
    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    /// YAML syntax or shape error.
    #[error("config parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Semantic problem in a parseable config.
    #[error("invalid config: {0}")]
    Invalid(String),

    /// Filesystem failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Loads and parses the config at `path`.
pub fn load(path: &Path) -> Result<Config, ConfigError> {
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };
    Ok(serde_yaml::from_slice(&bytes)?)
}

/// Serializes `config` to YAML at `path`, creating parent directories.
pub fn save(path: &Path, config: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let yaml = serde_yaml::to_string(config)?;
    fs::write(path, yaml)?;
    Ok(())
}

/// Semantic validation beyond YAML shape: a source must be configured and
/// no target may nest inside the source tree or another target's path.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.source.as_os_str().is_empty() {
        return Err(ConfigError::Invalid("source must be set".into()));
    }
    for (name, target) in &config.targets {
        if name.is_empty() {
            return Err(ConfigError::Invalid("target name must not be empty".into()));
        }
        if target.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "target '{name}' has no path"
            )));
        }
        if crate::paths::has_prefix(&target.path, &config.source)
            || crate::paths::paths_equal(&target.path, &config.source)
        {
            return Err(ConfigError::Invalid(format!(
                "target '{name}' lies inside the source tree"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn yaml_roundtrip_with_mode_inheritance() {
        let td = tempdir().unwrap();
        let path = td.path().join("config.yaml");
        let mut cfg = Config {
            source: PathBuf::from("/skills"),
            default_mode: Mode::Merge,
            targets: BTreeMap::new(),
        };
        cfg.targets.insert(
            "claude".into(),
            TargetConfig {
                path: PathBuf::from("/home/u/.claude/skills"),
                mode: None,
                include: vec![],
                exclude: vec!["*__wip".into()],
            },
        );
        cfg.targets.insert(
            "cursor".into(),
            TargetConfig {
                path: PathBuf::from("/home/u/.cursor/skills"),
                mode: Some(Mode::Copy),
                ..TargetConfig::default()
            },
        );

        save(&path, &cfg).unwrap();
        let back = load(&path).unwrap();
        assert_eq!(back, cfg);
        assert_eq!(back.mode_for(&back.targets["claude"]), Mode::Merge);
        assert_eq!(back.mode_for(&back.targets["cursor"]), Mode::Copy);
    }

    #[test]
    fn missing_mode_parses_as_inherit() {
        let yaml = "source: /skills\ntargets:\n  claude:\n    path: /t/claude\n";
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.targets["claude"].mode, None);
        assert_eq!(cfg.default_mode, Mode::Merge);
    }

    #[test]
    fn load_distinguishes_not_found() {
        let td = tempdir().unwrap();
        let err = load(&td.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn validate_rejects_target_inside_source() {
        let mut cfg = Config {
            source: PathBuf::from("/skills"),
            ..Config::default()
        };
        cfg.targets.insert(
            "bad".into(),
            TargetConfig {
                path: PathBuf::from("/skills/claude"),
                ..TargetConfig::default()
            },
        );
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));

        cfg.targets.get_mut("bad").unwrap().path = PathBuf::from("/elsewhere");
        validate(&cfg).unwrap();
    }
}
