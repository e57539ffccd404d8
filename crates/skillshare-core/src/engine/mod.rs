//! Projection engine.
//!
//! Three modes project skills into a target, modeled as a mode enum with
//! dedicated routines rather than trait objects:
//!
//! - **symlink**: the whole target path is one link to the source root.
//! - **merge**: one link per skill inside a real target directory.
//! - **copy**: one content copy per skill, fingerprinted in the manifest.
//!
//! Ownership rule shared by every mode: an entry is ours iff it is a link
//! whose canonical target lies strictly under the canonical source root, or
//! its name appears in the target's manifest. Hidden entries are invisible
//! to both projection and prune.

pub mod copy;
pub mod merge;
pub mod prune;
pub mod status;
pub mod symlink;

use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::checksum::ChecksumError;
use crate::config::{Config, Mode, TargetConfig};
use crate::discover::Skill;
use crate::filter::{self, FilterError, SkillFilter};
use crate::manifest;

pub use prune::PruneReport;
pub use status::{TargetState, TargetStatus};

/// Knobs shared by every projection call.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    /// Replace user-local entries and external links instead of skipping.
    pub force: bool,
    /// Classify without touching the filesystem or the manifest.
    pub dry_run: bool,
}

/// One skill that failed inside a multi-skill operation.
#[derive(Debug, Clone, Serialize)]
pub struct SkillFailure {
    /// Flat name.
    pub name: String,
    /// Human-readable reason.
    pub error: String,
}

/// Per-mode projection outcome; every mode fills the same shape.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProjectReport {
    /// Links created or verified (merge/symlink mode).
    pub linked: Vec<String>,
    /// Fresh copies (copy mode).
    pub copied: Vec<String>,
    /// Entries replaced or recreated.
    pub updated: Vec<String>,
    /// Entries left untouched (user-local, or fast-path hits).
    pub skipped: Vec<String>,
    /// Per-skill failures; the operation still completes for the rest.
    pub failed: Vec<SkillFailure>,
}

/// Outcome of projecting and pruning one target.
#[derive(Debug, Serialize)]
pub struct TargetReport {
    /// Target name.
    pub target: String,
    /// Mode that ran.
    pub mode: Mode,
    /// Projection outcome.
    pub report: ProjectReport,
    /// Prune outcome; absent in symlink mode (nothing to prune through a
    /// whole-directory link).
    pub prune: Option<PruneReport>,
}

impl TargetReport {
    /// True when some skills failed but the target as a whole completed.
    pub fn is_partial(&self) -> bool {
        !self.report.failed.is_empty()
    }
}

/// Aggregate outcome of syncing every configured target.
#[derive(Debug, Default, Serialize)]
pub struct SyncSummary {
    /// Per-target results, in config order.
    pub targets: Vec<TargetReport>,
    /// Targets that failed wholesale, with the error text.
    pub errors: Vec<SkillFailure>,
}

/// Coarse status of a multi-target operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OpStatus {
    /// Everything applied.
    Ok,
    /// Some skills or targets failed; the rest applied.
    Partial,
    /// Nothing applied.
    Error,
}

impl SyncSummary {
    /// Collapses the summary into the operations-log status.
    pub fn status(&self) -> OpStatus {
        let partial = self.targets.iter().any(TargetReport::is_partial);
        match (self.targets.is_empty(), self.errors.is_empty(), partial) {
            (_, true, false) => OpStatus::Ok,
            (true, false, _) => OpStatus::Error,
            _ => OpStatus::Partial,
        }
    }
}

/// Engine failures.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Existing state blocks the operation without `force`.
    #[error("target conflict at {path}: {reason}")]
    Conflict {
        /// Path that blocks the operation.
        path: PathBuf,
        /// What was found there.
        reason: String,
    },

    /// Bad include/exclude pattern; raised before any filesystem action.
    #[error(transparent)]
    Filter(#[from] FilterError),

    /// Directory-symlink cycle during copy or checksum.
    #[error("symlink cycle detected at {0}")]
    LinkCycle(PathBuf),

    /// Any other filesystem failure.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl From<ChecksumError> for EngineError {
    fn from(err: ChecksumError) -> Self {
        match err {
            ChecksumError::LinkCycle(path) => Self::LinkCycle(path),
            ChecksumError::Io(e) => Self::Io(e),
        }
    }
}

/// Everything one target projection needs.
#[derive(Debug)]
pub struct TargetSync<'a> {
    /// Target name (used for per-skill `targets:` matching).
    pub name: &'a str,
    /// Target configuration.
    pub target: &'a TargetConfig,
    /// Effective mode (target's own or the global default).
    pub mode: Mode,
    /// Source root as configured.
    pub source_root: &'a Path,
    /// Full discovery result for the source root.
    pub skills: &'a [Skill],
    /// Tracked-repo names from lite discovery (prune heuristic).
    pub tracked_repos: &'a [String],
    /// Force/dry-run knobs.
    pub opts: SyncOptions,
}

/// Projects one target and prunes what the engine no longer owns.
///
/// Filter compilation happens first, so a bad pattern fails before any
/// filesystem action. Per-skill failures land in the report; only
/// whole-target problems (conflicting symlink state, unreachable target
/// directory) return an error.
pub fn sync_target(args: &TargetSync<'_>) -> Result<TargetReport, EngineError> {
    let skill_filter = SkillFilter::new(&args.target.include, &args.target.exclude)?;
    let (filtered, mut report) = filtered_skills(args.skills, args.name, &skill_filter);

    let target_path = args.target.path.as_path();
    match args.mode {
        Mode::Symlink => {
            let link_report = symlink::project(target_path, args.source_root, args.opts)?;
            report.linked.extend(link_report.linked);
            report.updated.extend(link_report.updated);
            Ok(TargetReport {
                target: args.name.to_string(),
                mode: args.mode,
                report,
                prune: None,
            })
        }
        Mode::Merge | Mode::Copy => {
            let mut man = manifest::read(target_path);
            let mode_report = match args.mode {
                Mode::Merge => merge::project(
                    target_path,
                    args.source_root,
                    &filtered,
                    &mut man,
                    args.opts,
                )?,
                Mode::Copy => {
                    copy::project(target_path, &filtered, &mut man, args.opts)?
                }
                Mode::Symlink => unreachable!(),
            };
            merge_reports(&mut report, mode_report);

            let valid: HashSet<String> =
                filtered.iter().map(|s| s.flat_name.clone()).collect();
            let prune_report = prune::prune(
                &prune::PruneInput {
                    target_path,
                    source_root: args.source_root,
                    valid_names: &valid,
                    filter: &skill_filter,
                    tracked_repos: args.tracked_repos,
                    force: args.opts.force,
                    dry_run: args.opts.dry_run,
                },
                &mut man,
            )?;

            if !args.opts.dry_run {
                manifest::write(target_path, &man)?;
            }
            Ok(TargetReport {
                target: args.name.to_string(),
                mode: args.mode,
                report,
                prune: Some(prune_report),
            })
        }
    }
}

/// Syncs every configured target sequentially (deterministic log order,
/// bounded filesystem pressure). Wholesale target failures become summary
/// errors; the remaining targets still run.
pub fn sync_all(
    config: &Config,
    skills: &[Skill],
    tracked_repos: &[String],
    opts: SyncOptions,
) -> SyncSummary {
    let mut summary = SyncSummary::default();
    for (name, target) in &config.targets {
        let args = TargetSync {
            name,
            target,
            mode: config.mode_for(target),
            source_root: &config.source,
            skills,
            tracked_repos,
            opts,
        };
        match sync_target(&args) {
            Ok(report) => summary.targets.push(report),
            Err(err) => {
                tracing::warn!(target_name = name.as_str(), %err, "target sync failed");
                summary.errors.push(SkillFailure {
                    name: name.clone(),
                    error: err.to_string(),
                });
            }
        }
    }
    summary
}

/// Status for every configured target, read-only.
pub fn status_all(config: &Config) -> Vec<(String, TargetStatus)> {
    config
        .targets
        .iter()
        .map(|(name, target)| {
            let man = manifest::read(&target.path);
            (
                name.clone(),
                status::check_status(&target.path, &config.source, &man),
            )
        })
        .collect()
}

/// Dry-run preview of a full sync: identical classification, no mutation.
pub fn diff_all(
    config: &Config,
    skills: &[Skill],
    tracked_repos: &[String],
    force: bool,
) -> SyncSummary {
    sync_all(
        config,
        skills,
        tracked_repos,
        SyncOptions {
            force,
            dry_run: true,
        },
    )
}

/// Applies the per-target `targets:` gate and the include/exclude filter,
/// then drops flat-name collisions. Collisions are reported as failures,
/// never silently merged.
fn filtered_skills<'a>(
    skills: &'a [Skill],
    target_name: &str,
    skill_filter: &SkillFilter,
) -> (Vec<&'a Skill>, ProjectReport) {
    let accepted = filter::filter_for_target(skills, target_name, skill_filter);

    let mut by_name: BTreeMap<&str, usize> = BTreeMap::new();
    for skill in &accepted {
        *by_name.entry(skill.flat_name.as_str()).or_default() += 1;
    }

    let mut report = ProjectReport::default();
    let mut unique = Vec::with_capacity(accepted.len());
    let mut seen: HashSet<&str> = HashSet::new();
    for skill in accepted {
        if by_name[skill.flat_name.as_str()] > 1 {
            if seen.insert(skill.flat_name.as_str()) {
                report.failed.push(SkillFailure {
                    name: skill.flat_name.clone(),
                    error: format!(
                        "flat name collision: multiple skills resolve to '{}'",
                        skill.flat_name
                    ),
                });
            }
        } else {
            unique.push(skill);
        }
    }
    (unique, report)
}

fn merge_reports(into: &mut ProjectReport, from: ProjectReport) {
    into.linked.extend(from.linked);
    into.copied.extend(from.copied);
    into.updated.extend(from.updated);
    into.skipped.extend(from.skipped);
    into.failed.extend(from.failed);
}

/// True iff `entry_path` is a link whose target (resolved or dangling)
/// points into the source root. Together with manifest membership this is
/// the engine's ownership test.
pub(crate) fn link_into_source(entry_path: &Path, source_root: &Path) -> bool {
    if !crate::paths::is_link(entry_path) {
        return false;
    }
    match crate::paths::resolve_link(entry_path) {
        Ok(dest) => crate::paths::points_into(&dest, source_root),
        Err(_) => false,
    }
}
