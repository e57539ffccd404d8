//! Skill discovery.
//!
//! A skill is a directory containing a `SKILL.md` file. Discovery walks a
//! source root recursively and reports each skill with its relative path,
//! flat name, tracked-repo flag, and (in full mode) the `targets:` list from
//! its frontmatter.
//!
//! Two entry points:
//!
//! - [`discover`] (full): reads each `SKILL.md` just far enough to extract
//!   `targets:`; never parses the rest of the document.
//! - [`discover_lite`]: skips frontmatter entirely and additionally records
//!   the set of tracked-repo directory names.

pub mod frontmatter;

use std::collections::BTreeSet;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use walkdir::WalkDir;

use crate::paths;

/// The file that marks its containing directory as a skill.
pub const SKILL_FILE: &str = "SKILL.md";

/// Errors surfaced by discovery.
#[derive(Error, Debug)]
pub enum DiscoverError {
    /// The source root does not exist.
    #[error("source directory not found: {0}")]
    SourceMissing(PathBuf),

    /// Any other filesystem failure at the root itself. Per-entry stat
    /// failures during the walk are traversal races and silently skipped.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A discovered skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    /// Absolute path of the skill directory, computed against the
    /// caller-supplied root even when that root is itself a symlink.
    pub source_path: PathBuf,
    /// Path relative to the source root, forward-slash normalized.
    pub rel_path: String,
    /// Single-segment name used inside targets (`/` replaced by `__`).
    pub flat_name: String,
    /// True iff the first segment of `rel_path` begins with `_` and that
    /// first-level directory contains a `.git` subdirectory.
    pub is_in_repo: bool,
    /// Target names from frontmatter. `None` means the skill applies to
    /// every target.
    pub targets: Option<Vec<String>>,
}

/// Result of a lite discovery walk.
#[derive(Debug, Clone, Default)]
pub struct LiteDiscovery {
    /// Discovered skills, `targets` always `None`.
    pub skills: Vec<Skill>,
    /// First-level directory names that begin with `_` and contain `.git`.
    pub tracked_repos: Vec<String>,
}

/// Full discovery: walk `source_root` and parse each skill's `targets:` list.
pub fn discover(source_root: &Path) -> Result<Vec<Skill>, DiscoverError> {
    let mut skills = walk(source_root, true)?.skills;
    skills.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
    Ok(skills)
}

/// Lite discovery: names only, plus the tracked-repo list. Frontmatter is
/// never read.
pub fn discover_lite(source_root: &Path) -> Result<LiteDiscovery, DiscoverError> {
    let mut lite = walk(source_root, false)?;
    lite.skills.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
    Ok(lite)
}

/// Counts `SKILL.md` files under `source_root` without reading or statting
/// them individually. Used as the cheap staleness guard by the discovery
/// cache.
pub fn count_skill_files(source_root: &Path) -> Result<usize, DiscoverError> {
    if !source_root.exists() {
        return Err(DiscoverError::SourceMissing(source_root.to_path_buf()));
    }
    let walk_root = fs::canonicalize(source_root)?;
    let count = WalkDir::new(&walk_root)
        .min_depth(2)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| !(e.file_type().is_dir() && e.file_name() == ".git"))
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file() && e.file_name() == SKILL_FILE)
        .count();
    Ok(count)
}

fn walk(source_root: &Path, parse_frontmatter: bool) -> Result<LiteDiscovery, DiscoverError> {
    if !source_root.exists() {
        return Err(DiscoverError::SourceMissing(source_root.to_path_buf()));
    }
    // Walk the real directory, but report paths against the logical root so
    // downstream operations keep the caller's spelling.
    let walk_root = fs::canonicalize(source_root)?;

    let mut repo_cache: BTreeSet<String> = BTreeSet::new();
    let mut non_repo_cache: BTreeSet<String> = BTreeSet::new();
    let mut skills = Vec::new();

    for entry in WalkDir::new(&walk_root)
        .min_depth(1)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| !(e.file_type().is_dir() && e.file_name() == ".git"))
        .filter_map(Result::ok)
    {
        if !entry.file_type().is_file() || entry.file_name() != SKILL_FILE {
            continue;
        }
        let Ok(rel_file) = entry.path().strip_prefix(&walk_root) else {
            continue;
        };
        // SKILL.md at the walk root identifies no directory; min_depth(1)
        // admits it, so filter here.
        let Some(rel_dir) = rel_file.parent().filter(|p| !p.as_os_str().is_empty()) else {
            continue;
        };

        let rel_path = to_slash(rel_dir);
        let first_segment = rel_path.split('/').next().unwrap_or(&rel_path).to_string();
        let is_in_repo = first_segment.starts_with('_')
            && is_tracked_repo(
                &walk_root,
                &first_segment,
                &mut repo_cache,
                &mut non_repo_cache,
            );

        let targets = if parse_frontmatter {
            read_targets(entry.path())
        } else {
            None
        };

        skills.push(Skill {
            source_path: source_root.join(rel_dir),
            flat_name: paths::flat_name(&rel_path),
            rel_path,
            is_in_repo,
            targets,
        });
    }

    Ok(LiteDiscovery {
        skills,
        tracked_repos: repo_cache.into_iter().collect(),
    })
}

fn is_tracked_repo(
    walk_root: &Path,
    first_segment: &str,
    repos: &mut BTreeSet<String>,
    non_repos: &mut BTreeSet<String>,
) -> bool {
    if repos.contains(first_segment) {
        return true;
    }
    if non_repos.contains(first_segment) {
        return false;
    }
    let tracked = walk_root.join(first_segment).join(".git").is_dir();
    if tracked {
        repos.insert(first_segment.to_string());
    } else {
        non_repos.insert(first_segment.to_string());
    }
    tracked
}

/// Reads just enough of a `SKILL.md` to extract the frontmatter, then parses
/// the `targets:` list. Read failures are traversal races, not errors.
fn read_targets(skill_file: &Path) -> Option<Vec<String>> {
    // Frontmatter past this size is not something we are willing to parse.
    const MAX_FRONTMATTER: usize = 64 * 1024;

    let file = fs::File::open(skill_file).ok()?;
    let mut reader = BufReader::new(file);
    let mut head = String::new();

    // Frontmatter must open on the first line; otherwise stop immediately.
    let mut first = String::new();
    reader.read_line(&mut first).ok()?;
    if first.trim_end().trim_start_matches('\u{feff}') != "---" {
        return None;
    }
    head.push_str(&first);
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line).ok()? == 0 {
            break;
        }
        head.push_str(&line);
        let t = line.trim_end();
        if t == "---" || t == "..." || head.len() > MAX_FRONTMATTER {
            break;
        }
    }
    frontmatter::parse_targets(&head)
}

fn to_slash(path: &Path) -> String {
    let mut out = String::new();
    for comp in path.components() {
        if !out.is_empty() {
            out.push('/');
        }
        out.push_str(&comp.as_os_str().to_string_lossy());
    }
    out
}
