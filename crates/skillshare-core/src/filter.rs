//! Include/exclude filtering and target-name policy.
//!
//! Patterns are globs matched against flat names. A skill is accepted iff no
//! include pattern exists or at least one matches, and no exclude pattern
//! matches. Pattern validation happens before any filesystem action.

use glob::Pattern;
use thiserror::Error;

use crate::discover::Skill;

/// A bad glob pattern; reported before any filesystem action.
#[derive(Error, Debug)]
#[error("invalid filter pattern '{pattern}': {source}")]
pub struct FilterError {
    /// The offending pattern text.
    pub pattern: String,
    source: glob::PatternError,
}

/// Target names the engine treats as interchangeable. A skill whose
/// `targets` list names either spelling applies to a target configured
/// under the other.
const TARGET_ALIASES: &[(&str, &str)] = &[("claude", "claude-code")];

/// Compiled include/exclude patterns over flat names.
#[derive(Debug, Default)]
pub struct SkillFilter {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl SkillFilter {
    /// Compiles pattern lists. Empty strings are ignored; an invalid
    /// pattern fails the whole filter.
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self, FilterError> {
        Ok(Self {
            include: compile(include)?,
            exclude: compile(exclude)?,
        })
    }

    /// Returns true iff `flat_name` passes the include/exclude gates.
    pub fn matches(&self, flat_name: &str) -> bool {
        let included =
            self.include.is_empty() || self.include.iter().any(|p| p.matches(flat_name));
        included && !self.exclude.iter().any(|p| p.matches(flat_name))
    }
}

fn compile(patterns: &[String]) -> Result<Vec<Pattern>, FilterError> {
    patterns
        .iter()
        .filter(|p| !p.is_empty())
        .map(|p| {
            Pattern::new(p).map_err(|source| FilterError {
                pattern: p.clone(),
                source,
            })
        })
        .collect()
}

/// Returns true iff a skill applies to the named target: a `targets` of
/// `None` applies everywhere, otherwise the list must contain the target
/// name or its canonical alias.
pub fn applies_to_target(skill: &Skill, target_name: &str) -> bool {
    match &skill.targets {
        None => true,
        Some(list) => list
            .iter()
            .any(|t| t == target_name || is_alias(t, target_name)),
    }
}

/// Applies both gates — the per-target `targets` list and the
/// include/exclude filter — returning the filtered set in input order.
pub fn filter_for_target<'a>(
    skills: &'a [Skill],
    target_name: &str,
    filter: &SkillFilter,
) -> Vec<&'a Skill> {
    skills
        .iter()
        .filter(|s| applies_to_target(s, target_name) && filter.matches(&s.flat_name))
        .collect()
}

fn is_alias(a: &str, b: &str) -> bool {
    TARGET_ALIASES
        .iter()
        .any(|(x, y)| (*x == a && *y == b) || (*x == b && *y == a))
}
