//! Route handlers, one module per API area.

pub mod backup;
pub mod cache;
pub mod collect;
pub mod config;
pub mod health;
pub mod skills;
pub mod sync;
pub mod targets;

use std::sync::Arc;

use skillshare_core::config::Config;
use skillshare_core::discover::{LiteDiscovery, Skill};

use crate::error::ApiError;
use crate::state::SharedState;

/// Current config plus both discovery views, through the cache.
fn discovery(
    state: &SharedState,
) -> Result<(Config, Arc<Vec<Skill>>, Arc<LiteDiscovery>), ApiError> {
    let config = state.config_snapshot();
    let skills = state.cache.discover_full(&config.source)?;
    let lite = state.cache.discover_lite(&config.source)?;
    Ok((config, skills, lite))
}
