//! Target configuration CRUD.
//!
//! Every change runs the parse-validate-write-reload cycle against the
//! config file before it lands in server state.

use std::path::PathBuf;

use axum::Json;
use axum::extract::{Path, State};
use serde::Deserialize;
use serde_json::{Value, json};
use skillshare_core::config::{self, Config, Mode, TargetConfig};
use skillshare_core::engine;
use skillshare_core::manifest;

use crate::error::ApiError;
use crate::oplog::{self, OpOutcome};
use crate::state::SharedState;

/// `GET /api/targets` — configs joined with live status.
pub async fn list(State(state): State<SharedState>) -> Result<Json<Value>, ApiError> {
    let config = state.config_snapshot();
    let items: Vec<Value> = config
        .targets
        .iter()
        .map(|(name, target)| {
            let man = manifest::read(&target.path);
            let status = engine::status::check_status(&target.path, &config.source, &man);
            json!({
                "name": name,
                "path": target.path,
                "mode": config.mode_for(target).to_string(),
                "include": target.include,
                "exclude": target.exclude,
                "status": status,
            })
        })
        .collect();
    Ok(Json(json!({ "targets": items })))
}

/// Body of `POST /api/targets`.
#[derive(Debug, Deserialize)]
pub struct CreateTarget {
    /// Target name.
    pub name: String,
    /// Directory to project into.
    pub path: PathBuf,
    /// Optional mode (inherits the global default otherwise).
    #[serde(default)]
    pub mode: Option<Mode>,
    /// Include globs.
    #[serde(default)]
    pub include: Vec<String>,
    /// Exclude globs.
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// `POST /api/targets` — 409 on duplicate names.
pub async fn create(
    State(state): State<SharedState>,
    Json(req): Json<CreateTarget>,
) -> Result<Json<Value>, ApiError> {
    let _guard = state.ops_lock.lock().await;
    let op = oplog::start("target-add", json!({ "name": req.name, "path": req.path }));

    let mut config = state.config_snapshot();
    if config.targets.contains_key(&req.name) {
        op.finish(OpOutcome::Blocked);
        return Err(ApiError::Conflict(format!(
            "target already exists: {}",
            req.name
        )));
    }
    config.targets.insert(
        req.name.clone(),
        TargetConfig {
            path: req.path,
            mode: req.mode,
            include: req.include,
            exclude: req.exclude,
        },
    );

    match commit(&state, config) {
        Ok(()) => {
            op.finish(OpOutcome::Ok);
            Ok(Json(json!({ "status": "ok", "name": req.name })))
        }
        Err(err) => {
            op.finish(OpOutcome::Error);
            Err(err)
        }
    }
}

/// `DELETE /api/targets/{name}` — 404 on unknown names.
pub async fn remove(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let _guard = state.ops_lock.lock().await;
    let op = oplog::start("target-remove", json!({ "name": name }));

    let mut config = state.config_snapshot();
    if config.targets.remove(&name).is_none() {
        op.finish(OpOutcome::Blocked);
        return Err(ApiError::NotFound(format!("target not found: {name}")));
    }

    match commit(&state, config) {
        Ok(()) => {
            op.finish(OpOutcome::Ok);
            Ok(Json(json!({ "status": "ok", "name": name })))
        }
        Err(err) => {
            op.finish(OpOutcome::Error);
            Err(err)
        }
    }
}

/// Body of `PATCH /api/targets/{name}`; absent fields stay unchanged.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateTarget {
    /// New path, when present.
    pub path: Option<PathBuf>,
    /// New mode; `Some(None)` cannot be expressed — use the config file to
    /// drop a mode back to inherit.
    pub mode: Option<Mode>,
    /// Replacement include list.
    pub include: Option<Vec<String>>,
    /// Replacement exclude list.
    pub exclude: Option<Vec<String>>,
}

/// `PATCH /api/targets/{name}` — partial update, 404 on unknown names.
pub async fn update(
    State(state): State<SharedState>,
    Path(name): Path<String>,
    Json(req): Json<UpdateTarget>,
) -> Result<Json<Value>, ApiError> {
    let _guard = state.ops_lock.lock().await;
    let op = oplog::start("target-update", json!({ "name": name }));

    let mut config = state.config_snapshot();
    let Some(target) = config.targets.get_mut(&name) else {
        op.finish(OpOutcome::Blocked);
        return Err(ApiError::NotFound(format!("target not found: {name}")));
    };
    if let Some(path) = req.path {
        target.path = path;
    }
    if let Some(mode) = req.mode {
        target.mode = Some(mode);
    }
    if let Some(include) = req.include {
        target.include = include;
    }
    if let Some(exclude) = req.exclude {
        target.exclude = exclude;
    }

    match commit(&state, config) {
        Ok(()) => {
            op.finish(OpOutcome::Ok);
            Ok(Json(json!({ "status": "ok", "name": name })))
        }
        Err(err) => {
            op.finish(OpOutcome::Error);
            Err(err)
        }
    }
}

/// Validate → write → reload, in that order. A config that fails semantic
/// validation is rejected before it ever reaches the file.
fn commit(state: &SharedState, config: Config) -> Result<(), ApiError> {
    config::validate(&config)?;
    config::save(&state.config_path, &config)?;
    *state.config.write().expect("config lock poisoned") = config;
    Ok(())
}
