//! Reverse collection: preview and apply.

use std::collections::HashSet;

use axum::Json;
use axum::extract::{Query, State};
use serde::Deserialize;
use serde_json::{Value, json};
use skillshare_core::{collect, manifest};

use crate::error::ApiError;
use crate::oplog::{self, OpOutcome};
use crate::state::SharedState;

/// Query of `GET /api/collect/scan`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ScanQuery {
    /// Restrict the scan to one target.
    pub target: Option<String>,
}

/// `GET /api/collect/scan` — target-local skills that could be pulled.
pub async fn scan(
    State(state): State<SharedState>,
    Query(query): Query<ScanQuery>,
) -> Result<Json<Value>, ApiError> {
    let (config, skills, _) = super::discovery(&state)?;
    let source_names: HashSet<String> =
        skills.iter().map(|s| s.flat_name.clone()).collect();

    let mut found = Vec::new();
    for (name, target) in &config.targets {
        if query.target.as_deref().is_some_and(|t| t != name) {
            continue;
        }
        let man = manifest::read(&target.path);
        let local = collect::scan(&target.path, &man, &source_names)?;
        found.push(json!({ "target": name, "skills": local }));
    }
    if let Some(wanted) = &query.target {
        if !config.targets.contains_key(wanted) {
            return Err(ApiError::NotFound(format!("target not found: {wanted}")));
        }
    }
    Ok(Json(json!({ "targets": found })))
}

/// Body of `POST /api/collect`.
#[derive(Debug, Deserialize)]
pub struct CollectRequest {
    /// Target to pull from.
    pub target: String,
    /// Restrict to these skill names; everything found otherwise.
    #[serde(default)]
    pub names: Option<Vec<String>>,
    /// Overwrite existing source skills.
    #[serde(default)]
    pub force: bool,
}

/// `POST /api/collect` — pull target-local skills into the source.
pub async fn apply(
    State(state): State<SharedState>,
    Json(req): Json<CollectRequest>,
) -> Result<Json<Value>, ApiError> {
    let _guard = state.ops_lock.lock().await;
    let op = oplog::start(
        "collect",
        json!({ "target": req.target, "force": req.force }),
    );

    let result = run_collect(&state, &req);
    match &result {
        Ok((pulled, failed)) => {
            state.invalidate_discovery();
            op.finish(if failed.is_empty() {
                OpOutcome::Ok
            } else if pulled.is_empty() {
                OpOutcome::Error
            } else {
                OpOutcome::Partial
            });
        }
        Err(_) => op.finish(OpOutcome::Error),
    }
    let (pulled, failed) = result?;
    Ok(Json(json!({
        "status": if failed.is_empty() { "ok" } else { "partial" },
        "pulled": pulled,
        "failed": failed,
    })))
}

type CollectOutcome = (Vec<String>, Vec<Value>);

fn run_collect(state: &SharedState, req: &CollectRequest) -> Result<CollectOutcome, ApiError> {
    let (config, skills, _) = super::discovery(state)?;
    let Some(target) = config.targets.get(&req.target) else {
        return Err(ApiError::NotFound(format!(
            "target not found: {}",
            req.target
        )));
    };
    let source_names: HashSet<String> =
        skills.iter().map(|s| s.flat_name.clone()).collect();
    let man = manifest::read(&target.path);
    let mut candidates = collect::scan(&target.path, &man, &source_names)?;
    if let Some(names) = &req.names {
        candidates.retain(|c| names.contains(&c.name));
    }

    let mut pulled = Vec::new();
    let mut failed = Vec::new();
    for (name, outcome) in collect::pull(&candidates, &config.source, req.force) {
        match outcome {
            Ok(()) => pulled.push(name),
            Err(err) => failed.push(json!({ "name": name, "error": err.to_string() })),
        }
    }
    Ok((pulled, failed))
}
