//! Projection endpoints: sync, diff preview, status.

use axum::Json;
use axum::extract::State;
use serde::Deserialize;
use serde_json::{Value, json};
use skillshare_core::engine::{self, SyncOptions};

use crate::error::ApiError;
use crate::oplog;
use crate::state::SharedState;

/// Body of `POST /api/sync`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SyncRequest {
    /// Classify only; touch nothing.
    pub dry_run: bool,
    /// Replace user-local entries and external links.
    pub force: bool,
}

/// `POST /api/sync` — run projection for all targets under the
/// serialization lock.
pub async fn sync(
    State(state): State<SharedState>,
    Json(req): Json<SyncRequest>,
) -> Result<Json<Value>, ApiError> {
    let _guard = state.ops_lock.lock().await;
    let op = oplog::start(
        "sync",
        json!({ "dryRun": req.dry_run, "force": req.force }),
    );

    let summary = match run_sync(&state, &req) {
        Ok(summary) => summary,
        Err(err) => {
            op.finish(oplog::OpOutcome::Error);
            return Err(err);
        }
    };

    // A symlink-mode migration can move files into the source, so the
    // skill set may have changed. Invalidate before the lock is released.
    if !req.dry_run {
        state.invalidate_discovery();
    }
    op.finish(summary.status().into());
    Ok(Json(json!({
        "status": summary.status(),
        "targets": summary.targets,
        "errors": summary.errors,
    })))
}

fn run_sync(
    state: &SharedState,
    req: &SyncRequest,
) -> Result<engine::SyncSummary, ApiError> {
    let (config, skills, lite) = super::discovery(state)?;
    Ok(engine::sync_all(
        &config,
        &skills,
        &lite.tracked_repos,
        SyncOptions {
            force: req.force,
            dry_run: req.dry_run,
        },
    ))
}

/// `GET /api/diff` — the dry-run classification, no lock, no mutation.
pub async fn diff(State(state): State<SharedState>) -> Result<Json<Value>, ApiError> {
    let (config, skills, lite) = super::discovery(&state)?;
    let summary = engine::diff_all(&config, &skills, &lite.tracked_repos, false);
    Ok(Json(json!({
        "status": summary.status(),
        "targets": summary.targets,
        "errors": summary.errors,
    })))
}

/// `GET /api/status` — per-target state, read-only.
pub async fn status(State(state): State<SharedState>) -> Result<Json<Value>, ApiError> {
    let config = state.config_snapshot();
    let statuses: Vec<Value> = engine::status_all(&config)
        .into_iter()
        .map(|(name, status)| json!({ "name": name, "status": status }))
        .collect();
    Ok(Json(json!({ "targets": statuses })))
}
