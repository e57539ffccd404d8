//! Backup and restore endpoints.

use axum::Json;
use axum::extract::State;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::ApiError;
use crate::oplog::{self, OpOutcome};
use crate::state::SharedState;

/// `GET /api/backups` — snapshots newest first, plus per-target aggregates.
pub async fn list(State(state): State<SharedState>) -> Result<Json<Value>, ApiError> {
    let config = state.config_snapshot();
    let backups = state.backups.list()?;
    let mut per_target = Vec::new();
    for name in config.targets.keys() {
        per_target.push(state.backups.list_target_backups(name)?);
    }
    Ok(Json(json!({ "backups": backups, "targets": per_target })))
}

/// Body of `POST /api/backup`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BackupRequest {
    /// Restrict to one target; all configured targets otherwise.
    pub target: Option<String>,
}

/// `POST /api/backup` — snapshot targets. Symlinked and empty targets are
/// skipped, a same-second snapshot collision is a 409.
pub async fn create(
    State(state): State<SharedState>,
    Json(req): Json<BackupRequest>,
) -> Result<Json<Value>, ApiError> {
    let _guard = state.ops_lock.lock().await;
    let op = oplog::start("backup", json!({ "target": req.target }));

    let config = state.config_snapshot();
    if let Some(name) = &req.target {
        if !config.targets.contains_key(name) {
            op.finish(OpOutcome::Blocked);
            return Err(ApiError::NotFound(format!("target not found: {name}")));
        }
    }

    let mut created = Vec::new();
    let mut skipped = Vec::new();
    for (name, target) in &config.targets {
        if req.target.as_deref().is_some_and(|t| t != name) {
            continue;
        }
        match state
            .backups
            .create(name, &target.path, config.mode_for(target))
        {
            Ok(Some(path)) => created.push(json!({ "target": name, "path": path })),
            Ok(None) => skipped.push(name.clone()),
            Err(err) => {
                op.finish(OpOutcome::Error);
                return Err(err.into());
            }
        }
    }
    op.finish(OpOutcome::Ok);
    Ok(Json(json!({
        "status": "ok",
        "created": created,
        "skipped": skipped,
    })))
}

/// Body of `POST /api/restore`.
#[derive(Debug, Deserialize)]
pub struct RestoreRequest {
    /// Snapshot timestamp (`YYYY-MM-DD_HH-MM-SS`).
    pub backup: String,
    /// Target name inside the snapshot.
    pub target: String,
    /// Destination; defaults to the target's configured path.
    #[serde(default)]
    pub dest: Option<std::path::PathBuf>,
    /// Restore over a non-empty directory.
    #[serde(default)]
    pub force: bool,
}

/// `POST /api/restore` — validate, then restore a snapshot over the
/// destination. The pre-flight is the same `validate_restore` the UI uses.
pub async fn restore(
    State(state): State<SharedState>,
    Json(req): Json<RestoreRequest>,
) -> Result<Json<Value>, ApiError> {
    let _guard = state.ops_lock.lock().await;
    let op = oplog::start(
        "restore",
        json!({ "backup": req.backup, "target": req.target, "force": req.force }),
    );

    let config = state.config_snapshot();
    let dest = match &req.dest {
        Some(dest) => dest.clone(),
        None => match config.targets.get(&req.target) {
            Some(target) => target.path.clone(),
            None => {
                op.finish(OpOutcome::Blocked);
                return Err(ApiError::NotFound(format!(
                    "target not found: {}",
                    req.target
                )));
            }
        },
    };

    if let Err(err) = state
        .backups
        .restore_to_path(&req.backup, &req.target, &dest, req.force)
    {
        op.finish(OpOutcome::Blocked);
        return Err(err.into());
    }
    state.invalidate_discovery();
    op.finish(OpOutcome::Ok);
    Ok(Json(json!({ "status": "ok", "dest": dest })))
}

/// Body of `POST /api/backup/cleanup`.
#[derive(Debug, Deserialize)]
pub struct CleanupRequest {
    /// Snapshots to keep, newest first.
    pub keep: usize,
}

/// `POST /api/backup/cleanup` — delete all but the newest N snapshots.
pub async fn cleanup(
    State(state): State<SharedState>,
    Json(req): Json<CleanupRequest>,
) -> Result<Json<Value>, ApiError> {
    let _guard = state.ops_lock.lock().await;
    let op = oplog::start("backup-cleanup", json!({ "keep": req.keep }));

    match state.backups.cleanup(req.keep) {
        Ok(removed) => {
            op.finish(OpOutcome::Ok);
            Ok(Json(json!({ "status": "ok", "removed": removed })))
        }
        Err(err) => {
            op.finish(OpOutcome::Error);
            Err(err.into())
        }
    }
}
