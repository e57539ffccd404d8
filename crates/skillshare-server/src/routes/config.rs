//! Raw config read/write.
//!
//! The write path is parse → validate → write → reload. A YAML parse
//! failure is a 400 and nothing is written. A parseable but semantically
//! invalid config IS written — the reload failure is surfaced in the
//! response body so a UI can show it — and the next request re-reads the
//! file. The read path always returns the raw bytes, valid or not.

use axum::Json;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use skillshare_core::config::{self, Config};

use crate::error::ApiError;
use crate::oplog::{self, OpOutcome};
use crate::state::SharedState;

/// `GET /api/config` — the raw file bytes, whatever they contain.
pub async fn read(State(state): State<SharedState>) -> Result<Response, ApiError> {
    let bytes = match std::fs::read(&state.config_path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ApiError::NotFound(format!(
                "config file not found: {}",
                state.config_path.display()
            )));
        }
        Err(e) => return Err(e.into()),
    };
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/yaml")],
        bytes,
    )
        .into_response())
}

/// `PUT /api/config` — body is the raw YAML.
pub async fn write(
    State(state): State<SharedState>,
    body: String,
) -> Result<Json<Value>, ApiError> {
    let _guard = state.ops_lock.lock().await;
    let op = oplog::start("config-write", json!({ "bytes": body.len() }));

    // Parse first: unparseable input never reaches the file.
    let parsed: Config = match serde_yaml::from_str(&body) {
        Ok(parsed) => parsed,
        Err(err) => {
            op.finish(OpOutcome::Blocked);
            return Err(ApiError::Validation(format!("config parse error: {err}")));
        }
    };

    let old_source = state.config_snapshot().source;
    if let Some(parent) = state.config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&state.config_path, &body)?;

    // Reload: semantic validation decides whether the new config becomes
    // active. Either way the file stays as written.
    match config::validate(&parsed) {
        Ok(()) => {
            *state.config.write().expect("config lock poisoned") = parsed;
            state.cache.invalidate(&old_source);
            state.invalidate_discovery();
            op.finish(OpOutcome::Ok);
            Ok(Json(json!({ "status": "ok" })))
        }
        Err(err) => {
            op.finish(OpOutcome::Partial);
            Ok(Json(json!({
                "status": "written",
                "reload_error": err.to_string(),
            })))
        }
    }
}
