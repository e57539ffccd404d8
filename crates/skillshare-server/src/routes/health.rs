//! Health and overview.

use axum::Json;
use axum::extract::State;
use serde_json::{Value, json};

use crate::error::ApiError;
use crate::state::SharedState;

/// `GET /api/health`
pub async fn health(State(state): State<SharedState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "uptime_seconds": state.started.elapsed().as_secs(),
    }))
}

/// `GET /api/overview` — skill/target counts and a per-mode summary.
pub async fn overview(State(state): State<SharedState>) -> Result<Json<Value>, ApiError> {
    let (config, skills, lite) = super::discovery(&state)?;

    let mut modes = json!({ "symlink": 0, "merge": 0, "copy": 0 });
    for target in config.targets.values() {
        let key = config.mode_for(target).to_string();
        modes[&key] = json!(modes[&key].as_u64().unwrap_or(0) + 1);
    }

    Ok(Json(json!({
        "skills": skills.len(),
        "targets": config.targets.len(),
        "tracked_repos": lite.tracked_repos,
        "modes": modes,
        "source": config.source,
    })))
}
