//! Discovery cache inspector.

use axum::Json;
use axum::extract::State;
use serde_json::{Value, json};

use crate::error::ApiError;
use crate::state::SharedState;

/// `GET /api/cache` — on-disk cache files with orphan/invalid flags.
pub async fn info(State(state): State<SharedState>) -> Result<Json<Value>, ApiError> {
    Ok(Json(json!({ "caches": state.cache.info() })))
}
