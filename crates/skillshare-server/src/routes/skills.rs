//! Skill listing and detail.

use axum::Json;
use axum::extract::{Path, State};
use serde_json::{Value, json};
use skillshare_core::discover::Skill;

use crate::error::ApiError;
use crate::state::SharedState;

fn skill_json(skill: &Skill) -> Value {
    json!({
        "name": skill.flat_name,
        "rel_path": skill.rel_path,
        "source_path": skill.source_path,
        "is_in_repo": skill.is_in_repo,
        "targets": skill.targets,
    })
}

/// `GET /api/skills`
pub async fn list(State(state): State<SharedState>) -> Result<Json<Value>, ApiError> {
    let (_, skills, _) = super::discovery(&state)?;
    let items: Vec<Value> = skills.iter().map(skill_json).collect();
    Ok(Json(json!({ "skills": items })))
}

/// `GET /api/skills/{name}` — looked up by flat name.
pub async fn detail(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let (_, skills, _) = super::discovery(&state)?;
    skills
        .iter()
        .find(|s| s.flat_name == name)
        .map(|s| Json(skill_json(s)))
        .ok_or_else(|| ApiError::NotFound(format!("skill not found: {name}")))
}
