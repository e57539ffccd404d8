//! API error surface.
//!
//! Handlers return [`ApiError`]; the HTTP mapping follows the engine's
//! taxonomy: 400 validation, 404 missing named entity, 409 conflict,
//! 500 I/O or unexpected.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use skillshare_core::backup::{BackupError, RestoreError};
use skillshare_core::config::ConfigError;
use skillshare_core::discover::DiscoverError;
use skillshare_core::engine::EngineError;
use thiserror::Error;

/// One API failure, already classified.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Bad request body or parameters.
    #[error("{0}")]
    Validation(String),

    /// A named entity does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Existing state conflicts with the request.
    #[error("{0}")]
    Conflict(String),

    /// Everything else.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// HTTP status for this kind.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<DiscoverError> for ApiError {
    fn from(err: DiscoverError) -> Self {
        match err {
            DiscoverError::SourceMissing(_) => Self::Validation(err.to_string()),
            DiscoverError::Io(_) => Self::Internal(err.to_string()),
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Conflict { .. } => Self::Conflict(err.to_string()),
            EngineError::Filter(_) => Self::Validation(err.to_string()),
            EngineError::LinkCycle(_) | EngineError::Io(_) => {
                Self::Internal(err.to_string())
            }
        }
    }
}

impl From<BackupError> for ApiError {
    fn from(err: BackupError) -> Self {
        match err {
            BackupError::SnapshotExists(_) => Self::Conflict(err.to_string()),
            BackupError::Io(_) => Self::Internal(err.to_string()),
        }
    }
}

impl From<RestoreError> for ApiError {
    fn from(err: RestoreError) -> Self {
        match err {
            RestoreError::NotFound { .. } => Self::NotFound(err.to_string()),
            RestoreError::NotEmpty(_) | RestoreError::NotADirectory(_) => {
                Self::Conflict(err.to_string())
            }
            RestoreError::Io(_) => Self::Internal(err.to_string()),
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NotFound(_) => Self::NotFound(err.to_string()),
            ConfigError::Parse(_) | ConfigError::Invalid(_) => {
                Self::Validation(err.to_string())
            }
            ConfigError::Io(_) => Self::Internal(err.to_string()),
        }
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}
