//! Read-only project snapshots.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use super::AppState;
use crate::integrator::ProjectSnapshot;
use crate::types::ProjectName;

/// Errors resolving a project for the API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("unknown project: {0}")]
    UnknownProject(ProjectName),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::UnknownProject(_) => StatusCode::NOT_FOUND,
        };
        (status, self.to_string()).into_response()
    }
}

/// The whole-server snapshot body.
#[derive(Debug, Serialize)]
pub struct ServerSnapshot {
    pub projects: Vec<ProjectSnapshot>,
}

/// `GET /api/v1/server` - every project's snapshot.
pub async fn server_snapshot_handler(State(state): State<AppState>) -> Json<ServerSnapshot> {
    Json(ServerSnapshot {
        projects: state.registry().snapshot_all(),
    })
}

/// `GET /api/v1/projects/{name}` - one project's snapshot.
pub async fn project_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ProjectSnapshot>, ApiError> {
    let project = ProjectName::new(name);
    let handle = state
        .registry()
        .get(&project)
        .ok_or(ApiError::UnknownProject(project))?;
    Ok(Json(handle.snapshot()))
}
