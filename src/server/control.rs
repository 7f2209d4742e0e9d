//! Build control endpoints: force, abort, cancel-pending.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use super::AppState;
use super::projects::ApiError;
use crate::types::{BuildParameters, ProjectName};

/// Optional body for a forced build.
#[derive(Debug, Default, Deserialize)]
pub struct ForceBuildBody {
    /// Who is asking, for attribution in the build record.
    pub user: Option<String>,
    /// Name/value pairs exposed to the task pipeline.
    #[serde(default)]
    pub parameters: BuildParameters,
}

fn resolve(
    state: &AppState,
    name: String,
) -> Result<std::sync::Arc<crate::integrator::IntegratorHandle>, ApiError> {
    let project = ProjectName::new(name);
    state
        .registry()
        .get(&project)
        .ok_or(ApiError::UnknownProject(project))
}

/// `POST /api/v1/projects/{name}/force` - request a forced build.
///
/// Returns 202: the request is queued (or collapsed into an equal-or-
/// stronger pending one), not yet built.
pub async fn force_build_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Option<Json<ForceBuildBody>>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let handle = resolve(&state, name)?;
    let body = body.map(|Json(body)| body).unwrap_or_default();

    info!(project = %handle.name(), user = ?body.user, "force build requested");
    let accepted = handle.force_build(body.user, body.parameters);

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "accepted": accepted })),
    ))
}

/// `POST /api/v1/projects/{name}/abort` - abort the build in progress.
pub async fn abort_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let handle = resolve(&state, name)?;
    info!(project = %handle.name(), "abort requested");
    handle.abort();
    Ok((StatusCode::ACCEPTED, Json(json!({ "aborting": true }))))
}

/// `POST /api/v1/projects/{name}/cancel-pending` - drop a queued request.
pub async fn cancel_pending_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let handle = resolve(&state, name)?;
    let cancelled = handle.cancel_pending_request();
    info!(project = %handle.name(), cancelled, "cancel pending requested");
    Ok(Json(json!({ "cancelled": cancelled })))
}
