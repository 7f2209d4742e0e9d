//! HTTP management surface.
//!
//! A thin JSON API over the running integrators:
//!
//! - `GET /health` - liveness probe
//! - `GET /api/v1/server` - snapshot of every project
//! - `GET /api/v1/projects/{name}` - one project's snapshot
//! - `POST /api/v1/projects/{name}/force` - request a forced build
//! - `POST /api/v1/projects/{name}/abort` - abort the build in progress
//! - `POST /api/v1/projects/{name}/cancel-pending` - drop a queued request
//!
//! Every operation maps directly onto an integrator handle method; the
//! server holds no state of its own beyond the registry.

use std::sync::Arc;

use crate::registry::ProjectRegistry;

pub mod control;
pub mod health;
pub mod projects;

pub use control::{abort_handler, cancel_pending_handler, force_build_handler};
pub use health::health_handler;
pub use projects::{project_handler, server_snapshot_handler};

/// Shared application state for all handlers.
#[derive(Clone)]
pub struct AppState {
    registry: Arc<ProjectRegistry>,
}

impl AppState {
    pub fn new(registry: Arc<ProjectRegistry>) -> Self {
        AppState { registry }
    }

    pub fn registry(&self) -> &ProjectRegistry {
        &self.registry
    }
}

/// Builds the axum Router with all endpoints.
pub fn build_router(app_state: AppState) -> axum::Router {
    use axum::routing::{get, post};

    axum::Router::new()
        .route("/health", get(health_handler))
        .route("/api/v1/server", get(server_snapshot_handler))
        .route("/api/v1/projects/{name}", get(project_handler))
        .route("/api/v1/projects/{name}/force", post(force_build_handler))
        .route("/api/v1/projects/{name}/abort", post(abort_handler))
        .route(
            "/api/v1/projects/{name}/cancel-pending",
            post(cancel_pending_handler),
        )
        .with_state(app_state)
}
