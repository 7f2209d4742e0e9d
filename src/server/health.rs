//! Liveness probe.

use axum::Json;
use serde_json::{Value, json};

/// Returns 200 with a tiny JSON body while the server is up.
pub async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
