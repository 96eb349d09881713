use axum::{response::IntoResponse, Json};
use serde_json::json;

/// Liveness probe; does not touch the database.
pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "up" }))
}
