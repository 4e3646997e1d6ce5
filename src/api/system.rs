use axum::Json;

use super::types::HealthResponse;

/// GET /health
/// Liveness probe. Answers without touching the database.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        message: format!("partpix {} is running", env!("CARGO_PKG_VERSION")),
    })
}
