use axum::{Json, extract::State};
use std::sync::Arc;

use super::{ApiError, AppState};

/// GET /catalog/all
/// Every known part code, lexicographically ordered. Backs client-side
/// autocomplete, so the full list is returned without pagination.
pub async fn list_part_codes(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<String>>, ApiError> {
    let codes = state.store().list_part_codes().await?;
    Ok(Json(codes))
}
