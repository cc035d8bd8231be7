use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::Utc;

use aiboom_shared::errors::AppResult;
use aiboom_shared::types::api::ApiResponse;

use crate::resolution::ResolveSummary;
use crate::AppState;

/// Run one scan and resolution pass now. Idempotent: calling it on page
/// load, from a timer or from an external scheduler is equally safe.
pub async fn resolve_now(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<ResolveSummary>>> {
    let summary = state.resolver.resolve_expired(Utc::now()).await?;
    Ok(Json(ApiResponse::ok(summary)))
}
