use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use aiboom_shared::errors::{AppError, AppResult, ErrorCode};
use aiboom_shared::types::api::ApiResponse;
use aiboom_shared::types::auth::AuthUser;

use crate::models::{NewReport, Report};
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateReportRequest {
    #[validate(length(min = 1, max = 500, message = "reason must be 1-500 characters"))]
    pub reason: String,
}

pub async fn create_report(
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<Uuid>,
    auth: AuthUser,
    Json(body): Json<CreateReportRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Report>>)> {
    body.validate()
        .map_err(|e| AppError::new(ErrorCode::ValidationError, e.to_string()))?;

    let post = state
        .store
        .find_post(post_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::PostNotFound, "post not found"))?;

    if post.user_id == auth.id {
        return Err(AppError::new(ErrorCode::CannotReportOwnPost, "you cannot report your own post"));
    }

    if state.store.has_pending_report(post_id, auth.id).await? {
        return Err(AppError::new(
            ErrorCode::DuplicateReport,
            "you already have a pending report on this post",
        ));
    }

    let report = state
        .store
        .create_report(NewReport {
            post_id,
            reporter_id: auth.id,
            reason: body.reason.trim().to_string(),
        })
        .await?;

    tracing::info!(report_id = %report.id, post_id = %post_id, reporter_id = %auth.id, "report created");
    state.publisher.report_created(&report).await;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(report))))
}
