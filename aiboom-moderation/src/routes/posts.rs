use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;

use aiboom_shared::errors::AppResult;
use aiboom_shared::middleware::OptionalAuthUser;
use aiboom_shared::types::api::ApiResponse;
use aiboom_shared::types::auth::AuthUser;
use aiboom_shared::types::pagination::{Paginated, PaginationParams};

use crate::models::Post;
use crate::submission::SubmitPostRequest;
use crate::voting::PendingPostView;
use crate::AppState;

pub async fn submit_post(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<SubmitPostRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Post>>)> {
    let post = state.gate.submit(auth.id, body, Utc::now()).await?;

    let message = if post.is_pending() {
        "post is live and awaiting community verification"
    } else {
        "post published"
    };

    Ok((StatusCode::CREATED, Json(ApiResponse::ok_with_message(post, message))))
}

/// Pending posts still open for voting, newest first.
pub async fn list_pending(
    State(state): State<Arc<AppState>>,
    OptionalAuthUser(viewer): OptionalAuthUser,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Paginated<PendingPostView>>>> {
    let page = state
        .sessions
        .list_pending(viewer.map(|u| u.id), &params, Utc::now())
        .await?;

    Ok(Json(ApiResponse::ok(page)))
}
