use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use aiboom_shared::errors::AppResult;
use aiboom_shared::middleware::OptionalAuthUser;
use aiboom_shared::types::api::ApiResponse;

use crate::voting::{Choice, TallyView, VoteOutcome};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub vote_ai: bool,
}

/// Cast, flip or retract the caller's vote. Anonymous callers reach the
/// handler so they get the sign-in prompt rather than a bare 401.
pub async fn cast_vote(
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<Uuid>,
    OptionalAuthUser(voter): OptionalAuthUser,
    Json(body): Json<VoteRequest>,
) -> AppResult<Json<ApiResponse<VoteOutcome>>> {
    let outcome = state
        .sessions
        .cast_vote(voter.as_ref(), post_id, Choice::from_vote_ai(body.vote_ai), Utc::now())
        .await?;

    Ok(Json(ApiResponse::ok(outcome)))
}

pub async fn get_tally(
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<Uuid>,
    OptionalAuthUser(viewer): OptionalAuthUser,
) -> AppResult<Json<ApiResponse<TallyView>>> {
    let view = state
        .sessions
        .view_tally(post_id, viewer.map(|u| u.id), Utc::now())
        .await?;

    Ok(Json(ApiResponse::ok(view)))
}
