use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use chrono::Utc;
use futures::{Stream, StreamExt};
use uuid::Uuid;

use aiboom_shared::errors::AppResult;
use aiboom_shared::middleware::OptionalAuthUser;

use crate::AppState;

/// `GET /posts/:id/live`: server-sent `tally`, `countdown` and `resolved`
/// events for one post. The stream closes after `resolved`; a client that
/// disconnects drops its feed subscription with it.
pub async fn live_tally(
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<Uuid>,
    OptionalAuthUser(viewer): OptionalAuthUser,
) -> AppResult<Sse<impl Stream<Item = Result<SseEvent, Infallible>>>> {
    let viewer = viewer.map(|u| u.id);
    let initial = state.sessions.view_tally(post_id, viewer, Utc::now()).await?;
    let mut updates = Box::pin(state.sessions.live_view(initial, viewer));

    tracing::info!(post_id = %post_id, "live view opened");

    let stream = async_stream::stream! {
        while let Some(update) = updates.next().await {
            let json = match serde_json::to_string(&update) {
                Ok(json) => json,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to serialize live update");
                    continue;
                }
            };

            yield Ok(SseEvent::default().event(update.event_name()).data(json));
        }

        tracing::info!(post_id = %post_id, "live view closed");
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}
