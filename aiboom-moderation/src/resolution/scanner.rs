use chrono::{DateTime, Utc};
use uuid::Uuid;

use aiboom_shared::errors::AppResult;

use crate::store::PostStore;

/// Pending posts whose voting window closed strictly before `now`.
///
/// Read-only and unordered; safe to call from any number of places at once.
/// Posts resolved by a concurrent pass simply stop matching.
pub async fn find_expired<S>(store: &S, now: DateTime<Utc>) -> AppResult<Vec<Uuid>>
where
    S: PostStore + ?Sized,
{
    let ids = store.expired_pending_posts(now).await?;
    if !ids.is_empty() {
        tracing::debug!(count = ids.len(), "expired pending posts found");
    }
    Ok(ids)
}
