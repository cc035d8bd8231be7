use std::time::Duration;

use chrono::Utc;

use crate::resolution::Resolver;

/// Spawn the periodic resolution pass. Each tick is an ordinary scan; a pass
/// that fails is logged and the next tick tries again.
pub fn spawn_resolution_task(resolver: Resolver, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!(interval_secs = every.as_secs(), "resolution scheduler started");

        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;

            if let Err(e) = resolver.resolve_expired(Utc::now()).await {
                tracing::error!(error = %e, "scheduled resolution pass failed");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::events::{EventPublisher, VoteFeed};
    use crate::store::{MemoryStore, PostStore};
    use crate::testing::pending_post;

    #[tokio::test]
    async fn scheduled_pass_resolves_expired_posts() {
        let store = Arc::new(MemoryStore::new());
        let post = store
            .create_post(pending_post(Utc::now() - chrono::Duration::minutes(1)))
            .await
            .unwrap();
        let resolver = Resolver::new(store.clone(), EventPublisher::disabled(), VoteFeed::new());

        let handle = spawn_resolution_task(resolver, Duration::from_secs(60));
        // The first tick fires immediately.
        tokio::time::sleep(Duration::from_millis(50)).await;

        let post = store.find_post(post.id).await.unwrap().unwrap();
        assert!(!post.is_pending());
        handle.abort();
    }
}
