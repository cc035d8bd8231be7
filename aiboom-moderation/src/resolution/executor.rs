use chrono::{DateTime, Utc};
use metrics::counter;
use serde::Serialize;
use uuid::Uuid;

use aiboom_shared::errors::AppResult;

use crate::events::{EventPublisher, FeedEvent, Outcome, VoteFeed};
use crate::store::{DependentTable, SharedStore};
use crate::voting::{tally, Tally, Verdict};

use super::scanner;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Gone,
    NotPending,
    NotExpired,
}

/// What one resolution attempt did to a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Approved(Tally),
    Purged(Tally),
    Skipped(SkipReason),
}

impl Resolution {
    fn outcome_label(&self) -> &'static str {
        match self {
            Resolution::Approved(_) => "approved",
            Resolution::Purged(_) => "purged",
            Resolution::Skipped(_) => "skipped",
        }
    }
}

/// Result of one scan pass. `resolved` is `approved + purged`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResolveSummary {
    pub resolved: u64,
    pub approved: u64,
    pub purged: u64,
    pub failed: u64,
    pub skipped: u64,
}

impl ResolveSummary {
    fn record(&mut self, resolution: &Resolution) {
        match resolution {
            Resolution::Approved(_) => self.approved += 1,
            Resolution::Purged(_) => self.purged += 1,
            Resolution::Skipped(_) => self.skipped += 1,
        }
        self.resolved = self.approved + self.purged;
    }
}

/// Applies tally verdicts to expired posts.
///
/// No locking: every step is a single repeatable statement, so concurrent
/// resolvers on the same post either repeat the same writes or find nothing
/// left to do. A failed step leaves the post pending for the next scan.
#[derive(Clone)]
pub struct Resolver {
    store: SharedStore,
    publisher: EventPublisher,
    feed: VoteFeed,
}

impl Resolver {
    pub fn new(store: SharedStore, publisher: EventPublisher, feed: VoteFeed) -> Self {
        Self { store, publisher, feed }
    }

    /// One full pass: scan for expired posts and resolve each independently.
    pub async fn resolve_expired(&self, now: DateTime<Utc>) -> AppResult<ResolveSummary> {
        let expired = scanner::find_expired(&*self.store, now).await?;
        let mut summary = ResolveSummary::default();

        for post_id in expired {
            match self.resolve_post(post_id, now).await {
                Ok(resolution) => summary.record(&resolution),
                Err(e) => {
                    summary.failed += 1;
                    counter!("moderation_resolution_failures_total").increment(1);
                    tracing::warn!(
                        post_id = %post_id,
                        error = %e,
                        "resolution aborted, post stays pending until the next scan"
                    );
                }
            }
        }

        if summary != ResolveSummary::default() {
            tracing::info!(
                resolved = summary.resolved,
                approved = summary.approved,
                purged = summary.purged,
                failed = summary.failed,
                skipped = summary.skipped,
                "resolution pass finished"
            );
        }

        Ok(summary)
    }

    /// Resolve a single post from a fresh read of its row and votes.
    pub async fn resolve_post(&self, post_id: Uuid, now: DateTime<Utc>) -> AppResult<Resolution> {
        let Some(post) = self.store.find_post(post_id).await? else {
            return Ok(Resolution::Skipped(SkipReason::Gone));
        };
        if !post.is_pending() {
            return Ok(Resolution::Skipped(SkipReason::NotPending));
        }
        if !post.voting_expired(now) {
            return Ok(Resolution::Skipped(SkipReason::NotExpired));
        }

        let votes = self.store.votes_for_post(post_id).await?;
        let tally = tally(&votes);
        let verdict = tally.verdict();

        tracing::debug!(
            post_id = %post_id,
            ai = tally.ai_count,
            not_ai = tally.not_ai_count,
            verdict = %verdict,
            "resolving post"
        );

        let resolution = match verdict {
            Verdict::Ai => self.approve(post_id, tally).await?,
            Verdict::NotAi => self.purge(post_id, tally).await?,
        };

        counter!("moderation_resolutions_total", "outcome" => resolution.outcome_label()).increment(1);

        match resolution {
            Resolution::Approved(tally) => {
                tracing::info!(post_id = %post_id, ai = tally.ai_count, not_ai = tally.not_ai_count, "post approved by community vote");
                self.feed.emit(FeedEvent::PostResolved { post_id, outcome: Outcome::Approved });
                self.publisher.post_approved(post_id, post.user_id, tally).await;
            }
            Resolution::Purged(tally) => {
                tracing::info!(post_id = %post_id, ai = tally.ai_count, not_ai = tally.not_ai_count, "post purged by community vote");
                self.feed.emit(FeedEvent::PostResolved { post_id, outcome: Outcome::Purged });
                self.publisher.post_purged(post_id, post.user_id, tally).await;
            }
            Resolution::Skipped(_) => {}
        }

        Ok(resolution)
    }

    async fn approve(&self, post_id: Uuid, tally: Tally) -> AppResult<Resolution> {
        if self.store.approve_post(post_id).await? {
            Ok(Resolution::Approved(tally))
        } else {
            // Another pass got there first.
            Ok(Resolution::Skipped(SkipReason::NotPending))
        }
    }

    /// Children before parent. The first failing statement aborts with the
    /// post still pending; rows already deleted stay deleted.
    ///
    /// Known gap: a concurrent pass that re-reads the post after the votes
    /// are gone sees a 0-0 tie and approves it, then the final delete here
    /// still removes the row. The post ends up absent, but both an approval
    /// and a purge are announced for it.
    async fn purge(&self, post_id: Uuid, tally: Tally) -> AppResult<Resolution> {
        for table in DependentTable::PURGE_ORDER {
            let deleted = self.store.delete_dependents(table, post_id).await?;
            tracing::debug!(post_id = %post_id, table = %table, deleted, "dependents removed");
        }

        if self.store.delete_post(post_id).await? {
            Ok(Resolution::Purged(tally))
        } else {
            Ok(Resolution::Skipped(SkipReason::Gone))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::Duration;

    use crate::models::PostStatus;
    use crate::store::{FailPoint, MemoryStore, PostStore, VoteLedger};
    use crate::testing::{approved_post, pending_post, seed_votes};

    fn resolver(store: &Arc<MemoryStore>) -> Resolver {
        Resolver::new(store.clone(), EventPublisher::disabled(), VoteFeed::new())
    }

    fn after(deadline: DateTime<Utc>) -> DateTime<Utc> {
        deadline + Duration::seconds(1)
    }

    async fn expired_post(store: &MemoryStore) -> (Uuid, DateTime<Utc>) {
        let deadline = Utc::now() - Duration::minutes(5);
        let post = store.create_post(pending_post(deadline)).await.unwrap();
        (post.id, deadline)
    }

    #[tokio::test]
    async fn scenario_a_no_votes_is_approved() {
        let store = Arc::new(MemoryStore::new());
        let (post_id, deadline) = expired_post(&store).await;

        let summary = resolver(&store).resolve_expired(after(deadline)).await.unwrap();
        assert_eq!(summary, ResolveSummary { resolved: 1, approved: 1, ..Default::default() });

        let post = store.find_post(post_id).await.unwrap().unwrap();
        assert_eq!(post.status(), PostStatus::Approved);
        assert!(post.is_verified_ai);
    }

    #[tokio::test]
    async fn scenario_b_ai_majority_is_approved() {
        let store = Arc::new(MemoryStore::new());
        let (post_id, deadline) = expired_post(&store).await;
        seed_votes(&store, post_id, 3, 1).await;

        let resolution = resolver(&store).resolve_post(post_id, after(deadline)).await.unwrap();
        assert_eq!(resolution, Resolution::Approved(Tally { ai_count: 3, not_ai_count: 1 }));

        // Attached rows stay attached on approval.
        assert_eq!(store.dependent_count(DependentTable::Votes, post_id), 4);
    }

    #[tokio::test]
    async fn scenario_c_not_ai_majority_purges_everything() {
        let store = Arc::new(MemoryStore::new());
        let (post_id, deadline) = expired_post(&store).await;
        seed_votes(&store, post_id, 1, 2).await;
        store.attach(DependentTable::Likes, post_id).unwrap();
        store.attach(DependentTable::Comments, post_id).unwrap();
        store.attach(DependentTable::Notifications, post_id).unwrap();
        store
            .create_report(crate::models::NewReport {
                post_id,
                reporter_id: Uuid::new_v4(),
                reason: "not ai".into(),
            })
            .await
            .unwrap();

        let resolution = resolver(&store).resolve_post(post_id, after(deadline)).await.unwrap();
        assert_eq!(resolution, Resolution::Purged(Tally { ai_count: 1, not_ai_count: 2 }));

        for table in DependentTable::PURGE_ORDER {
            assert_eq!(store.dependent_count(table, post_id), 0, "{table} not purged");
        }
        assert!(store.find_post(post_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn tie_is_approved() {
        let store = Arc::new(MemoryStore::new());
        let (post_id, deadline) = expired_post(&store).await;
        seed_votes(&store, post_id, 2, 2).await;

        let resolution = resolver(&store).resolve_post(post_id, after(deadline)).await.unwrap();
        assert!(matches!(resolution, Resolution::Approved(_)));
    }

    #[tokio::test]
    async fn resolving_twice_matches_resolving_once() {
        let store = Arc::new(MemoryStore::new());
        let resolver = resolver(&store);

        let (approved_id, deadline) = expired_post(&store).await;
        let (purged_id, _) = expired_post(&store).await;
        seed_votes(&store, purged_id, 0, 1).await;
        let now = after(deadline);

        resolver.resolve_post(approved_id, now).await.unwrap();
        resolver.resolve_post(purged_id, now).await.unwrap();
        let first = store.find_post(approved_id).await.unwrap();

        assert_eq!(
            resolver.resolve_post(approved_id, now).await.unwrap(),
            Resolution::Skipped(SkipReason::NotPending)
        );
        assert_eq!(
            resolver.resolve_post(purged_id, now).await.unwrap(),
            Resolution::Skipped(SkipReason::Gone)
        );
        assert_eq!(store.find_post(approved_id).await.unwrap(), first);
        assert!(store.find_post(purged_id).await.unwrap().is_none());

        let summary = resolver.resolve_expired(now).await.unwrap();
        assert_eq!(summary, ResolveSummary::default());
    }

    #[tokio::test]
    async fn open_and_approved_posts_are_skipped() {
        let store = Arc::new(MemoryStore::new());
        let resolver = resolver(&store);
        let now = Utc::now();

        let open = store.create_post(pending_post(now + Duration::hours(1))).await.unwrap();
        let approved = store.create_post(approved_post(true)).await.unwrap();

        assert_eq!(
            resolver.resolve_post(open.id, now).await.unwrap(),
            Resolution::Skipped(SkipReason::NotExpired)
        );
        assert_eq!(
            resolver.resolve_post(approved.id, now).await.unwrap(),
            Resolution::Skipped(SkipReason::NotPending)
        );
        assert_eq!(
            resolver.resolve_post(Uuid::new_v4(), now).await.unwrap(),
            Resolution::Skipped(SkipReason::Gone)
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn scenario_e_racing_scans_purge_once_without_errors() {
        let store = Arc::new(MemoryStore::new());
        let (post_id, deadline) = expired_post(&store).await;
        seed_votes(&store, post_id, 1, 3).await;
        store.attach(DependentTable::Comments, post_id).unwrap();
        let now = after(deadline);

        let resolver = resolver(&store);
        let handles: Vec<_> = (0..2)
            .map(|_| {
                let resolver = resolver.clone();
                tokio::spawn(async move { resolver.resolve_expired(now).await })
            })
            .collect();

        for handle in handles {
            let summary = handle.await.unwrap().unwrap();
            assert_eq!(summary.failed, 0);
        }

        assert!(store.find_post(post_id).await.unwrap().is_none());
        assert_eq!(store.dependent_count(DependentTable::Votes, post_id), 0);
        assert_eq!(store.dependent_count(DependentTable::Comments, post_id), 0);
    }

    #[tokio::test]
    async fn failed_child_delete_keeps_post_pending() {
        let store = Arc::new(MemoryStore::new());
        let (post_id, deadline) = expired_post(&store).await;
        seed_votes(&store, post_id, 0, 2).await;
        store.attach(DependentTable::Likes, post_id).unwrap();
        store.inject_failure(FailPoint::DeleteDependents(DependentTable::Comments));

        let resolver = resolver(&store);
        let summary = resolver.resolve_expired(after(deadline)).await.unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.resolved, 0);

        let post = store.find_post(post_id).await.unwrap().unwrap();
        assert!(post.is_pending());
        assert_eq!(store.dependent_count(DependentTable::Votes, post_id), 0);
        assert_eq!(store.dependent_count(DependentTable::Likes, post_id), 0);
    }

    #[tokio::test]
    async fn failed_post_delete_degrades_to_approval_on_retry() {
        let store = Arc::new(MemoryStore::new());
        let (post_id, deadline) = expired_post(&store).await;
        seed_votes(&store, post_id, 1, 2).await;
        store.inject_failure(FailPoint::DeletePost);

        let resolver = resolver(&store);
        let now = after(deadline);
        assert_eq!(resolver.resolve_expired(now).await.unwrap().failed, 1);
        assert!(store.votes_for_post(post_id).await.unwrap().is_empty());

        store.clear_failure(FailPoint::DeletePost);
        let summary = resolver.resolve_expired(now).await.unwrap();
        assert_eq!(summary.approved, 1);

        let post = store.find_post(post_id).await.unwrap().unwrap();
        assert_eq!(post.status(), PostStatus::Approved);
    }

    #[tokio::test]
    async fn approval_between_child_deletes_and_post_delete_still_ends_absent() {
        let store = Arc::new(MemoryStore::new());
        let (post_id, deadline) = expired_post(&store).await;
        seed_votes(&store, post_id, 0, 3).await;
        let now = after(deadline);

        // First pass has cleared the children but not yet the post row.
        for table in DependentTable::PURGE_ORDER {
            store.delete_dependents(table, post_id).await.unwrap();
        }
        let second = resolver(&store).resolve_post(post_id, now).await.unwrap();
        assert!(matches!(second, Resolution::Approved(t) if t.total() == 0));

        assert!(store.delete_post(post_id).await.unwrap());
        assert!(store.find_post(post_id).await.unwrap().is_none());
        assert!(matches!(
            resolver(&store).resolve_post(post_id, now).await.unwrap(),
            Resolution::Skipped(SkipReason::Gone)
        ));
    }

    #[tokio::test]
    async fn failed_approval_is_retried_by_the_next_scan() {
        let store = Arc::new(MemoryStore::new());
        let (post_id, deadline) = expired_post(&store).await;
        seed_votes(&store, post_id, 3, 1).await;
        store.inject_failure(FailPoint::ApprovePost);

        let resolver = resolver(&store);
        let now = after(deadline);
        let summary = resolver.resolve_expired(now).await.unwrap();
        assert_eq!((summary.failed, summary.approved), (1, 0));

        let post = store.find_post(post_id).await.unwrap().unwrap();
        assert!(post.is_pending());
        assert!(!post.is_verified_ai);
        assert_eq!(store.dependent_count(DependentTable::Votes, post_id), 4);

        store.clear_failure(FailPoint::ApprovePost);
        let summary = resolver.resolve_expired(now).await.unwrap();
        assert_eq!((summary.failed, summary.approved), (0, 1));

        let post = store.find_post(post_id).await.unwrap().unwrap();
        assert_eq!(post.status(), PostStatus::Approved);
        assert!(post.is_verified_ai);
    }

    #[tokio::test]
    async fn scan_failure_is_an_error() {
        let store = Arc::new(MemoryStore::new());
        store.inject_failure(FailPoint::ExpiredScan);

        assert!(resolver(&store).resolve_expired(Utc::now()).await.is_err());
    }

    #[tokio::test]
    async fn resolution_closes_live_subscriptions() {
        let store = Arc::new(MemoryStore::new());
        let (post_id, deadline) = expired_post(&store).await;
        let feed = VoteFeed::new();
        let mut sub = feed.subscribe_post(post_id);

        Resolver::new(store.clone(), EventPublisher::disabled(), feed)
            .resolve_post(post_id, after(deadline))
            .await
            .unwrap();

        assert_eq!(
            sub.next().await,
            Some(crate::events::PostSignal::Resolved(Outcome::Approved))
        );
    }
}
