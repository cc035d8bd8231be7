//! Persistence contracts for moderation.
//!
//! [`VoteLedger`] owns the `post_votes` rows, [`PostStore`] owns posts and the
//! rows that hang off them. Every method is a single statement against the
//! backing store, so each call is atomic on its own and nothing spans calls.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use aiboom_shared::errors::AppResult;

use crate::models::{NewPost, NewReport, Post, Report, Vote};

pub mod memory;
pub mod postgres;

pub use memory::{FailPoint, MemoryStore};
pub use postgres::PgStore;

/// Tables whose rows reference a post and must go before the post itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependentTable {
    Votes,
    Likes,
    Comments,
    Reports,
    Notifications,
}

impl DependentTable {
    /// Children-before-parent deletion order used by the purge.
    pub const PURGE_ORDER: [DependentTable; 5] = [
        DependentTable::Votes,
        DependentTable::Likes,
        DependentTable::Comments,
        DependentTable::Reports,
        DependentTable::Notifications,
    ];

    pub fn table_name(&self) -> &'static str {
        match self {
            DependentTable::Votes => "post_votes",
            DependentTable::Likes => "likes",
            DependentTable::Comments => "comments",
            DependentTable::Reports => "reports",
            DependentTable::Notifications => "notifications",
        }
    }
}

impl std::fmt::Display for DependentTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.table_name())
    }
}

#[axum::async_trait]
pub trait PostStore: Send + Sync {
    /// Insert a post in its final initial state in one write.
    async fn create_post(&self, post: NewPost) -> AppResult<Post>;

    async fn find_post(&self, post_id: Uuid) -> AppResult<Option<Post>>;

    /// Ids of `pending_review` posts whose deadline is strictly before `now`.
    async fn expired_pending_posts(&self, now: DateTime<Utc>) -> AppResult<Vec<Uuid>>;

    /// Pending posts still open for voting at `now`, newest first, plus the
    /// total number of such posts.
    async fn open_pending_posts(
        &self,
        now: DateTime<Utc>,
        offset: u64,
        limit: u64,
    ) -> AppResult<(Vec<Post>, u64)>;

    /// Mark a pending post approved and verified. Returns false when no
    /// pending row matched (already approved or gone).
    async fn approve_post(&self, post_id: Uuid) -> AppResult<bool>;

    /// Remove every row of `table` that references the post.
    async fn delete_dependents(&self, table: DependentTable, post_id: Uuid) -> AppResult<u64>;

    /// Remove the post row. Returns false when it was already gone.
    async fn delete_post(&self, post_id: Uuid) -> AppResult<bool>;

    async fn create_report(&self, report: NewReport) -> AppResult<Report>;

    async fn has_pending_report(&self, post_id: Uuid, reporter_id: Uuid) -> AppResult<bool>;

    /// Cheap connectivity probe for health checks.
    async fn ping(&self) -> AppResult<()>;
}

#[axum::async_trait]
pub trait VoteLedger: Send + Sync {
    async fn votes_for_post(&self, post_id: Uuid) -> AppResult<Vec<Vote>>;

    async fn votes_for_posts(&self, post_ids: &[Uuid]) -> AppResult<Vec<Vote>>;

    async fn find_vote(&self, post_id: Uuid, user_id: Uuid) -> AppResult<Option<Vote>>;

    /// Insert the user's vote, or overwrite it in place if one already exists.
    async fn upsert_vote(&self, post_id: Uuid, user_id: Uuid, vote_ai: bool) -> AppResult<Vote>;

    /// Remove the user's vote. Returns false when there was none.
    async fn delete_vote(&self, post_id: Uuid, user_id: Uuid) -> AppResult<bool>;
}

pub trait ModerationStore: PostStore + VoteLedger {}

impl<T: PostStore + VoteLedger> ModerationStore for T {}

pub type SharedStore = Arc<dyn ModerationStore>;
