use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use aiboom_shared::errors::{AppError, AppResult};

use crate::models::{NewPost, NewReport, Post, PostStatus, Report, Vote};

use super::{DependentTable, PostStore, VoteLedger};

/// Operations that can be made to fail on demand, to exercise the
/// partial-failure paths of resolution and voting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    ExpiredScan,
    ReadVotes,
    UpsertVote,
    DeleteVote,
    ApprovePost,
    DeleteDependents(DependentTable),
    DeletePost,
}

#[derive(Default)]
struct Inner {
    posts: HashMap<Uuid, Post>,
    votes: HashMap<(Uuid, Uuid), Vote>,
    reports: HashMap<Uuid, Report>,
    /// Likes, comments and notifications: row id -> post id.
    attachments: HashMap<DependentTable, HashMap<Uuid, Uuid>>,
    failures: HashSet<FailPoint>,
}

impl Inner {
    fn check(&self, point: FailPoint) -> AppResult<()> {
        if self.failures.contains(&point) {
            return Err(AppError::internal(format!("injected failure at {point:?}")));
        }
        Ok(())
    }

    fn references(&self, post_id: Uuid) -> usize {
        let votes = self.votes.keys().filter(|(p, _)| *p == post_id).count();
        let reports = self.reports.values().filter(|r| r.post_id == post_id).count();
        let attached: usize = self
            .attachments
            .values()
            .map(|rows| rows.values().filter(|p| **p == post_id).count())
            .sum();
        votes + reports + attached
    }
}

/// In-process store with the same per-statement semantics as [`super::PgStore`]:
/// one mutex acquisition per call, unique `(post_id, user_id)` votes, and
/// foreign keys from dependents to their post.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic while holding the lock cannot leave a half-applied
        // statement behind, so a poisoned guard is still consistent.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Make every subsequent call through `point` fail until cleared.
    pub fn inject_failure(&self, point: FailPoint) {
        self.lock().failures.insert(point);
    }

    pub fn clear_failure(&self, point: FailPoint) {
        self.lock().failures.remove(&point);
    }

    /// Attach a like, comment or notification row to a post.
    pub fn attach(&self, table: DependentTable, post_id: Uuid) -> AppResult<Uuid> {
        let mut inner = self.lock();
        if !inner.posts.contains_key(&post_id) {
            return Err(AppError::internal(format!(
                "foreign key violation: {table} references missing post {post_id}"
            )));
        }
        let row_id = Uuid::new_v4();
        inner.attachments.entry(table).or_default().insert(row_id, post_id);
        Ok(row_id)
    }

    /// Number of rows in `table` referencing the post.
    pub fn dependent_count(&self, table: DependentTable, post_id: Uuid) -> usize {
        let inner = self.lock();
        match table {
            DependentTable::Votes => inner.votes.keys().filter(|(p, _)| *p == post_id).count(),
            DependentTable::Reports => inner.reports.values().filter(|r| r.post_id == post_id).count(),
            other => inner
                .attachments
                .get(&other)
                .map(|rows| rows.values().filter(|p| **p == post_id).count())
                .unwrap_or(0),
        }
    }
}

#[axum::async_trait]
impl PostStore for MemoryStore {
    async fn create_post(&self, post: NewPost) -> AppResult<Post> {
        let now = Utc::now();
        let created = Post {
            id: Uuid::new_v4(),
            user_id: post.user_id,
            image_url: post.image_url,
            video_url: post.video_url,
            caption: post.caption,
            category: post.category,
            ai_tool: post.ai_tool,
            tags: post.tags,
            status: post.status,
            is_verified_ai: post.is_verified_ai,
            voting_expires_at: post.voting_expires_at,
            likes_count: 0,
            comments_count: 0,
            created_at: now,
            updated_at: now,
        };
        self.lock().posts.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_post(&self, post_id: Uuid) -> AppResult<Option<Post>> {
        Ok(self.lock().posts.get(&post_id).cloned())
    }

    async fn expired_pending_posts(&self, now: DateTime<Utc>) -> AppResult<Vec<Uuid>> {
        let inner = self.lock();
        inner.check(FailPoint::ExpiredScan)?;

        Ok(inner
            .posts
            .values()
            .filter(|p| p.is_pending() && p.voting_expired(now))
            .map(|p| p.id)
            .collect())
    }

    async fn open_pending_posts(
        &self,
        now: DateTime<Utc>,
        offset: u64,
        limit: u64,
    ) -> AppResult<(Vec<Post>, u64)> {
        let inner = self.lock();

        let mut open: Vec<Post> = inner
            .posts
            .values()
            .filter(|p| p.is_pending() && p.voting_expires_at.is_some_and(|at| at > now))
            .cloned()
            .collect();
        open.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = open.len() as u64;
        let items = open
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok((items, total))
    }

    async fn approve_post(&self, post_id: Uuid) -> AppResult<bool> {
        let mut inner = self.lock();
        inner.check(FailPoint::ApprovePost)?;

        match inner.posts.get_mut(&post_id) {
            Some(post) if post.is_pending() => {
                post.status = PostStatus::Approved.to_string();
                post.is_verified_ai = true;
                post.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_dependents(&self, table: DependentTable, post_id: Uuid) -> AppResult<u64> {
        let mut inner = self.lock();
        inner.check(FailPoint::DeleteDependents(table))?;

        let deleted = match table {
            DependentTable::Votes => {
                let before = inner.votes.len();
                inner.votes.retain(|(p, _), _| *p != post_id);
                before - inner.votes.len()
            }
            DependentTable::Reports => {
                let before = inner.reports.len();
                inner.reports.retain(|_, r| r.post_id != post_id);
                before - inner.reports.len()
            }
            other => match inner.attachments.get_mut(&other) {
                Some(rows) => {
                    let before = rows.len();
                    rows.retain(|_, p| *p != post_id);
                    before - rows.len()
                }
                None => 0,
            },
        };
        Ok(deleted as u64)
    }

    async fn delete_post(&self, post_id: Uuid) -> AppResult<bool> {
        let mut inner = self.lock();
        inner.check(FailPoint::DeletePost)?;

        let remaining = inner.references(post_id);
        if remaining > 0 {
            return Err(AppError::internal(format!(
                "foreign key violation: {remaining} rows still reference post {post_id}"
            )));
        }
        Ok(inner.posts.remove(&post_id).is_some())
    }

    async fn create_report(&self, report: NewReport) -> AppResult<Report> {
        let mut inner = self.lock();
        if !inner.posts.contains_key(&report.post_id) {
            return Err(AppError::internal("foreign key violation: report references missing post"));
        }
        let created = Report {
            id: Uuid::new_v4(),
            post_id: report.post_id,
            reporter_id: report.reporter_id,
            reason: report.reason,
            status: "pending".to_string(),
            created_at: Utc::now(),
        };
        inner.reports.insert(created.id, created.clone());
        Ok(created)
    }

    async fn has_pending_report(&self, post_id: Uuid, reporter_id: Uuid) -> AppResult<bool> {
        Ok(self
            .lock()
            .reports
            .values()
            .any(|r| r.post_id == post_id && r.reporter_id == reporter_id && r.status == "pending"))
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}

#[axum::async_trait]
impl VoteLedger for MemoryStore {
    async fn votes_for_post(&self, post_id: Uuid) -> AppResult<Vec<Vote>> {
        let inner = self.lock();
        inner.check(FailPoint::ReadVotes)?;

        Ok(inner
            .votes
            .values()
            .filter(|v| v.post_id == post_id)
            .cloned()
            .collect())
    }

    async fn votes_for_posts(&self, post_ids: &[Uuid]) -> AppResult<Vec<Vote>> {
        let inner = self.lock();
        inner.check(FailPoint::ReadVotes)?;

        Ok(inner
            .votes
            .values()
            .filter(|v| post_ids.contains(&v.post_id))
            .cloned()
            .collect())
    }

    async fn find_vote(&self, post_id: Uuid, user_id: Uuid) -> AppResult<Option<Vote>> {
        let inner = self.lock();
        inner.check(FailPoint::ReadVotes)?;

        Ok(inner.votes.get(&(post_id, user_id)).cloned())
    }

    async fn upsert_vote(&self, post_id: Uuid, user_id: Uuid, vote_ai: bool) -> AppResult<Vote> {
        let mut inner = self.lock();
        inner.check(FailPoint::UpsertVote)?;

        if !inner.posts.contains_key(&post_id) {
            return Err(AppError::internal(format!(
                "foreign key violation: vote references missing post {post_id}"
            )));
        }

        let vote = inner
            .votes
            .entry((post_id, user_id))
            .and_modify(|v| v.vote_ai = vote_ai)
            .or_insert_with(|| Vote {
                id: Uuid::new_v4(),
                post_id,
                user_id,
                vote_ai,
                created_at: Utc::now(),
            });
        Ok(vote.clone())
    }

    async fn delete_vote(&self, post_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        let mut inner = self.lock();
        inner.check(FailPoint::DeleteVote)?;

        Ok(inner.votes.remove(&(post_id, user_id)).is_some())
    }
}
