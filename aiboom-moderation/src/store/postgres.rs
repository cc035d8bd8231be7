use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, PooledConnection};
use uuid::Uuid;

use aiboom_shared::clients::db::DbPool;
use aiboom_shared::errors::{AppError, AppResult};

use crate::models::{NewPost, NewReport, NewVote, Post, PostStatus, Report, Vote};
use crate::schema::{comments, likes, notifications, post_votes, posts, reports};

use super::{DependentTable, PostStore, VoteLedger};

/// Diesel-backed store over the r2d2 Postgres pool.
#[derive(Clone)]
pub struct PgStore {
    db: DbPool,
}

impl PgStore {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    fn conn(&self) -> AppResult<PooledConnection<ConnectionManager<PgConnection>>> {
        self.db
            .get()
            .map_err(|e| AppError::internal(format!("db pool error: {e}")))
    }
}

#[axum::async_trait]
impl PostStore for PgStore {
    async fn create_post(&self, post: NewPost) -> AppResult<Post> {
        let mut conn = self.conn()?;

        let created = diesel::insert_into(posts::table)
            .values(&post)
            .get_result::<Post>(&mut conn)?;

        Ok(created)
    }

    async fn find_post(&self, post_id: Uuid) -> AppResult<Option<Post>> {
        let mut conn = self.conn()?;

        let post = posts::table
            .find(post_id)
            .first::<Post>(&mut conn)
            .optional()?;

        Ok(post)
    }

    async fn expired_pending_posts(&self, now: DateTime<Utc>) -> AppResult<Vec<Uuid>> {
        let mut conn = self.conn()?;

        let ids = posts::table
            .filter(posts::status.eq(PostStatus::PendingReview.as_str()))
            .filter(posts::voting_expires_at.lt(now))
            .select(posts::id)
            .load::<Uuid>(&mut conn)?;

        Ok(ids)
    }

    async fn open_pending_posts(
        &self,
        now: DateTime<Utc>,
        offset: u64,
        limit: u64,
    ) -> AppResult<(Vec<Post>, u64)> {
        let mut conn = self.conn()?;

        let items = posts::table
            .filter(posts::status.eq(PostStatus::PendingReview.as_str()))
            .filter(posts::voting_expires_at.gt(now))
            .order(posts::created_at.desc())
            .offset(offset as i64)
            .limit(limit as i64)
            .load::<Post>(&mut conn)?;

        let total: i64 = posts::table
            .filter(posts::status.eq(PostStatus::PendingReview.as_str()))
            .filter(posts::voting_expires_at.gt(now))
            .count()
            .get_result(&mut conn)?;

        Ok((items, total as u64))
    }

    async fn approve_post(&self, post_id: Uuid) -> AppResult<bool> {
        let mut conn = self.conn()?;

        let updated = diesel::update(
            posts::table
                .filter(posts::id.eq(post_id))
                .filter(posts::status.eq(PostStatus::PendingReview.as_str())),
        )
        .set((
            posts::status.eq(PostStatus::Approved.as_str()),
            posts::is_verified_ai.eq(true),
            posts::updated_at.eq(Utc::now()),
        ))
        .execute(&mut conn)?;

        Ok(updated > 0)
    }

    async fn delete_dependents(&self, table: DependentTable, post_id: Uuid) -> AppResult<u64> {
        let mut conn = self.conn()?;

        let deleted = match table {
            DependentTable::Votes => {
                diesel::delete(post_votes::table.filter(post_votes::post_id.eq(post_id)))
                    .execute(&mut conn)?
            }
            DependentTable::Likes => {
                diesel::delete(likes::table.filter(likes::post_id.eq(post_id)))
                    .execute(&mut conn)?
            }
            DependentTable::Comments => {
                diesel::delete(comments::table.filter(comments::post_id.eq(post_id)))
                    .execute(&mut conn)?
            }
            DependentTable::Reports => {
                diesel::delete(reports::table.filter(reports::post_id.eq(post_id)))
                    .execute(&mut conn)?
            }
            DependentTable::Notifications => {
                diesel::delete(notifications::table.filter(notifications::post_id.eq(post_id)))
                    .execute(&mut conn)?
            }
        };

        Ok(deleted as u64)
    }

    async fn delete_post(&self, post_id: Uuid) -> AppResult<bool> {
        let mut conn = self.conn()?;

        let deleted = diesel::delete(posts::table.find(post_id)).execute(&mut conn)?;

        Ok(deleted > 0)
    }

    async fn create_report(&self, report: NewReport) -> AppResult<Report> {
        let mut conn = self.conn()?;

        let created = diesel::insert_into(reports::table)
            .values(&report)
            .get_result::<Report>(&mut conn)?;

        Ok(created)
    }

    async fn has_pending_report(&self, post_id: Uuid, reporter_id: Uuid) -> AppResult<bool> {
        let mut conn = self.conn()?;

        let existing: i64 = reports::table
            .filter(reports::post_id.eq(post_id))
            .filter(reports::reporter_id.eq(reporter_id))
            .filter(reports::status.eq("pending"))
            .count()
            .get_result(&mut conn)?;

        Ok(existing > 0)
    }

    async fn ping(&self) -> AppResult<()> {
        let mut conn = self.conn()?;
        diesel::sql_query("SELECT 1").execute(&mut conn)?;
        Ok(())
    }
}

#[axum::async_trait]
impl VoteLedger for PgStore {
    async fn votes_for_post(&self, post_id: Uuid) -> AppResult<Vec<Vote>> {
        let mut conn = self.conn()?;

        let votes = post_votes::table
            .filter(post_votes::post_id.eq(post_id))
            .load::<Vote>(&mut conn)?;

        Ok(votes)
    }

    async fn votes_for_posts(&self, post_ids: &[Uuid]) -> AppResult<Vec<Vote>> {
        if post_ids.is_empty() {
            return Ok(vec![]);
        }
        let mut conn = self.conn()?;

        let votes = post_votes::table
            .filter(post_votes::post_id.eq_any(post_ids.to_vec()))
            .load::<Vote>(&mut conn)?;

        Ok(votes)
    }

    async fn find_vote(&self, post_id: Uuid, user_id: Uuid) -> AppResult<Option<Vote>> {
        let mut conn = self.conn()?;

        let vote = post_votes::table
            .filter(post_votes::post_id.eq(post_id))
            .filter(post_votes::user_id.eq(user_id))
            .first::<Vote>(&mut conn)
            .optional()?;

        Ok(vote)
    }

    async fn upsert_vote(&self, post_id: Uuid, user_id: Uuid, vote_ai: bool) -> AppResult<Vote> {
        let mut conn = self.conn()?;

        // A concurrent first vote from the same user lands on the unique key
        // and turns into an update here instead of a constraint error.
        let vote = diesel::insert_into(post_votes::table)
            .values(&NewVote { post_id, user_id, vote_ai })
            .on_conflict((post_votes::post_id, post_votes::user_id))
            .do_update()
            .set(post_votes::vote_ai.eq(vote_ai))
            .get_result::<Vote>(&mut conn)?;

        Ok(vote)
    }

    async fn delete_vote(&self, post_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        let mut conn = self.conn()?;

        let deleted = diesel::delete(
            post_votes::table
                .filter(post_votes::post_id.eq(post_id))
                .filter(post_votes::user_id.eq(user_id)),
        )
        .execute(&mut conn)?;

        Ok(deleted > 0)
    }
}
