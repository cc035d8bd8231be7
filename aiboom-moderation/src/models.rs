use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::{post_votes, posts, reports};

// --- PostStatus ---

/// Moderation state of a post. A purged post has no status: its row is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    Approved,
    PendingReview,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Approved => "approved",
            PostStatus::PendingReview => "pending_review",
        }
    }
}

impl std::fmt::Display for PostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PostStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approved" => Ok(PostStatus::Approved),
            "pending_review" => Ok(PostStatus::PendingReview),
            _ => Err(format!("unknown post status: {s}")),
        }
    }
}

// --- Post ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone, PartialEq)]
#[diesel(table_name = posts)]
pub struct Post {
    pub id: Uuid,
    pub user_id: Uuid,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
    pub caption: Option<String>,
    pub category: String,
    pub ai_tool: String,
    pub tags: Vec<String>,
    pub status: String,
    pub is_verified_ai: bool,
    pub voting_expires_at: Option<DateTime<Utc>>,
    pub likes_count: i32,
    pub comments_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    /// Parsed status; rows outside the known set are treated as approved so
    /// they never enter a voting flow.
    pub fn status(&self) -> PostStatus {
        self.status.parse().unwrap_or(PostStatus::Approved)
    }

    pub fn is_pending(&self) -> bool {
        self.status() == PostStatus::PendingReview
    }

    /// True once the voting window has elapsed: strictly after the deadline.
    pub fn voting_expired(&self, now: DateTime<Utc>) -> bool {
        self.voting_expires_at.is_some_and(|expires_at| expires_at < now)
    }
}

#[derive(Debug, Insertable, Clone)]
#[diesel(table_name = posts)]
pub struct NewPost {
    pub user_id: Uuid,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
    pub caption: Option<String>,
    pub category: String,
    pub ai_tool: String,
    pub tags: Vec<String>,
    pub status: String,
    pub is_verified_ai: bool,
    pub voting_expires_at: Option<DateTime<Utc>>,
}

// --- Vote ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone, PartialEq)]
#[diesel(table_name = post_votes)]
pub struct Vote {
    pub id: Uuid,
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub vote_ai: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = post_votes)]
pub struct NewVote {
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub vote_ai: bool,
}

// --- Report ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = reports)]
pub struct Report {
    pub id: Uuid,
    pub post_id: Uuid,
    pub reporter_id: Uuid,
    pub reason: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = reports)]
pub struct NewReport {
    pub post_id: Uuid,
    pub reporter_id: Uuid,
    pub reason: String,
}
