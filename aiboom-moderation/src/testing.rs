//! Fixtures shared by the unit tests.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{NewPost, PostStatus};
use crate::store::{MemoryStore, VoteLedger};

pub fn pending_post(expires_at: DateTime<Utc>) -> NewPost {
    NewPost {
        user_id: Uuid::new_v4(),
        image_url: Some("https://cdn.example/pending.png".into()),
        video_url: None,
        caption: Some("is this real?".into()),
        category: "ai-photography".into(),
        ai_tool: "Midjourney".into(),
        tags: vec!["portrait".into()],
        status: PostStatus::PendingReview.to_string(),
        is_verified_ai: false,
        voting_expires_at: Some(expires_at),
    }
}

pub fn approved_post(is_verified_ai: bool) -> NewPost {
    NewPost {
        status: PostStatus::Approved.to_string(),
        is_verified_ai,
        voting_expires_at: None,
        ..pending_post(Utc::now())
    }
}

/// Cast `ai` AI votes and `not_ai` not-AI votes from fresh voters.
pub async fn seed_votes(store: &MemoryStore, post_id: Uuid, ai: usize, not_ai: usize) {
    for vote_ai in std::iter::repeat(true).take(ai).chain(std::iter::repeat(false).take(not_ai)) {
        store
            .upsert_vote(post_id, Uuid::new_v4(), vote_ai)
            .await
            .expect("seed vote");
    }
}
