use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// RabbitMQ Event envelope wrapping all domain events.
///
/// Routing key format: `aiboom.{domain}.{entity}.{action}`
/// Example: `aiboom.moderation.post.approved`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event<T: Serialize> {
    pub id: Uuid,
    pub source: String,
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub data: T,
}

impl<T: Serialize> Event<T> {
    pub fn new(source: impl Into<String>, event_type: impl Into<String>, data: T) -> Self {
        Self {
            id: Uuid::now_v7(),
            source: source.into(),
            event_type: event_type.into(),
            timestamp: Utc::now(),
            correlation_id: None,
            user_id: None,
            data,
        }
    }

    pub fn with_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }
}

/// RabbitMQ routing keys
pub mod routing_keys {
    pub const MODERATION_POST_SUBMITTED: &str = "aiboom.moderation.post.submitted";
    pub const MODERATION_POST_APPROVED: &str = "aiboom.moderation.post.approved";
    pub const MODERATION_POST_PURGED: &str = "aiboom.moderation.post.purged";
    pub const MODERATION_VOTE_CHANGED: &str = "aiboom.moderation.vote.changed";
    pub const MODERATION_REPORT_CREATED: &str = "aiboom.moderation.report.created";
}

/// Common event data payloads
pub mod payloads {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct PostSubmitted {
        pub post_id: Uuid,
        pub owner_id: Uuid,
        pub status: String,
        pub is_verified_ai: bool,
        pub voting_expires_at: Option<DateTime<Utc>>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct PostApproved {
        pub post_id: Uuid,
        pub owner_id: Uuid,
        pub ai_votes: u64,
        pub not_ai_votes: u64,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct PostPurged {
        pub post_id: Uuid,
        pub owner_id: Uuid,
        pub ai_votes: u64,
        pub not_ai_votes: u64,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct VoteChanged {
        pub post_id: Uuid,
        pub voter_id: Uuid,
        /// Replica that accepted the vote, so it can skip its own echo.
        pub origin: Uuid,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ReportCreated {
        pub report_id: Uuid,
        pub post_id: Uuid,
        pub reporter_id: Uuid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_carries_user_and_payload() {
        let post_id = Uuid::new_v4();
        let voter_id = Uuid::new_v4();
        let event = Event::new(
            "aiboom-moderation",
            routing_keys::MODERATION_VOTE_CHANGED,
            payloads::VoteChanged { post_id, voter_id, origin: Uuid::nil() },
        )
        .with_user(voter_id);

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event_type"], "aiboom.moderation.vote.changed");
        assert_eq!(json["user_id"], voter_id.to_string());
        assert_eq!(json["data"]["post_id"], post_id.to_string());

        let back: Event<payloads::VoteChanged> = serde_json::from_value(json).unwrap();
        assert_eq!(back.data.voter_id, voter_id);
    }
}
