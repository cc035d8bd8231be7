use serde::Serialize;
use uuid::Uuid;

use aiboom_shared::clients::rabbitmq::RabbitMQClient;
use aiboom_shared::types::event::{payloads, routing_keys, Event};

use crate::models::{Post, Report};
use crate::voting::Tally;

const SOURCE: &str = "aiboom-moderation";

/// Domain event publisher. Without a broker (memory mode, tests) every publish
/// is a logged no-op; publish failures never fail the caller.
#[derive(Clone, Default)]
pub struct EventPublisher {
    rabbitmq: Option<RabbitMQClient>,
}

impl EventPublisher {
    pub fn new(rabbitmq: RabbitMQClient) -> Self {
        Self { rabbitmq: Some(rabbitmq) }
    }

    pub fn disabled() -> Self {
        Self { rabbitmq: None }
    }

    pub fn rabbitmq(&self) -> Option<&RabbitMQClient> {
        self.rabbitmq.as_ref()
    }

    async fn publish<T: Serialize>(&self, routing_key: &str, event: Event<T>) {
        let Some(rabbitmq) = &self.rabbitmq else {
            tracing::debug!(routing_key = %routing_key, "no broker configured, event dropped");
            return;
        };

        if let Err(e) = rabbitmq.publish(routing_key, &event).await {
            tracing::error!(error = %e, routing_key = %routing_key, "failed to publish event");
        }
    }

    pub async fn post_submitted(&self, post: &Post) {
        let event = Event::new(
            SOURCE,
            routing_keys::MODERATION_POST_SUBMITTED,
            payloads::PostSubmitted {
                post_id: post.id,
                owner_id: post.user_id,
                status: post.status.clone(),
                is_verified_ai: post.is_verified_ai,
                voting_expires_at: post.voting_expires_at,
            },
        )
        .with_user(post.user_id);

        self.publish(routing_keys::MODERATION_POST_SUBMITTED, event).await;
    }

    pub async fn post_approved(&self, post_id: Uuid, owner_id: Uuid, tally: Tally) {
        let event = Event::new(
            SOURCE,
            routing_keys::MODERATION_POST_APPROVED,
            payloads::PostApproved {
                post_id,
                owner_id,
                ai_votes: tally.ai_count,
                not_ai_votes: tally.not_ai_count,
            },
        )
        .with_user(owner_id);

        self.publish(routing_keys::MODERATION_POST_APPROVED, event).await;
    }

    pub async fn post_purged(&self, post_id: Uuid, owner_id: Uuid, tally: Tally) {
        let event = Event::new(
            SOURCE,
            routing_keys::MODERATION_POST_PURGED,
            payloads::PostPurged {
                post_id,
                owner_id,
                ai_votes: tally.ai_count,
                not_ai_votes: tally.not_ai_count,
            },
        )
        .with_user(owner_id);

        self.publish(routing_keys::MODERATION_POST_PURGED, event).await;
    }

    pub async fn vote_changed(&self, post_id: Uuid, voter_id: Uuid, origin: Uuid) {
        let event = Event::new(
            SOURCE,
            routing_keys::MODERATION_VOTE_CHANGED,
            payloads::VoteChanged { post_id, voter_id, origin },
        )
        .with_user(voter_id);

        self.publish(routing_keys::MODERATION_VOTE_CHANGED, event).await;
    }

    pub async fn report_created(&self, report: &Report) {
        let event = Event::new(
            SOURCE,
            routing_keys::MODERATION_REPORT_CREATED,
            payloads::ReportCreated {
                report_id: report.id,
                post_id: report.post_id,
                reporter_id: report.reporter_id,
            },
        )
        .with_user(report.reporter_id);

        self.publish(routing_keys::MODERATION_REPORT_CREATED, event).await;
    }
}
