use futures_lite::StreamExt;
use lapin::options::BasicAckOptions;
use uuid::Uuid;

use aiboom_shared::clients::rabbitmq::RabbitMQClient;
use aiboom_shared::types::event::{payloads, routing_keys, Event};

use super::feed::{FeedEvent, Outcome, VoteFeed};

/// Relay vote and resolution events from other replicas into the local feed,
/// so live views see votes accepted anywhere. Each replica binds its own
/// transient queue; events this replica published itself are skipped.
pub async fn listen_vote_events(
    rabbitmq: RabbitMQClient,
    feed: VoteFeed,
    instance_id: Uuid,
) -> anyhow::Result<()> {
    let mut consumer = rabbitmq
        .subscribe_transient(
            &format!("aiboom-moderation.live.{instance_id}"),
            &[
                routing_keys::MODERATION_VOTE_CHANGED,
                routing_keys::MODERATION_POST_APPROVED,
                routing_keys::MODERATION_POST_PURGED,
            ],
        )
        .await?;

    tracing::info!(instance_id = %instance_id, "listening for vote events");

    while let Some(delivery) = consumer.next().await {
        match delivery {
            Ok(delivery) => {
                let routing_key = delivery.routing_key.to_string();

                match decode(&routing_key, &delivery.data, instance_id) {
                    Ok(Some(event)) => {
                        feed.emit(event);
                    }
                    Ok(None) => {}
                    Err(e) => {
                        tracing::error!(error = %e, routing_key = %routing_key, "failed to deserialize event");
                    }
                }

                let _ = delivery.ack(BasicAckOptions::default()).await;
            }
            Err(e) => {
                tracing::error!(error = %e, "vote event consumer error");
            }
        }
    }

    Ok(())
}

/// Map a broker message onto a feed event. `Ok(None)` means nothing to relay:
/// an echo of our own vote or an unrelated key.
fn decode(routing_key: &str, data: &[u8], instance_id: Uuid) -> serde_json::Result<Option<FeedEvent>> {
    let event = match routing_key {
        routing_keys::MODERATION_VOTE_CHANGED => {
            let event: Event<payloads::VoteChanged> = serde_json::from_slice(data)?;
            if event.data.origin == instance_id {
                return Ok(None);
            }
            FeedEvent::VoteChanged {
                post_id: event.data.post_id,
                voter_id: event.data.voter_id,
            }
        }
        routing_keys::MODERATION_POST_APPROVED => {
            let event: Event<payloads::PostApproved> = serde_json::from_slice(data)?;
            FeedEvent::PostResolved {
                post_id: event.data.post_id,
                outcome: Outcome::Approved,
            }
        }
        routing_keys::MODERATION_POST_PURGED => {
            let event: Event<payloads::PostPurged> = serde_json::from_slice(data)?;
            FeedEvent::PostResolved {
                post_id: event.data.post_id,
                outcome: Outcome::Purged,
            }
        }
        _ => return Ok(None),
    };
    Ok(Some(event))
}
