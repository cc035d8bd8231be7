//! In-process fan-out of vote and resolution notices.
//!
//! The feed only says *that* something changed for a post. Subscribers react
//! by re-reading the ledger; nothing downstream trusts a count carried here.

use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Approved,
    Purged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    VoteChanged { post_id: Uuid, voter_id: Uuid },
    PostResolved { post_id: Uuid, outcome: Outcome },
}

impl FeedEvent {
    pub fn post_id(&self) -> Uuid {
        match self {
            FeedEvent::VoteChanged { post_id, .. } | FeedEvent::PostResolved { post_id, .. } => *post_id,
        }
    }
}

/// What a per-post subscriber should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostSignal {
    /// Votes may have changed: re-fetch the tally.
    Refresh,
    /// The post left review; no further signals will follow.
    Resolved(Outcome),
}

/// Broadcast channel shared by the vote handlers, the resolver, the broker
/// bridge and every open live view. Cheap to clone.
#[derive(Clone)]
pub struct VoteFeed {
    tx: broadcast::Sender<FeedEvent>,
}

impl VoteFeed {
    pub fn new() -> Self {
        Self::with_capacity(1024)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Returns the number of live receivers; zero is normal when nobody is
    /// watching.
    pub fn emit(&self, event: FeedEvent) -> usize {
        tracing::debug!(post_id = %event.post_id(), ?event, "feed event");
        self.tx.send(event).unwrap_or(0)
    }

    /// Subscription filtered to one post. Dropping it unsubscribes.
    pub fn subscribe_post(&self, post_id: Uuid) -> PostSubscription {
        PostSubscription {
            post_id,
            rx: self.tx.subscribe(),
        }
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for VoteFeed {
    fn default() -> Self {
        Self::new()
    }
}

pub struct PostSubscription {
    post_id: Uuid,
    rx: broadcast::Receiver<FeedEvent>,
}

impl PostSubscription {
    /// Next signal for this post, or `None` once the feed is gone.
    pub async fn next(&mut self) -> Option<PostSignal> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.post_id() != self.post_id => continue,
                Ok(FeedEvent::VoteChanged { .. }) => return Some(PostSignal::Refresh),
                Ok(FeedEvent::PostResolved { outcome, .. }) => {
                    return Some(PostSignal::Resolved(outcome))
                }
                // Missed events may have touched this post; a re-read covers them.
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(post_id = %self.post_id, skipped, "vote feed subscriber lagged");
                    return Some(PostSignal::Refresh);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscription_only_sees_its_post() {
        let feed = VoteFeed::new();
        let watched = Uuid::new_v4();
        let mut sub = feed.subscribe_post(watched);

        feed.emit(FeedEvent::VoteChanged { post_id: Uuid::new_v4(), voter_id: Uuid::new_v4() });
        feed.emit(FeedEvent::VoteChanged { post_id: watched, voter_id: Uuid::new_v4() });
        feed.emit(FeedEvent::PostResolved { post_id: watched, outcome: Outcome::Purged });

        assert_eq!(sub.next().await, Some(PostSignal::Refresh));
        assert_eq!(sub.next().await, Some(PostSignal::Resolved(Outcome::Purged)));
    }

    #[tokio::test]
    async fn lagging_subscriber_is_told_to_refresh() {
        let feed = VoteFeed::with_capacity(2);
        let post_id = Uuid::new_v4();
        let mut sub = feed.subscribe_post(post_id);

        for _ in 0..5 {
            feed.emit(FeedEvent::VoteChanged { post_id: Uuid::new_v4(), voter_id: Uuid::new_v4() });
        }

        assert_eq!(sub.next().await, Some(PostSignal::Refresh));
    }

    #[test]
    fn dropping_a_subscription_releases_its_receiver() {
        let feed = VoteFeed::new();
        let sub = feed.subscribe_post(Uuid::new_v4());
        assert_eq!(feed.receiver_count(), 1);

        drop(sub);
        assert_eq!(feed.receiver_count(), 0);
        assert_eq!(feed.emit(FeedEvent::VoteChanged { post_id: Uuid::nil(), voter_id: Uuid::nil() }), 0);
    }
}
