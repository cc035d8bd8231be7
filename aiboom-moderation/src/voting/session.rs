use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::Stream;
use metrics::counter;
use serde::Serialize;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

use aiboom_shared::errors::{AppError, AppResult, ErrorCode};
use aiboom_shared::types::auth::AuthUser;
use aiboom_shared::types::pagination::{Paginated, PaginationParams};

use crate::events::{EventPublisher, FeedEvent, Outcome, PostSignal, VoteFeed};
use crate::models::{Post, Vote};
use crate::store::SharedStore;

use super::countdown::TimeLeft;
use super::tally::{tally, tally_by_post, Tally, Verdict};
use super::transition::{transition, Choice, LedgerAction, VoteState};

/// Tally of one post as shown to one viewer, always built from a fresh read.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TallyView {
    pub post_id: Uuid,
    pub status: String,
    pub ai_count: u64,
    pub not_ai_count: u64,
    pub total: u64,
    pub ai_percent: u8,
    pub leading: Verdict,
    pub my_vote: Option<Choice>,
    pub voting_expires_at: Option<DateTime<Utc>>,
    pub time_left: Option<TimeLeft>,
}

impl TallyView {
    fn new(post: &Post, tally: Tally, my_vote: Option<Choice>, now: DateTime<Utc>) -> Self {
        Self {
            post_id: post.id,
            status: post.status.clone(),
            ai_count: tally.ai_count,
            not_ai_count: tally.not_ai_count,
            total: tally.total(),
            ai_percent: tally.ai_percent(),
            leading: tally.verdict(),
            my_vote,
            voting_expires_at: post.voting_expires_at,
            time_left: post
                .voting_expires_at
                .filter(|_| post.is_pending())
                .map(|at| TimeLeft::until(at, now)),
        }
    }

    fn is_pending(&self) -> bool {
        self.time_left.is_some()
    }
}

#[derive(Debug, Serialize)]
pub struct PendingPostView {
    pub post: Post,
    pub tally: TallyView,
}

#[derive(Debug, Serialize)]
pub struct VoteOutcome {
    pub action: &'static str,
    pub tally: TallyView,
}

/// One message on a live view of a post.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum LiveUpdate {
    Tally(TallyView),
    Countdown { post_id: Uuid, time_left: TimeLeft },
    Resolved { post_id: Uuid, outcome: Outcome },
}

impl LiveUpdate {
    pub fn event_name(&self) -> &'static str {
        match self {
            LiveUpdate::Tally(_) => "tally",
            LiveUpdate::Countdown { .. } => "countdown",
            LiveUpdate::Resolved { .. } => "resolved",
        }
    }
}

enum Step {
    Tick,
    Signal(Option<PostSignal>),
}

fn viewer_choice(votes: &[Vote], viewer: Option<Uuid>) -> Option<Choice> {
    let viewer = viewer?;
    votes
        .iter()
        .find(|v| v.user_id == viewer)
        .map(|v| Choice::from_vote_ai(v.vote_ai))
}

/// Server side of the voting screen: vote transitions, tally reads and live
/// updates for pending posts.
#[derive(Clone)]
pub struct VotingSession {
    store: SharedStore,
    feed: VoteFeed,
    publisher: EventPublisher,
    instance_id: Uuid,
}

impl VotingSession {
    pub fn new(store: SharedStore, feed: VoteFeed, publisher: EventPublisher, instance_id: Uuid) -> Self {
        Self { store, feed, publisher, instance_id }
    }

    /// Apply a tap on `choice`: insert, flip or retract the voter's row.
    ///
    /// Anonymous callers are rejected before anything is read or written.
    /// The returned tally is re-read from the ledger after the write.
    pub async fn cast_vote(
        &self,
        voter: Option<&AuthUser>,
        post_id: Uuid,
        choice: Choice,
        now: DateTime<Utc>,
    ) -> AppResult<VoteOutcome> {
        let voter = voter.ok_or_else(|| AppError::new(ErrorCode::AuthRequired, "sign in to vote"))?;

        let post = self
            .store
            .find_post(post_id)
            .await?
            .ok_or_else(|| AppError::new(ErrorCode::PostNotFound, "post not found"))?;

        if !post.is_pending() {
            return Err(AppError::new(ErrorCode::PostNotPending, "post is not open for voting"));
        }
        match post.voting_expires_at {
            Some(expires_at) if now < expires_at => {}
            _ => {
                return Err(AppError::with_details(
                    ErrorCode::VotingClosed,
                    "voting has closed for this post",
                    serde_json::json!({ "voting_expires_at": post.voting_expires_at }),
                ))
            }
        }

        let current = self
            .store
            .find_vote(post_id, voter.id)
            .await?
            .map(|v| v.vote_ai);
        let (_, action) = transition(VoteState::from(current), choice);

        match action {
            LedgerAction::Insert(choice) | LedgerAction::Update(choice) => {
                self.store.upsert_vote(post_id, voter.id, choice.vote_ai()).await?;
            }
            LedgerAction::Delete => {
                self.store.delete_vote(post_id, voter.id).await?;
            }
        }

        counter!("moderation_votes_total", "action" => action.as_str()).increment(1);
        tracing::info!(post_id = %post_id, user_id = %voter.id, action = action.as_str(), "vote recorded");

        self.feed.emit(FeedEvent::VoteChanged { post_id, voter_id: voter.id });
        self.publisher.vote_changed(post_id, voter.id, self.instance_id).await;

        let tally = self.view_tally(post_id, Some(voter.id), now).await?;
        Ok(VoteOutcome { action: action.as_str(), tally })
    }

    pub async fn view_tally(
        &self,
        post_id: Uuid,
        viewer: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> AppResult<TallyView> {
        let post = self
            .store
            .find_post(post_id)
            .await?
            .ok_or_else(|| AppError::new(ErrorCode::PostNotFound, "post not found"))?;

        let votes = self.store.votes_for_post(post_id).await?;
        let my_vote = viewer_choice(&votes, viewer);

        Ok(TallyView::new(&post, tally(&votes), my_vote, now))
    }

    /// Pending posts still open at `now`, newest first, each with its tally.
    pub async fn list_pending(
        &self,
        viewer: Option<Uuid>,
        params: &PaginationParams,
        now: DateTime<Utc>,
    ) -> AppResult<Paginated<PendingPostView>> {
        let (posts, total) = self
            .store
            .open_pending_posts(now, params.offset(), params.limit())
            .await?;

        let ids: Vec<Uuid> = posts.iter().map(|p| p.id).collect();
        let votes = self.store.votes_for_posts(&ids).await?;
        let tallies = tally_by_post(&votes);

        let items = posts
            .into_iter()
            .map(|post| {
                let post_votes: Vec<Vote> = votes.iter().filter(|v| v.post_id == post.id).cloned().collect();
                let tally = tallies.get(&post.id).copied().unwrap_or_default();
                let view = TallyView::new(&post, tally, viewer_choice(&post_votes, viewer), now);
                PendingPostView { post, tally: view }
            })
            .collect();

        Ok(Paginated::new(items, total, params))
    }

    /// Live view of one post, starting from an already-fetched tally.
    ///
    /// Emits a fresh tally whenever the feed reports a vote change, a
    /// countdown every second, and ends after the post is resolved. The
    /// countdown reaching zero is only a label; the stream keeps going until
    /// the resolver acts. Dropping the stream drops its feed subscription.
    pub fn live_view(
        &self,
        initial: TallyView,
        viewer: Option<Uuid>,
    ) -> impl Stream<Item = LiveUpdate> + Send + 'static {
        let session = self.clone();
        let post_id = initial.post_id;
        let mut subscription = self.feed.subscribe_post(post_id);

        async_stream::stream! {
            let expires_at = initial.voting_expires_at;
            let pending = initial.is_pending();
            yield LiveUpdate::Tally(initial);

            if !pending {
                yield LiveUpdate::Resolved { post_id, outcome: Outcome::Approved };
                return;
            }

            let mut ticker = tokio::time::interval(Duration::from_secs(1));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                let step = tokio::select! {
                    _ = ticker.tick() => Step::Tick,
                    signal = subscription.next() => Step::Signal(signal),
                };

                match step {
                    Step::Tick => {
                        if let Some(expires_at) = expires_at {
                            yield LiveUpdate::Countdown {
                                post_id,
                                time_left: TimeLeft::until(expires_at, Utc::now()),
                            };
                        }
                    }
                    Step::Signal(Some(PostSignal::Refresh)) => {
                        match session.view_tally(post_id, viewer, Utc::now()).await {
                            Ok(view) if view.is_pending() => yield LiveUpdate::Tally(view),
                            // A lagged subscriber can miss the resolution notice itself.
                            Ok(view) => {
                                yield LiveUpdate::Tally(view);
                                yield LiveUpdate::Resolved { post_id, outcome: Outcome::Approved };
                                break;
                            }
                            Err(e) if e.code() == ErrorCode::PostNotFound => {
                                yield LiveUpdate::Resolved { post_id, outcome: Outcome::Purged };
                                break;
                            }
                            // Keep the last tally on screen; the next change retries.
                            Err(e) => tracing::warn!(post_id = %post_id, error = %e, "live tally refresh failed"),
                        }
                    }
                    Step::Signal(Some(PostSignal::Resolved(outcome))) => {
                        yield LiveUpdate::Resolved { post_id, outcome };
                        break;
                    }
                    Step::Signal(None) => break,
                }
            }
        }
    }
}
