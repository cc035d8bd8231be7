pub mod feed;
pub mod publisher;
pub mod subscriber;

pub use feed::{FeedEvent, Outcome, PostSignal, PostSubscription, VoteFeed};
pub use publisher::EventPublisher;
