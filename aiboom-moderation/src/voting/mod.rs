//! Community voting on pending posts.

pub mod countdown;
pub mod session;
pub mod tally;
pub mod transition;

pub use countdown::TimeLeft;
pub use session::{LiveUpdate, PendingPostView, TallyView, VoteOutcome, VotingSession};
pub use tally::{tally, tally_by_post, Tally, Verdict};
pub use transition::{transition, Choice, LedgerAction, VoteState};
