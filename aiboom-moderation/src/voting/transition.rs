use serde::{Deserialize, Serialize};

/// The button a voter pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Choice {
    Ai,
    NotAi,
}

impl Choice {
    pub fn from_vote_ai(vote_ai: bool) -> Self {
        if vote_ai {
            Choice::Ai
        } else {
            Choice::NotAi
        }
    }

    pub fn vote_ai(self) -> bool {
        self == Choice::Ai
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteState {
    NoVote,
    Voted(Choice),
}

impl From<Option<bool>> for VoteState {
    fn from(stored: Option<bool>) -> Self {
        stored.map_or(VoteState::NoVote, |v| VoteState::Voted(Choice::from_vote_ai(v)))
    }
}

/// Write the ledger must perform to move between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerAction {
    Insert(Choice),
    Update(Choice),
    Delete,
}

impl LedgerAction {
    /// Label used in logs and the votes counter.
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerAction::Insert(_) => "cast",
            LedgerAction::Update(_) => "changed",
            LedgerAction::Delete => "retracted",
        }
    }
}

/// Pressing the current choice again retracts it; pressing the other one
/// flips it.
pub fn transition(current: VoteState, tap: Choice) -> (VoteState, LedgerAction) {
    match current {
        VoteState::NoVote => (VoteState::Voted(tap), LedgerAction::Insert(tap)),
        VoteState::Voted(existing) if existing == tap => (VoteState::NoVote, LedgerAction::Delete),
        VoteState::Voted(_) => (VoteState::Voted(tap), LedgerAction::Update(tap)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_transition() {
        use Choice::*;
        use VoteState::*;

        assert_eq!(transition(NoVote, Ai), (Voted(Ai), LedgerAction::Insert(Ai)));
        assert_eq!(transition(NoVote, NotAi), (Voted(NotAi), LedgerAction::Insert(NotAi)));
        assert_eq!(transition(Voted(Ai), Ai), (NoVote, LedgerAction::Delete));
        assert_eq!(transition(Voted(NotAi), NotAi), (NoVote, LedgerAction::Delete));
        assert_eq!(transition(Voted(Ai), NotAi), (Voted(NotAi), LedgerAction::Update(NotAi)));
        assert_eq!(transition(Voted(NotAi), Ai), (Voted(Ai), LedgerAction::Update(Ai)));
    }

    #[test]
    fn stored_flag_maps_to_state() {
        assert_eq!(VoteState::from(None), VoteState::NoVote);
        assert_eq!(VoteState::from(Some(false)), VoteState::Voted(Choice::NotAi));
        assert!(Choice::Ai.vote_ai());
    }
}
