use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use crate::models::Vote;

/// Outcome a tally drives at resolution time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Ai,
    NotAi,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Ai => "ai",
            Verdict::NotAi => "not_ai",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counts of AI / not-AI votes on one post. Always derived from ledger rows,
/// never stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub ai_count: u64,
    pub not_ai_count: u64,
}

impl Tally {
    pub fn total(&self) -> u64 {
        self.ai_count + self.not_ai_count
    }

    /// Ties, including the empty tally, go to the poster.
    pub fn verdict(&self) -> Verdict {
        if self.ai_count >= self.not_ai_count {
            Verdict::Ai
        } else {
            Verdict::NotAi
        }
    }

    /// Share of AI votes as a rounded percentage; 0 with no votes.
    pub fn ai_percent(&self) -> u8 {
        match self.total() {
            0 => 0,
            total => ((self.ai_count as f64 / total as f64) * 100.0).round() as u8,
        }
    }

    fn add(&mut self, vote_ai: bool) {
        if vote_ai {
            self.ai_count += 1;
        } else {
            self.not_ai_count += 1;
        }
    }
}

pub fn tally(votes: &[Vote]) -> Tally {
    votes.iter().fold(Tally::default(), |mut acc, vote| {
        acc.add(vote.vote_ai);
        acc
    })
}

/// Tallies for several posts from one batch read. Posts without votes are
/// absent from the map; callers default them to an empty tally.
pub fn tally_by_post(votes: &[Vote]) -> HashMap<Uuid, Tally> {
    let mut tallies: HashMap<Uuid, Tally> = HashMap::new();
    for vote in votes {
        tallies.entry(vote.post_id).or_default().add(vote.vote_ai);
    }
    tallies
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn votes(post_id: Uuid, ai: usize, not_ai: usize) -> Vec<Vote> {
        std::iter::repeat(true)
            .take(ai)
            .chain(std::iter::repeat(false).take(not_ai))
            .map(|vote_ai| Vote {
                id: Uuid::new_v4(),
                post_id,
                user_id: Uuid::new_v4(),
                vote_ai,
                created_at: Utc::now(),
            })
            .collect()
    }

    #[test]
    fn ties_resolve_to_ai() {
        let post = Uuid::new_v4();
        assert_eq!(tally(&[]).verdict(), Verdict::Ai);
        assert_eq!(tally(&votes(post, 2, 2)).verdict(), Verdict::Ai);
    }

    #[test]
    fn majority_decides() {
        let post = Uuid::new_v4();

        let t = tally(&votes(post, 3, 1));
        assert_eq!((t.ai_count, t.not_ai_count), (3, 1));
        assert_eq!(t.verdict(), Verdict::Ai);

        assert_eq!(tally(&votes(post, 1, 2)).verdict(), Verdict::NotAi);
    }

    #[test]
    fn percent_rounds_and_handles_empty() {
        assert_eq!(Tally::default().ai_percent(), 0);
        assert_eq!(Tally { ai_count: 2, not_ai_count: 1 }.ai_percent(), 67);
        assert_eq!(Tally { ai_count: 1, not_ai_count: 0 }.ai_percent(), 100);
    }

    #[test]
    fn grouped_tallies_keep_posts_apart() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut all = votes(a, 2, 0);
        all.extend(votes(b, 0, 3));

        let grouped = tally_by_post(&all);
        assert_eq!(grouped[&a], Tally { ai_count: 2, not_ai_count: 0 });
        assert_eq!(grouped[&b].verdict(), Verdict::NotAi);
        assert!(!grouped.contains_key(&Uuid::new_v4()));
    }
}
