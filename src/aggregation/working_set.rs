use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

use crate::profile::models::{Profile, ProfileDelta};
use crate::rating::{compute_outcome, RatingInput, RatingOutcome};
use crate::vote::VoteEvent;

/// Why a single vote could not be replayed. The vote is skipped, the batch goes on.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReplayError {
    #[error("vote {vote_id} references missing profile {profile_id}")]
    MissingProfile { vote_id: String, profile_id: String },

    #[error("vote {vote_id} compares profile {profile_id} with itself")]
    SelfMatch { vote_id: String, profile_id: String },
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    original: RatingInput,
    current: RatingInput,
}

/// Rating state of every profile touched by one tick.
///
/// Owned by a single pipeline run and dropped when it ends. Each applied vote
/// updates `current`, so later votes in the same batch see earlier results.
#[derive(Debug, Default)]
pub struct WorkingSet {
    entries: HashMap<String, Entry>,
}

impl WorkingSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_profiles<I>(profiles: I) -> Self
    where
        I: IntoIterator<Item = Profile>,
    {
        let mut working_set = Self::new();
        for profile in profiles {
            working_set.insert(profile.id.clone(), profile.rating_input());
        }
        working_set
    }

    /// Records the snapshot for a profile. Re-inserting resets its progress.
    pub fn insert(&mut self, profile_id: String, snapshot: RatingInput) {
        self.entries.insert(
            profile_id,
            Entry {
                original: snapshot,
                current: snapshot,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn current(&self, profile_id: &str) -> Option<RatingInput> {
        self.entries.get(profile_id).map(|entry| entry.current)
    }

    /// Scores one vote against current in-batch state and folds the result back in
    pub fn apply(&mut self, vote: &VoteEvent) -> Result<RatingOutcome, ReplayError> {
        if vote.is_self_match() {
            return Err(ReplayError::SelfMatch {
                vote_id: vote.id.clone(),
                profile_id: vote.winner_id.clone(),
            });
        }

        let winner = self.require(vote, &vote.winner_id)?;
        let loser = self.require(vote, &vote.loser_id)?;

        let outcome = compute_outcome(winner, loser);

        self.advance(&vote.winner_id, outcome.winner_change);
        self.advance(&vote.loser_id, outcome.loser_change);

        Ok(outcome)
    }

    /// Net change per profile relative to the snapshot. Profiles that took
    /// part in no applied vote are left out.
    pub fn into_deltas(self) -> BTreeMap<String, ProfileDelta> {
        self.entries
            .into_iter()
            .filter_map(|(profile_id, entry)| {
                let delta = ProfileDelta {
                    score_delta: entry.current.score - entry.original.score,
                    experience_delta: entry.current.experience_count
                        - entry.original.experience_count,
                };
                (delta.experience_delta != 0).then_some((profile_id, delta))
            })
            .collect()
    }

    fn require(&self, vote: &VoteEvent, profile_id: &str) -> Result<RatingInput, ReplayError> {
        self.current(profile_id)
            .ok_or_else(|| ReplayError::MissingProfile {
                vote_id: vote.id.clone(),
                profile_id: profile_id.to_string(),
            })
    }

    fn advance(&mut self, profile_id: &str, score_change: i32) {
        if let Some(entry) = self.entries.get_mut(profile_id) {
            entry.current = entry.current.after_vote(score_change);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rating::MIN_SCORE;
    use crate::vote::NewVote;

    fn vote(winner: &str, loser: &str, sequence: i64) -> VoteEvent {
        VoteEvent::pending(
            NewVote {
                winner_id: winner.to_string(),
                loser_id: loser.to_string(),
                voter_id: "voter".to_string(),
            },
            sequence,
        )
    }

    fn two_fresh_profiles() -> WorkingSet {
        let mut working_set = WorkingSet::new();
        working_set.insert("a".to_string(), RatingInput::new(1000, 0));
        working_set.insert("b".to_string(), RatingInput::new(1000, 0));
        working_set
    }

    #[test]
    fn apply_updates_current_state() {
        let mut working_set = two_fresh_profiles();

        let outcome = working_set.apply(&vote("a", "b", 1)).unwrap();

        assert_eq!(outcome.winner_change, 50);
        assert_eq!(working_set.current("a"), Some(RatingInput::new(1050, 1)));
        assert_eq!(working_set.current("b"), Some(RatingInput::new(950, 1)));
    }

    #[test]
    fn second_vote_is_scored_against_updated_state() {
        let mut working_set = two_fresh_profiles();

        let first = working_set.apply(&vote("a", "b", 1)).unwrap();
        let second = working_set.apply(&vote("a", "b", 2)).unwrap();

        assert_eq!(first.winner_change, 50);
        assert_eq!(second.winner_change, 36);
        assert!(second.winner_change < first.winner_change);

        let deltas = working_set.into_deltas();
        assert_eq!(
            deltas["a"],
            ProfileDelta {
                score_delta: 86,
                experience_delta: 2
            }
        );
        assert_eq!(
            deltas["b"],
            ProfileDelta {
                score_delta: -86,
                experience_delta: 2
            }
        );
    }

    #[test]
    fn missing_profile_is_reported_and_state_untouched() {
        let mut working_set = two_fresh_profiles();

        let ghost_vote = vote("a", "ghost", 1);

        let result = working_set.apply(&ghost_vote);

        assert_eq!(
            result.unwrap_err(),
            ReplayError::MissingProfile {
                vote_id: ghost_vote.id.clone(),
                profile_id: "ghost".to_string(),
            }
        );
        assert_eq!(working_set.current("a"), Some(RatingInput::new(1000, 0)));
        assert!(working_set.into_deltas().is_empty());
    }

    #[test]
    fn self_match_is_rejected() {
        let mut working_set = two_fresh_profiles();

        let result = working_set.apply(&vote("a", "a", 1));

        assert!(matches!(result, Err(ReplayError::SelfMatch { .. })));
        assert_eq!(working_set.current("a"), Some(RatingInput::new(1000, 0)));
    }

    #[test]
    fn floor_holds_across_repeated_losses() {
        let mut working_set = WorkingSet::new();
        working_set.insert("rival".to_string(), RatingInput::new(180, 0));
        working_set.insert("weak".to_string(), RatingInput::new(180, 0));

        for sequence in 0..10 {
            working_set.apply(&vote("rival", "weak", sequence)).unwrap();
            assert!(working_set.current("weak").unwrap().score >= MIN_SCORE);
        }

        let weak = working_set.current("weak").unwrap();
        assert_eq!(weak.score, MIN_SCORE);
        assert_eq!(weak.experience_count, 10);
    }

    #[test]
    fn untouched_profiles_produce_no_delta() {
        let mut working_set = two_fresh_profiles();
        working_set.insert("c".to_string(), RatingInput::new(1000, 0));

        working_set.apply(&vote("a", "b", 1)).unwrap();

        let deltas = working_set.into_deltas();
        assert_eq!(deltas.len(), 2);
        assert!(!deltas.contains_key("c"));
    }
}
