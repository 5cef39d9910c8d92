use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::models::{VoteEvent, VoteStatus};
use crate::profile::types::ProfileResponse;
use crate::rating::PairingOutcomes;

/// Request payload for submitting a vote
#[derive(Debug, Deserialize)]
pub struct SubmitVoteRequest {
    pub voter_id: String,
    pub winner_id: String,
    pub loser_id: String,
}

/// Response for vote submission and vote lookups
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VoteResponse {
    pub vote_id: String,
    pub winner_id: String,
    pub loser_id: String,
    pub created_at: DateTime<Utc>,
    pub status: VoteStatus,
}

impl From<VoteEvent> for VoteResponse {
    fn from(vote: VoteEvent) -> Self {
        Self {
            vote_id: vote.id,
            winner_id: vote.winner_id,
            loser_id: vote.loser_id,
            created_at: vote.created_at,
            status: vote.status,
        }
    }
}

/// Query string for pairing requests
#[derive(Debug, Default, Deserialize)]
pub struct PairingsQuery {
    pub count: Option<usize>,
    /// Profile that must not appear in any pair, usually the voter's own
    pub exclude: Option<String>,
}

/// Two profiles to compare, with the score swing for either choice
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PairingResponse {
    pub profile_a: ProfileResponse,
    pub profile_b: ProfileResponse,
    #[serde(flatten)]
    pub outcomes: PairingOutcomes,
}
