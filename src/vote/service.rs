use chrono::Utc;
use rand::seq::SliceRandom;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use super::{
    models::NewVote,
    repository::VoteRepository,
    types::{PairingResponse, SubmitVoteRequest, VoteResponse},
};
use crate::{
    profile::{models::Profile, repository::ProfileRepository},
    rating,
    shared::AppError,
};

/// Upper bound on pairs handed out by one request
pub const MAX_PAIRINGS_PER_REQUEST: usize = 50;

/// Service for vote submission and pairing selection.
///
/// Submitting a vote only appends to the log; scores change later when the
/// aggregation pipeline picks the vote up.
pub struct VoteService {
    profile_repository: Arc<dyn ProfileRepository + Send + Sync>,
    vote_repository: Arc<dyn VoteRepository + Send + Sync>,
    dedup_window: Duration,
}

impl VoteService {
    pub fn new(
        profile_repository: Arc<dyn ProfileRepository + Send + Sync>,
        vote_repository: Arc<dyn VoteRepository + Send + Sync>,
        dedup_window: Duration,
    ) -> Self {
        Self {
            profile_repository,
            vote_repository,
            dedup_window,
        }
    }

    #[instrument(skip(self))]
    pub async fn submit_vote(&self, request: SubmitVoteRequest) -> Result<VoteResponse, AppError> {
        let voter_id = request.voter_id.trim();
        let winner_id = request.winner_id.trim();
        let loser_id = request.loser_id.trim();

        if voter_id.is_empty() || winner_id.is_empty() || loser_id.is_empty() {
            return Err(AppError::Validation(
                "voter_id, winner_id and loser_id are required".to_string(),
            ));
        }
        if winner_id == loser_id {
            return Err(AppError::Validation(
                "A profile cannot be compared with itself".to_string(),
            ));
        }

        for profile_id in [winner_id, loser_id] {
            if self.profile_repository.get_profile(profile_id).await?.is_none() {
                return Err(AppError::NotFound(format!(
                    "Profile {} not found",
                    profile_id
                )));
            }
        }

        if self.voted_recently(voter_id, winner_id, loser_id).await {
            info!(voter_id, winner_id, loser_id, "Rejecting repeat vote on pair");
            return Err(AppError::Conflict(
                "Already voted on this pair recently".to_string(),
            ));
        }

        let vote = self
            .vote_repository
            .append_vote(NewVote {
                winner_id: winner_id.to_string(),
                loser_id: loser_id.to_string(),
                voter_id: voter_id.to_string(),
            })
            .await?;

        info!(
            vote_id = %vote.id,
            winner_id = %vote.winner_id,
            loser_id = %vote.loser_id,
            "Vote recorded"
        );

        Ok(vote.into())
    }

    #[instrument(skip(self))]
    pub async fn get_vote(&self, vote_id: &str) -> Result<VoteResponse, AppError> {
        self.vote_repository
            .get_vote(vote_id)
            .await?
            .map(VoteResponse::from)
            .ok_or_else(|| AppError::NotFound(format!("Vote {} not found", vote_id)))
    }

    /// Random pairs of distinct profiles with both outcomes precomputed
    #[instrument(skip(self))]
    pub async fn pairings(
        &self,
        count: usize,
        exclude: Option<&str>,
    ) -> Result<Vec<PairingResponse>, AppError> {
        let count = count.clamp(1, MAX_PAIRINGS_PER_REQUEST);

        let mut candidates: Vec<Profile> = self
            .profile_repository
            .list_profiles()
            .await?
            .into_iter()
            .filter(|profile| Some(profile.id.as_str()) != exclude)
            .collect();

        if candidates.len() < 2 {
            return Err(AppError::Conflict(
                "Not enough profiles to form a pair".to_string(),
            ));
        }

        debug!(candidates = candidates.len(), count, "Drawing pairings");
        Ok(draw_pairings(&mut candidates, count))
    }

    // Anti-abuse only: a failing lookup lets the vote through
    async fn voted_recently(&self, voter_id: &str, winner_id: &str, loser_id: &str) -> bool {
        if self.dedup_window.is_zero() {
            return false;
        }
        let Ok(window) = chrono::Duration::from_std(self.dedup_window) else {
            return false;
        };

        match self
            .vote_repository
            .has_recent_vote(voter_id, winner_id, loser_id, Utc::now() - window)
            .await
        {
            Ok(recent) => recent,
            Err(err) => {
                warn!(?err, voter_id, "Recent vote check failed, allowing vote");
                false
            }
        }
    }
}

fn draw_pairings(candidates: &mut [Profile], count: usize) -> Vec<PairingResponse> {
    let mut rng = rand::rng();

    (0..count)
        .map(|_| {
            let (picked, _) = candidates.partial_shuffle(&mut rng, 2);
            let a = picked[0].clone();
            let b = picked[1].clone();
            let outcomes = rating::precompute(a.rating_input(), b.rating_input());

            PairingResponse {
                profile_a: a.into(),
                profile_b: b.into(),
                outcomes,
            }
        })
        .collect()
}
