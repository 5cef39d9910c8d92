use axum::Router;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cloutscore::{
    build_router, AggregationPipeline, AppConfig, AppState, NewVote, Profile, ProfileRepository,
    VoteEvent, VoteRepository,
};

use super::mocks::{FlakyProfileRepository, FlakyVoteRepository};

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub struct TestSetup {
    pub profiles: Arc<FlakyProfileRepository>,
    pub votes: Arc<FlakyVoteRepository>,
    pub state: AppState,
    voter_counter: AtomicUsize,
}

pub struct TestSetupBuilder {
    profiles: Vec<Profile>,
    config: AppConfig,
}

#[allow(dead_code)]
impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            profiles: vec![],
            config: AppConfig::default(),
        }
    }

    /// Seeds a profile with explicit rating state
    pub fn with_profile(mut self, id: &str, score: i32, experience_count: i32) -> Self {
        let mut profile = Profile::new(format!("Profile {}", id), None);
        profile.id = id.to_string();
        profile.score = score;
        profile.experience_count = experience_count;
        self.profiles.push(profile);
        self
    }

    /// Seeds profiles at the starting score with no experience
    pub fn with_fresh_profiles(self, ids: &[&str]) -> Self {
        ids.iter()
            .fold(self, |builder, id| builder.with_profile(id, 1000, 0))
    }

    pub fn with_dedup_window(mut self, window: Duration) -> Self {
        self.config.vote_dedup_window = window;
        self
    }

    pub fn build(self) -> TestSetup {
        let profiles = Arc::new(FlakyProfileRepository::with_profiles(self.profiles));
        let votes = Arc::new(FlakyVoteRepository::default());
        let state = AppState::new(profiles.clone(), votes.clone(), self.config);

        TestSetup {
            profiles,
            votes,
            state,
            voter_counter: AtomicUsize::new(0),
        }
    }
}

#[allow(dead_code)]
impl TestSetup {
    pub fn pipeline(&self) -> Arc<AggregationPipeline> {
        Arc::clone(&self.state.pipeline)
    }

    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    /// Appends a vote straight to the log, each from a distinct voter
    pub async fn vote(&self, winner: &str, loser: &str) -> VoteEvent {
        let voter = self.voter_counter.fetch_add(1, Ordering::SeqCst);
        self.votes
            .append_vote(NewVote {
                winner_id: winner.to_string(),
                loser_id: loser.to_string(),
                voter_id: format!("voter-{}", voter),
            })
            .await
            .expect("appending to the in-memory log should succeed")
    }

    /// Current (score, experience_count) of a profile
    pub async fn rating_of(&self, profile_id: &str) -> (i32, i32) {
        let profile = self
            .profiles
            .get_profile(profile_id)
            .await
            .expect("lookup should succeed")
            .expect("profile should exist");
        (profile.score, profile.experience_count)
    }

    pub async fn pending_votes(&self) -> usize {
        self.votes.inner.pending_count().await
    }
}
