use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use cloutscore::{
    profile::{models::ProfileDelta, repository::InMemoryProfileRepository},
    vote::repository::InMemoryVoteRepository,
    AppError, NewVote, Profile, ProfileRepository, VoteEvent, VoteRepository,
};

// ============================================================================
// Failure Injection
// ============================================================================

fn injected(operation: &str) -> AppError {
    AppError::DatabaseError(format!("injected failure in {}", operation))
}

/// In-memory profile store whose reads and commits can be made to fail
#[derive(Default)]
pub struct FlakyProfileRepository {
    pub inner: InMemoryProfileRepository,
    fail_lookup: AtomicBool,
    fail_commit: AtomicBool,
}

#[allow(dead_code)]
impl FlakyProfileRepository {
    pub fn with_profiles(profiles: Vec<Profile>) -> Self {
        Self {
            inner: InMemoryProfileRepository::with_profiles(profiles),
            ..Self::default()
        }
    }

    pub fn fail_lookups(&self, fail: bool) {
        self.fail_lookup.store(fail, Ordering::SeqCst);
    }

    pub fn fail_commits(&self, fail: bool) {
        self.fail_commit.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ProfileRepository for FlakyProfileRepository {
    async fn create_profile(&self, profile: &Profile) -> Result<(), AppError> {
        self.inner.create_profile(profile).await
    }

    async fn get_profile(&self, profile_id: &str) -> Result<Option<Profile>, AppError> {
        if self.fail_lookup.load(Ordering::SeqCst) {
            return Err(injected("get_profile"));
        }
        self.inner.get_profile(profile_id).await
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>, AppError> {
        self.inner.list_profiles().await
    }

    async fn top_profiles(&self, limit: usize) -> Result<Vec<Profile>, AppError> {
        self.inner.top_profiles(limit).await
    }

    async fn apply_deltas(&self, deltas: &BTreeMap<String, ProfileDelta>) -> Result<(), AppError> {
        if self.fail_commit.load(Ordering::SeqCst) {
            return Err(injected("apply_deltas"));
        }
        self.inner.apply_deltas(deltas).await
    }
}

/// In-memory vote log whose fetch and seal steps can be made to fail, and
/// whose pending votes can be handed back newest first
#[derive(Default)]
pub struct FlakyVoteRepository {
    pub inner: InMemoryVoteRepository,
    fail_fetch: AtomicBool,
    fail_seal: AtomicBool,
    reverse_fetch: AtomicBool,
}

#[allow(dead_code)]
impl FlakyVoteRepository {
    pub fn fail_fetches(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    pub fn fail_seals(&self, fail: bool) {
        self.fail_seal.store(fail, Ordering::SeqCst);
    }

    pub fn reverse_fetches(&self, reverse: bool) {
        self.reverse_fetch.store(reverse, Ordering::SeqCst);
    }
}

#[async_trait]
impl VoteRepository for FlakyVoteRepository {
    async fn append_vote(&self, vote: NewVote) -> Result<VoteEvent, AppError> {
        self.inner.append_vote(vote).await
    }

    async fn get_vote(&self, vote_id: &str) -> Result<Option<VoteEvent>, AppError> {
        self.inner.get_vote(vote_id).await
    }

    async fn fetch_pending_votes(&self) -> Result<Vec<VoteEvent>, AppError> {
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(injected("fetch_pending_votes"));
        }
        let mut pending = self.inner.fetch_pending_votes().await?;
        if self.reverse_fetch.load(Ordering::SeqCst) {
            pending.reverse();
        }
        Ok(pending)
    }

    async fn mark_votes_processed(&self, vote_ids: &[String]) -> Result<u64, AppError> {
        if self.fail_seal.load(Ordering::SeqCst) {
            return Err(injected("mark_votes_processed"));
        }
        self.inner.mark_votes_processed(vote_ids).await
    }

    async fn has_recent_vote(
        &self,
        voter_id: &str,
        profile_a: &str,
        profile_b: &str,
        since: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        self.inner
            .has_recent_vote(voter_id, profile_a, profile_b, since)
            .await
    }
}
