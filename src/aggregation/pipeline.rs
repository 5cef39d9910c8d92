use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

use super::errors::AggregationError;
use super::working_set::WorkingSet;
use crate::profile::models::ProfileDelta;
use crate::profile::repository::ProfileRepository;
use crate::vote::repository::VoteRepository;
use crate::vote::VoteEvent;

/// Summary of one aggregation tick
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    pub votes_fetched: usize,
    pub votes_applied: usize,
    pub votes_skipped: usize,
    pub votes_sealed: u64,
    pub profiles_updated: usize,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Result of replaying a batch against its working set
#[derive(Debug, Default)]
pub struct Replay {
    pub deltas: BTreeMap<String, ProfileDelta>,
    pub applied: usize,
    pub skipped: usize,
}

/// Folds pending votes into profile scores.
///
/// A tick runs fetch, snapshot, replay, commit, seal in that order. Profiles are
/// written with relative increments before any vote is sealed, so a crash in
/// between leaves votes pending rather than lost.
pub struct AggregationPipeline {
    profiles: Arc<dyn ProfileRepository + Send + Sync>,
    votes: Arc<dyn VoteRepository + Send + Sync>,
    lease: Mutex<()>,
}

impl AggregationPipeline {
    pub fn new(
        profiles: Arc<dyn ProfileRepository + Send + Sync>,
        votes: Arc<dyn VoteRepository + Send + Sync>,
    ) -> Self {
        Self {
            profiles,
            votes,
            lease: Mutex::new(()),
        }
    }

    /// Runs a single tick. Returns `TickInProgress` instead of waiting when
    /// another tick holds the lease.
    #[instrument(skip(self))]
    pub async fn run_tick(&self) -> Result<TickReport, AggregationError> {
        let _lease = self.lease.try_lock().map_err(|_| {
            warn!("Aggregation tick requested while another is running");
            AggregationError::TickInProgress
        })?;

        let mut votes = self
            .votes
            .fetch_pending_votes()
            .await
            .map_err(AggregationError::Fetch)?;

        if votes.is_empty() {
            debug!("No pending votes to aggregate");
            return Ok(TickReport {
                completed_at: Some(Utc::now()),
                ..TickReport::default()
            });
        }

        // Stable, so equal sequences keep store order
        votes.sort_by_key(|vote| vote.sequence);
        info!(vote_count = votes.len(), "Aggregating pending votes");

        let working_set = self.snapshot(&votes).await?;
        let replayed = replay(&votes, working_set);

        if !replayed.deltas.is_empty() {
            self.profiles
                .apply_deltas(&replayed.deltas)
                .await
                .map_err(|e| {
                    error!(error = %e, "Profile commit failed, votes stay pending");
                    AggregationError::Commit(e)
                })?;
        }

        let vote_ids: Vec<String> = votes.iter().map(|vote| vote.id.clone()).collect();
        let votes_sealed = self
            .votes
            .mark_votes_processed(&vote_ids)
            .await
            .map_err(|e| {
                error!(
                    error = %e,
                    vote_count = vote_ids.len(),
                    "Sealing failed after profile commit"
                );
                AggregationError::Seal(e)
            })?;

        let report = TickReport {
            votes_fetched: votes.len(),
            votes_applied: replayed.applied,
            votes_skipped: replayed.skipped,
            votes_sealed,
            profiles_updated: replayed.deltas.len(),
            completed_at: Some(Utc::now()),
        };

        info!(
            votes_applied = report.votes_applied,
            votes_skipped = report.votes_skipped,
            profiles_updated = report.profiles_updated,
            "Aggregation tick committed"
        );
        Ok(report)
    }

    /// Loads every referenced profile concurrently. Missing profiles are left
    /// out of the working set; replay skips the votes that need them.
    async fn snapshot(&self, votes: &[VoteEvent]) -> Result<WorkingSet, AggregationError> {
        let profile_ids: BTreeSet<&str> = votes
            .iter()
            .flat_map(|vote| [vote.winner_id.as_str(), vote.loser_id.as_str()])
            .collect();

        let lookups = profile_ids.iter().map(|profile_id| {
            let profiles = Arc::clone(&self.profiles);
            async move { profiles.get_profile(profile_id).await }
        });

        let found = try_join_all(lookups)
            .await
            .map_err(AggregationError::Snapshot)?;

        let working_set = WorkingSet::from_profiles(found.into_iter().flatten());
        debug!(
            referenced = profile_ids.len(),
            loaded = working_set.len(),
            "Snapshot taken"
        );
        Ok(working_set)
    }
}

/// Replays votes in the given order against the working set.
pub fn replay(votes: &[VoteEvent], mut working_set: WorkingSet) -> Replay {
    let mut applied = 0;
    let mut skipped = 0;

    for vote in votes {
        match working_set.apply(vote) {
            Ok(outcome) => {
                debug!(
                    vote_id = %vote.id,
                    winner_change = outcome.winner_change,
                    loser_change = outcome.loser_change,
                    "Vote replayed"
                );
                applied += 1;
            }
            Err(reason) => {
                warn!(vote_id = %vote.id, reason = %reason, "Skipping vote");
                skipped += 1;
            }
        }
    }

    Replay {
        deltas: working_set.into_deltas(),
        applied,
        skipped,
    }
}
