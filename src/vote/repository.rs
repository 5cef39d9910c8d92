use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use super::models::{NewVote, VoteEvent, VoteRow};
use crate::shared::AppError;

/// Trait for the append-only vote log
#[async_trait]
pub trait VoteRepository {
    /// Appends a pending vote. The store assigns id, creation time and sequence.
    async fn append_vote(&self, vote: NewVote) -> Result<VoteEvent, AppError>;
    async fn get_vote(&self, vote_id: &str) -> Result<Option<VoteEvent>, AppError>;

    /// All pending votes. Callers must not rely on the returned order.
    async fn fetch_pending_votes(&self) -> Result<Vec<VoteEvent>, AppError>;

    /// Atomically seals every listed vote. Unknown or already sealed ids fail the
    /// whole call and nothing is sealed.
    async fn mark_votes_processed(&self, vote_ids: &[String]) -> Result<u64, AppError>;

    /// Whether `voter_id` voted on this pair, in either direction, after `since`
    async fn has_recent_vote(
        &self,
        voter_id: &str,
        profile_a: &str,
        profile_b: &str,
        since: DateTime<Utc>,
    ) -> Result<bool, AppError>;
}

#[derive(Debug, Default)]
struct VoteLog {
    votes: Vec<VoteEvent>,
    index: HashMap<String, usize>,
    next_sequence: i64,
}

/// In-memory implementation of VoteRepository for development and testing
#[derive(Debug, Default)]
pub struct InMemoryVoteRepository {
    log: RwLock<VoteLog>,
}

impl InMemoryVoteRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn vote_count(&self) -> usize {
        self.log.read().await.votes.len()
    }

    pub async fn pending_count(&self) -> usize {
        self.log
            .read()
            .await
            .votes
            .iter()
            .filter(|vote| vote.is_pending())
            .count()
    }
}

#[async_trait]
impl VoteRepository for InMemoryVoteRepository {
    #[instrument(skip(self))]
    async fn append_vote(&self, vote: NewVote) -> Result<VoteEvent, AppError> {
        let mut log = self.log.write().await;
        log.next_sequence += 1;

        let event = VoteEvent::pending(vote, log.next_sequence);
        let position = log.votes.len();
        log.index.insert(event.id.clone(), position);
        log.votes.push(event.clone());

        debug!(vote_id = %event.id, sequence = event.sequence, "Vote appended in memory");
        Ok(event)
    }

    #[instrument(skip(self))]
    async fn get_vote(&self, vote_id: &str) -> Result<Option<VoteEvent>, AppError> {
        let log = self.log.read().await;
        Ok(log
            .index
            .get(vote_id)
            .and_then(|position| log.votes.get(*position))
            .cloned())
    }

    #[instrument(skip(self))]
    async fn fetch_pending_votes(&self) -> Result<Vec<VoteEvent>, AppError> {
        let log = self.log.read().await;
        let pending: Vec<VoteEvent> = log
            .votes
            .iter()
            .filter(|vote| vote.is_pending())
            .cloned()
            .collect();

        debug!(count = pending.len(), "Fetched pending votes from memory");
        Ok(pending)
    }

    #[instrument(skip(self, vote_ids), fields(vote_count = vote_ids.len()))]
    async fn mark_votes_processed(&self, vote_ids: &[String]) -> Result<u64, AppError> {
        let mut log = self.log.write().await;

        let mut positions = Vec::with_capacity(vote_ids.len());
        let mut seen = HashSet::new();
        for vote_id in vote_ids {
            if !seen.insert(vote_id.as_str()) {
                continue;
            }
            let position = *log.index.get(vote_id).ok_or_else(|| {
                warn!(vote_id = %vote_id, "Cannot seal unknown vote");
                AppError::NotFound(format!("Vote {} not found", vote_id))
            })?;
            if !log.votes[position].is_pending() {
                warn!(vote_id = %vote_id, "Vote already sealed, aborting seal batch");
                return Err(AppError::Conflict(format!(
                    "Vote {} is already sealed",
                    vote_id
                )));
            }
            positions.push(position);
        }

        let sealed_at = Utc::now();
        for position in &positions {
            log.votes[*position].seal(sealed_at)?;
        }

        info!(sealed = positions.len(), "Votes sealed in memory");
        Ok(positions.len() as u64)
    }

    #[instrument(skip(self))]
    async fn has_recent_vote(
        &self,
        voter_id: &str,
        profile_a: &str,
        profile_b: &str,
        since: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let log = self.log.read().await;
        Ok(log.votes.iter().rev().any(|vote| {
            vote.voter_id == voter_id
                && vote.created_at > since
                && vote.involves_pair(profile_a, profile_b)
        }))
    }
}

/// PostgreSQL implementation of the vote log
pub struct PostgresVoteRepository {
    pool: PgPool,
}

impl PostgresVoteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Decodes pending rows, leaving out any row whose state columns disagree.
/// A bad row is logged by id and stays in the table for an operator to repair.
fn decode_pending_rows(rows: Vec<VoteRow>) -> Vec<VoteEvent> {
    rows.into_iter()
        .filter_map(|row| {
            let vote_id = row.id.clone();
            match VoteEvent::try_from(row) {
                Ok(event) => Some(event),
                Err(e) => {
                    warn!(vote_id = %vote_id, error = %e, "Skipping malformed pending vote row");
                    None
                }
            }
        })
        .collect()
}

const VOTE_COLUMNS: &str =
    "id, sequence, winner_id, loser_id, voter_id, created_at, processed, processed_at";

#[async_trait]
impl VoteRepository for PostgresVoteRepository {
    #[instrument(skip(self))]
    async fn append_vote(&self, vote: NewVote) -> Result<VoteEvent, AppError> {
        // `sequence` is a BIGSERIAL and `created_at` defaults to NOW() server side
        let row: VoteRow = sqlx::query_as(&format!(
            "INSERT INTO votes (id, winner_id, loser_id, voter_id) VALUES ($1, $2, $3, $4) RETURNING {}",
            VOTE_COLUMNS
        ))
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(&vote.winner_id)
        .bind(&vote.loser_id)
        .bind(&vote.voter_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to append vote to database");
            AppError::DatabaseError(e.to_string())
        })?;

        let event = VoteEvent::try_from(row)?;
        debug!(vote_id = %event.id, sequence = event.sequence, "Vote appended in database");
        Ok(event)
    }

    #[instrument(skip(self))]
    async fn get_vote(&self, vote_id: &str) -> Result<Option<VoteEvent>, AppError> {
        let row: Option<VoteRow> =
            sqlx::query_as(&format!("SELECT {} FROM votes WHERE id = $1", VOTE_COLUMNS))
                .bind(vote_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    warn!(error = %e, vote_id = %vote_id, "Failed to fetch vote from database");
                    AppError::DatabaseError(e.to_string())
                })?;

        row.map(VoteEvent::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn fetch_pending_votes(&self) -> Result<Vec<VoteEvent>, AppError> {
        let rows: Vec<VoteRow> = sqlx::query_as(&format!(
            "SELECT {} FROM votes WHERE processed = FALSE ORDER BY sequence ASC",
            VOTE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to fetch pending votes from database");
            AppError::DatabaseError(e.to_string())
        })?;

        debug!(count = rows.len(), "Fetched pending votes from database");
        Ok(decode_pending_rows(rows))
    }

    #[instrument(skip(self, vote_ids), fields(vote_count = vote_ids.len()))]
    async fn mark_votes_processed(&self, vote_ids: &[String]) -> Result<u64, AppError> {
        let unique_ids: Vec<String> = vote_ids
            .iter()
            .collect::<HashSet<_>>()
            .into_iter()
            .cloned()
            .collect();

        let mut tx = self.pool.begin().await.map_err(|e| {
            warn!(error = %e, "Failed to open seal transaction");
            AppError::DatabaseError(e.to_string())
        })?;

        let result = sqlx::query(
            "UPDATE votes SET processed = TRUE, processed_at = $2 WHERE id = ANY($1) AND processed = FALSE",
        )
        .bind(&unique_ids)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to seal votes");
            AppError::DatabaseError(e.to_string())
        })?;

        let sealed = result.rows_affected();
        if sealed != unique_ids.len() as u64 {
            // Dropping `tx` rolls the partial seal back
            warn!(
                expected = unique_ids.len(),
                sealed, "Seal batch contained unknown or already sealed votes"
            );
            return Err(AppError::Conflict(format!(
                "Expected to seal {} votes but {} were pending",
                unique_ids.len(),
                sealed
            )));
        }

        tx.commit().await.map_err(|e| {
            warn!(error = %e, "Failed to commit seal transaction");
            AppError::DatabaseError(e.to_string())
        })?;

        info!(sealed, "Votes sealed in database");
        Ok(sealed)
    }

    #[instrument(skip(self))]
    async fn has_recent_vote(
        &self,
        voter_id: &str,
        profile_a: &str,
        profile_b: &str,
        since: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM votes WHERE voter_id = $1 AND created_at > $4 AND ((winner_id = $2 AND loser_id = $3) OR (winner_id = $3 AND loser_id = $2)))",
        )
        .bind(voter_id)
        .bind(profile_a)
        .bind(profile_b)
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to check recent votes");
            AppError::DatabaseError(e.to_string())
        })
    }
}
