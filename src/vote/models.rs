use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::errors::VoteError;
use crate::shared::AppError;

/// Lifecycle of a vote event. The only legal transition is `Pending -> Sealed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum VoteStatus {
    Pending,
    Sealed { sealed_at: DateTime<Utc> },
}

/// A vote as submitted, before the store assigns identity and ordering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVote {
    pub winner_id: String,
    pub loser_id: String,
    pub voter_id: String,
}

/// One pairwise outcome in the append-only vote log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteEvent {
    pub id: String,
    /// Store-assigned insertion order; replay follows it
    pub sequence: i64,
    pub winner_id: String,
    pub loser_id: String,
    pub voter_id: String,
    pub created_at: DateTime<Utc>,
    pub status: VoteStatus,
}

impl VoteEvent {
    /// Creates a pending event with a fresh id and the given position in the log
    pub fn pending(vote: NewVote, sequence: i64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sequence,
            winner_id: vote.winner_id,
            loser_id: vote.loser_id,
            voter_id: vote.voter_id,
            created_at: Utc::now(),
            status: VoteStatus::Pending,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.status, VoteStatus::Pending)
    }

    pub fn is_self_match(&self) -> bool {
        self.winner_id == self.loser_id
    }

    /// True when this vote compared the two given profiles, in either direction
    pub fn involves_pair(&self, a: &str, b: &str) -> bool {
        (self.winner_id == a && self.loser_id == b) || (self.winner_id == b && self.loser_id == a)
    }

    /// Seals the event. Sealing twice is an error, a sealed event never reopens.
    pub fn seal(&mut self, sealed_at: DateTime<Utc>) -> Result<(), VoteError> {
        match self.status {
            VoteStatus::Pending => {
                self.status = VoteStatus::Sealed { sealed_at };
                Ok(())
            }
            VoteStatus::Sealed { .. } => Err(VoteError::AlreadySealed(self.id.clone())),
        }
    }
}

/// Raw `votes` row as read from PostgreSQL
#[derive(Debug, Clone, FromRow)]
pub struct VoteRow {
    pub id: String,
    pub sequence: i64,
    pub winner_id: String,
    pub loser_id: String,
    pub voter_id: String,
    pub created_at: DateTime<Utc>,
    pub processed: bool,
    pub processed_at: Option<DateTime<Utc>>,
}

impl TryFrom<VoteRow> for VoteEvent {
    type Error = AppError;

    fn try_from(row: VoteRow) -> Result<Self, Self::Error> {
        let status = match (row.processed, row.processed_at) {
            (false, None) => VoteStatus::Pending,
            (true, Some(sealed_at)) => VoteStatus::Sealed { sealed_at },
            (processed, processed_at) => {
                return Err(AppError::DatabaseError(format!(
                    "vote {} has inconsistent state: processed={} processed_at={:?}",
                    row.id, processed, processed_at
                )))
            }
        };

        Ok(VoteEvent {
            id: row.id,
            sequence: row.sequence,
            winner_id: row.winner_id,
            loser_id: row.loser_id,
            voter_id: row.voter_id,
            created_at: row.created_at,
            status,
        })
    }
}
