use thiserror::Error;

use crate::shared::AppError;

/// Tick-level failures. Any of these aborts the tick; nothing is sealed unless
/// the profile commit already succeeded.
#[derive(Debug, Error)]
pub enum AggregationError {
    #[error("Failed to fetch pending votes: {0}")]
    Fetch(#[source] AppError),

    #[error("Failed to snapshot profiles: {0}")]
    Snapshot(#[source] AppError),

    #[error("Failed to commit profile deltas: {0}")]
    Commit(#[source] AppError),

    #[error("Profile deltas committed but sealing votes failed: {0}")]
    Seal(#[source] AppError),

    #[error("An aggregation tick is already running")]
    TickInProgress,
}

impl From<AggregationError> for AppError {
    fn from(err: AggregationError) -> Self {
        match err {
            AggregationError::TickInProgress => AppError::Conflict(err.to_string()),
            other => AppError::DatabaseError(other.to_string()),
        }
    }
}
