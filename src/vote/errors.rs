use thiserror::Error;

use crate::shared::AppError;

#[derive(Debug, Error, PartialEq)]
pub enum VoteError {
    #[error("Vote {0} is already sealed")]
    AlreadySealed(String),
}

impl From<VoteError> for AppError {
    fn from(err: VoteError) -> Self {
        match err {
            VoteError::AlreadySealed(_) => AppError::Conflict(err.to_string()),
        }
    }
}
