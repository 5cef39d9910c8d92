use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::rating::{RatingInput, INITIAL_SCORE, MIN_SCORE};
use crate::shared::AppError;

/// A ranked entity. Only the aggregation pipeline changes `score` and
/// `experience_count`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String, // UUID v4 as string
    pub display_name: String,
    pub image_url: Option<String>,
    pub score: i32,
    pub experience_count: i32, // Votes this profile took part in, as winner or loser
    pub created_at: DateTime<Utc>,
}

impl Profile {
    /// Creates a new profile at the starting score with no experience
    pub fn new(display_name: String, image_url: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            display_name,
            image_url,
            score: INITIAL_SCORE,
            experience_count: 0,
            created_at: Utc::now(),
        }
    }

    pub fn rating_input(&self) -> RatingInput {
        RatingInput::new(self.score, self.experience_count)
    }

    /// Applies a relative update, never letting the score fall below the floor
    pub fn apply_delta(&mut self, delta: &ProfileDelta) {
        self.score = MIN_SCORE.max(self.score + delta.score_delta);
        self.experience_count += delta.experience_delta;
    }
}

/// Raw `profiles` row as read from PostgreSQL
#[derive(Debug, Clone, FromRow)]
pub struct ProfileRow {
    pub id: String,
    pub display_name: String,
    pub image_url: Option<String>,
    pub score: i32,
    pub experience_count: i32,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = AppError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        if row.score < MIN_SCORE {
            return Err(AppError::DatabaseError(format!(
                "profile {} has score {} below floor {}",
                row.id, row.score, MIN_SCORE
            )));
        }
        if row.experience_count < 0 {
            return Err(AppError::DatabaseError(format!(
                "profile {} has negative experience count {}",
                row.id, row.experience_count
            )));
        }

        Ok(Profile {
            id: row.id,
            display_name: row.display_name,
            image_url: row.image_url,
            score: row.score,
            experience_count: row.experience_count,
            created_at: row.created_at,
        })
    }
}

/// Net change to commit for one profile, relative to its stored value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileDelta {
    pub score_delta: i32,
    pub experience_delta: i32,
}
