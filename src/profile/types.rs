use serde::{Deserialize, Serialize};

use super::models::Profile;
use crate::rating::Volatility;

/// Request payload for creating a new profile
#[derive(Debug, Deserialize)]
pub struct CreateProfileRequest {
    pub display_name: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Query string for the leaderboard
#[derive(Debug, Default, Deserialize)]
pub struct RankingsQuery {
    pub limit: Option<usize>,
}

/// Public view of a profile
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProfileResponse {
    pub id: String,
    pub display_name: String,
    pub image_url: Option<String>,
    pub score: i32,
    pub experience_count: i32,
    pub volatility: Volatility,
}

impl From<Profile> for ProfileResponse {
    fn from(profile: Profile) -> Self {
        let volatility = profile.rating_input().volatility();
        Self {
            id: profile.id,
            display_name: profile.display_name,
            image_url: profile.image_url,
            score: profile.score,
            experience_count: profile.experience_count,
            volatility,
        }
    }
}

/// One leaderboard row, rank is 1-based
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankingEntry {
    pub rank: usize,
    pub profile: ProfileResponse,
}
