use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::{
    models::Profile,
    repository::ProfileRepository,
    types::{CreateProfileRequest, ProfileResponse, RankingEntry},
};
use crate::shared::AppError;

/// Leaderboard size when the caller does not ask for one
pub const DEFAULT_RANKINGS_LIMIT: usize = 100;
/// Upper bound on a single leaderboard read
pub const MAX_RANKINGS_LIMIT: usize = 500;

const MAX_DISPLAY_NAME_LEN: usize = 80;

/// Service for profile identity operations and leaderboard reads
pub struct ProfileService {
    repository: Arc<dyn ProfileRepository + Send + Sync>,
}

impl ProfileService {
    pub fn new(repository: Arc<dyn ProfileRepository + Send + Sync>) -> Self {
        Self { repository }
    }

    /// Creates a profile at the initial score
    #[instrument(skip(self))]
    pub async fn create_profile(
        &self,
        request: CreateProfileRequest,
    ) -> Result<ProfileResponse, AppError> {
        let display_name = request.display_name.trim().to_string();
        if display_name.is_empty() {
            return Err(AppError::Validation(
                "display_name must not be empty".to_string(),
            ));
        }
        if display_name.chars().count() > MAX_DISPLAY_NAME_LEN {
            return Err(AppError::Validation(format!(
                "display_name must be at most {} characters",
                MAX_DISPLAY_NAME_LEN
            )));
        }

        let image_url = request
            .image_url
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());

        let profile = Profile::new(display_name, image_url);
        self.repository.create_profile(&profile).await?;

        info!(profile_id = %profile.id, "Profile created");
        Ok(profile.into())
    }

    #[instrument(skip(self))]
    pub async fn get_profile(&self, profile_id: &str) -> Result<ProfileResponse, AppError> {
        self.repository
            .get_profile(profile_id)
            .await?
            .map(ProfileResponse::from)
            .ok_or_else(|| AppError::NotFound(format!("Profile {} not found", profile_id)))
    }

    /// Highest scoring profiles, clamped to [`MAX_RANKINGS_LIMIT`]
    #[instrument(skip(self))]
    pub async fn rankings(&self, limit: Option<usize>) -> Result<Vec<RankingEntry>, AppError> {
        let limit = limit
            .unwrap_or(DEFAULT_RANKINGS_LIMIT)
            .clamp(1, MAX_RANKINGS_LIMIT);
        debug!(limit, "Fetching rankings");

        let profiles = self.repository.top_profiles(limit).await?;

        Ok(profiles
            .into_iter()
            .enumerate()
            .map(|(index, profile)| RankingEntry {
                rank: index + 1,
                profile: profile.into(),
            })
            .collect())
    }
}
