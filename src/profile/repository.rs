use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use super::models::{Profile, ProfileDelta, ProfileRow};
use crate::rating::MIN_SCORE;
use crate::shared::AppError;

/// Trait for profile repository operations
#[async_trait]
pub trait ProfileRepository {
    async fn create_profile(&self, profile: &Profile) -> Result<(), AppError>;
    async fn get_profile(&self, profile_id: &str) -> Result<Option<Profile>, AppError>;
    async fn list_profiles(&self) -> Result<Vec<Profile>, AppError>;

    /// Highest scoring profiles first
    async fn top_profiles(&self, limit: usize) -> Result<Vec<Profile>, AppError>;

    /// Atomically applies relative score and experience increments.
    /// Either every delta is applied or none is; an unknown profile id fails the whole commit.
    async fn apply_deltas(&self, deltas: &BTreeMap<String, ProfileDelta>) -> Result<(), AppError>;
}

/// In-memory implementation of ProfileRepository for development and testing
#[derive(Debug, Default)]
pub struct InMemoryProfileRepository {
    profiles: RwLock<HashMap<String, Profile>>,
}

impl InMemoryProfileRepository {
    /// Creates a new empty in-memory repository
    pub fn new() -> Self {
        Self {
            profiles: RwLock::new(HashMap::new()),
        }
    }

    /// Creates an in-memory repository with pre-populated profiles
    pub fn with_profiles(profiles: Vec<Profile>) -> Self {
        let profile_map = profiles
            .into_iter()
            .map(|profile| (profile.id.clone(), profile))
            .collect();

        Self {
            profiles: RwLock::new(profile_map),
        }
    }

    pub async fn profile_count(&self) -> usize {
        self.profiles.read().await.len()
    }
}

#[async_trait]
impl ProfileRepository for InMemoryProfileRepository {
    #[instrument(skip(self, profile))]
    async fn create_profile(&self, profile: &Profile) -> Result<(), AppError> {
        debug!(profile_id = %profile.id, "Creating profile in memory");

        let mut profiles = self.profiles.write().await;
        if profiles.contains_key(&profile.id) {
            warn!(profile_id = %profile.id, "Profile already exists in memory");
            return Err(AppError::Conflict("Profile already exists".to_string()));
        }
        profiles.insert(profile.id.clone(), profile.clone());

        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_profile(&self, profile_id: &str) -> Result<Option<Profile>, AppError> {
        let profiles = self.profiles.read().await;
        let profile = profiles.get(profile_id).cloned();

        if profile.is_none() {
            debug!(profile_id = %profile_id, "Profile not found in memory");
        }

        Ok(profile)
    }

    #[instrument(skip(self))]
    async fn list_profiles(&self) -> Result<Vec<Profile>, AppError> {
        let profiles = self.profiles.read().await;
        Ok(profiles.values().cloned().collect())
    }

    #[instrument(skip(self))]
    async fn top_profiles(&self, limit: usize) -> Result<Vec<Profile>, AppError> {
        let profiles = self.profiles.read().await;
        let mut ranked: Vec<Profile> = profiles.values().cloned().collect();
        ranked.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
        ranked.truncate(limit);
        Ok(ranked)
    }

    #[instrument(skip(self, deltas), fields(profile_count = deltas.len()))]
    async fn apply_deltas(&self, deltas: &BTreeMap<String, ProfileDelta>) -> Result<(), AppError> {
        let mut profiles = self.profiles.write().await;

        // Validate everything before touching anything so the commit stays all-or-nothing
        if let Some(missing) = deltas.keys().find(|id| !profiles.contains_key(*id)) {
            warn!(profile_id = %missing, "Delta references unknown profile, aborting commit");
            return Err(AppError::NotFound(format!("Profile {} not found", missing)));
        }

        for (profile_id, delta) in deltas {
            if let Some(profile) = profiles.get_mut(profile_id) {
                profile.apply_delta(delta);
            }
        }

        info!(profile_count = deltas.len(), "Applied profile deltas in memory");
        Ok(())
    }
}

/// PostgreSQL implementation of profile repository
pub struct PostgresProfileRepository {
    pool: PgPool,
}

impl PostgresProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const PROFILE_COLUMNS: &str = "id, display_name, image_url, score, experience_count, created_at";

#[async_trait]
impl ProfileRepository for PostgresProfileRepository {
    #[instrument(skip(self, profile))]
    async fn create_profile(&self, profile: &Profile) -> Result<(), AppError> {
        debug!(profile_id = %profile.id, "Creating profile in database");

        sqlx::query(
            "INSERT INTO profiles (id, display_name, image_url, score, experience_count, created_at) VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(&profile.id)
        .bind(&profile.display_name)
        .bind(&profile.image_url)
        .bind(profile.score)
        .bind(profile.experience_count)
        .bind(profile.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to create profile in database");
            AppError::DatabaseError(e.to_string())
        })?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_profile(&self, profile_id: &str) -> Result<Option<Profile>, AppError> {
        let row: Option<ProfileRow> = sqlx::query_as(&format!(
            "SELECT {} FROM profiles WHERE id = $1",
            PROFILE_COLUMNS
        ))
        .bind(profile_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, profile_id = %profile_id, "Failed to fetch profile from database");
            AppError::DatabaseError(e.to_string())
        })?;

        row.map(Profile::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn list_profiles(&self) -> Result<Vec<Profile>, AppError> {
        let rows: Vec<ProfileRow> =
            sqlx::query_as(&format!("SELECT {} FROM profiles", PROFILE_COLUMNS))
                .fetch_all(&self.pool)
                .await
                .map_err(|e| {
                    warn!(error = %e, "Failed to list profiles from database");
                    AppError::DatabaseError(e.to_string())
                })?;

        rows.into_iter().map(Profile::try_from).collect()
    }

    #[instrument(skip(self))]
    async fn top_profiles(&self, limit: usize) -> Result<Vec<Profile>, AppError> {
        let rows: Vec<ProfileRow> = sqlx::query_as(&format!(
            "SELECT {} FROM profiles ORDER BY score DESC, id ASC LIMIT $1",
            PROFILE_COLUMNS
        ))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to fetch rankings from database");
            AppError::DatabaseError(e.to_string())
        })?;

        rows.into_iter().map(Profile::try_from).collect()
    }

    #[instrument(skip(self, deltas), fields(profile_count = deltas.len()))]
    async fn apply_deltas(&self, deltas: &BTreeMap<String, ProfileDelta>) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            warn!(error = %e, "Failed to open profile delta transaction");
            AppError::DatabaseError(e.to_string())
        })?;

        for (profile_id, delta) in deltas {
            // Increments are relative to whatever is stored at commit time, not the snapshot
            let result = sqlx::query(
                "UPDATE profiles SET score = GREATEST(score + $2, $4), experience_count = experience_count + $3 WHERE id = $1",
            )
            .bind(profile_id)
            .bind(delta.score_delta)
            .bind(delta.experience_delta)
            .bind(MIN_SCORE)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                warn!(error = %e, profile_id = %profile_id, "Failed to apply profile delta");
                AppError::DatabaseError(e.to_string())
            })?;

            if result.rows_affected() == 0 {
                // Dropping `tx` without committing rolls back everything applied so far
                warn!(profile_id = %profile_id, "Delta references unknown profile, aborting commit");
                return Err(AppError::NotFound(format!("Profile {} not found", profile_id)));
            }
        }

        tx.commit().await.map_err(|e| {
            warn!(error = %e, "Failed to commit profile delta transaction");
            AppError::DatabaseError(e.to_string())
        })?;

        info!(profile_count = deltas.len(), "Applied profile deltas in database");
        Ok(())
    }
}
