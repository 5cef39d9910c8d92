use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::{info, instrument};

use super::{
    service::ProfileService,
    types::{CreateProfileRequest, ProfileResponse, RankingEntry, RankingsQuery},
};
use crate::shared::{AppError, AppState};

/// HTTP handler for creating a new profile
///
/// POST /profiles
#[instrument(name = "create_profile", skip(state))]
pub async fn create_profile(
    State(state): State<AppState>,
    Json(request): Json<CreateProfileRequest>,
) -> Result<(StatusCode, Json<ProfileResponse>), AppError> {
    let service = ProfileService::new(Arc::clone(&state.profile_repository));
    let profile = service.create_profile(request).await?;

    Ok((StatusCode::CREATED, Json(profile)))
}

/// GET /profiles/:id
#[instrument(name = "get_profile", skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    Path(profile_id): Path<String>,
) -> Result<Json<ProfileResponse>, AppError> {
    let service = ProfileService::new(Arc::clone(&state.profile_repository));
    Ok(Json(service.get_profile(&profile_id).await?))
}

/// HTTP handler for the leaderboard
///
/// GET /rankings?limit=N
/// Returns profiles ordered by score, highest first
#[instrument(name = "list_rankings", skip(state))]
pub async fn list_rankings(
    State(state): State<AppState>,
    Query(query): Query<RankingsQuery>,
) -> Result<Json<Vec<RankingEntry>>, AppError> {
    let service = ProfileService::new(Arc::clone(&state.profile_repository));
    let rankings = service.rankings(query.limit).await?;

    info!(count = rankings.len(), "Rankings listed");
    Ok(Json(rankings))
}
