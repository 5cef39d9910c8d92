use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::{info, instrument};

use super::{
    service::VoteService,
    types::{PairingResponse, PairingsQuery, SubmitVoteRequest, VoteResponse},
};
use crate::shared::{AppError, AppState};

fn vote_service(state: &AppState) -> VoteService {
    VoteService::new(
        Arc::clone(&state.profile_repository),
        Arc::clone(&state.vote_repository),
        state.config.vote_dedup_window,
    )
}

/// HTTP handler for submitting a vote
///
/// POST /votes
/// Returns 202 as soon as the vote is in the log; scores update on a later tick
#[instrument(name = "submit_vote", skip(state))]
pub async fn submit_vote(
    State(state): State<AppState>,
    Json(request): Json<SubmitVoteRequest>,
) -> Result<(StatusCode, Json<VoteResponse>), AppError> {
    let vote = vote_service(&state).submit_vote(request).await?;
    Ok((StatusCode::ACCEPTED, Json(vote)))
}

/// GET /votes/:id
#[instrument(name = "get_vote", skip(state))]
pub async fn get_vote(
    State(state): State<AppState>,
    Path(vote_id): Path<String>,
) -> Result<Json<VoteResponse>, AppError> {
    Ok(Json(vote_service(&state).get_vote(&vote_id).await?))
}

/// HTTP handler for fetching pairs to vote on
///
/// GET /pairings?count=N&exclude=<profile id>
#[instrument(name = "list_pairings", skip(state))]
pub async fn list_pairings(
    State(state): State<AppState>,
    Query(query): Query<PairingsQuery>,
) -> Result<Json<Vec<PairingResponse>>, AppError> {
    let count = query.count.unwrap_or(state.config.pairing_batch_size);
    let pairings = vote_service(&state)
        .pairings(count, query.exclude.as_deref())
        .await?;

    info!(count = pairings.len(), "Pairings drawn");
    Ok(Json(pairings))
}
