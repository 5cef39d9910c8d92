// Library crate for the cloutscore rating service
// This file exposes the public API for the binary and integration tests

pub mod aggregation;
pub mod config;
pub mod profile;
pub mod rating;
pub mod shared;
pub mod vote;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

// Re-export commonly used types for easier access in tests
pub use aggregation::{AggregationError, AggregationPipeline, TickReport};
pub use config::AppConfig;
pub use profile::{models::Profile, repository::ProfileRepository};
pub use rating::{compute_outcome, precompute, RatingInput, RatingOutcome, MIN_SCORE};
pub use shared::{AppError, AppState};
pub use vote::{repository::VoteRepository, NewVote, VoteEvent, VoteStatus};

/// Builds the HTTP router over the given state
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "cloutscore" }))
        .route("/profiles", post(profile::create_profile))
        .route("/profiles/:id", get(profile::get_profile))
        .route("/rankings", get(profile::list_rankings))
        .route("/votes", post(vote::submit_vote))
        .route("/votes/:id", get(vote::get_vote))
        .route("/pairings", get(vote::list_pairings))
        .route("/admin/aggregate", post(aggregation::trigger_aggregation))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
