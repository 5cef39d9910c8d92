use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

use crate::aggregation::AggregationPipeline;
use crate::config::AppConfig;
use crate::profile::repository::ProfileRepository;
use crate::vote::repository::VoteRepository;

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub profile_repository: Arc<dyn ProfileRepository + Send + Sync>,
    pub vote_repository: Arc<dyn VoteRepository + Send + Sync>,
    pub pipeline: Arc<AggregationPipeline>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(
        profile_repository: Arc<dyn ProfileRepository + Send + Sync>,
        vote_repository: Arc<dyn VoteRepository + Send + Sync>,
        config: AppConfig,
    ) -> Self {
        let pipeline = Arc::new(AggregationPipeline::new(
            Arc::clone(&profile_repository),
            Arc::clone(&vote_repository),
        ));

        Self {
            profile_repository,
            vote_repository,
            pipeline,
            config: Arc::new(config),
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::DatabaseError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {}", msg),
            ),
        };

        let body = Json(json!({
            "error": error_message
        }));

        (status, body).into_response()
    }
}
