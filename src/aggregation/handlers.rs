use axum::{extract::State, Json};
use tracing::{info, instrument};

use super::pipeline::TickReport;
use crate::shared::{AppError, AppState};

/// HTTP handler for running an aggregation tick on demand
///
/// POST /admin/aggregate
/// Returns 409 when a tick is already running
#[instrument(name = "trigger_aggregation", skip(state))]
pub async fn trigger_aggregation(State(state): State<AppState>) -> Result<Json<TickReport>, AppError> {
    let report = state.pipeline.run_tick().await?;

    info!(
        votes_applied = report.votes_applied,
        profiles_updated = report.profiles_updated,
        "Manual aggregation completed"
    );
    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::repository::{InMemoryProfileRepository, ProfileRepository};
    use crate::shared::test_utils::{profile_with, AppStateBuilder};
    use crate::vote::repository::{InMemoryVoteRepository, VoteRepository};
    use crate::vote::NewVote;
    use axum::{body::Body, http::Request, http::StatusCode, routing::post, Router};
    use std::sync::Arc;
    use tower::ServiceExt; // for `oneshot`

    fn aggregate_request() -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/admin/aggregate")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_trigger_aggregation_handler() {
        let profiles = Arc::new(InMemoryProfileRepository::with_profiles(vec![
            profile_with("a", 1000, 0),
            profile_with("b", 1000, 0),
        ]));
        let votes = Arc::new(InMemoryVoteRepository::new());
        votes
            .append_vote(NewVote {
                winner_id: "a".to_string(),
                loser_id: "b".to_string(),
                voter_id: "voter".to_string(),
            })
            .await
            .unwrap();

        let state = AppStateBuilder::new()
            .with_profile_repository(profiles.clone())
            .with_vote_repository(votes.clone())
            .build();
        let app = Router::new()
            .route("/admin/aggregate", post(trigger_aggregation))
            .with_state(state);

        let response = app.oneshot(aggregate_request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let report: TickReport = serde_json::from_slice(&body).unwrap();
        assert_eq!(report.votes_applied, 1);
        assert_eq!(report.profiles_updated, 2);

        let winner = profiles.get_profile("a").await.unwrap().unwrap();
        assert_eq!(winner.score, 1050);
    }

    #[tokio::test]
    async fn test_trigger_aggregation_handler_with_nothing_pending() {
        let state = AppStateBuilder::new().build();
        let app = Router::new()
            .route("/admin/aggregate", post(trigger_aggregation))
            .with_state(state);

        let response = app.oneshot(aggregate_request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let report: TickReport = serde_json::from_slice(&body).unwrap();
        assert_eq!(report.votes_fetched, 0);
    }
}
