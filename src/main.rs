use cloutscore::{
    aggregation::start_aggregation_task,
    build_router,
    profile::repository::{InMemoryProfileRepository, PostgresProfileRepository},
    vote::repository::{InMemoryVoteRepository, PostgresVoteRepository},
    AppConfig, AppState, ProfileRepository, VoteRepository,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cloutscore=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting cloutscore rating service");

    let config = AppConfig::from_env();

    let (profile_repository, vote_repository): (
        Arc<dyn ProfileRepository + Send + Sync>,
        Arc<dyn VoteRepository + Send + Sync>,
    ) = match &config.database_url {
        Some(database_url) => {
            let pool = sqlx::PgPool::connect(database_url).await?;
            info!("Connected to PostgreSQL");
            (
                Arc::new(PostgresProfileRepository::new(pool.clone())),
                Arc::new(PostgresVoteRepository::new(pool)),
            )
        }
        None => {
            warn!("DATABASE_URL not set, using in-memory stores");
            (
                Arc::new(InMemoryProfileRepository::new()),
                Arc::new(InMemoryVoteRepository::new()),
            )
        }
    };

    let bind_addr = config.bind_addr.clone();
    let aggregation_config = config.aggregation.clone();
    let app_state = AppState::new(profile_repository, vote_repository, config);

    // Start the aggregation task
    tokio::spawn(start_aggregation_task(
        Arc::clone(&app_state.pipeline),
        aggregation_config,
    ));

    let app = build_router(app_state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(bind_addr = %bind_addr, "Server running");
    axum::serve(listener, app).await?;

    Ok(())
}
