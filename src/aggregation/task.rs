use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, instrument, warn};

use super::errors::AggregationError;
use super::pipeline::{AggregationPipeline, TickReport};

/// Configuration for the aggregation task
#[derive(Debug, Clone)]
pub struct AggregationConfig {
    /// How often pending votes are folded into scores
    pub tick_interval: Duration,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(5 * 60), // 5 minutes
        }
    }
}

/// Starts the background task that periodically aggregates pending votes.
/// The first tick fires immediately, draining anything left from a previous run.
#[instrument(skip(pipeline))]
pub async fn start_aggregation_task(pipeline: Arc<AggregationPipeline>, config: AggregationConfig) {
    info!(
        tick_interval_secs = config.tick_interval.as_secs(),
        "Starting vote aggregation background task"
    );

    let mut tick_interval = interval(config.tick_interval);
    tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tick_interval.tick().await;
        run_scheduled_tick(&pipeline).await;
    }
}

/// Runs one tick and logs the outcome. Failures never stop the schedule.
async fn run_scheduled_tick(pipeline: &AggregationPipeline) -> Option<TickReport> {
    match pipeline.run_tick().await {
        Ok(report) => {
            info!(
                votes_fetched = report.votes_fetched,
                votes_sealed = report.votes_sealed,
                "Scheduled aggregation completed"
            );
            Some(report)
        }
        Err(AggregationError::TickInProgress) => {
            warn!("Previous aggregation still running, skipping this tick");
            None
        }
        Err(e) => {
            error!(error = %e, "Scheduled aggregation failed");
            None
        }
    }
}
