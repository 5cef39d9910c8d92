use std::time::Duration;
use tracing::warn;

use crate::aggregation::AggregationConfig;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_VOTE_DEDUP_WINDOW_SECS: u64 = 5 * 60;
/// Pairs handed out per pairing request, so clients can prefetch
const DEFAULT_PAIRING_BATCH_SIZE: usize = 10;

/// Process configuration, read from the environment
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    /// In-memory stores are used when unset
    pub database_url: Option<String>,
    pub aggregation: AggregationConfig,
    /// A voter may not vote on the same pair twice within this window
    pub vote_dedup_window: Duration,
    pub pairing_batch_size: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            database_url: None,
            aggregation: AggregationConfig::default(),
            vote_dedup_window: Duration::from_secs(DEFAULT_VOTE_DEDUP_WINDOW_SECS),
            pairing_batch_size: DEFAULT_PAIRING_BATCH_SIZE,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. Unparseable numbers fall
    /// back to their defaults with a warning.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let tick_interval = parse_or(
            &lookup,
            "AGGREGATION_INTERVAL_SECS",
            defaults.aggregation.tick_interval.as_secs(),
        );
        let dedup_window = parse_or(
            &lookup,
            "VOTE_DEDUP_WINDOW_SECS",
            defaults.vote_dedup_window.as_secs(),
        );

        Self {
            bind_addr: lookup("BIND_ADDR").unwrap_or(defaults.bind_addr),
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            aggregation: AggregationConfig {
                tick_interval: Duration::from_secs(tick_interval.max(1)),
            },
            vote_dedup_window: Duration::from_secs(dedup_window),
            pairing_batch_size: parse_or(&lookup, "PAIRING_BATCH_SIZE", defaults.pairing_batch_size)
                .max(1),
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + Copy + std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, default = %default, "Invalid config value, using default");
            default
        }),
        None => default,
    }
}
