// Public API - what other modules can use
pub use errors::AggregationError;
pub use handlers::trigger_aggregation;
pub use pipeline::{replay, AggregationPipeline, Replay, TickReport};
pub use task::{start_aggregation_task, AggregationConfig};
pub use working_set::{ReplayError, WorkingSet};

// Internal modules
mod errors;
mod handlers;
mod pipeline;
mod task;
mod working_set;
