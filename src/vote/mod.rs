// Public API - what other modules can use
pub use errors::VoteError;
pub use handlers::{get_vote, list_pairings, submit_vote};
pub use models::{NewVote, VoteEvent, VoteStatus};

// Internal modules
mod errors;
mod handlers;
pub mod models;
pub mod repository;
pub mod service;
pub mod types;
