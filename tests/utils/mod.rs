pub mod actions;
pub mod mocks;
pub mod setup;

// Re-export main utilities for use by test files
#[allow(unused_imports)]
pub use actions::{get_json, post_json};
#[allow(unused_imports)]
pub use mocks::{FlakyProfileRepository, FlakyVoteRepository};
#[allow(unused_imports)]
pub use setup::{TestSetup, TestSetupBuilder};
