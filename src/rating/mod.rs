pub mod pairing;

pub use pairing::{precompute, PairingOutcomes};

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

/// Score every profile starts with.
pub const INITIAL_SCORE: i32 = 1000;
/// No profile score may ever drop below this.
pub const MIN_SCORE: i32 = 100;
/// K-factor for profiles that have not yet reached the established threshold.
pub const NEW_PROFILE_CHANGE: i32 = 100;
/// K-factor for established profiles.
pub const ESTABLISHED_PROFILE_CHANGE: i32 = 1;
/// Votes a profile must have participated in to be treated as established.
pub const ESTABLISHED_THRESHOLD: i32 = 100;

/// Rating scale divisor of the Elo logistic curve.
const ELO_SCALE: f64 = 400.0;

/// The slice of profile state the rating function needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingInput {
    pub score: i32,
    pub experience_count: i32,
}

impl RatingInput {
    pub fn new(score: i32, experience_count: i32) -> Self {
        Self {
            score,
            experience_count,
        }
    }

    pub fn volatility(&self) -> Volatility {
        Volatility::for_experience(self.experience_count)
    }

    /// Returns the state after one vote with the given score change applied
    pub fn after_vote(&self, score_change: i32) -> Self {
        Self {
            score: self.score + score_change,
            experience_count: self.experience_count + 1,
        }
    }
}

/// Score change each side receives for one comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingOutcome {
    pub winner_change: i32,
    pub loser_change: i32,
}

/// Experience-based volatility tier controlling the K-factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Volatility {
    New,
    Established,
}

impl Volatility {
    pub fn for_experience(experience_count: i32) -> Self {
        if experience_count < ESTABLISHED_THRESHOLD {
            Volatility::New
        } else {
            Volatility::Established
        }
    }

    pub fn k_factor(&self) -> i32 {
        match self {
            Volatility::New => NEW_PROFILE_CHANGE,
            Volatility::Established => ESTABLISHED_PROFILE_CHANGE,
        }
    }
}

/// Elo probability that `player` beats `opponent`
pub fn expected_score(player_score: i32, opponent_score: i32) -> f64 {
    let exponent = f64::from(opponent_score - player_score) / ELO_SCALE;
    1.0 / (1.0 + 10f64.powf(exponent))
}

/// Computes the score change for both sides of a single win/lose comparison.
///
/// K-factors are chosen per side from each profile's own experience count.
/// Raw changes are rounded once (half-up), then each resulting score is
/// clamped to [`MIN_SCORE`]. The returned changes are the difference between
/// the clamped and the original score, so a profile already sitting at the
/// floor that loses again reports a change of exactly zero.
pub fn compute_outcome(winner: RatingInput, loser: RatingInput) -> RatingOutcome {
    let expected_winner = expected_score(winner.score, loser.score);
    let expected_loser = 1.0 - expected_winner;

    let winner_k = f64::from(winner.volatility().k_factor());
    let loser_k = f64::from(loser.volatility().k_factor());

    let winner_raw = round_half_up(winner_k * (1.0 - expected_winner));
    let loser_raw = round_half_up(loser_k * (0.0 - expected_loser));

    let final_winner_score = MIN_SCORE.max(winner.score + winner_raw);
    let final_loser_score = MIN_SCORE.max(loser.score + loser_raw);

    RatingOutcome {
        winner_change: final_winner_score - winner.score,
        loser_change: final_loser_score - loser.score,
    }
}

// Ties round toward positive infinity, so -50.5 becomes -50 rather than -51.
fn round_half_up(value: f64) -> i32 {
    (value + 0.5).floor() as i32
}
