use serde::{Deserialize, Serialize};

use super::{compute_outcome, RatingInput, RatingOutcome};

/// Both possible results of a pairing, computed before the voter chooses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairingOutcomes {
    pub if_a_wins: RatingOutcome,
    pub if_b_wins: RatingOutcome,
}

/// Precomputes the score swing for either choice.
///
/// Display only: the aggregation pipeline recomputes against authoritative
/// state, so these numbers can differ from what is eventually committed.
pub fn precompute(a: RatingInput, b: RatingInput) -> PairingOutcomes {
    PairingOutcomes {
        if_a_wins: compute_outcome(a, b),
        if_b_wins: compute_outcome(b, a),
    }
}
