//! Priority invariant: exactly one valid player holds priority.

use super::Invariant;
use crate::GameState;

/// Invariant: the mover index names an existing city.
pub struct MoverInRangeInvariant;

impl Invariant<GameState> for MoverInRangeInvariant {
    fn holds(state: &GameState) -> bool {
        *state.mover() < state.cities().len()
    }

    fn description() -> &'static str {
        "Priority is held by an existing player"
    }
}
