//! First-class invariants for the game state.
//!
//! Invariants are logical properties that must hold after every applied action.
//! The engine checks them after each transition; they are also testable on their own.

/// A logical property that must hold for a given state.
pub trait Invariant<S> {
    /// Checks if the invariant holds for the given state.
    fn holds(state: &S) -> bool;

    /// Human-readable description of the invariant.
    fn description() -> &'static str;
}

/// Violation of an invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantViolation {
    /// Description of the violated invariant.
    pub description: String,
}

impl InvariantViolation {
    /// Creates a new invariant violation.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }
}

/// A set of invariants that can be checked together.
///
/// Implementations are provided for tuples.
pub trait InvariantSet<S> {
    /// Checks all invariants in the set, collecting every violation.
    fn check_all(state: &S) -> Result<(), Vec<InvariantViolation>>;
}

/// Implements [`InvariantSet`] for a tuple of invariants.
macro_rules! invariant_tuple {
    ($($inv:ident),+) => {
        impl<S, $($inv),+> InvariantSet<S> for ($($inv,)+)
        where
            $($inv: Invariant<S>,)+
        {
            fn check_all(state: &S) -> Result<(), Vec<InvariantViolation>> {
                let violations: Vec<InvariantViolation> = [
                    $(($inv::holds(state), $inv::description()),)+
                ]
                .into_iter()
                .filter(|(holds, _)| !holds)
                .map(|(_, description)| InvariantViolation::new(description))
                .collect();

                if violations.is_empty() {
                    Ok(())
                } else {
                    Err(violations)
                }
            }
        }
    };
}

invariant_tuple!(I1);
invariant_tuple!(I1, I2);
invariant_tuple!(I1, I2, I3);
invariant_tuple!(I1, I2, I3, I4);

pub mod capacity;
pub mod mover;

pub use capacity::{BuildingSlotsInvariant, UnitCapacityInvariant};
pub use mover::MoverInRangeInvariant;

/// All game-state invariants as a composable set.
pub type StateInvariants = (
    BuildingSlotsInvariant,
    UnitCapacityInvariant,
    MoverInRangeInvariant,
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GameConfig, GameState};
    use std::sync::Arc;

    #[test]
    fn test_invariant_set_holds_for_opening_state() {
        let state = GameState::new(Arc::new(GameConfig::default()));
        assert!(StateInvariants::check_all(&state).is_ok());
    }

    #[test]
    fn test_two_invariants_as_set() {
        let state = GameState::new(Arc::new(GameConfig::default()));
        type Capacity = (BuildingSlotsInvariant, UnitCapacityInvariant);
        assert!(Capacity::check_all(&state).is_ok());
    }

    #[test]
    fn test_smaller_sets_compose() {
        let state = GameState::new(Arc::new(GameConfig::default()));
        assert!(<(MoverInRangeInvariant,)>::check_all(&state).is_ok());
        assert!(<(UnitCapacityInvariant, MoverInRangeInvariant)>::check_all(&state).is_ok());
    }

    #[test]
    fn test_invariant_set_detects_violations() {
        let mut state = GameState::new(Arc::new(GameConfig::default()));
        let city = state.city_mut(0).unwrap();
        for _ in 0..6 {
            city.start_construction("Farm".into(), 2);
        }

        let violations = StateInvariants::check_all(&state).unwrap_err();
        assert_eq!(violations.len(), 1);
        assert_eq!(
            violations[0].description,
            BuildingSlotsInvariant::description()
        );
    }
}
