//! Capacity invariants: no city exceeds its building slots or unit capacity.

use super::Invariant;
use crate::GameState;

/// Invariant: completed buildings plus constructions fit in the building slots.
pub struct BuildingSlotsInvariant;

impl Invariant<GameState> for BuildingSlotsInvariant {
    fn holds(state: &GameState) -> bool {
        state
            .cities()
            .iter()
            .all(|city| city.used_building_slots(state.config()) <= *city.building_slots())
    }

    fn description() -> &'static str {
        "Used building slots never exceed capacity"
    }
}

/// Invariant: units plus pending recruitments fit in the unit capacity.
pub struct UnitCapacityInvariant;

impl Invariant<GameState> for UnitCapacityInvariant {
    fn holds(state: &GameState) -> bool {
        state
            .cities()
            .iter()
            .all(|city| city.used_unit_slots() <= *city.unit_slots())
    }

    fn description() -> &'static str {
        "Units and recruitments never exceed unit capacity"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GameConfig;
    use std::sync::Arc;

    #[test]
    fn test_full_roster_holds() {
        let mut state = GameState::new(Arc::new(GameConfig::default()));
        let city = state.city_mut(1).unwrap();
        for _ in 0..10 {
            city.start_recruitment("Warrior".into(), 0);
        }
        assert!(UnitCapacityInvariant::holds(&state));

        state.city_mut(1).unwrap().start_recruitment("Warrior".into(), 3);
        assert!(!UnitCapacityInvariant::holds(&state));
    }
}
