//! Deterministic combat resolution.

use crate::action::PlayerIndex;
use crate::state::GameState;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Resources a winning attacker takes from the defender, capped by the defender's balance.
pub const PLUNDER: u32 = 5;

/// Resources a repelled attacker loses, capped by its balance.
pub const FAILED_ATTACK_LOSS: u32 = 3;

/// Result of one attack, computed before any state changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatReport {
    /// Attacking player.
    pub attacker: PlayerIndex,
    /// Defending player.
    pub defender: PlayerIndex,
    /// Sum of count times attack over the attacker's roster.
    pub attacker_power: u64,
    /// Sum of count times attack over the defender's roster.
    pub defender_power: u64,
    /// Resources moved by the outcome: plunder taken from the defender when the
    /// attacker wins, resources the attacker loses otherwise.
    pub resources: u32,
}

impl CombatReport {
    /// Ties go to the defender.
    pub fn attacker_wins(&self) -> bool {
        self.attacker_power > self.defender_power
    }

    /// Winning player.
    pub fn winner(&self) -> PlayerIndex {
        if self.attacker_wins() {
            self.attacker
        } else {
            self.defender
        }
    }

    /// Losing player, whose whole roster is removed.
    pub fn loser(&self) -> PlayerIndex {
        if self.attacker_wins() {
            self.defender
        } else {
            self.attacker
        }
    }
}

/// Compares aggregate attack of two cities. Returns `None` for unknown indices.
#[instrument(skip(state))]
pub fn resolve_combat(
    state: &GameState,
    attacker: PlayerIndex,
    defender: PlayerIndex,
) -> Option<CombatReport> {
    let config = state.config();
    let attacking = state.city(attacker)?;
    let defending = state.city(defender)?;

    let mut report = CombatReport {
        attacker,
        defender,
        attacker_power: attacking.attack_power(config),
        defender_power: defending.attack_power(config),
        resources: 0,
    };
    report.resources = if report.attacker_wins() {
        PLUNDER.min(*defending.resources())
    } else {
        FAILED_ATTACK_LOSS.min(*attacking.resources())
    };
    Some(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GameConfig;
    use std::sync::Arc;

    fn armed(attacker_units: u32, defender_units: u32) -> GameState {
        let mut state = GameState::new(Arc::new(GameConfig::default()));
        for _ in 0..attacker_units {
            state.city_mut(0).unwrap().start_recruitment("Warrior".into(), 0);
        }
        for _ in 0..defender_units {
            state.city_mut(1).unwrap().start_recruitment("Warrior".into(), 0);
        }
        state
    }

    #[test]
    fn test_stronger_attacker_wins() {
        let report = resolve_combat(&armed(5, 3), 0, 1).unwrap();
        assert_eq!(report.attacker_power, 5);
        assert_eq!(report.defender_power, 3);
        assert!(report.attacker_wins());
        assert_eq!(report.loser(), 1);
        assert_eq!(report.resources, PLUNDER);
    }

    #[test]
    fn test_tie_goes_to_defender() {
        let report = resolve_combat(&armed(2, 2), 0, 1).unwrap();
        assert!(!report.attacker_wins());
        assert_eq!(report.winner(), 1);
        assert_eq!(report.resources, FAILED_ATTACK_LOSS);
    }

    #[test]
    fn test_unknown_player() {
        assert!(resolve_combat(&armed(1, 0), 0, 7).is_none());
    }
}
