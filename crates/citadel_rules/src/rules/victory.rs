//! Victory detection.

use crate::action::PlayerIndex;
use crate::config::VictoryCondition;
use crate::state::GameState;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Outcome of a finished match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "result", content = "player", rename_all = "snake_case")]
pub enum Outcome {
    /// A player reached a victory threshold.
    Winner(PlayerIndex),
    /// The turn limit was reached with no threshold winner.
    Draw,
}

impl Outcome {
    /// Returns the winner if there is one.
    pub fn winner(&self) -> Option<PlayerIndex> {
        match self {
            Outcome::Winner(player) => Some(*player),
            Outcome::Draw => None,
        }
    }

    /// Returns true if the match was a draw.
    pub fn is_draw(&self) -> bool {
        matches!(self, Outcome::Draw)
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Winner(player) => write!(f, "Player {} wins", player),
            Outcome::Draw => write!(f, "Draw"),
        }
    }
}

/// Evaluates the victory predicates in OR fashion.
///
/// A player whose cumulative spending reaches the threshold wins; when several
/// qualify the earliest in turn order wins. Otherwise reaching the turn limit
/// ends the match as a draw.
#[instrument(skip(state, conditions), fields(turn = *state.turn()))]
pub fn check_victory(state: &GameState, conditions: &VictoryCondition) -> Option<Outcome> {
    if let Some(threshold) = conditions.resources_spent()
        && let Some(winner) = state
            .cities()
            .iter()
            .position(|city| city.resources_spent() >= threshold)
    {
        return Some(Outcome::Winner(winner));
    }

    match conditions.nb_turns() {
        Some(limit) if state.turn() >= limit => Some(Outcome::Draw),
        _ => None,
    }
}
