//! Serializable read-only views of the game state.
//!
//! Snapshots are what decision sources and front ends see. They are plain data,
//! detached from the live state, and serialize to one JSON object per line in
//! headless mode.

use crate::action::{Action, PlayerIndex};
use crate::config::PlayerKind;
use crate::rules::Outcome;
use crate::state::{City, GameState};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-player summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSummary {
    /// City name.
    pub name: String,
    /// Controller.
    pub kind: PlayerKind,
    /// Current balance.
    pub resources: u32,
    /// Cumulative Build and Hire spending.
    pub resources_spent: u64,
    /// Completed buildings by id, with counts.
    pub buildings: BTreeMap<String, u32>,
    /// Unit roster by id.
    pub units: BTreeMap<String, u32>,
    /// Buildings under construction with turn starts remaining.
    pub constructions: Vec<(String, u32)>,
    /// Units being recruited with turn starts remaining.
    pub recruitments: Vec<(String, u32)>,
    /// Unused building slots.
    pub free_building_slots: u32,
    /// Unused unit capacity.
    pub free_unit_slots: u32,
    /// Aggregate attack of the roster.
    pub attack_power: u64,
}

/// Snapshot of the whole match after a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnSnapshot {
    /// Turn counter.
    pub turn: u32,
    /// Player holding priority.
    pub player_turn: PlayerIndex,
    /// Match seed.
    pub seed: String,
    /// Players in turn order.
    pub players: Vec<PlayerSummary>,
    /// Player that acted last, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_actor: Option<PlayerIndex>,
    /// Canonical text of the action applied last, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_action: Option<String>,
    /// Final outcome once the match is over.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
}

impl TurnSnapshot {
    /// Captures the current state.
    pub fn capture(state: &GameState) -> Self {
        Self {
            turn: *state.turn(),
            player_turn: *state.mover(),
            seed: state.seed().to_string(),
            players: state
                .cities()
                .iter()
                .map(|city| summarize(city, state))
                .collect(),
            last_actor: None,
            last_action: None,
            outcome: None,
        }
    }

    /// Records the action that produced this snapshot.
    pub fn with_last_action(mut self, actor: PlayerIndex, action: &Action) -> Self {
        self.last_actor = Some(actor);
        self.last_action = Some(action.to_string());
        self
    }

    /// Records the match outcome.
    pub fn with_outcome(mut self, outcome: Option<Outcome>) -> Self {
        self.outcome = outcome;
        self
    }

    /// Name of a player, or `?` for an unknown index.
    pub fn player_name(&self, player: PlayerIndex) -> &str {
        self.players
            .get(player)
            .map(|p| p.name.as_str())
            .unwrap_or("?")
    }

    /// Summary of the player holding priority.
    pub fn mover(&self) -> Option<&PlayerSummary> {
        self.players.get(self.player_turn)
    }
}

fn summarize(city: &City, state: &GameState) -> PlayerSummary {
    let config = state.config();

    let mut buildings = BTreeMap::new();
    for id in city.buildings() {
        *buildings.entry(id.clone()).or_insert(0) += 1;
    }

    PlayerSummary {
        name: city.name().clone(),
        kind: *city.kind(),
        resources: *city.resources(),
        resources_spent: *city.resources_spent(),
        buildings,
        units: city.units().clone(),
        constructions: city
            .constructions()
            .iter()
            .map(|c| (c.building().clone(), *c.remaining()))
            .collect(),
        recruitments: city
            .recruitments()
            .iter()
            .map(|r| (r.unit().clone(), *r.remaining()))
            .collect(),
        free_building_slots: city
            .building_slots()
            .saturating_sub(city.used_building_slots(config)),
        free_unit_slots: city.unit_slots().saturating_sub(city.used_unit_slots()),
        attack_power: city.attack_power(config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GameConfig;
    use std::sync::Arc;

    #[test]
    fn test_capture_opening_state() {
        let state = GameState::new(Arc::new(GameConfig::default()));
        let snapshot = TurnSnapshot::capture(&state);
        assert_eq!(snapshot.turn, 1);
        assert_eq!(snapshot.player_turn, 0);
        assert_eq!(snapshot.seed, "pokemon");
        assert_eq!(snapshot.player_name(1), "IA");
        assert_eq!(snapshot.players[0].free_building_slots, 5);
        assert_eq!(snapshot.players[0].free_unit_slots, 10);
    }

    #[test]
    fn test_json_shape() {
        let state = GameState::new(Arc::new(GameConfig::default()));
        let snapshot = TurnSnapshot::capture(&state).with_last_action(0, &Action::EndTurn);
        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["turn"], 1);
        assert_eq!(value["players"][0]["name"], "Player");
        assert_eq!(value["players"][1]["kind"], "ai");
        assert_eq!(value["last_action"], "end");
        assert_eq!(value["last_actor"], 0);
        assert!(value.get("outcome").is_none());
    }
}
