//! Prompt text for the language-model AI.

use citadel_rules::{Action, PlayerIndex, PlayerSummary, TurnSnapshot};
use std::fmt::Write;

/// Standing instructions sent with every request.
pub const SYSTEM_PROMPT: &str = "You are playing a turn-based city-building strategy game. \
Each turn you may take several actions, then end your turn. \
Buildings cost resources and take turns to complete; farms produce resources, barracks train units. \
Attacking compares total attack: the stronger side wins and the loser loses all its units. \
The first player to spend enough resources wins. \
Reply with exactly one command on a single line and nothing else: \
`build <building>`, `hire <unit>`, `attack <city>` or `end`.";

/// Renders the per-decision message for `player`.
pub fn render_prompt(player: PlayerIndex, legal: &[Action], view: &TurnSnapshot) -> String {
    let mut text = String::new();
    let _ = writeln!(text, "Turn {}. You are {}.", view.turn, view.player_name(player));

    if let Some(me) = view.players.get(player) {
        let _ = writeln!(text);
        let _ = writeln!(text, "Your city:");
        describe(&mut text, me);
    }

    let others: Vec<&PlayerSummary> = view
        .players
        .iter()
        .enumerate()
        .filter(|(idx, _)| *idx != player)
        .map(|(_, p)| p)
        .collect();
    if !others.is_empty() {
        let _ = writeln!(text);
        let _ = writeln!(text, "Other cities:");
        for other in others {
            let _ = writeln!(
                text,
                "- {}: {} resources, attack {}",
                other.name, other.resources, other.attack_power
            );
        }
    }

    let _ = writeln!(text);
    let _ = writeln!(text, "Legal commands:");
    for action in legal {
        let _ = writeln!(text, "- {}", action);
    }
    text
}

fn describe(text: &mut String, me: &PlayerSummary) {
    let _ = writeln!(
        text,
        "- resources: {} (spent {})",
        me.resources, me.resources_spent
    );
    let _ = writeln!(text, "- buildings: {}", counts(&me.buildings));
    let _ = writeln!(text, "- units: {}", counts(&me.units));
    if !me.constructions.is_empty() {
        let pending: Vec<String> = me
            .constructions
            .iter()
            .map(|(id, turns)| format!("{} ({} turns)", id, turns))
            .collect();
        let _ = writeln!(text, "- under construction: {}", pending.join(", "));
    }
    let _ = writeln!(
        text,
        "- free building slots: {}, free unit slots: {}",
        me.free_building_slots, me.free_unit_slots
    );
}

fn counts(map: &std::collections::BTreeMap<String, u32>) -> String {
    if map.is_empty() {
        return "none".to_string();
    }
    map.iter()
        .map(|(id, count)| format!("{} x{}", id, count))
        .collect::<Vec<_>>()
        .join(", ")
}
