//! Loading game configuration files from disk.

use citadel_rules::{GameConfig, GameState, PlayerKind, seed_hash};
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

const SCENARIO: &str = r#"{
  "game": { "map_x": 160, "map_y": 40, "seed": "pokemon", "current_turn": 1, "attack_range": null },
  "buildings": [
    { "name": "Farm", "cost": 10, "build_time": 2, "slots": 1, "prerequisites": [],
      "production": { "type": "resource", "amount": 5, "time": 1 } },
    { "name": "Barracks", "cost": 20, "build_time": 4, "slots": 1, "prerequisites": ["Farm"],
      "production": { "type": "unit", "unit": "Warrior", "cost": 5, "time": 3 } }
  ],
  "units": [ { "name": "Warrior", "attack": 1, "cost": 5 } ],
  "cities": [
    { "name": "Player", "x": 10, "y": 10, "player_type": "player",
      "starting_resources": 100, "nb_slots_buildings": 5, "nb_slots_units": 10,
      "buildings": [ { "building": "Farm" } ], "units": [],
      "whitelist_buildings": null, "blacklist_buildings": null,
      "whitelist_units": null, "blacklist_units": null },
    { "name": "IA", "x": 20, "y": 20, "player_type": "AI",
      "starting_resources": 80, "nb_slots_buildings": 5, "nb_slots_units": 10,
      "blacklist_buildings": ["Barracks"] }
  ],
  "victory_conditions": { "nb_turns": 500, "resources_spent": 300 }
}"#;

fn write_temp(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_load_from_file() {
    let file = write_temp(SCENARIO);
    let config = GameConfig::from_file(file.path()).unwrap();

    assert_eq!(config.cities().len(), 2);
    assert_eq!(config.cities()[0].player_type(), &PlayerKind::Human);
    assert_eq!(config.cities()[1].player_type(), &PlayerKind::Ai);
    assert_eq!(config.seed_value(), seed_hash("pokemon"));

    let state = GameState::new(Arc::new(config));
    let player = state.city(0).unwrap();
    assert!(player.has_building("Farm"));
    assert_eq!(*player.resources(), 100);
    assert_eq!(*state.city(1).unwrap().resources(), 80);
}

#[test]
fn test_missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = GameConfig::from_file(dir.path().join("absent.json")).unwrap_err();
    assert!(err.message.contains("Failed to read config file"));
}

#[test]
fn test_invalid_json_is_an_error() {
    let file = write_temp("{ not json");
    let err = GameConfig::from_file(file.path()).unwrap_err();
    assert!(err.message.starts_with("Failed to parse config"));
}

#[test]
fn test_city_outside_map_is_rejected() {
    let doc = SCENARIO.replace(r#""x": 20, "y": 20"#, r#""x": 200, "y": 20"#);
    let file = write_temp(&doc);
    let err = GameConfig::from_file(file.path()).unwrap_err();
    assert!(err.message.contains("outside"));
}

#[test]
fn test_duplicate_ids_are_rejected() {
    let doc = SCENARIO.replace(r#""name": "IA""#, r#""name": "player""#);
    let err = GameConfig::from_json_str(&doc).unwrap_err();
    assert!(err.message.contains("Duplicate city id"));
}
