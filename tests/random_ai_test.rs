//! Reproducibility of seeded random matches.

use citadel::{AiDispatcher, run_headless};
use citadel_rules::{GameConfig, TurnEngine};
use std::sync::Arc;

fn short_match() -> Arc<GameConfig> {
    let mut value = serde_json::to_value(GameConfig::default()).unwrap();
    value["victory_conditions"] = serde_json::json!({ "nb_turns": 40, "resources_spent": 150 });
    Arc::new(serde_json::from_value(value).unwrap())
}

fn play(config: &Arc<GameConfig>, seed: u64) -> Vec<String> {
    let mut engine = TurnEngine::new(config.clone());
    let mut dispatcher = AiDispatcher::random(seed);
    let mut applied = Vec::new();
    engine.run(&mut dispatcher, |step| {
        applied.push(format!("{}:{}", step.actor, step.applied));
    });
    applied
}

#[test]
fn test_same_seed_same_match() {
    let config = short_match();
    let first = play(&config, config.seed_value());
    let second = play(&config, config.seed_value());
    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[test]
fn test_different_seeds_diverge() {
    let config = short_match();
    let matches: Vec<Vec<String>> = (0..4).map(|seed| play(&config, seed)).collect();
    assert!(matches.windows(2).any(|pair| pair[0] != pair[1]));
}

#[test]
fn test_headless_stream_is_reproducible() {
    let config = short_match();
    let stream = || {
        let mut engine = TurnEngine::new(config.clone());
        let mut dispatcher = AiDispatcher::random(config.seed_value());
        let mut out = Vec::new();
        run_headless(&mut engine, &mut dispatcher, &mut out).unwrap();
        out
    };
    assert_eq!(stream(), stream());
}
