//! Decoding model replies and typed commands into actions.

use citadel_rules::{
    Action, ActionKind, Command, GameConfig, GameState, ParseError, legal_actions, parse,
    parse_command,
};
use std::sync::Arc;
use strum::IntoEnumIterator;

#[test]
fn test_canonical_text_parses_back() {
    let mut value = serde_json::to_value(GameConfig::default()).unwrap();
    value["cities"][0]["buildings"] = serde_json::json!([{ "building": "Barracks" }]);
    value["cities"][0]["units"] = serde_json::json!([{ "unit": "Warrior", "count": 1 }]);
    let config: GameConfig = serde_json::from_value(value).unwrap();
    let state = GameState::new(Arc::new(config));

    let legal = legal_actions(&state, 0);
    for kind in ActionKind::iter() {
        assert!(legal.iter().any(|a| a.kind() == kind), "no legal {}", kind);
    }
    for action in legal {
        assert_eq!(parse(&action.to_string()), Ok(action));
    }
}

#[test]
fn test_chatty_replies() {
    let cases = [
        ("I'll go with:\n\n**hire Warrior**", Action::Hire("Warrior".into())),
        ("```\nattack IA\n```", Action::Attack("IA".into())),
        ("> end", Action::EndTurn),
        ("Command: build Farm", Action::Build("Farm".into())),
        ("```attack IA```", Action::Attack("IA".into())),
        ("Okay, I'll hire Warrior this time.", Action::Hire("Warrior".into())),
    ];
    for (reply, expected) in cases {
        assert_eq!(parse(reply), Ok(expected), "reply: {:?}", reply);
    }
}

#[test]
fn test_malformed_replies() {
    assert_eq!(parse("   \n\t"), Err(ParseError::Empty));
    assert!(matches!(parse("fortify the walls"), Err(ParseError::Unrecognized(_))));
    assert_eq!(parse("hire"), Err(ParseError::MissingTarget(ActionKind::Hire)));
    assert_eq!(parse_command("hire"), Ok(Command::Choose(ActionKind::Hire)));
}

#[test]
fn test_unrecognized_snippet_is_bounded() {
    let reply = "blah ".repeat(500);
    match parse(&reply) {
        Err(ParseError::Unrecognized(snippet)) => assert!(snippet.len() < reply.len()),
        other => panic!("unexpected {:?}", other),
    }
}
