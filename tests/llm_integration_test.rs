//! Integration test against a live chat-completion service.

use citadel::{AiDispatcher, ChatCompletionsClient, ChatMessage, CompletionBackend, Settings};
use citadel_rules::{GameConfig, TurnEngine};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

fn llm_settings() -> Settings {
    dotenvy::dotenv().ok();
    Settings::from_lookup(|key| match key {
        "AI_TYPE" => Some("llm".to_string()),
        other => std::env::var(other).ok(),
    })
    .expect("valid settings")
}

#[tokio::test]
#[cfg_attr(not(feature = "api"), ignore)]
#[instrument]
async fn test_chat_completions_connectivity() {
    let settings = llm_settings();
    let api_key = settings.llm().api_key().clone().expect("OPENAI_KEY not set");
    let client = ChatCompletionsClient::new(api_key, settings.llm());

    let response = client
        .complete(&[
            ChatMessage::system("You are a helpful assistant."),
            ChatMessage::user("Say 'Hello, world!' and nothing else."),
        ])
        .await
        .expect("Failed to generate");

    assert!(!response.is_empty(), "Response should not be empty");
    eprintln!("Response: {}", response);
}

#[test]
#[cfg_attr(not(feature = "api"), ignore)]
fn test_model_picks_a_legal_action() {
    let settings = llm_settings().with_decision_timeout(Duration::from_secs(30));
    let config = Arc::new(GameConfig::default());
    let mut dispatcher = AiDispatcher::from_settings(&settings, &config).expect("worker starts");

    let mut engine = TurnEngine::new(config);
    let step = engine.step(&mut dispatcher).expect("match is running");

    eprintln!("Model chose: {}", step.applied);
    assert!(step.fallback.is_none(), "engine rejected {}", step.proposed);
    assert_eq!(dispatcher.fallback_count(), 0, "reply could not be used");
}
