//! Citadel - turn-based city strategy engine
//!
//! The rules live in [`citadel_rules`]; this crate is the process around them.
//!
//! # Architecture
//!
//! - **Settings**: environment-driven AI selection and transport options
//! - **AI**: a seeded random player and a language-model player
//! - **Worker**: background thread owning the async completion client
//! - **Dispatcher**: bounded-time decisions with `EndTurn` fallback
//! - **Front ends**: headless NDJSON runner and terminal spectator UI
//!
//! # Example
//!
//! ```no_run
//! use citadel::{AiDispatcher, run_headless};
//! use citadel_rules::{GameConfig, TurnEngine};
//! use std::sync::Arc;
//!
//! # fn example() -> anyhow::Result<()> {
//! let config = Arc::new(GameConfig::default());
//! let mut engine = TurnEngine::new(config.clone());
//! let mut dispatcher = AiDispatcher::random(config.seed_value());
//! let outcome = run_headless(&mut engine, &mut dispatcher, std::io::stdout())?;
//! println!("{}", outcome);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod ai;
pub mod cli;
pub mod dispatcher;
pub mod headless;
pub mod llm_client;
pub mod logging;
pub mod settings;
pub mod tui;
pub mod worker;

// Crate-level exports - AI players
pub use ai::{Ai, LlmAi, RandomAi, SYSTEM_PROMPT, render_prompt};

// Crate-level exports - Dispatch
pub use dispatcher::{AiDispatcher, AiVariant, DispatchError};

// Crate-level exports - LLM client
pub use llm_client::{
    ChatCompletionsClient, ChatMessage, CompletionBackend, LlmError, MissingCredentials, Role,
    backend_for,
};

// Crate-level exports - Settings
pub use settings::{AiType, LlmSettings, Settings, SettingsError};

// Crate-level exports - Front ends
pub use headless::run_headless;
pub use tui::run_tui;

// Crate-level exports - Worker
pub use worker::{AiWorker, HISTORY_LIMIT};
