//! Decision dispatch: the bridge between the synchronous engine and the AI.
//!
//! The variant is chosen once at startup. Whatever goes wrong inside a variant
//! (timeout, transport, credentials, unparseable reply) is absorbed here and
//! turned into `EndTurn`, with a warning and a fallback count.

use crate::ai::{Ai, LlmAi, RandomAi, SYSTEM_PROMPT};
use crate::llm_client::{CompletionBackend, LlmError, backend_for};
use crate::settings::{AiType, Settings};
use crate::worker::AiWorker;
use citadel_rules::{
    Action, Command, DecisionSource, GameConfig, ParseError, PlayerIndex, Popup, TurnSnapshot,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Why a decision fell back to the default.
#[derive(Debug, derive_more::Display)]
pub enum DispatchError {
    /// No reply before the deadline.
    #[display("Decision timed out")]
    Timeout,
    /// The background worker is not running.
    #[display("AI worker is gone")]
    WorkerGone,
    /// The completion service failed.
    #[display("{}", _0)]
    Transport(LlmError),
    /// The reply held no usable command.
    #[display("{}", _0)]
    Parse(ParseError),
}

impl std::error::Error for DispatchError {}

/// The configured AI variant.
#[derive(Debug)]
pub enum AiVariant {
    /// Seeded uniform choice.
    Random(RandomAi),
    /// Remote language model behind the worker.
    LanguageModel(LlmAi),
}

/// Supplies one decision per request, never blocking longer than its timeout.
#[derive(Debug)]
pub struct AiDispatcher {
    variant: AiVariant,
    fallbacks: u64,
}

impl AiDispatcher {
    /// Builds the dispatcher selected by `settings`.
    #[instrument(skip_all, fields(ai_type = %settings.ai_type()))]
    pub fn from_settings(settings: &Settings, config: &GameConfig) -> std::io::Result<Self> {
        match settings.ai_type() {
            AiType::Random => Ok(Self::random(config.seed_value())),
            AiType::Llm => {
                Self::language_model(backend_for(settings.llm()), *settings.decision_timeout())
            }
        }
    }

    /// Dispatcher over a seeded [`RandomAi`].
    pub fn random(seed: u64) -> Self {
        info!(seed, "Using random AI");
        Self {
            variant: AiVariant::Random(RandomAi::new(seed)),
            fallbacks: 0,
        }
    }

    /// Dispatcher over an [`LlmAi`], starting its worker.
    pub fn language_model(
        backend: Arc<dyn CompletionBackend>,
        timeout: Duration,
    ) -> std::io::Result<Self> {
        info!(backend = backend.name(), "Using language-model AI");
        let worker = AiWorker::spawn(backend, SYSTEM_PROMPT.to_string())?;
        Ok(Self {
            variant: AiVariant::LanguageModel(LlmAi::new(worker, timeout)),
            fallbacks: 0,
        })
    }

    /// The active variant.
    pub fn variant(&self) -> &AiVariant {
        &self.variant
    }

    /// Decisions that fell back to the default so far.
    pub fn fallback_count(&self) -> u64 {
        self.fallbacks
    }

}

impl DecisionSource for AiDispatcher {
    fn decide(&mut self, player: PlayerIndex, legal: &[Action], view: &TurnSnapshot) -> Command {
        let decision = match &mut self.variant {
            AiVariant::Random(ai) => ai.select_action(player, legal, view),
            AiVariant::LanguageModel(ai) => ai.select_action(player, legal, view),
        };
        match decision {
            Ok(command) => command,
            Err(e) => {
                self.fallbacks += 1;
                warn!(
                    player,
                    error = %e,
                    fallbacks = self.fallbacks,
                    "Decision failed, falling back to EndTurn"
                );
                Command::Act(Action::EndTurn)
            }
        }
    }

    fn select_popup_input(
        &mut self,
        player: PlayerIndex,
        popup: &Popup,
        _view: &TurnSnapshot,
    ) -> Option<usize> {
        let choice = match &mut self.variant {
            AiVariant::Random(ai) => ai.select_popup_input(player, popup),
            AiVariant::LanguageModel(ai) => ai.select_popup_input(player, popup),
        };
        match choice {
            Ok(choice) => choice,
            Err(e) => {
                self.fallbacks += 1;
                warn!(player, error = %e, fallbacks = self.fallbacks, "Popup input failed");
                None
            }
        }
    }
}
