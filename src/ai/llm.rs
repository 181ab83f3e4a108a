//! Language-model AI.

use super::{Ai, render_prompt};
use crate::dispatcher::DispatchError;
use crate::worker::AiWorker;
use citadel_rules::{Action, Command, PlayerIndex, Popup, TurnSnapshot, parse_command};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument};

/// AI that asks a remote model through the background worker.
///
/// Every request, including a popup follow-up, is bounded by the timeout.
#[derive(Debug)]
pub struct LlmAi {
    worker: AiWorker,
    timeout: Duration,
}

impl LlmAi {
    /// Creates the AI on top of a running worker.
    pub fn new(worker: AiWorker, timeout: Duration) -> Self {
        info!(timeout_ms = timeout.as_millis() as u64, "Creating language-model AI");
        Self { worker, timeout }
    }

    fn deadline(&self) -> Instant {
        Instant::now() + self.timeout
    }
}

impl Ai for LlmAi {
    #[instrument(skip(self, legal, view), fields(options = legal.len()))]
    fn select_action(
        &mut self,
        player: PlayerIndex,
        legal: &[Action],
        view: &TurnSnapshot,
    ) -> Result<Command, DispatchError> {
        let reply = self
            .worker
            .ask(player, render_prompt(player, legal, view), self.deadline())?;

        let command = parse_command(&reply).map_err(DispatchError::Parse)?;
        debug!(player, ?command, "Model chose");
        Ok(command)
    }

    #[instrument(skip(self, popup), fields(title = %popup.title, choices = popup.choices.len()))]
    fn select_popup_input(
        &mut self,
        player: PlayerIndex,
        popup: &Popup,
    ) -> Result<Option<usize>, DispatchError> {
        let prompt = format!("{}\nReply with the number of your choice.", popup.render());
        let reply = self.worker.ask(player, prompt, self.deadline())?;
        let choice = popup.resolve(&reply);
        debug!(player, ?choice, "Popup answered");
        Ok(choice)
    }
}
