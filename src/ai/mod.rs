//! AI players.
//!
//! Every variant offers the same two capabilities: choosing a command from the
//! legal set and answering the popup the engine opens for a bare verb.
//! Failures are returned, never swallowed; the dispatcher decides what a
//! failure turns into.

mod llm;
mod prompt;
mod random;

pub use llm::LlmAi;
pub use prompt::{SYSTEM_PROMPT, render_prompt};
pub use random::RandomAi;

use crate::dispatcher::DispatchError;
use citadel_rules::{Action, Command, PlayerIndex, Popup, TurnSnapshot};

/// Decision-making capabilities of an AI player.
pub trait Ai {
    /// Chooses one command for `player`. `legal` always ends with `EndTurn`.
    fn select_action(
        &mut self,
        player: PlayerIndex,
        legal: &[Action],
        view: &TurnSnapshot,
    ) -> Result<Command, DispatchError>;

    /// Picks one of the popup's choices by index, or declines with `None`.
    fn select_popup_input(
        &mut self,
        player: PlayerIndex,
        popup: &Popup,
    ) -> Result<Option<usize>, DispatchError>;
}
