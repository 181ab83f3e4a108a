//! Seeded random AI.

use super::Ai;
use crate::dispatcher::DispatchError;
use citadel_rules::{Action, Command, PlayerIndex, Popup, TurnSnapshot};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, instrument};

/// Uniform choice over the legal actions, reproducible for a fixed seed.
///
/// A targeted pick is reported as its bare verb and the target is drawn again
/// from the popup the engine offers, which lists exactly that verb's legal
/// targets. Every legal action therefore stays equally likely. The AI never
/// inspects the state view; the same seed and the same sequence of
/// legal-action sets always yield the same choices.
#[derive(Debug, Clone)]
pub struct RandomAi {
    rng: StdRng,
}

impl RandomAi {
    /// Creates an AI seeded with `seed`.
    #[instrument]
    pub fn new(seed: u64) -> Self {
        debug!("Creating random AI");
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn pick(&mut self, len: usize) -> Option<usize> {
        (len > 0).then(|| self.rng.gen_range(0..len))
    }
}

impl Ai for RandomAi {
    fn select_action(
        &mut self,
        player: PlayerIndex,
        legal: &[Action],
        _view: &TurnSnapshot,
    ) -> Result<Command, DispatchError> {
        let action = self
            .pick(legal.len())
            .and_then(|idx| legal.get(idx))
            .unwrap_or(&Action::EndTurn);
        debug!(player, %action, options = legal.len(), "Random AI chose");
        Ok(match action.target() {
            Some(_) => Command::Choose(action.kind()),
            None => Command::Act(action.clone()),
        })
    }

    fn select_popup_input(
        &mut self,
        player: PlayerIndex,
        popup: &Popup,
    ) -> Result<Option<usize>, DispatchError> {
        let choice = self.pick(popup.choices.len());
        debug!(player, ?choice, title = %popup.title, "Random AI answered popup");
        Ok(choice)
    }
}
