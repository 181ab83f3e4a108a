//! Turn engine: the match state machine.
//!
//! The engine exclusively owns the [`GameState`]. Each cycle asks a
//! [`DecisionSource`] for the mover's command, offers a [`Popup`] when the
//! command is a bare verb, re-validates the resulting action, applies it,
//! advances priority and checks for victory:
//!
//! ```text
//! AwaitingDecision(p) -> Applying(action) -> AwaitingDecision(next) | TurnComplete -> ...
//!                                                                    MatchOver(outcome)
//! ```
//!
//! Rejected actions never abort a match. They are recorded as diagnostics and
//! replaced with `EndTurn`.

use crate::action::{Action, ActionError, ActionKind, PlayerIndex};
use crate::config::GameConfig;
use crate::invariants::{InvariantSet, StateInvariants};
use crate::parser::{Command, Popup};
use crate::rules::{
    CombatReport, Outcome, check_victory, hire_terms, legal_actions, resolve_combat, validate,
};
use crate::snapshot::TurnSnapshot;
use crate::state::GameState;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Actions one player may apply in a single turn before `EndTurn` is forced.
pub const MAX_ACTIONS_PER_TURN: u32 = 256;

/// Supplies decisions for the player holding priority.
///
/// Implementations must return promptly; any waiting they do is bounded by
/// their own timeout.
pub trait DecisionSource {
    /// Chooses a command for `player`. `legal` is never empty; it always ends
    /// with `EndTurn`. A complete action is re-validated by the engine; a bare
    /// verb makes the engine offer a popup of that verb's legal targets.
    fn decide(&mut self, player: PlayerIndex, legal: &[Action], view: &TurnSnapshot) -> Command;

    /// Picks one of the popup's choices by index. `None` declines, which ends
    /// the turn.
    fn select_popup_input(
        &mut self,
        _player: PlayerIndex,
        _popup: &Popup,
        _view: &TurnSnapshot,
    ) -> Option<usize> {
        None
    }
}

/// Where the engine is in its decision cycle.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum EnginePhase {
    /// Waiting for the mover's decision.
    #[display("Awaiting decision from player {}", _0)]
    AwaitingDecision(PlayerIndex),
    /// Applying a validated action.
    #[display("Applying {}", _0)]
    Applying(Action),
    /// The last player ended its turn; turn-start processing is underway.
    #[display("Turn complete")]
    TurnComplete,
    /// Terminal.
    #[display("Match over: {}", _0)]
    MatchOver(Outcome),
}

/// Why the engine substituted `EndTurn` for a decision.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum FallbackReason {
    /// The decision failed re-validation.
    #[display("{}", _0)]
    Rejected(ActionError),
    /// The player hit the per-turn action ceiling.
    #[display("Per-turn action ceiling reached")]
    ActionCeiling,
    /// A bare verb had no legal target, or its popup was declined.
    #[display("No {} target chosen", _0)]
    NoChoice(ActionKind),
}

/// A recoverable problem recorded during the match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Turn the problem occurred on.
    pub turn: u32,
    /// Player whose decision was replaced.
    pub player: PlayerIndex,
    /// What the player proposed, if a decision was requested.
    pub proposed: Option<Action>,
    /// Why it was replaced.
    pub reason: FallbackReason,
}

/// Everything one applied action produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Player that acted.
    pub actor: PlayerIndex,
    /// Action the decision source or user proposed.
    pub proposed: Action,
    /// Action actually applied (`EndTurn` when the proposal was replaced).
    pub applied: Action,
    /// Reason the proposal was replaced, if it was.
    pub fallback: Option<FallbackReason>,
    /// Combat result for an applied attack.
    pub combat: Option<CombatReport>,
    /// Whether a new turn began.
    pub turn_advanced: bool,
    /// Snapshot taken after the action, with outcome once the match is over.
    pub snapshot: TurnSnapshot,
}

impl Step {
    /// The match outcome, if this step ended the match.
    pub fn outcome(&self) -> Option<Outcome> {
        self.snapshot.outcome
    }
}

/// Synchronous match driver.
#[derive(Debug, Clone)]
pub struct TurnEngine {
    state: GameState,
    phase: EnginePhase,
    actions_this_turn: u32,
    diagnostics: Vec<Diagnostic>,
}

impl TurnEngine {
    /// Creates an engine on the opening state of `config`.
    #[instrument(skip(config))]
    pub fn new(config: Arc<GameConfig>) -> Self {
        let state = GameState::new(config);
        let phase = EnginePhase::AwaitingDecision(*state.mover());
        info!(
            players = state.cities().len(),
            turn = *state.turn(),
            seed = %state.seed(),
            "Turn engine ready"
        );
        Self {
            state,
            phase,
            actions_this_turn: 0,
            diagnostics: Vec::new(),
        }
    }

    /// Read-only view of the live state.
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Current phase.
    pub fn phase(&self) -> &EnginePhase {
        &self.phase
    }

    /// Player holding priority.
    pub fn mover(&self) -> PlayerIndex {
        *self.state.mover()
    }

    /// Recoverable problems recorded so far.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Outcome, once the match is over.
    pub fn outcome(&self) -> Option<Outcome> {
        match self.phase {
            EnginePhase::MatchOver(outcome) => Some(outcome),
            _ => None,
        }
    }

    /// Whether the match has ended.
    pub fn is_over(&self) -> bool {
        self.outcome().is_some()
    }

    /// Legal actions for the mover.
    pub fn legal_actions(&self) -> Vec<Action> {
        if self.is_over() {
            return Vec::new();
        }
        legal_actions(&self.state, self.mover())
    }

    /// Snapshot of the current state.
    pub fn snapshot(&self) -> TurnSnapshot {
        TurnSnapshot::capture(&self.state).with_outcome(self.outcome())
    }

    /// Runs one decision cycle for the mover.
    ///
    /// Fails only with [`ActionError::MatchOver`].
    #[instrument(skip(self, source), fields(turn = *self.state.turn(), mover = self.mover()))]
    pub fn step(&mut self, source: &mut dyn DecisionSource) -> Result<Step, ActionError> {
        if self.is_over() {
            return Err(ActionError::MatchOver);
        }
        let actor = self.mover();

        if self.actions_this_turn >= MAX_ACTIONS_PER_TURN {
            warn!(actor, limit = MAX_ACTIONS_PER_TURN, "Action ceiling reached, forcing EndTurn");
            self.diagnostics.push(Diagnostic {
                turn: *self.state.turn(),
                player: actor,
                proposed: None,
                reason: FallbackReason::ActionCeiling,
            });
            return Ok(self.apply(
                actor,
                Action::EndTurn,
                Action::EndTurn,
                Some(FallbackReason::ActionCeiling),
            ));
        }

        let legal = legal_actions(&self.state, actor);
        let view = TurnSnapshot::capture(&self.state);
        let decision = match source.decide(actor, &legal, &view) {
            Command::Act(action) => action,
            Command::Choose(kind) => match offer_popup(source, actor, kind, &legal, &view) {
                Some(action) => action,
                None => {
                    warn!(actor, %kind, "No popup choice, substituting EndTurn");
                    let reason = FallbackReason::NoChoice(kind);
                    self.diagnostics.push(Diagnostic {
                        turn: *self.state.turn(),
                        player: actor,
                        proposed: None,
                        reason: reason.clone(),
                    });
                    return Ok(self.apply(actor, Action::EndTurn, Action::EndTurn, Some(reason)));
                }
            },
        };
        debug!(actor, %decision, "Decision received");
        self.submit(actor, decision)
    }

    /// Applies an already-resolved decision for `actor`, such as typed input.
    ///
    /// An invalid action is replaced with `EndTurn` and recorded as a diagnostic.
    /// Acting out of turn changes nothing and returns
    /// [`ActionError::NotYourTurn`]; a finished match returns
    /// [`ActionError::MatchOver`].
    #[instrument(skip(self), fields(turn = *self.state.turn()))]
    pub fn submit(&mut self, actor: PlayerIndex, action: Action) -> Result<Step, ActionError> {
        if self.is_over() {
            return Err(ActionError::MatchOver);
        }
        let mover = self.mover();
        if actor != mover {
            return Err(ActionError::NotYourTurn { actor, mover });
        }

        if self.actions_this_turn >= MAX_ACTIONS_PER_TURN && !action.is_end_turn() {
            warn!(actor, %action, "Action ceiling reached, forcing EndTurn");
            self.diagnostics.push(Diagnostic {
                turn: *self.state.turn(),
                player: actor,
                proposed: Some(action.clone()),
                reason: FallbackReason::ActionCeiling,
            });
            return Ok(self.apply(
                actor,
                action,
                Action::EndTurn,
                Some(FallbackReason::ActionCeiling),
            ));
        }

        match validate(&self.state, &action, actor) {
            Ok(()) => Ok(self.apply(actor, action.clone(), action, None)),
            Err(reason) => {
                warn!(actor, %action, %reason, "Rejected action, substituting EndTurn");
                let fallback = FallbackReason::Rejected(reason);
                self.diagnostics.push(Diagnostic {
                    turn: *self.state.turn(),
                    player: actor,
                    proposed: Some(action.clone()),
                    reason: fallback.clone(),
                });
                Ok(self.apply(actor, action, Action::EndTurn, Some(fallback)))
            }
        }
    }

    /// Steps until the match is over, calling `on_step` after every action.
    pub fn run(
        &mut self,
        source: &mut dyn DecisionSource,
        mut on_step: impl FnMut(&Step),
    ) -> Outcome {
        loop {
            match self.step(source) {
                Ok(step) => {
                    on_step(&step);
                    if let Some(outcome) = step.outcome() {
                        return outcome;
                    }
                }
                Err(_) => {
                    if let Some(outcome) = self.outcome() {
                        return outcome;
                    }
                }
            }
        }
    }

    fn apply(
        &mut self,
        actor: PlayerIndex,
        proposed: Action,
        applied: Action,
        fallback: Option<FallbackReason>,
    ) -> Step {
        self.phase = EnginePhase::Applying(applied.clone());
        let combat = self.apply_effects(actor, &applied);
        self.actions_this_turn += 1;

        let mut turn_advanced = false;
        if applied.is_end_turn() {
            self.actions_this_turn = 0;
            turn_advanced = self.state.advance_mover();
            if turn_advanced {
                self.phase = EnginePhase::TurnComplete;
                info!(turn = *self.state.turn(), "New turn");
            }
        }

        if let Err(violations) = StateInvariants::check_all(&self.state) {
            let descriptions = violations
                .iter()
                .map(|v| v.description.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            error!(%descriptions, "Invariant violated");
            debug_assert!(false, "Invariant violated: {}", descriptions);
        }

        let outcome = check_victory(&self.state, self.state.config().victory_conditions());
        self.phase = match outcome {
            Some(outcome) => {
                info!(%outcome, turn = *self.state.turn(), "Match over");
                EnginePhase::MatchOver(outcome)
            }
            None => EnginePhase::AwaitingDecision(self.mover()),
        };

        Step {
            actor,
            proposed,
            snapshot: TurnSnapshot::capture(&self.state)
                .with_last_action(actor, &applied)
                .with_outcome(outcome),
            applied,
            fallback,
            combat,
            turn_advanced,
        }
    }

    /// Mutates the state for a validated action.
    fn apply_effects(&mut self, actor: PlayerIndex, action: &Action) -> Option<CombatReport> {
        let config = Arc::clone(self.state.config());
        match action {
            Action::Build(id) => {
                let def = config.building(id)?;
                let city = self.state.city_mut(actor)?;
                city.spend(*def.cost());
                city.start_construction(def.name().clone(), *def.build_time());
                info!(city = %city.name(), building = %def.name(), cost = *def.cost(), "Construction started");
                None
            }
            Action::Hire(id) => {
                let unit = config.unit(id)?;
                let terms = hire_terms(&self.state, self.state.city(actor)?, unit).ok()?;
                let city = self.state.city_mut(actor)?;
                city.spend(terms.cost);
                city.start_recruitment(unit.name().clone(), terms.time);
                info!(city = %city.name(), unit = %unit.name(), cost = terms.cost, "Recruitment started");
                None
            }
            Action::Attack(target) => {
                let defender = self.state.city_index(target)?;
                let report = resolve_combat(&self.state, actor, defender)?;

                let lost = self.state.city_mut(report.loser())?.disband();
                if report.attacker_wins() {
                    let taken = self.state.city_mut(defender)?.take(report.resources);
                    self.state.city_mut(actor)?.credit(taken);
                } else {
                    self.state.city_mut(actor)?.take(report.resources);
                }
                info!(
                    attacker = actor,
                    defender,
                    attacker_power = report.attacker_power,
                    defender_power = report.defender_power,
                    winner = report.winner(),
                    units_lost = lost,
                    resources = report.resources,
                    "Combat resolved"
                );
                Some(report)
            }
            Action::EndTurn => None,
        }
    }
}

/// Offers the targets of `kind` as a popup and maps the answer to an action.
fn offer_popup(
    source: &mut dyn DecisionSource,
    actor: PlayerIndex,
    kind: ActionKind,
    legal: &[Action],
    view: &TurnSnapshot,
) -> Option<Action> {
    let popup = Popup::for_kind(kind, legal)?;
    debug!(actor, title = %popup.title, choices = popup.choices.len(), "Offering popup");
    let index = source.select_popup_input(actor, &popup, view)?;
    popup.action_for(kind, index)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Replays a fixed script, then ends turns.
    struct Script(Vec<Action>);

    impl DecisionSource for Script {
        fn decide(&mut self, _: PlayerIndex, _: &[Action], _: &TurnSnapshot) -> Command {
            if self.0.is_empty() {
                Command::Act(Action::EndTurn)
            } else {
                Command::Act(self.0.remove(0))
            }
        }
    }

    /// Names a verb, then answers the popup with a fixed index.
    struct Picky {
        kind: ActionKind,
        answer: Option<usize>,
        offered: Vec<Popup>,
    }

    impl DecisionSource for Picky {
        fn decide(&mut self, _: PlayerIndex, _: &[Action], _: &TurnSnapshot) -> Command {
            Command::Choose(self.kind)
        }

        fn select_popup_input(
            &mut self,
            _: PlayerIndex,
            popup: &Popup,
            _: &TurnSnapshot,
        ) -> Option<usize> {
            self.offered.push(popup.clone());
            self.answer
        }
    }

    /// Never ends its turn.
    struct Chatty;

    impl DecisionSource for Chatty {
        fn decide(&mut self, _: PlayerIndex, _: &[Action], _: &TurnSnapshot) -> Command {
            Command::Act(Action::Build("Castle".into()))
        }
    }

    fn engine() -> TurnEngine {
        TurnEngine::new(Arc::new(GameConfig::default()))
    }

    #[test]
    fn test_build_debits_and_records_spending() {
        let mut engine = engine();
        let mut source = Script(vec![Action::Build("farm".into())]);
        let step = engine.step(&mut source).unwrap();

        assert_eq!(step.applied, Action::Build("farm".into()));
        assert!(step.fallback.is_none());
        assert_eq!(step.snapshot.players[0].resources, 90);
        assert_eq!(step.snapshot.players[0].resources_spent, 10);
        assert_eq!(step.snapshot.players[0].constructions, vec![("Farm".to_string(), 2)]);
        assert_eq!(engine.phase(), &EnginePhase::AwaitingDecision(0));
    }

    #[test]
    fn test_end_turn_passes_priority() {
        let mut engine = engine();
        let mut source = Script(Vec::new());

        let step = engine.step(&mut source).unwrap();
        assert!(!step.turn_advanced);
        assert_eq!(engine.mover(), 1);

        let step = engine.step(&mut source).unwrap();
        assert!(step.turn_advanced);
        assert_eq!(step.snapshot.turn, 2);
        assert_eq!(engine.mover(), 0);
    }

    #[test]
    fn test_bare_verb_is_completed_through_popup() {
        let mut engine = engine();
        let mut source = Picky {
            kind: ActionKind::Build,
            answer: Some(0),
            offered: Vec::new(),
        };
        let step = engine.step(&mut source).unwrap();

        assert_eq!(source.offered.len(), 1);
        let popup = &source.offered[0];
        assert_eq!(popup.title, "Build");
        let expected = popup.action_for(ActionKind::Build, 0).unwrap();
        assert_eq!(step.proposed, expected);
        assert_eq!(step.applied, expected);
        assert!(step.fallback.is_none());
        assert_eq!(engine.mover(), 0);
    }

    #[test]
    fn test_declined_popup_ends_the_turn() {
        let mut engine = engine();
        let mut source = Picky {
            kind: ActionKind::Hire,
            answer: None,
            offered: Vec::new(),
        };
        let step = engine.step(&mut source).unwrap();

        assert_eq!(step.applied, Action::EndTurn);
        assert_eq!(step.fallback, Some(FallbackReason::NoChoice(ActionKind::Hire)));
        assert_eq!(engine.diagnostics().len(), 1);
        assert_eq!(engine.mover(), 1);
    }

    #[test]
    fn test_out_of_range_popup_answer_ends_the_turn() {
        let mut engine = engine();
        let mut source = Picky {
            kind: ActionKind::Build,
            answer: Some(99),
            offered: Vec::new(),
        };
        let step = engine.step(&mut source).unwrap();

        assert_eq!(source.offered.len(), 1);
        assert_eq!(step.fallback, Some(FallbackReason::NoChoice(ActionKind::Build)));
        assert_eq!(engine.mover(), 1);
    }

    #[test]
    fn test_out_of_turn_submission_changes_nothing() {
        let mut engine = engine();
        let before = engine.snapshot();
        assert_eq!(
            engine.submit(1, Action::EndTurn),
            Err(ActionError::NotYourTurn { actor: 1, mover: 0 })
        );
        assert_eq!(engine.snapshot(), before);
        assert!(engine.diagnostics().is_empty());
    }

    #[test]
    fn test_rejected_actions_end_the_turn() {
        let mut engine = engine();
        let mut source = Chatty;
        for _ in 0..MAX_ACTIONS_PER_TURN {
            let step = engine.step(&mut source).unwrap();
            // Unknown buildings are rejected, which already ends the turn.
            assert_eq!(step.applied, Action::EndTurn);
        }
        assert_eq!(engine.diagnostics().len(), MAX_ACTIONS_PER_TURN as usize);
    }

    #[test]
    fn test_ceiling_limits_a_busy_turn() {
        let config: GameConfig = serde_json::from_value({
            let mut value = serde_json::to_value(GameConfig::default()).unwrap();
            value["cities"][0]["starting_resources"] = serde_json::json!(1_000_000);
            value["cities"][0]["nb_slots_units"] = serde_json::json!(1_000);
            value["units"][0]["cost"] = serde_json::json!(0);
            value["buildings"][1]["production"] = serde_json::Value::Null;
            value["victory_conditions"] = serde_json::json!({});
            value
        })
        .unwrap();

        let mut engine = TurnEngine::new(Arc::new(config));
        let mut source = Script(vec![Action::Hire("Warrior".into()); 300]);
        let mut hires = 0;
        loop {
            let step = engine.step(&mut source).unwrap();
            if step.applied.is_end_turn() {
                assert_eq!(step.fallback, Some(FallbackReason::ActionCeiling));
                break;
            }
            hires += 1;
        }
        assert_eq!(hires, MAX_ACTIONS_PER_TURN);
        assert_eq!(engine.mover(), 1);
    }

    #[test]
    fn test_finished_match_rejects_steps() {
        let config: GameConfig = serde_json::from_value({
            let mut value = serde_json::to_value(GameConfig::default()).unwrap();
            value["victory_conditions"] = serde_json::json!({ "nb_turns": 2 });
            value
        })
        .unwrap();
        let mut engine = TurnEngine::new(Arc::new(config));
        let mut source = Script(Vec::new());

        let outcome = engine.run(&mut source, |_| {});
        assert_eq!(outcome, Outcome::Draw);
        assert_eq!(engine.step(&mut source), Err(ActionError::MatchOver));
        assert!(engine.legal_actions().is_empty());
    }
}
