//! Application state and logic.

use super::input::Input;
use crate::dispatcher::AiDispatcher;
use citadel_rules::{
    Action, ActionKind, Command, PlayerIndex, PlayerKind, Popup, Step, TurnEngine, TurnSnapshot,
    parse_command, validate,
};
use std::collections::VecDeque;
use tracing::{debug, info, instrument, warn};

/// Lines kept in the action log.
pub const LOG_LIMIT: usize = 200;

/// A choice the human is being asked to make.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingPopup {
    /// Verb the choice completes.
    pub kind: ActionKind,
    /// Options on offer.
    pub popup: Popup,
}

/// Main application state.
#[derive(Debug)]
pub struct App {
    engine: TurnEngine,
    dispatcher: AiDispatcher,
    snapshot: TurnSnapshot,
    log: VecDeque<String>,
    input: String,
    popup: Option<PendingPopup>,
    status: String,
    quit: bool,
}

impl App {
    /// Creates the application around a fresh engine.
    pub fn new(engine: TurnEngine, dispatcher: AiDispatcher) -> Self {
        let snapshot = engine.snapshot();
        let mut app = Self {
            engine,
            dispatcher,
            snapshot,
            log: VecDeque::new(),
            input: String::new(),
            popup: None,
            status: String::new(),
            quit: false,
        };
        app.refresh_status();
        app
    }

    /// Latest snapshot.
    pub fn snapshot(&self) -> &TurnSnapshot {
        &self.snapshot
    }

    /// Recent actions, oldest first.
    pub fn log(&self) -> &VecDeque<String> {
        &self.log
    }

    /// Current input line.
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Open popup, if any.
    pub fn popup(&self) -> Option<&PendingPopup> {
        self.popup.as_ref()
    }

    /// Status line.
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Whether the user asked to leave.
    pub fn should_quit(&self) -> bool {
        self.quit
    }

    /// The engine driving the match.
    pub fn engine(&self) -> &TurnEngine {
        &self.engine
    }

    /// Whether the mover is a human waiting for input.
    pub fn human_turn(&self) -> bool {
        !self.engine.is_over() && self.mover_kind() == Some(PlayerKind::Human)
    }

    /// Whether the mover is an AI city.
    pub fn ai_turn(&self) -> bool {
        !self.engine.is_over() && self.mover_kind() == Some(PlayerKind::Ai)
    }

    fn mover_kind(&self) -> Option<PlayerKind> {
        self.engine
            .state()
            .city(self.engine.mover())
            .map(|city| *city.kind())
    }

    fn mover_name(&self) -> String {
        self.snapshot.player_name(self.engine.mover()).to_string()
    }

    /// Shows that the AI is deciding, before a potentially slow step.
    pub fn mark_thinking(&mut self) {
        self.status = format!("{} is thinking...", self.mover_name());
    }

    /// Runs one AI decision if an AI city holds priority.
    #[instrument(skip(self))]
    pub fn step_ai(&mut self) {
        if !self.ai_turn() {
            return;
        }
        match self.engine.step(&mut self.dispatcher) {
            Ok(step) => self.record(&step),
            Err(e) => warn!(error = %e, "AI step refused"),
        }
    }

    /// Handles one mapped key.
    pub fn handle(&mut self, input: Input) {
        match input {
            Input::Quit => {
                info!("User quit");
                self.quit = true;
            }
            Input::Char(c) => self.input.push(c),
            Input::Backspace => {
                self.input.pop();
            }
            Input::Cancel => {
                if self.popup.take().is_some() {
                    debug!("Popup cancelled");
                    self.refresh_status();
                }
                self.input.clear();
            }
            Input::Submit => {
                let line = std::mem::take(&mut self.input);
                if self.popup.is_some() {
                    self.answer_popup(&line);
                } else {
                    self.submit_line(&line);
                }
            }
        }
    }

    fn submit_line(&mut self, line: &str) {
        if !self.human_turn() {
            self.status = match self.engine.outcome() {
                Some(outcome) => format!("{}. Press Ctrl+Q to quit.", outcome),
                None => format!("Waiting for {}", self.mover_name()),
            };
            return;
        }

        match parse_command(line) {
            Ok(Command::Act(action)) => self.try_submit(action),
            Ok(Command::Choose(kind)) => {
                match Popup::for_kind(kind, &self.engine.legal_actions()) {
                    Some(popup) => {
                        debug!(%kind, choices = popup.choices.len(), "Opening popup");
                        self.status = popup.prompt.clone();
                        self.popup = Some(PendingPopup { kind, popup });
                    }
                    None => self.status = format!("Nothing to {} right now", kind),
                }
            }
            Err(e) => self.status = e.to_string(),
        }
    }

    fn answer_popup(&mut self, line: &str) {
        let Some(pending) = self.popup.as_ref() else {
            return;
        };
        let choice = pending
            .popup
            .resolve(line)
            .and_then(|index| pending.popup.action_for(pending.kind, index));
        match choice {
            Some(action) => {
                self.popup = None;
                self.try_submit(action);
            }
            None => {
                self.status = format!(
                    "Pick a number between 1 and {}, or Esc to cancel",
                    pending.popup.choices.len()
                );
            }
        }
    }

    fn try_submit(&mut self, action: Action) {
        let actor = self.engine.mover();
        if let Err(reason) = validate(self.engine.state(), &action, actor) {
            debug!(%action, %reason, "Typed action rejected");
            self.status = format!("Cannot {}: {}", action, reason);
            return;
        }
        match self.engine.submit(actor, action) {
            Ok(step) => self.record(&step),
            Err(e) => self.status = e.to_string(),
        }
    }

    fn record(&mut self, step: &Step) {
        let name = self.snapshot.player_name(step.actor).to_string();
        let mut line = format!("T{} {}: {}", self.snapshot.turn, name, step.applied);
        match &step.fallback {
            Some(reason) if step.proposed != step.applied => {
                line.push_str(&format!(" ({} instead of {})", reason, step.proposed));
            }
            Some(reason) => line.push_str(&format!(" ({})", reason)),
            None => {}
        }
        if let Some(report) = &step.combat {
            let verb = if report.attacker_wins() {
                "plundered"
            } else {
                "lost"
            };
            line.push_str(&format!(
                " [{} vs {}, {} {}]",
                report.attacker_power, report.defender_power, verb, report.resources
            ));
        }
        self.push_log(line);
        self.snapshot = step.snapshot.clone();
        self.refresh_status();
    }

    fn push_log(&mut self, line: String) {
        self.log.push_back(line);
        while self.log.len() > LOG_LIMIT {
            self.log.pop_front();
        }
    }

    fn refresh_status(&mut self) {
        self.status = if let Some(outcome) = self.engine.outcome() {
            let who = outcome
                .winner()
                .map(|p| format!("{} wins", self.snapshot.player_name(p)))
                .unwrap_or_else(|| "Draw".to_string());
            format!("Match over: {}. Press Ctrl+Q to quit.", who)
        } else if self.human_turn() {
            format!(
                "{}, your move: build <building>, hire <unit>, attack <city> or end",
                self.mover_name()
            )
        } else {
            format!("Waiting for {}", self.mover_name())
        };
    }

    /// Player whose row should be highlighted.
    pub fn highlighted(&self) -> Option<PlayerIndex> {
        (!self.engine.is_over()).then(|| self.engine.mover())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use citadel_rules::GameConfig;
    use std::sync::Arc;

    fn app() -> App {
        let engine = TurnEngine::new(Arc::new(GameConfig::default()));
        App::new(engine, AiDispatcher::random(3))
    }

    fn type_line(app: &mut App, text: &str) {
        for c in text.chars() {
            app.handle(Input::Char(c));
        }
        app.handle(Input::Submit);
    }

    #[test]
    fn test_human_moves_first() {
        let app = app();
        assert!(app.human_turn());
        assert!(!app.ai_turn());
        assert!(app.status().contains("your move"));
    }

    #[test]
    fn test_typed_build_is_applied() {
        let mut app = app();
        type_line(&mut app, "build Farm");
        assert_eq!(app.log().len(), 1);
        assert!(app.log()[0].contains("build Farm"));
        assert_eq!(app.snapshot().players[0].constructions.len(), 1);
    }

    #[test]
    fn test_invalid_action_is_not_submitted() {
        let mut app = app();
        type_line(&mut app, "hire Warrior");
        assert!(app.log().is_empty());
        assert!(app.status().starts_with("Cannot hire Warrior"));
        assert!(app.human_turn());
    }

    #[test]
    fn test_bare_verb_opens_popup() {
        let mut app = app();
        type_line(&mut app, "build");
        let pending = app.popup().unwrap();
        assert_eq!(pending.kind, ActionKind::Build);
        assert_eq!(pending.popup.prompt, "Choose building type:");

        type_line(&mut app, "1");
        assert!(app.popup().is_none());
        assert_eq!(app.log().len(), 1);
    }

    #[test]
    fn test_escape_cancels_popup() {
        let mut app = app();
        type_line(&mut app, "build");
        app.handle(Input::Cancel);
        assert!(app.popup().is_none());
        assert!(app.log().is_empty());
    }

    #[test]
    fn test_end_hands_over_to_ai() {
        let mut app = app();
        type_line(&mut app, "end");
        assert!(app.ai_turn());
        app.step_ai();
        assert_eq!(app.log().len(), 2);
    }

    #[test]
    fn test_quit() {
        let mut app = app();
        app.handle(Input::Quit);
        assert!(app.should_quit());
    }
}
