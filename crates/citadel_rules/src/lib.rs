//! Rules for citadel, a turn-based city-building strategy game.
//!
//! This crate is pure and synchronous. It loads and validates the game
//! configuration, owns the game state through [`TurnEngine`], validates and
//! applies actions, resolves combat and detects victory. Decisions come in
//! through the [`DecisionSource`] seam; everything that waits on the outside
//! world lives in the application crate.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod action;
mod config;
mod engine;
pub mod invariants;
mod parser;
pub mod rules;
mod snapshot;
mod state;

pub use action::{Action, ActionError, ActionKind, PlayerIndex};
pub use config::{
    BuildingDef, BuildingInstance, CityConfig, ConfigError, DEFAULT_SEED, GameConfig, GameSection,
    PlayerKind, Production, UnitDef, UnitInstance, VictoryCondition, seed_hash,
};
pub use engine::{
    DecisionSource, Diagnostic, EnginePhase, FallbackReason, MAX_ACTIONS_PER_TURN, Step,
    TurnEngine,
};
pub use parser::{Command, ParseError, Popup, parse, parse_command};
pub use rules::{CombatReport, HireTerms, Outcome, check_victory, legal_actions, validate};
pub use snapshot::{PlayerSummary, TurnSnapshot};
pub use state::{AccessList, City, Construction, GameState, Recruitment};
