//! Game rules.
//!
//! Pure functions over [`GameState`](crate::GameState): action validation,
//! combat resolution and victory detection. None of them mutate state.

pub mod combat;
pub mod validate;
pub mod victory;

pub use combat::{CombatReport, FAILED_ATTACK_LOSS, PLUNDER, resolve_combat};
pub use validate::{HireTerms, hire_terms, legal_actions, validate};
pub use victory::{Outcome, check_victory};
