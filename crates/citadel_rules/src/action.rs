//! First-class action types.
//!
//! Actions carry intent only. They hold no implicit context and are always
//! validated against the current state before application.

use serde::{Deserialize, Serialize};

/// Index of a player (city) in turn order.
pub type PlayerIndex = usize;

/// Something a player can do on its turn.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "action", content = "target", rename_all = "snake_case")]
pub enum Action {
    /// Start constructing a building.
    Build(String),
    /// Recruit one unit.
    Hire(String),
    /// Attack another city.
    Attack(String),
    /// Pass priority to the next player.
    EndTurn,
}

/// Verb of an action, without its target.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ActionKind {
    /// See [`Action::Build`].
    Build,
    /// See [`Action::Hire`].
    Hire,
    /// See [`Action::Attack`].
    Attack,
    /// See [`Action::EndTurn`].
    #[strum(serialize = "end")]
    EndTurn,
}

impl Action {
    /// Returns the verb of this action.
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Build(_) => ActionKind::Build,
            Action::Hire(_) => ActionKind::Hire,
            Action::Attack(_) => ActionKind::Attack,
            Action::EndTurn => ActionKind::EndTurn,
        }
    }

    /// Returns the id the action targets, if any.
    pub fn target(&self) -> Option<&str> {
        match self {
            Action::Build(id) | Action::Hire(id) | Action::Attack(id) => Some(id),
            Action::EndTurn => None,
        }
    }

    /// Builds an action from a verb and a target.
    pub fn with_target(kind: ActionKind, target: impl Into<String>) -> Self {
        match kind {
            ActionKind::Build => Action::Build(target.into()),
            ActionKind::Hire => Action::Hire(target.into()),
            ActionKind::Attack => Action::Attack(target.into()),
            ActionKind::EndTurn => Action::EndTurn,
        }
    }

    /// Whether this action passes priority.
    pub fn is_end_turn(&self) -> bool {
        matches!(self, Action::EndTurn)
    }
}

/// Canonical textual form, accepted back by the response parser.
impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.target() {
            Some(target) => write!(f, "{} {}", self.kind(), target),
            None => write!(f, "{}", self.kind()),
        }
    }
}

/// Reason an action was rejected.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum ActionError {
    /// The actor does not hold priority.
    #[display("Player {} acted during player {}'s turn", actor, mover)]
    NotYourTurn {
        /// Player that tried to act.
        actor: PlayerIndex,
        /// Player holding priority.
        mover: PlayerIndex,
    },

    /// No building with this id is defined.
    #[display("Unknown building: {}", _0)]
    UnknownBuilding(String),

    /// No unit with this id is defined.
    #[display("Unknown unit: {}", _0)]
    UnknownUnit(String),

    /// The city's allow/deny list forbids this id.
    #[display("{} is not allowed in this city", _0)]
    NotAllowed(String),

    /// A required building is not standing in the city.
    #[display("{} requires {}", subject, missing)]
    MissingPrerequisite {
        /// Building or unit being acquired.
        subject: String,
        /// Building that is missing.
        missing: String,
    },

    /// No building slot or unit capacity left.
    #[display("No free slot for {}", _0)]
    NoFreeSlot(String),

    /// The balance cannot cover the cost.
    #[display("Insufficient resources: need {}, have {}", needed, available)]
    InsufficientResources {
        /// Cost of the action.
        needed: u32,
        /// Current balance.
        available: u32,
    },

    /// The attack target is unknown, the attacker itself, or out of range.
    #[display("Invalid attack target: {}", _0)]
    InvalidTarget(String),

    /// The attacker has no combat-capable units.
    #[display("No combat-capable units")]
    NoUnits,

    /// The match has already ended.
    #[display("Match is over")]
    MatchOver,
}

impl std::error::Error for ActionError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_text() {
        assert_eq!(Action::Build("Farm".into()).to_string(), "build Farm");
        assert_eq!(Action::Hire("Warrior".into()).to_string(), "hire Warrior");
        assert_eq!(Action::Attack("IA".into()).to_string(), "attack IA");
        assert_eq!(Action::EndTurn.to_string(), "end");
    }

    #[test]
    fn test_with_target_matches_kind() {
        for kind in <ActionKind as strum::IntoEnumIterator>::iter() {
            assert_eq!(Action::with_target(kind, "x").kind(), kind);
        }
    }

    #[test]
    fn test_error_messages() {
        let err = ActionError::InsufficientResources {
            needed: 15,
            available: 10,
        };
        assert_eq!(err.to_string(), "Insufficient resources: need 15, have 10");
    }
}
