//! Action validation.
//!
//! [`validate`] is the single authority on legality. It never mutates state and
//! never partially validates: the first failed check decides the error.

use crate::action::{Action, ActionError, PlayerIndex};
use crate::config::{BuildingDef, Production, UnitDef};
use crate::state::{City, GameState};
use tracing::instrument;

/// Price and duration of hiring one unit in a particular city.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HireTerms {
    /// Unit cost plus the producing building's charge.
    pub cost: u32,
    /// Turn starts until the unit joins the roster.
    pub time: u32,
}

/// Checks whether `actor` may perform `action` in `state`.
#[instrument(skip(state), fields(turn = *state.turn(), mover = *state.mover()))]
pub fn validate(state: &GameState, action: &Action, actor: PlayerIndex) -> Result<(), ActionError> {
    let city = acting_city(state, actor)?;

    match action {
        Action::Build(id) => check_build(state, city, id).map(|_| ()),
        Action::Hire(id) => {
            let unit = state
                .config()
                .unit(id)
                .ok_or_else(|| ActionError::UnknownUnit(id.clone()))?;
            hire_terms(state, city, unit).map(|_| ())
        }
        Action::Attack(target) => check_attack(state, actor, target),
        Action::EndTurn => Ok(()),
    }
}

/// Every action `actor` could legally take right now, in a stable order:
/// builds and hires in catalogue order, attacks in turn order, then `EndTurn`.
pub fn legal_actions(state: &GameState, actor: PlayerIndex) -> Vec<Action> {
    let Ok(city) = acting_city(state, actor) else {
        return Vec::new();
    };
    let config = state.config();

    let builds = config
        .buildings()
        .iter()
        .filter(|def| check_build(state, city, def.name()).is_ok())
        .map(|def| Action::Build(def.name().clone()));

    let hires = config
        .units()
        .iter()
        .filter(|def| hire_terms(state, city, def).is_ok())
        .map(|def| Action::Hire(def.name().clone()));

    let attacks = state
        .cities()
        .iter()
        .filter(|target| check_attack(state, actor, target.name()).is_ok())
        .map(|target| Action::Attack(target.name().clone()));

    builds
        .chain(hires)
        .chain(attacks)
        .chain(std::iter::once(Action::EndTurn))
        .collect()
}

fn acting_city(state: &GameState, actor: PlayerIndex) -> Result<&City, ActionError> {
    let mover = *state.mover();
    if actor != mover {
        return Err(ActionError::NotYourTurn { actor, mover });
    }
    state
        .city(actor)
        .ok_or(ActionError::NotYourTurn { actor, mover })
}

fn check_build<'a>(
    state: &'a GameState,
    city: &City,
    id: &str,
) -> Result<&'a BuildingDef, ActionError> {
    let config = state.config();
    let def = config
        .building(id)
        .ok_or_else(|| ActionError::UnknownBuilding(id.to_string()))?;

    if !city.building_access().permits(def.name()) {
        return Err(ActionError::NotAllowed(def.name().clone()));
    }

    if let Some(missing) = def
        .prerequisites()
        .iter()
        .find(|prereq| !city.has_building(prereq))
    {
        return Err(ActionError::MissingPrerequisite {
            subject: def.name().clone(),
            missing: missing.clone(),
        });
    }

    let free = city
        .building_slots()
        .saturating_sub(city.used_building_slots(config));
    if *def.slots() > free {
        return Err(ActionError::NoFreeSlot(def.name().clone()));
    }

    ensure_affordable(city, *def.cost())?;
    Ok(def)
}

/// Works out what hiring `unit` costs `city`, or why it cannot.
///
/// A unit trained by some building requires a completed producer; the first
/// completed producer in catalogue order sets the extra charge and the delay.
/// A unit nothing trains is hired immediately at its base cost.
pub fn hire_terms(state: &GameState, city: &City, unit: &UnitDef) -> Result<HireTerms, ActionError> {
    let config = state.config();

    if !city.unit_access().permits(unit.name()) {
        return Err(ActionError::NotAllowed(unit.name().clone()));
    }

    let first_producer = config
        .producers_of(unit.name())
        .next()
        .map(|def| def.name().clone());
    let terms = match first_producer {
        None => HireTerms {
            cost: *unit.cost(),
            time: 0,
        },
        Some(first) => {
            let producer = config
                .producers_of(unit.name())
                .find(|def| city.has_building(def.name()))
                .ok_or(ActionError::MissingPrerequisite {
                    subject: unit.name().clone(),
                    missing: first,
                })?;
            let (charge, time) = match producer.production() {
                Some(Production::Unit { cost, time, .. }) => (*cost, *time),
                _ => (0, 0),
            };
            HireTerms {
                cost: unit.cost().saturating_add(charge),
                time,
            }
        }
    };

    if city.used_unit_slots() >= *city.unit_slots() {
        return Err(ActionError::NoFreeSlot(unit.name().clone()));
    }

    ensure_affordable(city, terms.cost)?;
    Ok(terms)
}

fn check_attack(state: &GameState, actor: PlayerIndex, target: &str) -> Result<(), ActionError> {
    let invalid = || ActionError::InvalidTarget(target.to_string());

    let target_index = state.city_index(target).ok_or_else(invalid)?;
    if target_index == actor {
        return Err(invalid());
    }

    let (Some(attacker), Some(defender)) = (state.city(actor), state.city(target_index)) else {
        return Err(invalid());
    };

    if let Some(range) = state.config().game().attack_range()
        && attacker.distance_to(defender) > *range
    {
        return Err(invalid());
    }

    if attacker.attack_power(state.config()) == 0 {
        return Err(ActionError::NoUnits);
    }

    Ok(())
}

fn ensure_affordable(city: &City, cost: u32) -> Result<(), ActionError> {
    if *city.resources() < cost {
        Err(ActionError::InsufficientResources {
            needed: cost,
            available: *city.resources(),
        })
    } else {
        Ok(())
    }
}
