//! Mutable game state.
//!
//! The state is owned by the turn engine. Every other component sees it through
//! shared references or through [`TurnSnapshot`](crate::TurnSnapshot) copies.

use crate::action::PlayerIndex;
use crate::config::{CityConfig, GameConfig, PlayerKind};
use derive_getters::Getters;
use derive_new::new;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Which ids of one resource kind a city may acquire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessList {
    /// No restriction.
    Any,
    /// Only the listed ids.
    Only(Vec<String>),
    /// Everything except the listed ids.
    Except(Vec<String>),
}

impl AccessList {
    /// Builds the list from the configuration pair. Validation has already
    /// guaranteed that at most one side is set.
    fn from_lists(whitelist: &Option<Vec<String>>, blacklist: &Option<Vec<String>>) -> Self {
        match (whitelist, blacklist) {
            (Some(only), _) => AccessList::Only(only.clone()),
            (None, Some(except)) => AccessList::Except(except.clone()),
            (None, None) => AccessList::Any,
        }
    }

    /// Whether `id` may be acquired.
    pub fn permits(&self, id: &str) -> bool {
        let listed = |ids: &[String]| ids.iter().any(|i| i.eq_ignore_ascii_case(id));
        match self {
            AccessList::Any => true,
            AccessList::Only(ids) => listed(ids),
            AccessList::Except(ids) => !listed(ids),
        }
    }
}

/// A building under construction.
#[derive(Debug, Clone, PartialEq, Eq, Getters, new)]
pub struct Construction {
    building: String,
    remaining: u32,
}

/// A unit being recruited.
#[derive(Debug, Clone, PartialEq, Eq, Getters, new)]
pub struct Recruitment {
    unit: String,
    remaining: u32,
}

/// One player's city.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct City {
    name: String,
    kind: PlayerKind,
    x: u32,
    y: u32,
    resources: u32,
    resources_spent: u64,
    building_slots: u32,
    unit_slots: u32,
    /// Completed buildings, by canonical id.
    buildings: Vec<String>,
    constructions: Vec<Construction>,
    /// Unit roster: unit id to count.
    units: BTreeMap<String, u32>,
    recruitments: Vec<Recruitment>,
    building_access: AccessList,
    unit_access: AccessList,
}

impl City {
    /// Creates a city from its configuration, canonicalising ids.
    fn from_config(city: &CityConfig, config: &GameConfig) -> Self {
        let buildings = city
            .buildings()
            .iter()
            .filter_map(|b| config.building(b.building()))
            .map(|def| def.name().clone())
            .collect();

        let mut units = BTreeMap::new();
        for stack in city.units() {
            if let Some(def) = config.unit(stack.unit())
                && *stack.count() > 0
            {
                *units.entry(def.name().clone()).or_insert(0) += *stack.count();
            }
        }

        Self {
            name: city.name().clone(),
            kind: *city.player_type(),
            x: *city.x(),
            y: *city.y(),
            resources: *city.starting_resources(),
            resources_spent: 0,
            building_slots: *city.nb_slots_buildings(),
            unit_slots: *city.nb_slots_units(),
            buildings,
            constructions: Vec::new(),
            units,
            recruitments: Vec::new(),
            building_access: AccessList::from_lists(
                city.whitelist_buildings(),
                city.blacklist_buildings(),
            ),
            unit_access: AccessList::from_lists(city.whitelist_units(), city.blacklist_units()),
        }
    }

    /// Whether a completed building with this id stands in the city.
    pub fn has_building(&self, id: &str) -> bool {
        self.buildings.iter().any(|b| b.eq_ignore_ascii_case(id))
    }

    /// Building slots taken by completed buildings and constructions.
    pub fn used_building_slots(&self, config: &GameConfig) -> u32 {
        self.buildings
            .iter()
            .chain(self.constructions.iter().map(|c| &c.building))
            .filter_map(|id| config.building(id))
            .map(|def| *def.slots())
            .sum()
    }

    /// Units in the roster.
    pub fn unit_count(&self) -> u32 {
        self.units.values().sum()
    }

    /// Units in the roster plus pending recruitments.
    pub fn used_unit_slots(&self) -> u32 {
        self.unit_count() + self.recruitments.len() as u32
    }

    /// Aggregate attack: sum of count times attack.
    pub fn attack_power(&self, config: &GameConfig) -> u64 {
        self.units
            .iter()
            .filter_map(|(id, count)| {
                config
                    .unit(id)
                    .map(|def| u64::from(*count) * u64::from(*def.attack()))
            })
            .sum()
    }

    /// Chebyshev distance to another city.
    pub fn distance_to(&self, other: &City) -> u32 {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }

    /// Debits a cost that validation has already checked.
    pub(crate) fn spend(&mut self, amount: u32) {
        debug_assert!(
            amount <= self.resources,
            "{} would go negative: {} - {}",
            self.name,
            self.resources,
            amount
        );
        self.resources = self.resources.saturating_sub(amount);
        self.resources_spent += u64::from(amount);
    }

    pub(crate) fn credit(&mut self, amount: u32) {
        self.resources = self.resources.saturating_add(amount);
    }

    /// Removes up to `amount` resources and returns what was taken.
    pub(crate) fn take(&mut self, amount: u32) -> u32 {
        let taken = amount.min(self.resources);
        self.resources -= taken;
        taken
    }

    pub(crate) fn start_construction(&mut self, building: String, build_time: u32) {
        if build_time == 0 {
            self.buildings.push(building);
        } else {
            self.constructions.push(Construction::new(building, build_time));
        }
    }

    pub(crate) fn start_recruitment(&mut self, unit: String, time: u32) {
        if time == 0 {
            *self.units.entry(unit).or_insert(0) += 1;
        } else {
            self.recruitments.push(Recruitment::new(unit, time));
        }
    }

    /// Removes the whole roster (the committed units of a lost battle).
    pub(crate) fn disband(&mut self) -> u32 {
        let lost = self.unit_count();
        self.units.clear();
        lost
    }

    /// Turn-start processing: yields, then construction and recruitment timers.
    fn start_turn(&mut self, config: &GameConfig) {
        let income: u32 = self
            .buildings
            .iter()
            .filter_map(|id| config.building(id))
            .map(|def| def.resource_yield())
            .sum();
        self.credit(income);

        for construction in &mut self.constructions {
            construction.remaining = construction.remaining.saturating_sub(1);
        }
        let (done, pending): (Vec<_>, Vec<_>) = self
            .constructions
            .drain(..)
            .partition(|c| c.remaining == 0);
        self.constructions = pending;
        self.buildings.extend(done.into_iter().map(|c| c.building));

        for recruitment in &mut self.recruitments {
            recruitment.remaining = recruitment.remaining.saturating_sub(1);
        }
        let (done, pending): (Vec<_>, Vec<_>) = self
            .recruitments
            .drain(..)
            .partition(|r| r.remaining == 0);
        self.recruitments = pending;
        for recruitment in done {
            *self.units.entry(recruitment.unit).or_insert(0) += 1;
        }

        debug!(city = %self.name, income, resources = self.resources, "Turn started");
    }
}

/// Complete mutable game state.
#[derive(Debug, Clone, Getters)]
pub struct GameState {
    config: Arc<GameConfig>,
    /// Turn counter, monotonic.
    turn: u32,
    /// Index of the player holding priority.
    mover: PlayerIndex,
    /// Cities in turn order.
    cities: Vec<City>,
}

impl GameState {
    /// Creates the opening state described by `config`.
    #[instrument(skip(config))]
    pub fn new(config: Arc<GameConfig>) -> Self {
        let cities = config
            .cities()
            .iter()
            .map(|city| City::from_config(city, &config))
            .collect();
        let turn = *config.game().current_turn();
        debug!(turn, "Created game state");
        Self {
            config,
            turn,
            mover: 0,
            cities,
        }
    }

    /// Returns the city at `index`.
    pub fn city(&self, index: PlayerIndex) -> Option<&City> {
        self.cities.get(index)
    }

    /// Finds a city by name, ignoring ASCII case.
    pub fn city_index(&self, name: &str) -> Option<PlayerIndex> {
        self.cities
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// The seed the match was configured with.
    pub fn seed(&self) -> &str {
        self.config.game().seed()
    }

    pub(crate) fn city_mut(&mut self, index: PlayerIndex) -> Option<&mut City> {
        self.cities.get_mut(index)
    }

    /// Passes priority. Returns `true` when the cycle wrapped and a new turn began.
    pub(crate) fn advance_mover(&mut self) -> bool {
        self.mover = (self.mover + 1) % self.cities.len().max(1);
        if self.mover == 0 {
            self.turn += 1;
            let config = Arc::clone(&self.config);
            for city in &mut self.cities {
                city.start_turn(&config);
            }
            true
        } else {
            false
        }
    }
}
