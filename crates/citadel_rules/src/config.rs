//! Declarative game configuration.
//!
//! The configuration is produced by an external compiler as a JSON document and
//! consumed here as a finished artifact. Loading validates every cross reference
//! up front so that a malformed document is a startup failure, never a mid-match
//! surprise.

use derive_getters::Getters;
use derive_more::{Display, Error};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, instrument, warn};

/// Seed used when the configuration does not name one.
pub const DEFAULT_SEED: &str = "pokemon";

/// Who controls a city.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
pub enum PlayerKind {
    /// Driven by keyboard input (or by the AI when running headless).
    #[serde(alias = "player", alias = "PLAYER", alias = "Human", alias = "HUMAN")]
    #[strum(serialize = "human")]
    Human,
    /// Driven by the configured decision source.
    #[serde(alias = "AI", alias = "Ai")]
    #[strum(serialize = "ai")]
    Ai,
}

/// Global match settings.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct GameSection {
    /// Map width in tiles.
    map_x: u32,
    /// Map height in tiles.
    map_y: u32,
    /// Match seed; numbers are accepted and stringified.
    #[serde(default = "default_seed", deserialize_with = "seed_from_any")]
    seed: String,
    /// Turn number the match starts on.
    #[serde(default = "default_current_turn")]
    current_turn: u32,
    /// Maximum Chebyshev distance an attack may cover. `None` means unlimited.
    #[serde(default)]
    attack_range: Option<u32>,
}

fn default_seed() -> String {
    DEFAULT_SEED.to_string()
}

fn default_current_turn() -> u32 {
    1
}

fn default_slots() -> u32 {
    1
}

fn default_production_time() -> u32 {
    1
}

fn default_level() -> u32 {
    1
}

fn seed_from_any<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum AnySeed {
        Text(String),
        Number(u64),
    }

    Ok(match AnySeed::deserialize(deserializer)? {
        AnySeed::Text(text) => text,
        AnySeed::Number(number) => number.to_string(),
    })
}

/// What a completed building yields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Production {
    /// Credits `amount` resources at every turn start.
    #[serde(alias = "ressource")]
    Resource {
        /// Resources credited per turn.
        amount: u32,
        /// Kept for compatibility with the compiler output; production is per turn.
        #[serde(default = "default_production_time")]
        time: u32,
    },
    /// Enables hiring of `unit`.
    Unit {
        /// Unit id this building trains.
        #[serde(alias = "prod_unit_id")]
        unit: String,
        /// Extra resources charged per recruitment.
        #[serde(default)]
        cost: u32,
        /// Turn starts a recruitment takes to complete.
        #[serde(default)]
        time: u32,
    },
}

/// Definition of a building type.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct BuildingDef {
    /// Unique building id.
    name: String,
    /// Resources debited when construction starts.
    cost: u32,
    /// Turn starts before the building completes.
    #[serde(default)]
    build_time: u32,
    /// Building slots the building occupies.
    #[serde(default = "default_slots")]
    slots: u32,
    /// Buildings that must already stand in the city.
    #[serde(default)]
    prerequisites: Vec<String>,
    /// Optional yield of the completed building.
    #[serde(default)]
    production: Option<Production>,
}

impl BuildingDef {
    /// Unit id this building trains, if any.
    pub fn trains(&self) -> Option<&str> {
        match &self.production {
            Some(Production::Unit { unit, .. }) => Some(unit.as_str()),
            _ => None,
        }
    }

    /// Resources this building credits per turn start.
    pub fn resource_yield(&self) -> u32 {
        match &self.production {
            Some(Production::Resource { amount, .. }) => *amount,
            _ => 0,
        }
    }
}

/// Definition of a unit type.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct UnitDef {
    /// Unique unit id.
    name: String,
    /// Attack contributed by each unit in combat.
    attack: u32,
    /// Resources debited per hire.
    #[serde(default)]
    cost: u32,
}

/// A building standing in a city at match start.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct BuildingInstance {
    /// Building id.
    #[serde(alias = "id_building")]
    building: String,
    /// Building level (informational).
    #[serde(default = "default_level")]
    level: u32,
}

/// A stack of units present in a city at match start.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct UnitInstance {
    /// Unit id.
    #[serde(alias = "id_units")]
    unit: String,
    /// Number of units.
    #[serde(alias = "nb_units")]
    count: u32,
}

/// Initial description of one city (one player).
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct CityConfig {
    /// Unique city id, also the player's name.
    name: String,
    /// Column on the map.
    x: u32,
    /// Row on the map.
    y: u32,
    /// Controller of the city.
    player_type: PlayerKind,
    /// Opening resource balance.
    starting_resources: u32,
    /// Building slot capacity.
    nb_slots_buildings: u32,
    /// Unit capacity.
    nb_slots_units: u32,
    /// Buildings standing at match start.
    #[serde(default)]
    buildings: Vec<BuildingInstance>,
    /// Units present at match start.
    #[serde(default)]
    units: Vec<UnitInstance>,
    /// Only these buildings may be built.
    #[serde(default)]
    whitelist_buildings: Option<Vec<String>>,
    /// These buildings may not be built.
    #[serde(default)]
    blacklist_buildings: Option<Vec<String>>,
    /// Only these units may be hired.
    #[serde(default)]
    whitelist_units: Option<Vec<String>>,
    /// These units may not be hired.
    #[serde(default)]
    blacklist_units: Option<Vec<String>>,
    /// Display colour, passed through for front ends.
    #[serde(default)]
    color: Option<String>,
}

/// Victory predicates, combined with OR semantics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct VictoryCondition {
    /// Turn at which the match ends.
    #[serde(default)]
    nb_turns: Option<u32>,
    /// Cumulative resources spent that wins the match.
    #[serde(default)]
    resources_spent: Option<u64>,
}

/// Complete, validated game configuration. Never mutated after loading.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct GameConfig {
    /// Global settings.
    game: GameSection,
    /// Building catalogue.
    #[serde(default)]
    buildings: Vec<BuildingDef>,
    /// Unit catalogue.
    #[serde(default)]
    units: Vec<UnitDef>,
    /// Cities in turn order.
    cities: Vec<CityConfig>,
    /// Victory predicates.
    #[serde(default)]
    victory_conditions: VictoryCondition,
}

impl GameConfig {
    /// Loads and validates a configuration file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading game config from file");
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ConfigError::new(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_json_str(&content)
    }

    /// Parses and validates a configuration document.
    #[instrument(skip(content), fields(bytes = content.len()))]
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        info!(
            cities = config.cities.len(),
            buildings = config.buildings.len(),
            units = config.units.len(),
            seed = %config.game.seed,
            "Game config loaded"
        );
        Ok(config)
    }

    /// Checks every structural rule the engine relies on.
    #[instrument(skip(self))]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.game.map_x == 0 || self.game.map_y == 0 {
            return Err(ConfigError::new("Map dimensions must be non-zero".to_string()));
        }
        if self.cities.is_empty() {
            return Err(ConfigError::new("At least one city is required".to_string()));
        }

        check_ids("building", self.buildings.iter().map(|b| b.name.as_str()))?;
        check_ids("unit", self.units.iter().map(|u| u.name.as_str()))?;
        check_ids("city", self.cities.iter().map(|c| c.name.as_str()))?;

        for building in &self.buildings {
            for prereq in &building.prerequisites {
                self.require_building(prereq, &building.name)?;
            }
            if let Some(unit) = building.trains() {
                self.require_unit(unit, &building.name)?;
            }
        }

        for city in &self.cities {
            self.validate_city(city)?;
        }

        debug!("Game config validated");
        Ok(())
    }

    fn validate_city(&self, city: &CityConfig) -> Result<(), ConfigError> {
        let name = &city.name;

        if city.x >= self.game.map_x || city.y >= self.game.map_y {
            return Err(ConfigError::new(format!(
                "City {} at ({}, {}) lies outside the {}x{} map",
                name, city.x, city.y, self.game.map_x, self.game.map_y
            )));
        }

        if city.whitelist_buildings.is_some() && city.blacklist_buildings.is_some() {
            warn!(city = %name, "Conflicting building lists");
            return Err(ConfigError::new(format!(
                "City {} declares both a whitelist and a blacklist for buildings",
                name
            )));
        }
        if city.whitelist_units.is_some() && city.blacklist_units.is_some() {
            warn!(city = %name, "Conflicting unit lists");
            return Err(ConfigError::new(format!(
                "City {} declares both a whitelist and a blacklist for units",
                name
            )));
        }

        for id in city
            .whitelist_buildings
            .iter()
            .chain(city.blacklist_buildings.iter())
            .flatten()
        {
            self.require_building(id, name)?;
        }
        for id in city
            .whitelist_units
            .iter()
            .chain(city.blacklist_units.iter())
            .flatten()
        {
            self.require_unit(id, name)?;
        }

        let mut used_slots = 0u64;
        for instance in &city.buildings {
            let def = self.require_building(&instance.building, name)?;
            used_slots += u64::from(def.slots);
        }
        if used_slots > u64::from(city.nb_slots_buildings) {
            return Err(ConfigError::new(format!(
                "City {} starts with {} building slots used but only has {}",
                name, used_slots, city.nb_slots_buildings
            )));
        }

        let mut unit_count = 0u64;
        for instance in &city.units {
            self.require_unit(&instance.unit, name)?;
            unit_count += u64::from(instance.count);
        }
        if unit_count > u64::from(city.nb_slots_units) {
            return Err(ConfigError::new(format!(
                "City {} starts with {} units but only has room for {}",
                name, unit_count, city.nb_slots_units
            )));
        }

        Ok(())
    }

    fn require_building(&self, id: &str, referrer: &str) -> Result<&BuildingDef, ConfigError> {
        self.building(id).ok_or_else(|| {
            ConfigError::new(format!("{} references unknown building {}", referrer, id))
        })
    }

    fn require_unit(&self, id: &str, referrer: &str) -> Result<&UnitDef, ConfigError> {
        self.unit(id).ok_or_else(|| {
            ConfigError::new(format!("{} references unknown unit {}", referrer, id))
        })
    }

    /// Looks up a building definition, ignoring ASCII case.
    pub fn building(&self, id: &str) -> Option<&BuildingDef> {
        self.buildings
            .iter()
            .find(|b| b.name.eq_ignore_ascii_case(id))
    }

    /// Looks up a unit definition, ignoring ASCII case.
    pub fn unit(&self, id: &str) -> Option<&UnitDef> {
        self.units.iter().find(|u| u.name.eq_ignore_ascii_case(id))
    }

    /// Building definitions that train the given unit.
    pub fn producers_of<'a>(&'a self, unit: &'a str) -> impl Iterator<Item = &'a BuildingDef> + 'a {
        self.buildings.iter().filter(move |b| {
            b.trains()
                .is_some_and(|trained| trained.eq_ignore_ascii_case(unit))
        })
    }

    /// The seed hashed to a `u64` for seeding random generators.
    pub fn seed_value(&self) -> u64 {
        seed_hash(&self.game.seed)
    }
}

impl Default for GameConfig {
    /// The built-in two-city scenario used when no configuration file is given.
    fn default() -> Self {
        let city = |name: &str, x: u32, y: u32, kind: PlayerKind, color: &str| CityConfig {
            name: name.to_string(),
            x,
            y,
            player_type: kind,
            starting_resources: 100,
            nb_slots_buildings: 5,
            nb_slots_units: 10,
            buildings: Vec::new(),
            units: Vec::new(),
            whitelist_buildings: None,
            blacklist_buildings: None,
            whitelist_units: None,
            blacklist_units: None,
            color: Some(color.to_string()),
        };

        Self {
            game: GameSection {
                map_x: 160,
                map_y: 40,
                seed: default_seed(),
                current_turn: default_current_turn(),
                attack_range: None,
            },
            buildings: vec![
                BuildingDef {
                    name: "Farm".to_string(),
                    cost: 10,
                    build_time: 2,
                    slots: 1,
                    prerequisites: Vec::new(),
                    production: Some(Production::Resource { amount: 5, time: 1 }),
                },
                BuildingDef {
                    name: "Barracks".to_string(),
                    cost: 20,
                    build_time: 4,
                    slots: 1,
                    prerequisites: Vec::new(),
                    production: Some(Production::Unit {
                        unit: "Warrior".to_string(),
                        cost: 5,
                        time: 3,
                    }),
                },
            ],
            units: vec![UnitDef {
                name: "Warrior".to_string(),
                attack: 1,
                cost: 0,
            }],
            cities: vec![
                city("Player", 10, 10, PlayerKind::Human, "#0000FF"),
                city("IA", 20, 20, PlayerKind::Ai, "#FF0000"),
            ],
            victory_conditions: VictoryCondition {
                nb_turns: Some(500),
                resources_spent: Some(300),
            },
        }
    }
}

/// Ids must be non-empty, free of whitespace (the action grammar splits on it)
/// and unique ignoring case.
fn check_ids<'a>(kind: &str, ids: impl Iterator<Item = &'a str>) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for id in ids {
        if id.is_empty() || id.chars().any(char::is_whitespace) {
            return Err(ConfigError::new(format!(
                "Invalid {} id {:?}: ids must be non-empty and contain no whitespace",
                kind, id
            )));
        }
        if !seen.insert(id.to_ascii_lowercase()) {
            return Err(ConfigError::new(format!("Duplicate {} id {}", kind, id)));
        }
    }
    Ok(())
}

/// FNV-1a hash of the textual seed.
pub fn seed_hash(seed: &str) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    seed.bytes().fold(OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(PRIME)
    })
}

/// Configuration error. Always fatal at startup.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}
