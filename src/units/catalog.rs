//! Unit catalog - static per-unit combat stats, costs and counters
//!
//! The catalog is an explicit context object: callers construct one (usually
//! via [`UnitCatalog::with_defaults`]) and pass it by reference. Lookups of
//! unknown ids return `None`, which combat code treats as "no contribution".

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::units::ability::Ability;
use crate::units::army::Army;
use crate::units::category::{PerCategory, UnitCategory};

const DEFAULT_CATALOG: &str = include_str!("../../data/units.toml");

/// Era a unit stays current for when the catalog does not say otherwise
pub const DEFAULT_OBSOLESCENCE: u32 = 2;

/// Immutable catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitType {
    pub id: String,
    pub name: String,
    pub category: UnitCategory,
    pub era: u32,
    pub attack: f64,
    pub defense: f64,
    pub speed: f64,
    pub range: f64,
    pub abilities: Vec<Ability>,
    /// Attack multiplier against each enemy category (1.0 = neutral)
    pub counters: PerCategory<f64>,
    pub obsolescence: u32,
    pub population: u32,
    pub recruit_cost: BTreeMap<String, f64>,
    pub maintenance: BTreeMap<String, f64>,
}

impl UnitType {
    pub fn has_ability(&self, ability: Ability) -> bool {
        self.abilities.contains(&ability)
    }

    pub fn counter_against(&self, category: UnitCategory) -> f64 {
        self.counters.get(category)
    }
}

/// Catalog of all unit types, keyed by id
#[derive(Debug, Clone, Default)]
pub struct UnitCatalog {
    units: Vec<UnitType>,
    index: AHashMap<String, usize>,
}

impl UnitCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog built from the shipped `data/units.toml`
    pub fn with_defaults() -> Self {
        match Self::parse_toml(DEFAULT_CATALOG) {
            Ok(catalog) => catalog,
            Err(e) => {
                tracing::error!("built-in unit catalog is invalid: {e}");
                Self::new()
            }
        }
    }

    /// Add or replace a unit type
    pub fn add(&mut self, unit: UnitType) {
        match self.index.get(&unit.id) {
            Some(&i) => self.units[i] = unit,
            None => {
                self.index.insert(unit.id.clone(), self.units.len());
                self.units.push(unit);
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&UnitType> {
        self.index.get(id).map(|&i| &self.units[i])
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Unit types in authoring order
    pub fn iter(&self) -> impl Iterator<Item = &UnitType> {
        self.units.iter()
    }

    /// Whether a unit has fallen more than its obsolescence window behind
    /// `current_era`. Unknown ids are never obsolete.
    pub fn is_obsolete(&self, id: &str, current_era: u32) -> bool {
        match self.get(id) {
            Some(unit) => current_era as i64 - unit.era as i64 > unit.obsolescence as i64,
            None => false,
        }
    }

    /// Units that can be fielded in `era`: already introduced, not obsolete
    pub fn units_for_era(&self, era: u32) -> Vec<&UnitType> {
        self.units
            .iter()
            .filter(|u| u.era <= era && !self.is_obsolete(&u.id, era))
            .collect()
    }

    /// Per-category head counts of an army; unknown ids are skipped
    pub fn category_counts(&self, army: &Army) -> PerCategory<u32> {
        let mut counts = PerCategory::default();
        for (id, count) in army.iter() {
            if let Some(unit) = self.get(id) {
                counts.add(unit.category, count);
            }
        }
        counts
    }

    /// Display power of an army: sum of count × (attack + defense)
    pub fn army_power(&self, army: &Army) -> f64 {
        army.iter()
            .filter_map(|(id, count)| self.get(id).map(|u| count as f64 * (u.attack + u.defense)))
            .sum()
    }

    /// Population consumed by an army
    pub fn army_population(&self, army: &Army) -> u32 {
        army.iter()
            .filter_map(|(id, count)| self.get(id).map(|u| count * u.population))
            .sum()
    }

    /// Daily upkeep of an army, per resource
    pub fn army_maintenance(&self, army: &Army) -> BTreeMap<String, f64> {
        let mut upkeep = BTreeMap::new();
        for (id, count) in army.iter() {
            let Some(unit) = self.get(id) else { continue };
            for (resource, amount) in &unit.maintenance {
                *upkeep.entry(resource.clone()).or_insert(0.0) += amount * count as f64;
            }
        }
        upkeep
    }

    /// Speed of the slowest known unit present, if any
    pub fn slowest_speed(&self, army: &Army) -> Option<f64> {
        army.iter()
            .filter(|(_, count)| *count > 0)
            .filter_map(|(id, _)| self.get(id).map(|u| u.speed))
            .min_by(|a, b| a.total_cmp(b))
    }

    /// Load a catalog from a TOML file
    pub fn load_from_toml(path: &std::path::Path) -> Result<Self, CatalogLoadError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CatalogLoadError::IoError(e.to_string()))?;
        Self::parse_toml(&content)
    }

    /// Parse a catalog from a TOML string
    pub fn parse_toml(content: &str) -> Result<Self, CatalogLoadError> {
        let toml_data: TomlCatalog =
            toml::from_str(content).map_err(|e| CatalogLoadError::ParseError(e.to_string()))?;

        let mut catalog = Self::new();
        for unit in toml_data.unit {
            if catalog.get(&unit.id).is_some() {
                return Err(CatalogLoadError::DuplicateUnit(unit.id));
            }
            catalog.add(unit.into_unit_type()?);
        }
        Ok(catalog)
    }
}

/// Error type for catalog loading
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CatalogLoadError {
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Invalid category: {0}")]
    InvalidCategory(String),
    #[error("Invalid ability: {0}")]
    InvalidAbility(String),
    #[error("Duplicate unit id: {0}")]
    DuplicateUnit(String),
    #[error("Duplicate building id: {0}")]
    DuplicateBuilding(String),
}

#[derive(Debug, Deserialize)]
struct TomlCatalog {
    #[serde(default)]
    unit: Vec<TomlUnit>,
}

#[derive(Debug, Deserialize)]
struct TomlUnit {
    id: String,
    name: String,
    category: String,
    era: u32,
    attack: f64,
    defense: f64,
    speed: f64,
    range: f64,
    #[serde(default)]
    abilities: Vec<String>,
    #[serde(default)]
    counters: BTreeMap<String, f64>,
    #[serde(default = "default_obsolescence")]
    obsolescence: u32,
    #[serde(default = "default_population")]
    population: u32,
    #[serde(default)]
    recruit_cost: BTreeMap<String, f64>,
    #[serde(default)]
    maintenance: BTreeMap<String, f64>,
}

fn default_obsolescence() -> u32 {
    DEFAULT_OBSOLESCENCE
}

fn default_population() -> u32 {
    1
}

impl TomlUnit {
    fn into_unit_type(self) -> Result<UnitType, CatalogLoadError> {
        let category = UnitCategory::from_name(&self.category)
            .ok_or_else(|| CatalogLoadError::InvalidCategory(self.category.clone()))?;

        let abilities = self
            .abilities
            .iter()
            .map(|tag| {
                Ability::from_tag(tag).ok_or_else(|| CatalogLoadError::InvalidAbility(tag.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut counters = PerCategory::splat(1.0);
        for (name, bonus) in &self.counters {
            let target = UnitCategory::from_name(name)
                .ok_or_else(|| CatalogLoadError::InvalidCategory(name.clone()))?;
            counters.set(target, *bonus);
        }

        Ok(UnitType {
            id: self.id,
            name: self.name,
            category,
            era: self.era,
            attack: self.attack,
            defense: self.defense,
            speed: self.speed,
            range: self.range,
            abilities,
            counters,
            obsolescence: self.obsolescence,
            population: self.population,
            recruit_cost: self.recruit_cost,
            maintenance: self.maintenance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_loads_every_unit() {
        let catalog = UnitCatalog::parse_toml(DEFAULT_CATALOG).unwrap();
        assert_eq!(catalog.len(), 25);

        let knight = catalog.get("knight").unwrap();
        assert_eq!(knight.category, UnitCategory::Cavalry);
        assert_eq!(knight.attack, 28.0);
        assert!(knight.has_ability(Ability::HeavyArmor));
        assert_eq!(knight.counter_against(UnitCategory::Archer), 1.9);
        assert_eq!(knight.counter_against(UnitCategory::Infantry), 1.0);

        let artillery = catalog.get("artillery").unwrap();
        assert_eq!(artillery.population, 4);
        assert_eq!(artillery.obsolescence, 3);
    }

    #[test]
    fn test_unknown_unit_is_none_and_never_obsolete() {
        let catalog = UnitCatalog::with_defaults();
        assert!(catalog.get("laser_tank").is_none());
        assert!(!catalog.is_obsolete("laser_tank", 6));
    }

    #[test]
    fn test_obsolescence_window() {
        let catalog = UnitCatalog::with_defaults();
        // militia: era 0, window 2
        assert!(!catalog.is_obsolete("militia", 2));
        assert!(catalog.is_obsolete("militia", 3));
        // an era before introduction is not obsolescence
        assert!(!catalog.is_obsolete("artillery", 0));
    }

    #[test]
    fn test_units_for_era() {
        let catalog = UnitCatalog::with_defaults();
        let ids: Vec<&str> = catalog.units_for_era(1).iter().map(|u| u.id.as_str()).collect();
        assert!(ids.contains(&"militia"));
        assert!(ids.contains(&"chariot"));
        assert!(!ids.contains(&"hoplite"));

        let late: Vec<&str> = catalog.units_for_era(6).iter().map(|u| u.id.as_str()).collect();
        assert!(!late.contains(&"militia"));
        assert!(late.contains(&"pikeman"));
    }

    #[test]
    fn test_army_queries_skip_unknown_ids() {
        let catalog = UnitCatalog::with_defaults();
        let army = Army::from_pairs([("militia", 10), ("trebuchet", 2), ("ghost", 50)]);

        assert_eq!(catalog.army_power(&army), 10.0 * 10.0 + 2.0 * 53.0);
        assert_eq!(catalog.army_population(&army), 10 + 6);
        assert_eq!(catalog.slowest_speed(&army), Some(1.0));

        let counts = catalog.category_counts(&army);
        assert_eq!(counts.get(UnitCategory::Infantry), 10);
        assert_eq!(counts.get(UnitCategory::Siege), 2);
        assert_eq!(counts.total(), 12);

        let upkeep = catalog.army_maintenance(&army);
        assert!((upkeep["food"] - (17.5 + 15.0)).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_unknown_ability() {
        let err = UnitCatalog::parse_toml(
            r#"
            [[unit]]
            id = "wizard"
            name = "Wizard"
            category = "infantry"
            era = 0
            attack = 1
            defense = 1
            speed = 1
            range = 1
            abilities = ["fireball"]
            "#,
        )
        .unwrap_err();
        assert_eq!(err, CatalogLoadError::InvalidAbility("fireball".into()));
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let unit = r#"
            [[unit]]
            id = "a"
            name = "A"
            category = "archer"
            era = 0
            attack = 1
            defense = 1
            speed = 1
            range = 1
        "#;
        let err = UnitCatalog::parse_toml(&format!("{unit}\n{unit}")).unwrap_err();
        assert_eq!(err, CatalogLoadError::DuplicateUnit("a".into()));
    }
}
