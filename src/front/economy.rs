//! Read-only economic inputs used to size and seed fronts
//!
//! Nothing here is ever mutated by the war: the surrounding application owns
//! the real economy and hands in a snapshot when war is declared.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::config::FrontConfig;
use crate::units::CatalogLoadError;

const DEFAULT_BUILDINGS: &str = include_str!("../../data/buildings.toml");

/// Outputs that are not material resources and never seed resource nodes
const NON_RESOURCE_OUTPUTS: [&str; 5] = ["max_pop", "military_capacity", "admin", "culture", "science"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildingCategory {
    Gather,
    Civic,
    Military,
    Industry,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingDef {
    pub id: String,
    pub name: String,
    pub category: BuildingCategory,
    pub era: u32,
    #[serde(default)]
    pub output: BTreeMap<String, f64>,
}

impl BuildingDef {
    /// Largest material output, if any: `(resource, rate)`
    pub fn main_output(&self) -> Option<(&str, f64)> {
        self.output
            .iter()
            .filter(|(k, _)| !NON_RESOURCE_OUTPUTS.contains(&k.as_str()))
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(k, &v)| (k.as_str(), v))
    }
}

#[derive(Debug, Clone, Default)]
pub struct BuildingCatalog {
    defs: Vec<BuildingDef>,
    index: AHashMap<String, usize>,
}

impl BuildingCatalog {
    /// Catalog built from the shipped `data/buildings.toml`
    pub fn with_defaults() -> Self {
        match Self::parse_toml(DEFAULT_BUILDINGS) {
            Ok(catalog) => catalog,
            Err(e) => {
                tracing::error!("built-in building catalog is invalid: {e}");
                Self::default()
            }
        }
    }

    pub fn parse_toml(content: &str) -> Result<Self, CatalogLoadError> {
        #[derive(Deserialize)]
        struct TomlBuildings {
            #[serde(default)]
            building: Vec<BuildingDef>,
        }

        let data: TomlBuildings =
            toml::from_str(content).map_err(|e| CatalogLoadError::ParseError(e.to_string()))?;
        let mut catalog = Self::default();
        for def in data.building {
            if catalog.index.contains_key(&def.id) {
                return Err(CatalogLoadError::DuplicateBuilding(def.id));
            }
            catalog.index.insert(def.id.clone(), catalog.defs.len());
            catalog.defs.push(def);
        }
        Ok(catalog)
    }

    pub fn get(&self, id: &str) -> Option<&BuildingDef> {
        self.index.get(id).map(|&i| &self.defs[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &BuildingDef> {
        self.defs.iter()
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

/// Economic state of one belligerent at war declaration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EconomySnapshot {
    pub wealth: f64,
    pub population: f64,
    pub army_size: u32,
    pub era: u32,
    /// Owned building counts by building id
    #[serde(default)]
    pub buildings: BTreeMap<String, u32>,
    /// Upgrade level per building id (0 when absent)
    #[serde(default)]
    pub building_levels: BTreeMap<String, u32>,
}

impl EconomySnapshot {
    pub fn level_of(&self, building: &str) -> u32 {
        self.building_levels.get(building).copied().unwrap_or(0)
    }

    /// Owned buildings with a positive count, in id order
    pub fn owned(&self) -> impl Iterator<Item = (&str, u32)> {
        self.buildings
            .iter()
            .filter(|(_, &n)| n > 0)
            .map(|(id, &n)| (id.as_str(), n))
    }

    /// National power used for front sizing
    pub fn power(&self, config: &FrontConfig) -> f64 {
        (self.army_size as f64 * config.army_power_weight
            + self.wealth * config.wealth_power_weight
            + self.population * config.population_power_weight)
            .floor()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_buildings_load() {
        let catalog = BuildingCatalog::with_defaults();
        assert!(catalog.len() >= 20);
        let farm = catalog.get("farm").unwrap();
        assert_eq!(farm.category, BuildingCategory::Gather);
        assert_eq!(farm.main_output(), Some(("food", 3.0)));
        assert!(catalog.get("hut").unwrap().main_output().is_none());
        assert!(catalog.get("nowhere").is_none());
    }

    #[test]
    fn test_duplicate_building_rejected() {
        let toml = r#"
            [[building]]
            id = "farm"
            name = "Farm"
            category = "gather"
            era = 0

            [[building]]
            id = "farm"
            name = "Farm again"
            category = "gather"
            era = 0
        "#;
        assert_eq!(
            BuildingCatalog::parse_toml(toml).unwrap_err(),
            CatalogLoadError::DuplicateBuilding("farm".into())
        );
    }

    #[test]
    fn test_nation_power() {
        let eco = EconomySnapshot {
            wealth: 1000.0,
            population: 200.0,
            army_size: 50,
            ..Default::default()
        };
        // 50*10 + 1000*0.5 + 200*2
        assert_eq!(eco.power(&FrontConfig::default()), 1400.0);
    }
}
