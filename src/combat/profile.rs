//! Combat profile builder
//!
//! Converts an army composition plus the opposing composition into
//! aggregate attack and defense figures. Profiles are ephemeral: built fresh
//! for each encounter and consumed by the resolver.

use serde::{Deserialize, Serialize};

use crate::combat::abilities::{flat_bonuses, situational_modifiers};
use crate::core::config::CombatConfig;
use crate::units::{Army, PerCategory, UnitCatalog, UnitCategory};

/// Per-unit-type line of a combat profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitProfile {
    pub unit_id: String,
    pub category: UnitCategory,
    pub count: u32,
    pub attack_per_unit: f64,
    pub defense_per_unit: f64,
    /// Defense after the enemy's counter pressure on this category
    pub adjusted_defense_per_unit: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CombatProfile {
    pub units: Vec<UnitProfile>,
    pub total_attack: f64,
    pub total_defense: f64,
    pub total_units: u32,
    pub category_counts: PerCategory<u32>,
    /// Counter pressure the opponent exerts on each of our categories
    pub pressure: PerCategory<f64>,
}

impl CombatProfile {
    pub fn is_empty(&self) -> bool {
        self.total_units == 0
    }

    /// Power before jitter: weighted sum of attack and defense
    pub fn base_power(&self, config: &CombatConfig) -> f64 {
        self.total_attack * config.attack_power_weight
            + self.total_defense * config.defense_power_weight
    }
}

/// Per-category head count of an army
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ForceSummary {
    pub counts: PerCategory<u32>,
    pub total: u32,
}

impl ForceSummary {
    pub fn of(catalog: &UnitCatalog, army: &Army) -> Self {
        let counts = catalog.category_counts(army);
        Self {
            total: counts.total(),
            counts,
        }
    }
}

/// How badly `enemy` punishes each of our categories
///
/// For each category this is `1 + Σ (enemyCounter[category] - 1) × share`,
/// summed over the enemy's unit types.
pub fn counter_pressure(catalog: &UnitCatalog, enemy: &Army) -> PerCategory<f64> {
    let mut pressure = PerCategory::splat(1.0);
    let enemy_total = catalog.category_counts(enemy).total();
    if enemy_total == 0 {
        return pressure;
    }
    for (id, count) in enemy.iter() {
        let Some(unit) = catalog.get(id) else { continue };
        let weight = count as f64 / enemy_total as f64;
        for category in UnitCategory::ALL {
            let current = pressure.get(category);
            pressure.set(category, current + (unit.counter_against(category) - 1.0) * weight);
        }
    }
    pressure
}

/// Builder for one side's combat profile
#[derive(Debug, Clone)]
pub struct ProfileBuilder<'a> {
    catalog: &'a UnitCatalog,
    config: &'a CombatConfig,
    buff: f64,
    defense_multiplier: f64,
}

impl<'a> ProfileBuilder<'a> {
    pub fn new(catalog: &'a UnitCatalog, config: &'a CombatConfig) -> Self {
        Self {
            catalog,
            config,
            buff: 0.0,
            defense_multiplier: 1.0,
        }
    }

    /// Side-wide buff applied to attack and defense (0.1 = +10%)
    pub fn with_buff(mut self, buff: f64) -> Self {
        self.buff = buff;
        self
    }

    pub fn with_defense_multiplier(mut self, multiplier: f64) -> Self {
        self.defense_multiplier = multiplier;
        self
    }

    /// Preset for the defending side of an engagement
    pub fn as_defender(self) -> Self {
        let multiplier = self.config.defender_defense_multiplier;
        self.with_defense_multiplier(multiplier)
    }

    /// Build a profile for `army` facing `enemy`
    pub fn build(&self, army: &Army, enemy: &Army) -> CombatProfile {
        let enemy_counts = self.catalog.category_counts(enemy);
        let enemy_pressure = counter_pressure(self.catalog, enemy);
        self.build_with(army, &enemy_counts, &enemy_pressure)
    }

    /// Build from pre-computed enemy category counts and counter pressure
    pub fn build_with(
        &self,
        army: &Army,
        enemy_counts: &PerCategory<u32>,
        enemy_pressure: &PerCategory<f64>,
    ) -> CombatProfile {
        let cfg = self.config;
        let enemy_total = enemy_counts.total();
        let side_buff = (1.0 + self.buff).max(0.0);

        let mut profile = CombatProfile {
            pressure: *enemy_pressure,
            ..Default::default()
        };

        for (id, count) in army.iter() {
            let Some(unit) = self.catalog.get(id) else { continue };
            if count == 0 {
                continue;
            }

            let counter_multiplier = if enemy_total == 0 {
                1.0
            } else {
                1.0 + UnitCategory::ALL
                    .into_iter()
                    .map(|c| (unit.counter_against(c) - 1.0) * enemy_counts.share(c))
                    .sum::<f64>()
            };

            let (flat_attack, flat_defense) = flat_bonuses(unit);
            let situational = situational_modifiers(unit, enemy_counts);
            let range_bonus = (unit.range * cfg.range_bonus_per_point).min(cfg.range_bonus_cap);
            let speed_bonus = (unit.speed * cfg.speed_bonus_per_point).min(cfg.speed_bonus_cap);

            let attack_factor =
                (1.0 + range_bonus + speed_bonus + flat_attack + situational.attack).max(0.0);
            let attack_per_unit = unit.attack * attack_factor * side_buff * counter_multiplier;

            let defense_factor = (1.0
                + cfg.defense_speed_share * speed_bonus
                + flat_defense
                + situational.defense)
                .max(0.0);
            let defense_per_unit =
                unit.defense * defense_factor * self.defense_multiplier * side_buff;

            let pressure = enemy_pressure.get(unit.category) * (1.0 + situational.pressure);
            let adjusted_defense_per_unit =
                defense_per_unit / pressure.max(cfg.min_counter_pressure);

            profile.total_attack += attack_per_unit * count as f64;
            profile.total_defense += defense_per_unit * count as f64;
            profile.total_units += count;
            profile.category_counts.add(unit.category, count);
            profile.units.push(UnitProfile {
                unit_id: id.to_string(),
                category: unit.category,
                count,
                attack_per_unit,
                defense_per_unit,
                adjusted_defense_per_unit,
            });
        }

        profile
    }
}
