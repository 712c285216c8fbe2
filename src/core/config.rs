//! Rules configuration with documented constants
//!
//! Every balance threshold used by combat, corps, fronts and the AI lives
//! here rather than inline, so tuning never touches the algorithms. The
//! defaults are the shipped balance; `data/rules.toml` mirrors them.
//!
//! Configuration is an explicit value passed into each context object.
//! There is no global instance.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::error::{FrontlineError, Result};

/// Root of all tunable rules
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    pub combat: CombatConfig,
    pub battle: BattleConfig,
    pub corps: CorpsConfig,
    pub front: FrontConfig,
    pub ai: AiConfig,
}

impl RulesConfig {
    /// Parse rules from TOML; missing keys fall back to defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let rules: RulesConfig = toml::from_str(content)?;
        rules.validate().map_err(FrontlineError::InvalidConfig)?;
        Ok(rules)
    }

    /// Load rules from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> std::result::Result<(), String> {
        self.combat.validate()?;
        self.battle.validate()?;
        self.front.validate()?;
        if self.corps.max_per_owner == 0 {
            return Err("corps.max_per_owner must be at least 1".into());
        }
        if !(0.0..=1.0).contains(&self.ai.attack_balance_threshold) {
            return Err("ai.attack_balance_threshold must lie in [0, 1]".into());
        }
        Ok(())
    }
}

// === COMBAT RESOLUTION ===

/// One entry of the loot basket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LootShare {
    pub resource: String,
    /// Fraction of the loot base assigned to this resource
    pub share: f64,
    /// Absolute ceiling, independent of defender wealth
    pub cap: f64,
}

impl LootShare {
    fn new(resource: &str, share: f64, cap: f64) -> Self {
        Self {
            resource: resource.to_string(),
            share,
            cap,
        }
    }
}

/// Thresholds for profile building and single-shot battle resolution
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Weight of total attack in side power
    pub attack_power_weight: f64,
    /// Weight of total defense in side power
    pub defense_power_weight: f64,
    /// Structural edge for the defending side (terrain, preparation)
    pub defender_defense_multiplier: f64,
    /// Half-width of the uniform power jitter (0.1 = ±10%)
    pub power_jitter: f64,
    /// Attacker advantage above which the attacker wins
    pub victory_threshold: f64,
    /// Distance of advantage from 0.5 beyond which a result is decisive
    pub decisive_margin: f64,
    /// Power ratio reported when the defender has no power at all
    pub zero_power_ratio: f64,

    pub range_bonus_per_point: f64,
    pub range_bonus_cap: f64,
    pub speed_bonus_per_point: f64,
    pub speed_bonus_cap: f64,
    /// Share of the speed bonus that also applies to defense
    pub defense_speed_share: f64,
    /// Floor for the counter-pressure divisor on defense
    pub min_counter_pressure: f64,

    // Loss allocation
    pub base_damage_scale: f64,
    pub damage_exponent: f64,
    /// Damage taken by the winner is scaled down by this factor
    pub winner_damage_factor: f64,
    pub decisive_winner_factor: f64,
    pub decisive_loser_factor: f64,
    pub damage_jitter: f64,
    /// Loser damage grows by this much per point of dominance above 1
    pub loser_dominance_boost: f64,
    pub loser_dominance_boost_cap: f64,

    // Annihilation
    pub annihilation_min_dominance: f64,
    /// Dominance at which annihilation is possible even without a decisive result
    pub annihilation_auto_dominance: f64,
    pub wipe_base_chance: f64,
    pub wipe_chance_per_dominance: f64,
    pub wipe_decisive_bonus: f64,
    pub wipe_chance_cap: f64,

    // Winner restraint
    pub restraint_min_ratio: f64,
    pub restraint_high_ratio: f64,
    pub restraint_high_factor: f64,
    pub restraint_mid_ratio: f64,
    pub restraint_mid_factor: f64,
    pub restraint_low_factor: f64,
    /// Enemy counter pressure that lets a zero cap rise to one loss
    pub restraint_counter_pressure: f64,
    pub restraint_min_enemy_units: u32,

    // Loot
    pub loot_share: f64,
    pub decisive_loot_share: f64,
    pub default_defender_wealth: f64,
    pub loot_basket: Vec<LootShare>,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            attack_power_weight: 0.65,
            defense_power_weight: 0.35,
            defender_defense_multiplier: 1.2,
            power_jitter: 0.1,
            victory_threshold: 0.5,
            decisive_margin: 0.28,
            zero_power_ratio: 100.0,

            range_bonus_per_point: 0.03,
            range_bonus_cap: 0.3,
            speed_bonus_per_point: 0.02,
            speed_bonus_cap: 0.2,
            defense_speed_share: 0.5,
            min_counter_pressure: 0.6,

            base_damage_scale: 0.12,
            damage_exponent: 0.9,
            winner_damage_factor: 0.75,
            decisive_winner_factor: 0.6,
            decisive_loser_factor: 1.1,
            damage_jitter: 0.1,
            loser_dominance_boost: 0.18,
            loser_dominance_boost_cap: 0.8,

            annihilation_min_dominance: 3.0,
            annihilation_auto_dominance: 6.0,
            wipe_base_chance: 0.2,
            wipe_chance_per_dominance: 0.12,
            wipe_decisive_bonus: 0.15,
            wipe_chance_cap: 0.75,

            restraint_min_ratio: 3.0,
            restraint_high_ratio: 10.0,
            restraint_high_factor: 0.2,
            restraint_mid_ratio: 6.0,
            restraint_mid_factor: 0.3,
            restraint_low_factor: 0.4,
            restraint_counter_pressure: 1.4,
            restraint_min_enemy_units: 5,

            loot_share: 0.04,
            decisive_loot_share: 0.08,
            default_defender_wealth: 1000.0,
            loot_basket: vec![
                LootShare::new("food", 0.25, 500.0),
                LootShare::new("wood", 0.12, 300.0),
                LootShare::new("stone", 0.08, 200.0),
                LootShare::new("silver", 0.30, 1500.0),
                LootShare::new("iron", 0.10, 150.0),
                LootShare::new("copper", 0.05, 100.0),
                LootShare::new("cloth", 0.05, 100.0),
                LootShare::new("tools", 0.05, 80.0),
            ],
        }
    }
}

impl CombatConfig {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.power_jitter < 0.0 || self.power_jitter >= 1.0 {
            return Err(format!("power_jitter ({}) must lie in [0, 1)", self.power_jitter));
        }
        if self.min_counter_pressure <= 0.0 {
            return Err("min_counter_pressure must be positive".into());
        }
        if self.restraint_high_ratio < self.restraint_mid_ratio
            || self.restraint_mid_ratio < self.restraint_min_ratio
        {
            return Err("restraint ratios must be ordered min <= mid <= high".into());
        }
        if self.wipe_chance_cap > 1.0 {
            return Err("wipe_chance_cap cannot exceed 1".into());
        }
        if self.loot_basket.iter().any(|l| l.cap < 0.0 || l.share < 0.0) {
            return Err("loot basket entries must be non-negative".into());
        }
        Ok(())
    }
}

// === MULTI-ROUND BATTLES ===

/// Round range and intensity for one battle type
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BattleTypeConfig {
    pub min_rounds: u32,
    pub max_rounds: u32,
    pub intensity: f64,
}

/// How corps engagements on a front are fought
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngagementMode {
    /// One resolver call per engagement
    #[default]
    Instant,
    /// A multi-round battle run to completion within the tick
    Rounds,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleConfig {
    pub engagement: EngagementMode,
    pub skirmish: BattleTypeConfig,
    pub pitched: BattleTypeConfig,
    pub siege: BattleTypeConfig,
    /// Sieges with a larger force ratio than this are fought as skirmishes
    pub siege_downgrade_ratio: f64,

    pub momentum_start: f64,
    pub momentum_swing: f64,
    pub momentum_max_shift: f64,
    /// Momentum at or above this (or at or below 100 minus it) routs the loser
    pub rout_momentum: f64,
    pub rout_min_round: u32,
    pub rout_round_fraction: f64,

    /// Share of enemy defense subtracted from a side's attack
    pub armor_absorption: f64,
    pub damage_roll_min: f64,
    pub damage_roll_max: f64,
    pub round_casualty_cap: f64,
    pub defender_defense_bonus: f64,

    pub morale_collapse: f64,
    pub morale_casualty_weight: f64,
    pub morale_momentum_weight: f64,
    pub morale_mod_base: f64,
    pub morale_mod_scale: f64,
    pub reinforcement_morale: f64,
    pub retreat_min_rounds: u32,
    pub retreat_max_rounds: u32,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            engagement: EngagementMode::Instant,
            skirmish: BattleTypeConfig {
                min_rounds: 3,
                max_rounds: 5,
                intensity: 0.6,
            },
            pitched: BattleTypeConfig {
                min_rounds: 10,
                max_rounds: 30,
                intensity: 1.0,
            },
            siege: BattleTypeConfig {
                min_rounds: 30,
                max_rounds: 90,
                intensity: 0.4,
            },
            siege_downgrade_ratio: 10.0,

            momentum_start: 50.0,
            momentum_swing: 15.0,
            momentum_max_shift: 8.0,
            rout_momentum: 80.0,
            rout_min_round: 5,
            rout_round_fraction: 0.3,

            armor_absorption: 0.3,
            damage_roll_min: 0.85,
            damage_roll_max: 1.15,
            round_casualty_cap: 0.4,
            defender_defense_bonus: 1.15,

            morale_collapse: 15.0,
            morale_casualty_weight: 60.0,
            morale_momentum_weight: 0.5,
            morale_mod_base: 0.6,
            morale_mod_scale: 0.4,
            reinforcement_morale: 10.0,
            retreat_min_rounds: 1,
            retreat_max_rounds: 3,
        }
    }
}

impl BattleConfig {
    pub fn validate(&self) -> std::result::Result<(), String> {
        for (name, t) in [
            ("skirmish", &self.skirmish),
            ("pitched", &self.pitched),
            ("siege", &self.siege),
        ] {
            if t.min_rounds == 0 || t.min_rounds > t.max_rounds {
                return Err(format!("{name} rounds must satisfy 0 < min <= max"));
            }
        }
        if self.damage_roll_min > self.damage_roll_max {
            return Err("damage_roll_min must not exceed damage_roll_max".into());
        }
        if self.rout_momentum <= 50.0 || self.rout_momentum > 100.0 {
            return Err("rout_momentum must lie in (50, 100]".into());
        }
        if self.retreat_min_rounds == 0 || self.retreat_min_rounds > self.retreat_max_rounds {
            return Err("retreat rounds must satisfy 0 < min <= max".into());
        }
        Ok(())
    }
}

// === CORPS ===

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpsConfig {
    /// Maximum corps one owner may field across all fronts
    pub max_per_owner: usize,
    pub start_morale: f64,
    pub start_supplies: f64,
    /// Supplies consumed per day
    pub supply_drain: f64,
    /// Below this supply level morale decays and combat power drops
    pub low_supply_threshold: f64,
    pub low_supply_morale_loss: f64,
    pub low_supply_power: f64,
    /// Morale below which a corps routs
    pub rout_morale: f64,
    pub defend_bonus: f64,
    pub reinforce_supplies: f64,
    pub supply_speed_threshold: f64,
    pub low_supply_speed: f64,
    pub morale_speed_threshold: f64,
    pub low_morale_speed: f64,
    /// Morale lost by the losing corps of an engagement
    pub defeat_morale_loss: f64,
    /// Share of corps strength dealt to an adjacent building per day
    pub building_damage_factor: f64,
    /// Morale regained when a retreat reaches its edge
    pub retreat_recovery_morale: f64,
    /// Strength multiplier for a corps fighting without a general
    pub no_general_penalty: f64,
    /// Supplies spent by each corps per engagement it survives
    pub battle_supply_cost: f64,
    pub victory_xp: u32,
    pub defeat_xp: u32,
}

impl Default for CorpsConfig {
    fn default() -> Self {
        Self {
            max_per_owner: 8,
            start_morale: 100.0,
            start_supplies: 100.0,
            supply_drain: 2.0,
            low_supply_threshold: 30.0,
            low_supply_morale_loss: 5.0,
            low_supply_power: 0.7,
            rout_morale: 30.0,
            defend_bonus: 0.25,
            reinforce_supplies: 20.0,
            supply_speed_threshold: 50.0,
            low_supply_speed: 0.5,
            morale_speed_threshold: 50.0,
            low_morale_speed: 0.7,
            defeat_morale_loss: 20.0,
            building_damage_factor: 0.5,
            retreat_recovery_morale: 10.0,
            no_general_penalty: 0.85,
            battle_supply_cost: 5.0,
            victory_xp: 50,
            defeat_xp: 20,
        }
    }
}

// === FRONTS ===

/// Named front size bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleTier {
    pub name: String,
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub buildings_per_side: u32,
    pub max_corps: usize,
    /// Exclusive upper bound on combined power; `None` for the last tier
    pub max_power: Option<f64>,
}

impl ScaleTier {
    fn new(
        name: &str,
        label: &str,
        (width, height): (u32, u32),
        buildings_per_side: u32,
        max_corps: usize,
        max_power: Option<f64>,
    ) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            width,
            height,
            buildings_per_side,
            max_corps,
            max_power,
        }
    }
}

/// Cumulative roll thresholds for terrain generation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainGenConfig {
    pub plain: f64,
    pub forest: f64,
    pub mountain: f64,
    /// Extra mountain chance near the top and bottom edges
    pub edge_mountain_bonus: f64,
    pub edge_rows: u32,
    pub river: f64,
    /// Extra river chance near the centre row
    pub center_river_bonus: f64,
    pub river_rows: u32,
    pub marsh: f64,
}

impl Default for TerrainGenConfig {
    fn default() -> Self {
        Self {
            plain: 0.55,
            forest: 0.70,
            mountain: 0.80,
            edge_mountain_bonus: 0.15,
            edge_rows: 2,
            river: 0.90,
            center_river_bonus: 0.10,
            river_rows: 2,
            marsh: 0.95,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WarScoreConfig {
    pub victory_base: f64,
    pub victory_per_casualty: f64,
    pub victory_max: f64,
    pub defeat_base: f64,
    pub defeat_per_casualty: f64,
    pub defeat_min: f64,
    pub majority_control: f64,
    pub majority_control_bonus: f64,
    pub full_control: f64,
    pub full_control_bonus: f64,
    /// Score for the side that destroys an infrastructure item
    pub infrastructure_destroyed: f64,
    /// Score for the side that loses one
    pub infrastructure_lost: f64,
    pub decisive: f64,
    pub major: f64,
    pub minor: f64,
}

impl Default for WarScoreConfig {
    fn default() -> Self {
        Self {
            victory_base: 10.0,
            victory_per_casualty: 0.5,
            victory_max: 40.0,
            defeat_base: -5.0,
            defeat_per_casualty: -0.3,
            defeat_min: -30.0,
            majority_control: 0.5,
            majority_control_bonus: 15.0,
            full_control: 0.8,
            full_control_bonus: 30.0,
            infrastructure_destroyed: 6.0,
            infrastructure_lost: -4.0,
            decisive: 100.0,
            major: 75.0,
            minor: 50.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExhaustionConfig {
    pub daily: f64,
    pub per_casualty: f64,
    /// Accrued by the owner of a destroyed infrastructure item
    pub infrastructure_loss: f64,
    /// Exhaustion at which peace is forced
    pub max: f64,
}

impl Default for ExhaustionConfig {
    fn default() -> Self {
        Self {
            daily: 0.1,
            per_casualty: 0.005,
            infrastructure_loss: 0.5,
            max: 100.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontConfig {
    pub army_power_weight: f64,
    pub wealth_power_weight: f64,
    pub population_power_weight: f64,
    pub tiers: Vec<ScaleTier>,
    pub terrain: TerrainGenConfig,

    /// Attacker buildings occupy x in [0, attacker_zone * width)
    pub attacker_zone: f64,
    /// Defender buildings occupy x in [defender_zone * width, width)
    pub defender_zone: f64,
    pub placement_attempts: u32,
    pub building_health_per_level: f64,
    pub building_resources_per_level: f64,

    pub min_nodes_per_side: usize,
    pub max_nodes_per_side: usize,
    pub node_days_min: u32,
    pub node_days_max: u32,
    pub node_min_amount: f64,

    pub max_infrastructure_per_side: usize,
    pub infrastructure_base_durability: f64,
    pub infrastructure_per_level: f64,
    pub infrastructure_per_era: f64,

    pub plunder_rate: f64,
    /// Fraction of max amount regenerated per day by intact nodes
    pub regen_rate: f64,
    /// Production penalty when every own node is plundered
    pub plunder_production_penalty: f64,

    pub war_score: WarScoreConfig,
    pub exhaustion: ExhaustionConfig,
    /// A war reaching this many days is settled on its current score
    pub max_duration_days: u32,
}

impl Default for FrontConfig {
    fn default() -> Self {
        Self {
            army_power_weight: 10.0,
            wealth_power_weight: 0.5,
            population_power_weight: 2.0,
            tiers: vec![
                ScaleTier::new("tiny", "border skirmish", (6, 4), 2, 2, Some(5000.0)),
                ScaleTier::new("small", "local conflict", (8, 6), 4, 3, Some(15000.0)),
                ScaleTier::new("medium", "regional war", (12, 8), 7, 5, Some(40000.0)),
                ScaleTier::new("large", "major war", (16, 10), 12, 8, Some(100000.0)),
                ScaleTier::new("epic", "epic war", (20, 12), 18, 12, None),
            ],
            terrain: TerrainGenConfig::default(),

            attacker_zone: 0.4,
            defender_zone: 0.6,
            placement_attempts: 50,
            building_health_per_level: 0.1,
            building_resources_per_level: 0.2,

            min_nodes_per_side: 2,
            max_nodes_per_side: 4,
            node_days_min: 50,
            node_days_max: 100,
            node_min_amount: 10.0,

            max_infrastructure_per_side: 3,
            infrastructure_base_durability: 100.0,
            infrastructure_per_level: 0.3,
            infrastructure_per_era: 0.15,

            plunder_rate: 0.3,
            regen_rate: 0.005,
            plunder_production_penalty: 0.15,

            war_score: WarScoreConfig::default(),
            exhaustion: ExhaustionConfig::default(),
            max_duration_days: 365,
        }
    }
}

impl FrontConfig {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.tiers.is_empty() {
            return Err("at least one scale tier is required".into());
        }
        if self.tiers.iter().any(|t| t.width < 4 || t.height < 3) {
            return Err("scale tiers need a grid of at least 4x3".into());
        }
        if self.attacker_zone > self.defender_zone {
            return Err(format!(
                "attacker_zone ({}) must not overlap defender_zone ({})",
                self.attacker_zone, self.defender_zone
            ));
        }
        if self.min_nodes_per_side > self.max_nodes_per_side {
            return Err("min_nodes_per_side must not exceed max_nodes_per_side".into());
        }
        let ws = &self.war_score;
        if !(ws.minor <= ws.major && ws.major <= ws.decisive) {
            return Err("war score thresholds must be ordered minor <= major <= decisive".into());
        }
        if ws.majority_control > ws.full_control {
            return Err("majority_control must not exceed full_control".into());
        }
        Ok(())
    }
}

// === AI ===

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Hex radius used for the local power balance
    pub local_radius: u32,
    /// Balance reported when no enemy is within the radius
    pub no_enemy_balance: f64,
    pub retreat_morale: f64,
    pub retreat_supplies: f64,
    /// Local balance required before attacking
    pub attack_balance_threshold: f64,
    pub aggressive_trait: f64,
    pub defensive_trait: f64,
    /// Rows either side of the midline used for repositioning
    pub midline_spread: i32,
    /// Share of the standing army drawn into an auto-created corps
    pub auto_corps_share: f64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            local_radius: 3,
            no_enemy_balance: 2.0,
            retreat_morale: 30.0,
            retreat_supplies: 20.0,
            attack_balance_threshold: 0.8,
            aggressive_trait: 0.7,
            defensive_trait: 0.3,
            midline_spread: 2,
            auto_corps_share: 0.5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rules_are_valid() {
        assert!(RulesConfig::default().validate().is_ok());
    }

    #[test]
    fn test_shipped_rules_file_matches_defaults() {
        let rules = RulesConfig::from_toml_str(include_str!("../../data/rules.toml")).unwrap();
        let defaults = RulesConfig::default();
        assert_eq!(rules.combat.loot_basket, defaults.combat.loot_basket);
        assert_eq!(rules.front.tiers, defaults.front.tiers);
        assert_eq!(rules.corps.max_per_owner, defaults.corps.max_per_owner);
        assert_eq!(rules.battle.pitched, defaults.battle.pitched);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let rules = RulesConfig::from_toml_str(
            r#"
            [combat]
            decisive_margin = 0.3
            "#,
        )
        .unwrap();
        assert_eq!(rules.combat.decisive_margin, 0.3);
        assert_eq!(rules.combat.attack_power_weight, 0.65);
        assert_eq!(rules.corps.supply_drain, 2.0);
    }

    #[test]
    fn test_invalid_rules_rejected() {
        let err = RulesConfig::from_toml_str(
            r#"
            [front.war_score]
            minor = 120.0
            "#,
        );
        assert!(matches!(err, Err(FrontlineError::InvalidConfig(_))));
    }

    #[test]
    fn test_battle_config_validation() {
        let mut config = BattleConfig::default();
        config.skirmish.min_rounds = 9;
        assert!(config.validate().is_err());
    }
}
