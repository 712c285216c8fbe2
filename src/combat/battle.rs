//! Multi-round battles
//!
//! A battle progresses round by round: both sides deal damage from their
//! current combat profiles, casualties are applied, momentum shifts toward
//! the side dealing more damage, and morale follows casualties and momentum.
//! The battle ends on annihilation, morale collapse, a rout, an ordered
//! retreat or when its round budget runs out.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::combat::profile::ProfileBuilder;
use crate::combat::stochastic_round;
use crate::core::config::{BattleConfig, BattleTypeConfig, CombatConfig};
use crate::core::error::CommandError;
use crate::core::types::{BattleId, CorpsId, FrontId, Side};
use crate::units::{total_losses, Army, Losses, UnitCatalog};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BattleKind {
    Skirmish,
    Pitched,
    Siege,
}

impl BattleKind {
    pub fn settings(self, config: &BattleConfig) -> BattleTypeConfig {
        match self {
            BattleKind::Skirmish => config.skirmish,
            BattleKind::Pitched => config.pitched,
            BattleKind::Siege => config.siege,
        }
    }
}

/// Standing order for one side of a battle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tactic {
    #[default]
    Normal,
    FocusAttack,
    Defensive,
    Retreat,
}

impl Tactic {
    pub fn attack_modifier(self) -> f64 {
        match self {
            Tactic::Normal => 1.0,
            Tactic::FocusAttack => 1.25,
            Tactic::Defensive => 0.8,
            Tactic::Retreat => 0.4,
        }
    }

    pub fn defense_modifier(self) -> f64 {
        match self {
            Tactic::Normal => 1.0,
            Tactic::FocusAttack => 0.8,
            Tactic::Defensive => 1.3,
            Tactic::Retreat => 0.6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BattleStatus {
    Active,
    Resolved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    Annihilation,
    MoraleCollapse,
    Rout,
    Retreat,
    Timeout,
}

/// A corps (or raw force) entering a battle
#[derive(Debug, Clone)]
pub struct Combatant {
    pub corps: Option<CorpsId>,
    pub units: Army,
    pub morale: f64,
    /// Side-wide buff fed to the profile builder
    pub buff: f64,
}

impl Combatant {
    pub fn new(units: Army) -> Self {
        Self {
            corps: None,
            units,
            morale: 100.0,
            buff: 0.0,
        }
    }

    pub fn with_corps(mut self, corps: CorpsId) -> Self {
        self.corps = Some(corps);
        self
    }

    pub fn with_morale(mut self, morale: f64) -> Self {
        self.morale = morale.clamp(0.0, 100.0);
        self
    }

    pub fn with_buff(mut self, buff: f64) -> Self {
        self.buff = buff;
        self
    }
}

/// One side's state inside a battle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleSide {
    pub corps: Option<CorpsId>,
    pub initial_units: u32,
    pub units: Army,
    pub tactic: Tactic,
    pub retreat_countdown: Option<u32>,
    pub starting_morale: f64,
    pub morale: f64,
    /// Morale granted by reinforcements, kept across recomputation
    pub morale_bonus: f64,
    pub buff: f64,
    pub casualties: Losses,
}

impl BattleSide {
    fn new(combatant: Combatant) -> Self {
        Self {
            corps: combatant.corps,
            initial_units: combatant.units.total(),
            units: combatant.units,
            tactic: Tactic::Normal,
            retreat_countdown: None,
            starting_morale: combatant.morale,
            morale: combatant.morale,
            morale_bonus: 0.0,
            buff: combatant.buff,
            casualties: Losses::new(),
        }
    }

    pub fn total_casualties(&self) -> u32 {
        total_losses(&self.casualties)
    }

    fn casualty_ratio(&self) -> f64 {
        if self.initial_units == 0 {
            1.0
        } else {
            1.0 - self.units.total() as f64 / self.initial_units as f64
        }
    }

    fn record(&mut self, losses: &Losses) {
        for (id, &count) in losses {
            *self.casualties.entry(id.clone()).or_insert(0) += count;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundLog {
    pub round: u32,
    pub attacker_damage: f64,
    pub defender_damage: f64,
    pub attacker_losses: Losses,
    pub defender_losses: Losses,
    pub momentum: f64,
    pub attacker_morale: f64,
    pub defender_morale: f64,
    pub events: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleResult {
    pub winner: Side,
    pub reason: EndReason,
    pub rounds: u32,
    pub final_momentum: f64,
    pub attacker_casualties: Losses,
    pub defender_casualties: Losses,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Battle {
    pub id: BattleId,
    pub front: Option<FrontId>,
    pub kind: BattleKind,
    pub current_round: u32,
    pub max_rounds: u32,
    /// 0 = defender dominates, 100 = attacker dominates
    pub momentum: f64,
    pub intensity: f64,
    pub status: BattleStatus,
    pub attacker: BattleSide,
    pub defender: BattleSide,
    pub log: Vec<RoundLog>,
    pub result: Option<BattleResult>,
}

impl Battle {
    /// Open a battle between two forces
    ///
    /// Sieges between badly mismatched forces are fought as skirmishes.
    pub fn new(
        id: BattleId,
        front: Option<FrontId>,
        mut kind: BattleKind,
        attacker: Combatant,
        defender: Combatant,
        config: &BattleConfig,
        rng: &mut impl Rng,
    ) -> Result<Self, CommandError> {
        let attacker_total = attacker.units.total();
        let defender_total = defender.units.total();
        if attacker_total == 0 || defender_total == 0 {
            return Err(CommandError::EmptyComposition);
        }

        let force_ratio = attacker_total.max(defender_total) as f64
            / attacker_total.min(defender_total).max(1) as f64;
        if kind == BattleKind::Siege && force_ratio > config.siege_downgrade_ratio {
            kind = BattleKind::Skirmish;
        }

        let settings = kind.settings(config);
        let max_rounds = rng.gen_range(settings.min_rounds..=settings.max_rounds);

        Ok(Self {
            id,
            front,
            kind,
            current_round: 0,
            max_rounds,
            momentum: config.momentum_start,
            intensity: settings.intensity,
            status: BattleStatus::Active,
            attacker: BattleSide::new(attacker),
            defender: BattleSide::new(defender),
            log: Vec::new(),
            result: None,
        })
    }

    pub fn is_active(&self) -> bool {
        self.status == BattleStatus::Active
    }

    pub fn side(&self, side: Side) -> &BattleSide {
        match side {
            Side::Attacker => &self.attacker,
            Side::Defender => &self.defender,
        }
    }

    fn side_mut(&mut self, side: Side) -> &mut BattleSide {
        match side {
            Side::Attacker => &mut self.attacker,
            Side::Defender => &mut self.defender,
        }
    }

    /// Change a side's tactic; ordering a retreat starts a short countdown
    pub fn set_tactic(&mut self, side: Side, tactic: Tactic, config: &BattleConfig, rng: &mut impl Rng) {
        let countdown = (tactic == Tactic::Retreat)
            .then(|| rng.gen_range(config.retreat_min_rounds..=config.retreat_max_rounds));
        let state = self.side_mut(side);
        state.tactic = tactic;
        state.retreat_countdown = countdown;
    }

    /// Add fresh units to one side mid-battle
    pub fn reinforce(&mut self, side: Side, units: Army, config: &BattleConfig) {
        if !self.is_active() || units.is_empty() {
            return;
        }
        let round = self.current_round;
        let state = self.side_mut(side);
        state.initial_units += units.total();
        state.units.deposit(units);
        state.morale_bonus += config.reinforcement_morale;
        state.morale = (state.morale + config.reinforcement_morale).min(100.0);
        self.log.push(RoundLog {
            round,
            attacker_damage: 0.0,
            defender_damage: 0.0,
            attacker_losses: Losses::new(),
            defender_losses: Losses::new(),
            momentum: self.momentum,
            attacker_morale: self.attacker.morale,
            defender_morale: self.defender.morale,
            events: vec![format!("{side:?} reinforcements arrive")],
        });
    }

    /// Fight one round. Returns the result once the battle has ended.
    pub fn process_round(
        &mut self,
        catalog: &UnitCatalog,
        combat: &CombatConfig,
        config: &BattleConfig,
        rng: &mut impl Rng,
    ) -> Option<&BattleResult> {
        if !self.is_active() {
            return self.result.as_ref();
        }
        self.current_round += 1;

        let (atk_attack, atk_defense) = self.side_power(Side::Attacker, catalog, combat, config);
        let (def_attack, def_defense) = self.side_power(Side::Defender, catalog, combat, config);

        let atk_tactic = self.attacker.tactic;
        let def_tactic = self.defender.tactic;
        let atk_base = (atk_attack * atk_tactic.attack_modifier()
            - def_defense * def_tactic.defense_modifier() * config.armor_absorption)
            .max(1.0);
        let def_base = (def_attack * def_tactic.attack_modifier()
            - atk_defense * atk_tactic.defense_modifier() * config.armor_absorption)
            .max(1.0);

        let attacker_damage =
            atk_base * rng.gen_range(config.damage_roll_min..=config.damage_roll_max) * self.intensity;
        let defender_damage =
            def_base * rng.gen_range(config.damage_roll_min..=config.damage_roll_max) * self.intensity;

        let defender_losses = inflict(catalog, &mut self.defender.units, attacker_damage, config, rng);
        let attacker_losses = inflict(catalog, &mut self.attacker.units, defender_damage, config, rng);
        self.defender.record(&defender_losses);
        self.attacker.record(&attacker_losses);

        let total_damage = attacker_damage + defender_damage;
        if total_damage > 0.0 {
            let shift = ((attacker_damage / total_damage - 0.5) * config.momentum_swing)
                .clamp(-config.momentum_max_shift, config.momentum_max_shift);
            self.momentum = (self.momentum + shift).clamp(0.0, 100.0);
        }

        self.attacker.morale = side_morale(&self.attacker, 100.0 - self.momentum, config);
        self.defender.morale = side_morale(&self.defender, self.momentum, config);

        self.log.push(RoundLog {
            round: self.current_round,
            attacker_damage,
            defender_damage,
            events: vec![format!(
                "attacker lost {}, defender lost {}",
                total_losses(&attacker_losses),
                total_losses(&defender_losses)
            )],
            attacker_losses,
            defender_losses,
            momentum: self.momentum,
            attacker_morale: self.attacker.morale,
            defender_morale: self.defender.morale,
        });

        if let Some((winner, reason)) = self.check_end(config) {
            self.finish(winner, reason);
        }
        self.result.as_ref()
    }

    /// Fight rounds until the battle ends
    pub fn run_to_completion(
        &mut self,
        catalog: &UnitCatalog,
        combat: &CombatConfig,
        config: &BattleConfig,
        rng: &mut impl Rng,
    ) -> Option<&BattleResult> {
        while self.is_active() {
            self.process_round(catalog, combat, config, rng);
        }
        self.result.as_ref()
    }

    fn side_power(
        &self,
        side: Side,
        catalog: &UnitCatalog,
        combat: &CombatConfig,
        config: &BattleConfig,
    ) -> (f64, f64) {
        let own = self.side(side);
        let enemy = self.side(side.opposite());
        let profile = ProfileBuilder::new(catalog, combat)
            .with_buff(own.buff)
            .build(&own.units, &enemy.units);

        let morale_mod = config.morale_mod_base + own.morale / 100.0 * config.morale_mod_scale;
        let mut defense = profile.total_defense;
        if side == Side::Defender {
            defense *= config.defender_defense_bonus;
        }
        (profile.total_attack * morale_mod, defense * morale_mod)
    }

    fn check_end(&mut self, config: &BattleConfig) -> Option<(Side, EndReason)> {
        for side in Side::BOTH {
            let state = self.side_mut(side);
            if let Some(countdown) = state.retreat_countdown.as_mut() {
                *countdown = countdown.saturating_sub(1);
                if *countdown == 0 {
                    return Some((side.opposite(), EndReason::Retreat));
                }
            }
        }

        if self.attacker.units.is_empty() {
            return Some((Side::Defender, EndReason::Annihilation));
        }
        if self.defender.units.is_empty() {
            return Some((Side::Attacker, EndReason::Annihilation));
        }
        if self.attacker.morale <= config.morale_collapse {
            return Some((Side::Defender, EndReason::MoraleCollapse));
        }
        if self.defender.morale <= config.morale_collapse {
            return Some((Side::Attacker, EndReason::MoraleCollapse));
        }

        let rout_round = config
            .rout_min_round
            .max((self.max_rounds as f64 * config.rout_round_fraction).floor() as u32);
        if self.current_round >= rout_round {
            if self.momentum >= config.rout_momentum {
                return Some((Side::Attacker, EndReason::Rout));
            }
            if self.momentum <= 100.0 - config.rout_momentum {
                return Some((Side::Defender, EndReason::Rout));
            }
        }

        if self.current_round >= self.max_rounds {
            let winner = if self.momentum >= 50.0 {
                Side::Attacker
            } else {
                Side::Defender
            };
            return Some((winner, EndReason::Timeout));
        }
        None
    }

    fn finish(&mut self, winner: Side, reason: EndReason) {
        self.status = BattleStatus::Resolved;
        self.result = Some(BattleResult {
            winner,
            reason,
            rounds: self.current_round,
            final_momentum: self.momentum,
            attacker_casualties: self.attacker.casualties.clone(),
            defender_casualties: self.defender.casualties.clone(),
        });
        tracing::debug!(
            battle = self.id.0,
            ?winner,
            ?reason,
            rounds = self.current_round,
            "battle ended"
        );
    }
}

/// Morale from casualties and adverse momentum (momentum favouring the enemy)
fn side_morale(side: &BattleSide, adverse_momentum: f64, config: &BattleConfig) -> f64 {
    (side.starting_morale - side.casualty_ratio() * config.morale_casualty_weight
        - (adverse_momentum - 50.0).max(0.0) * config.morale_momentum_weight
        + side.morale_bonus)
        .clamp(0.0, 100.0)
}

/// Apply `damage` to an army, spread by each type's share of total durability
fn inflict(
    catalog: &UnitCatalog,
    units: &mut Army,
    damage: f64,
    config: &BattleConfig,
    rng: &mut impl Rng,
) -> Losses {
    let mut losses = Losses::new();
    let durability = |id: &str| catalog.get(id).map(|u| u.attack + u.defense).unwrap_or(0.0);
    let total_hp: f64 = units
        .iter()
        .map(|(id, count)| durability(id) * count as f64)
        .sum();
    if total_hp <= 0.0 || damage <= 0.0 {
        return losses;
    }

    let damage_ratio = (damage / total_hp).min(config.round_casualty_cap);
    for (id, count) in units.iter() {
        let unit_durability = durability(id);
        if unit_durability <= 0.0 {
            continue;
        }
        let unit_damage = damage * unit_durability * count as f64 / total_hp;
        let expected = unit_damage / unit_durability.max(1.0) * damage_ratio;
        let killed = stochastic_round(expected, rng).min(count);
        if killed > 0 {
            losses.insert(id.to_string(), killed);
        }
    }
    units.apply_losses(&losses);
    losses
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    struct Fixture {
        catalog: UnitCatalog,
        combat: CombatConfig,
        config: BattleConfig,
        rng: ChaCha8Rng,
    }

    fn fixture(seed: u64) -> Fixture {
        Fixture {
            catalog: UnitCatalog::with_defaults(),
            combat: CombatConfig::default(),
            config: BattleConfig::default(),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    fn open(f: &mut Fixture, kind: BattleKind, atk: Army, def: Army) -> Battle {
        Battle::new(
            BattleId(1),
            None,
            kind,
            Combatant::new(atk),
            Combatant::new(def),
            &f.config,
            &mut f.rng,
        )
        .unwrap()
    }

    #[test]
    fn test_empty_side_cannot_open_battle() {
        let mut f = fixture(1);
        let err = Battle::new(
            BattleId(1),
            None,
            BattleKind::Pitched,
            Combatant::new(Army::new()),
            Combatant::new(Army::from_pairs([("militia", 5)])),
            &f.config,
            &mut f.rng,
        );
        assert_eq!(err.unwrap_err(), CommandError::EmptyComposition);
    }

    #[test]
    fn test_round_budget_follows_kind() {
        let mut f = fixture(2);
        for _ in 0..20 {
            let b = open(
                &mut f,
                BattleKind::Skirmish,
                Army::from_pairs([("militia", 10)]),
                Army::from_pairs([("militia", 10)]),
            );
            assert!((3..=5).contains(&b.max_rounds));
            assert_eq!(b.intensity, 0.6);
        }
    }

    #[test]
    fn test_lopsided_siege_becomes_skirmish() {
        let mut f = fixture(3);
        let b = open(
            &mut f,
            BattleKind::Siege,
            Army::from_pairs([("militia", 200)]),
            Army::from_pairs([("militia", 10)]),
        );
        assert_eq!(b.kind, BattleKind::Skirmish);
    }

    #[test]
    fn test_battle_runs_to_resolution_with_bounded_state() {
        let mut f = fixture(4);
        let mut b = open(
            &mut f,
            BattleKind::Pitched,
            Army::from_pairs([("hoplite", 60), ("archer", 30)]),
            Army::from_pairs([("spearman", 70), ("slinger", 30)]),
        );
        let result = b
            .run_to_completion(&f.catalog, &f.combat, &f.config, &mut f.rng)
            .cloned()
            .unwrap();

        assert_eq!(b.status, BattleStatus::Resolved);
        assert!(result.rounds <= b.max_rounds);
        assert_eq!(b.log.len() as u32, result.rounds);
        for entry in &b.log {
            assert!((0.0..=100.0).contains(&entry.momentum));
            assert!((0.0..=100.0).contains(&entry.attacker_morale));
            assert!((0.0..=100.0).contains(&entry.defender_morale));
        }
        // Casualties plus survivors account for every starting unit
        assert_eq!(b.attacker.units.total() + b.attacker.total_casualties(), 90);
        assert_eq!(b.defender.units.total() + b.defender.total_casualties(), 100);
    }

    #[test]
    fn test_momentum_shift_is_clamped_per_round() {
        let mut f = fixture(5);
        let mut b = open(
            &mut f,
            BattleKind::Pitched,
            Army::from_pairs([("knight", 100)]),
            Army::from_pairs([("militia", 100)]),
        );
        let before = b.momentum;
        b.process_round(&f.catalog, &f.combat, &f.config, &mut f.rng);
        assert!(b.momentum > before);
        assert!(b.momentum - before <= f.config.momentum_max_shift + 1e-9);
    }

    #[test]
    fn test_ordered_retreat_ends_battle_for_the_enemy() {
        let mut f = fixture(6);
        let mut b = open(
            &mut f,
            BattleKind::Siege,
            Army::from_pairs([("militia", 50)]),
            Army::from_pairs([("militia", 50)]),
        );
        b.set_tactic(Side::Attacker, Tactic::Retreat, &f.config.clone(), &mut f.rng);
        let countdown = b.attacker.retreat_countdown.unwrap();
        assert!((1..=3).contains(&countdown));

        let result = b
            .run_to_completion(&f.catalog, &f.combat, &f.config, &mut f.rng)
            .cloned()
            .unwrap();
        assert_eq!(result.reason, EndReason::Retreat);
        assert_eq!(result.winner, Side::Defender);
        assert_eq!(result.rounds, countdown);
    }

    #[test]
    fn test_reinforcement_raises_morale_and_units() {
        let mut f = fixture(7);
        let mut b = open(
            &mut f,
            BattleKind::Pitched,
            Army::from_pairs([("militia", 50)]),
            Army::from_pairs([("militia", 50)]),
        );
        b.attacker.morale = 60.0;
        b.reinforce(Side::Attacker, Army::from_pairs([("militia", 20)]), &f.config);
        assert_eq!(b.attacker.units.get("militia"), 70);
        assert_eq!(b.attacker.morale, 70.0);
        assert_eq!(b.attacker.initial_units, 70);
    }

    #[test]
    fn test_tactic_modifiers() {
        assert_eq!(Tactic::FocusAttack.attack_modifier(), 1.25);
        assert_eq!(Tactic::Defensive.defense_modifier(), 1.3);
        assert_eq!(Tactic::Retreat.attack_modifier(), 0.4);
    }
}
