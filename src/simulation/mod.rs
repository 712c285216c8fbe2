//! War simulation context
//!
//! [`WarSimulation`] is the explicit context object that owns everything a
//! war needs: catalogs, rules, fronts, corps, standing armies, AI
//! belligerents and the seeded random source. Independent simulations share
//! nothing and can run side by side.
//!
//! Player commands and AI decisions go through the same methods here, so
//! both are validated identically.

pub mod events;
pub mod tick;

pub use events::{EngagementReport, FrontEvent};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;

use crate::ai::{AiCommander, FrontAi, StrategyBook};
use crate::core::config::RulesConfig;
use crate::core::error::{CommandError, CommandOk, FrontlineError, Result};
use crate::core::types::{CorpsId, Day, FrontId, HexCoord, PolityId};
use crate::corps::{ArmyPool, AttackTarget, CorpsManager, General};
use crate::front::{BuildingCatalog, EconomySnapshot, Front, FrontRegistry, FrontSnapshot, WarOutcome};
use crate::units::{Army, UnitCatalog};

type CommandOutcome = std::result::Result<CommandOk, CommandError>;

pub struct WarSimulation {
    catalog: UnitCatalog,
    buildings: BuildingCatalog,
    rules: RulesConfig,
    registry: FrontRegistry,
    corps: CorpsManager,
    pool: ArmyPool,
    economies: BTreeMap<PolityId, EconomySnapshot>,
    ais: Vec<Box<dyn FrontAi>>,
    /// Units each polity should hold across its standing army and corps
    ledger: BTreeMap<PolityId, u64>,
    rng: ChaCha8Rng,
    day: Day,
    next_battle: u32,
}

impl WarSimulation {
    pub fn new(catalog: UnitCatalog, buildings: BuildingCatalog, rules: RulesConfig, seed: u64) -> Self {
        let corps = CorpsManager::new(rules.corps.clone());
        Self {
            catalog,
            buildings,
            rules,
            registry: FrontRegistry::new(),
            corps,
            pool: ArmyPool::new(),
            economies: BTreeMap::new(),
            ais: Vec::new(),
            ledger: BTreeMap::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            day: 0,
            next_battle: 0,
        }
    }

    /// Shipped catalogs and default rules
    pub fn with_defaults(seed: u64) -> Self {
        Self::new(
            UnitCatalog::with_defaults(),
            BuildingCatalog::with_defaults(),
            RulesConfig::default(),
            seed,
        )
    }

    pub fn day(&self) -> Day {
        self.day
    }

    pub fn catalog(&self) -> &UnitCatalog {
        &self.catalog
    }

    pub fn rules(&self) -> &RulesConfig {
        &self.rules
    }

    pub fn registry(&self) -> &FrontRegistry {
        &self.registry
    }

    pub fn corps(&self) -> &CorpsManager {
        &self.corps
    }

    pub fn pool(&self) -> &ArmyPool {
        &self.pool
    }

    pub fn front(&self, id: FrontId) -> Option<&Front> {
        self.registry.get(id)
    }

    pub fn snapshot(&self, id: FrontId) -> Option<FrontSnapshot> {
        self.registry.get(id).map(|f| f.snapshot(&self.corps))
    }

    /// Record a polity's economy; used to size and seed its future fronts
    pub fn set_economy(&mut self, polity: PolityId, economy: EconomySnapshot) {
        self.economies.insert(polity, economy);
    }

    /// Add freshly raised units to a standing army
    pub fn recruit(&mut self, polity: PolityId, units: Army) {
        *self.ledger.entry(polity).or_insert(0) += units.total() as u64;
        self.pool.deposit(polity, units);
    }

    /// Hand a belligerent to an AI
    pub fn add_ai(&mut self, ai: Box<dyn FrontAi>) {
        self.ais.push(ai);
    }

    /// Convenience for the built-in commander with the shipped strategies
    pub fn add_ai_commander(&mut self, polity: PolityId, aggression: f64) {
        let seed = rand::Rng::gen(&mut self.rng);
        self.add_ai(Box::new(AiCommander::new(
            polity,
            aggression,
            StrategyBook::with_defaults(),
            seed,
        )));
    }

    pub fn declare_war(&mut self, attacker: PolityId, defender: PolityId) -> Result<FrontId> {
        let fallback = EconomySnapshot::default();
        let a = self.economies.get(&attacker).unwrap_or(&fallback);
        let d = self.economies.get(&defender).unwrap_or(&fallback);
        self.registry
            .declare_war(attacker, defender, [a, d], &self.buildings, &self.rules.front, &mut self.rng)
    }

    /// Settle a war by treaty
    pub fn make_peace(&mut self, front: FrontId) -> Result<WarOutcome> {
        self.registry.make_peace(front, &mut self.corps)
    }

    /// Form a corps from `owner`'s standing army and put it on `front`
    ///
    /// Either both steps happen or neither does.
    pub fn raise_corps(
        &mut self,
        front: FrontId,
        owner: PolityId,
        name: impl Into<String>,
        units: &Army,
    ) -> std::result::Result<CorpsId, CommandError> {
        let f = self.registry.get(front).ok_or(CommandError::UnknownTarget)?;
        if !f.is_active() {
            return Err(CommandError::FrontClosed);
        }
        let side = f.side_of(owner).ok_or(CommandError::NotBelligerent(owner))?;
        let start = f.start_position(side);
        let id = self.corps.create(&mut self.pool, owner, side, name, units, start)?;
        if let Err(e) = self.registry.assign(front, id, &mut self.corps) {
            self.corps.disband(id, &mut self.pool)?;
            return Err(e);
        }
        Ok(id)
    }

    pub fn disband(&mut self, id: CorpsId) -> std::result::Result<u32, CommandError> {
        self.registry.unassign(id, &mut self.corps)?;
        self.corps.disband(id, &mut self.pool)
    }

    pub fn reinforce(&mut self, id: CorpsId, units: &Army) -> CommandOutcome {
        self.corps.reinforce(id, &mut self.pool, units)
    }

    /// Send units from a corps back to its owner's standing army
    pub fn detach(&mut self, id: CorpsId, units: &Army) -> CommandOutcome {
        self.corps.detach(id, &mut self.pool, units)
    }

    /// Put an existing corps, e.g. one released by an earlier peace, on `front`
    pub fn assign_corps(&mut self, id: CorpsId, front: FrontId) -> CommandOutcome {
        self.registry.assign(front, id, &mut self.corps)
    }

    /// Draw a new general from the simulation's random source
    pub fn commission_general(&mut self, name: impl Into<String>, seniority: u32) -> General {
        General::generate(name, seniority, &mut self.rng)
    }

    /// Give a corps a general, or relieve it with `None`; returns the previous one
    pub fn appoint_general(
        &mut self,
        id: CorpsId,
        general: Option<General>,
    ) -> std::result::Result<Option<General>, CommandError> {
        self.corps.appoint(id, general)
    }

    fn front_of(&self, id: CorpsId) -> std::result::Result<&Front, CommandError> {
        let corps = self.corps.get(id).ok_or(CommandError::UnknownCorps(id))?;
        corps
            .front
            .and_then(|f| self.registry.get(f))
            .filter(|f| f.is_active())
            .ok_or(CommandError::FrontClosed)
    }

    pub fn move_corps(&mut self, id: CorpsId, target: HexCoord) -> CommandOutcome {
        let front = self.front_of(id)?.id;
        let grid = &self.registry.get(front).ok_or(CommandError::FrontClosed)?.grid;
        self.corps.move_to(id, target, grid, &self.catalog)
    }

    pub fn defend(&mut self, id: CorpsId) -> CommandOutcome {
        self.front_of(id)?;
        self.corps.defend(id)
    }

    pub fn retreat(&mut self, id: CorpsId) -> CommandOutcome {
        let front = self.front_of(id)?.id;
        let grid = &self.registry.get(front).ok_or(CommandError::FrontClosed)?.grid;
        self.corps.retreat(id, grid, &self.catalog)
    }

    /// Order an attack on an enemy corps, building or infrastructure item
    pub fn attack(&mut self, id: CorpsId, target: AttackTarget) -> CommandOutcome {
        let front_id = self.front_of(id)?.id;
        let front = self.registry.get(front_id).ok_or(CommandError::FrontClosed)?;
        let (at, side) = match target {
            AttackTarget::Corps(t) => {
                let enemy = self.corps.get(t).ok_or(CommandError::UnknownTarget)?;
                if enemy.front != Some(front.id) {
                    return Err(CommandError::UnknownTarget);
                }
                (enemy.position, enemy.side)
            }
            AttackTarget::Building(b) => {
                let building = front
                    .building(b)
                    .filter(|b| !b.destroyed)
                    .ok_or(CommandError::UnknownTarget)?;
                (building.position, building.owner)
            }
            AttackTarget::Infrastructure(i) => {
                let infra = front
                    .infra(i)
                    .filter(|i| !i.destroyed)
                    .ok_or(CommandError::UnknownTarget)?;
                (infra.position, infra.owner)
            }
        };
        let grid = &front.grid;
        self.corps.attack(id, target, at, side, grid, &self.catalog)
    }

    /// Check that no unit was created or lost outside recruitment and combat
    pub fn check_invariants(&self) -> Result<()> {
        for (&polity, &expected) in &self.ledger {
            let held = self.pool.total(polity) as u64 + self.corps.units_held(polity) as u64;
            if held != expected {
                return Err(FrontlineError::InvariantViolation(format!(
                    "{polity:?} holds {held} units, expected {expected}"
                )));
            }
        }
        for corps in self.corps.iter() {
            if corps.units.is_empty() {
                return Err(FrontlineError::InvariantViolation(format!(
                    "corps {:?} survives without units",
                    corps.id
                )));
            }
            if let Some(front) = corps.front.and_then(|f| self.registry.get(f)) {
                if !front.corps[corps.side.index()].contains(&corps.id) {
                    return Err(FrontlineError::InvariantViolation(format!(
                        "corps {:?} not listed on its front",
                        corps.id
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Side;

    fn sim_at_war() -> (WarSimulation, FrontId) {
        let mut sim = WarSimulation::with_defaults(9);
        sim.recruit(PolityId(1), Army::from_pairs([("militia", 60), ("slinger", 20)]));
        sim.recruit(PolityId(2), Army::from_pairs([("militia", 60), ("slinger", 20)]));
        let front = sim.declare_war(PolityId(1), PolityId(2)).unwrap();
        (sim, front)
    }

    #[test]
    fn test_raise_corps_places_on_front() {
        let (mut sim, front) = sim_at_war();
        let id = sim
            .raise_corps(front, PolityId(1), "1st", &Army::from_pairs([("militia", 20)]))
            .unwrap();
        let corps = sim.corps().get(id).unwrap();
        assert_eq!(corps.front, Some(front));
        assert_eq!(corps.side, Side::Attacker);
        assert_eq!(corps.position, sim.front(front).unwrap().start_position(Side::Attacker));
        assert_eq!(sim.pool().total(PolityId(1)), 60);
        sim.check_invariants().unwrap();
    }

    #[test]
    fn test_failed_assignment_returns_units() {
        let (mut sim, front) = sim_at_war();
        let small = Army::from_pairs([("militia", 1)]);
        // tiny fronts take two corps per side
        sim.raise_corps(front, PolityId(1), "a", &small).unwrap();
        sim.raise_corps(front, PolityId(1), "b", &small).unwrap();
        assert_eq!(
            sim.raise_corps(front, PolityId(1), "c", &small),
            Err(CommandError::CorpsCap(2))
        );
        assert_eq!(sim.pool().total(PolityId(1)), 78);
        assert_eq!(sim.corps().len(), 2);
        sim.check_invariants().unwrap();
    }

    #[test]
    fn test_outsider_cannot_raise() {
        let (mut sim, front) = sim_at_war();
        sim.recruit(PolityId(7), Army::from_pairs([("militia", 5)]));
        assert_eq!(
            sim.raise_corps(front, PolityId(7), "x", &Army::from_pairs([("militia", 5)])),
            Err(CommandError::NotBelligerent(PolityId(7)))
        );
    }

    #[test]
    fn test_attack_own_side_rejected() {
        let (mut sim, front) = sim_at_war();
        let units = Army::from_pairs([("militia", 5)]);
        let a = sim.raise_corps(front, PolityId(1), "a", &units).unwrap();
        let b = sim.raise_corps(front, PolityId(1), "b", &units).unwrap();
        assert_eq!(
            sim.attack(a, AttackTarget::Corps(b)),
            Err(CommandError::FriendlyTarget("corps"))
        );
        let own_building = sim.front(front).unwrap().standing_buildings(Side::Attacker).next().unwrap().id;
        assert_eq!(
            sim.attack(a, AttackTarget::Building(own_building)),
            Err(CommandError::FriendlyTarget("building"))
        );
    }

    #[test]
    fn test_released_corps_reassigned_to_new_war() {
        let (mut sim, first) = sim_at_war();
        let id = sim
            .raise_corps(first, PolityId(2), "d", &Army::from_pairs([("militia", 30)]))
            .unwrap();
        sim.make_peace(first).unwrap();
        assert_eq!(sim.move_corps(id, HexCoord::new(1, 1)), Err(CommandError::FrontClosed));

        let second = sim.declare_war(PolityId(2), PolityId(3)).unwrap();
        assert!(sim.assign_corps(id, second).is_ok());
        assert_eq!(sim.assign_corps(id, second), Err(CommandError::AlreadyAssigned));
        let corps = sim.corps().get(id).unwrap();
        assert_eq!(corps.front, Some(second));
        assert_eq!(corps.side, Side::Attacker);
        assert!(sim.defend(id).is_ok());
        sim.check_invariants().unwrap();

        let third = sim.declare_war(PolityId(4), PolityId(5)).unwrap();
        sim.make_peace(second).unwrap();
        assert_eq!(sim.assign_corps(id, third), Err(CommandError::NotBelligerent(PolityId(2))));
    }

    #[test]
    fn test_detach_keeps_ledger_balanced() {
        let (mut sim, front) = sim_at_war();
        let id = sim
            .raise_corps(front, PolityId(1), "a", &Army::from_pairs([("militia", 40), ("slinger", 10)]))
            .unwrap();
        sim.detach(id, &Army::from_pairs([("slinger", 10)])).unwrap();
        assert_eq!(sim.pool().army(PolityId(1)).unwrap().get("slinger"), 20);
        assert_eq!(
            sim.detach(id, &Army::from_pairs([("militia", 40)])),
            Err(CommandError::WouldEmpty)
        );
        sim.check_invariants().unwrap();
    }

    #[test]
    fn test_commissioned_general_takes_command() {
        let (mut sim, front) = sim_at_war();
        let id = sim
            .raise_corps(front, PolityId(1), "a", &Army::from_pairs([("militia", 20)]))
            .unwrap();
        let leaderless = sim.corps().strength(id, sim.catalog());
        let mut general = sim.commission_general("Yue", 10);
        assert_eq!(general.level, 4);
        // a pure logistician still beats the leaderless penalty
        general.traits = vec![crate::corps::GeneralTrait::Logistics];
        assert_eq!(sim.appoint_general(id, Some(general)), Ok(None));
        assert!(sim.corps().strength(id, sim.catalog()) > leaderless);
    }

    #[test]
    fn test_disband_releases_everything() {
        let (mut sim, front) = sim_at_war();
        let id = sim
            .raise_corps(front, PolityId(2), "d", &Army::from_pairs([("slinger", 20)]))
            .unwrap();
        assert_eq!(sim.disband(id), Ok(20));
        assert!(sim.front(front).unwrap().corps[1].is_empty());
        assert_eq!(sim.pool().total(PolityId(2)), 80);
        sim.check_invariants().unwrap();
    }
}
