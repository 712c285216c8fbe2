//! Fronts - the contested theatre between two belligerents
//!
//! A front is generated once per war from both sides' economies: a terrain
//! grid with roads, frontline buildings, resource nodes and infrastructure.
//! Corps are tracked by the [`CorpsManager`]; a front only records which
//! corps are assigned to it.
//!
//! Control of a cell: a side controls a cell when one of its corps stands
//! within one hex and no enemy corps does. Plunder and infrastructure damage
//! require control.

pub mod assets;
pub mod buildings;
pub mod economy;
pub mod registry;
pub mod scoring;
pub mod terrain;

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::core::config::{FrontConfig, ScaleTier};
use crate::core::error::{CommandError, FrontlineError, Result};
use crate::core::types::{BuildingId, CorpsId, FrontId, HexCoord, InfraId, NodeId, PolityId, Side, WarId};
use crate::corps::{Corps, CorpsManager};

pub use assets::{InfraEffect, Infrastructure, ResourceNode, SeedContext};
pub use buildings::{EconomicPenalty, FrontBuilding, FrontBuildingKind};
pub use economy::{BuildingCatalog, BuildingCategory, BuildingDef, EconomySnapshot};
pub use registry::FrontRegistry;
pub use scoring::{PeaceReason, WarOutcome, WarResult, WarScore};
pub use terrain::{FrontTerrain, TerrainGrid};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrontStatus {
    #[default]
    Forming,
    Active,
    Resolved,
}

/// Per-side modifiers a front imposes on its belligerents' economies
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EconomicImpact {
    /// Fractional production loss from plunder and destroyed buildings
    pub production_penalty: f64,
    /// Fractional income loss from destroyed buildings
    pub income_penalty: f64,
    /// Flat income lost with destroyed infrastructure
    pub lost_income: f64,
    pub supply_bonus: f64,
    pub defense_bonus: f64,
    /// Accumulated building-destruction penalties
    pub penalties: EconomicPenalty,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingDestroyed {
    pub building: BuildingId,
    pub kind: FrontBuildingKind,
    pub owner: Side,
    pub loot: BTreeMap<String, f64>,
    pub score_delta: f64,
}

/// Display view of a front
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrontSnapshot {
    pub id: FrontId,
    pub war: WarId,
    pub status: FrontStatus,
    pub tier: String,
    pub war_score: f64,
    pub area_control: [f64; 2],
    pub exhaustion: [f64; 2],
    pub resource_nodes: Vec<ResourceNode>,
    pub infrastructure: Vec<Infrastructure>,
    pub buildings: Vec<FrontBuilding>,
    pub corps: Vec<Corps>,
    pub days_since_start: u32,
    pub outcome: Option<WarOutcome>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Front {
    pub id: FrontId,
    pub war: WarId,
    /// Attacker then defender
    pub belligerents: [PolityId; 2],
    pub status: FrontStatus,
    pub tier: ScaleTier,
    /// Highest era of the two belligerents
    pub era: u32,
    pub grid: TerrainGrid,
    pub buildings: Vec<FrontBuilding>,
    pub resource_nodes: Vec<ResourceNode>,
    pub infrastructure: Vec<Infrastructure>,
    /// Assigned corps per side
    pub corps: [Vec<CorpsId>; 2],
    pub score: WarScore,
    pub area_control: [f64; 2],
    pub casualties: [u32; 2],
    /// Loot taken by each side, by resource
    pub plundered: [BTreeMap<String, f64>; 2],
    pub penalties: [EconomicPenalty; 2],
    pub days_elapsed: u32,
    pub outcome: Option<WarOutcome>,
    /// Front rules in force when the war began
    rules: FrontConfig,
}

/// First tier whose power ceiling is above `power`; the last tier otherwise
pub fn select_tier(power: f64, tiers: &[ScaleTier]) -> Option<&ScaleTier> {
    tiers
        .iter()
        .find(|t| t.max_power.map_or(true, |max| power < max))
        .or_else(|| tiers.last())
}

impl Front {
    /// Build a front for a new war
    #[allow(clippy::too_many_arguments)]
    pub fn generate<R: Rng>(
        id: FrontId,
        war: WarId,
        belligerents: [PolityId; 2],
        economies: [&EconomySnapshot; 2],
        catalog: &BuildingCatalog,
        config: &FrontConfig,
        rng: &mut R,
    ) -> Result<Self> {
        let power: f64 = economies.iter().map(|e| e.power(config)).sum();
        let tier = select_tier(power, &config.tiers)
            .cloned()
            .ok_or_else(|| FrontlineError::InvalidConfig("no scale tiers configured".into()))?;
        let era = economies[0].era.max(economies[1].era);
        let grid = TerrainGrid::generate(tier.width, tier.height, &config.terrain, rng);

        let mut front = Self {
            id,
            war,
            belligerents,
            status: FrontStatus::Forming,
            tier,
            era,
            grid,
            buildings: Vec::new(),
            resource_nodes: Vec::new(),
            infrastructure: Vec::new(),
            corps: [Vec::new(), Vec::new()],
            score: WarScore::new(),
            area_control: [0.0; 2],
            casualties: [0; 2],
            plundered: [BTreeMap::new(), BTreeMap::new()],
            penalties: [EconomicPenalty::default(); 2],
            days_elapsed: 0,
            outcome: None,
            rules: config.clone(),
        };

        let mut occupied: BTreeSet<HexCoord> =
            Side::BOTH.into_iter().map(|s| front.start_position(s)).collect();
        let (mut next_building, mut next_node, mut next_infra) = (0, 0, 0);

        for side in Side::BOTH {
            let seeds = buildings::select_buildings(
                economies[side.index()],
                catalog,
                front.tier.buildings_per_side as usize,
                rng,
            );
            let placed = buildings::place_buildings(
                seeds,
                side,
                &front.grid,
                &mut occupied,
                &mut next_building,
                config,
                rng,
            );
            front.buildings.extend(placed);
        }

        let mut ctx = SeedContext {
            grid: &front.grid,
            buildings: catalog,
            config,
            era,
            occupied: &mut occupied,
            rng: &mut *rng,
        };
        let mut nodes = Vec::new();
        let mut infrastructure = Vec::new();
        for side in Side::BOTH {
            let economy = economies[side.index()];
            nodes.extend(assets::seed_resource_nodes(&mut ctx, side, economy, &mut next_node));
            infrastructure.extend(assets::seed_infrastructure(&mut ctx, side, economy, &mut next_infra));
        }
        front.resource_nodes = nodes;
        front.infrastructure = infrastructure;

        tracing::info!(
            front = id.0,
            tier = %front.tier.name,
            power,
            buildings = front.buildings.len(),
            nodes = front.resource_nodes.len(),
            infrastructure = front.infrastructure.len(),
            "front generated"
        );
        Ok(front)
    }

    pub fn rules(&self) -> &FrontConfig {
        &self.rules
    }

    pub fn is_active(&self) -> bool {
        self.status != FrontStatus::Resolved
    }

    pub fn attacker(&self) -> PolityId {
        self.belligerents[0]
    }

    pub fn defender(&self) -> PolityId {
        self.belligerents[1]
    }

    /// Side `polity` fights on, if it is a belligerent here
    pub fn side_of(&self, polity: PolityId) -> Option<Side> {
        Side::BOTH.into_iter().find(|s| self.belligerents[s.index()] == polity)
    }

    pub fn polity(&self, side: Side) -> PolityId {
        self.belligerents[side.index()]
    }

    /// Where newly assigned corps of `side` appear
    pub fn start_position(&self, side: Side) -> HexCoord {
        let q = match side {
            Side::Attacker => 1,
            Side::Defender => self.grid.width as i32 - 2,
        };
        let wanted = HexCoord::new(q, self.grid.height as i32 / 2);
        self.grid.nearest_open(wanted).unwrap_or(wanted)
    }

    pub fn building(&self, id: BuildingId) -> Option<&FrontBuilding> {
        self.buildings.iter().find(|b| b.id == id)
    }

    pub fn node(&self, id: NodeId) -> Option<&ResourceNode> {
        self.resource_nodes.iter().find(|n| n.id == id)
    }

    pub fn infra(&self, id: InfraId) -> Option<&Infrastructure> {
        self.infrastructure.iter().find(|i| i.id == id)
    }

    /// Intact buildings owned by `side`
    pub fn standing_buildings(&self, side: Side) -> impl Iterator<Item = &FrontBuilding> {
        self.buildings.iter().filter(move |b| b.owner == side && !b.destroyed)
    }

    /// Whether `side` holds the cell `at` under the one-hex presence rule
    pub fn controls(&self, side: Side, at: HexCoord, corps: &CorpsManager) -> bool {
        let mut own = false;
        for c in corps.on_front(self.id) {
            if c.position.distance(&at) > 1 {
                continue;
            }
            if c.side == side {
                own = true;
            } else {
                return false;
            }
        }
        own
    }

    /// Take a share of an enemy resource node held by `side`
    pub fn plunder_node(&mut self, id: NodeId, side: Side, corps: &CorpsManager) -> std::result::Result<f64, CommandError> {
        let (owner, position) = self
            .node(id)
            .map(|n| (n.owner, n.position))
            .ok_or(CommandError::UnknownTarget)?;
        if owner == side {
            return Err(CommandError::FriendlyTarget("resource node"));
        }
        if !self.controls(side, position, corps) {
            return Err(CommandError::NotControlled("resource node"));
        }
        let rate = self.rules.plunder_rate;
        let node = self
            .resource_nodes
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or(CommandError::UnknownTarget)?;
        let taken = node.plunder(rate);
        if taken > 0.0 {
            *self.plundered[side.index()].entry(node.resource.clone()).or_insert(0.0) += taken;
            tracing::debug!(front = self.id.0, node = id.0, taken, "node plundered");
        }
        Ok(taken)
    }

    /// Damage enemy infrastructure held by `side`; true when it was destroyed
    ///
    /// Destruction scores for the destroyer and adds exhaustion to the owner.
    pub fn damage_infrastructure(
        &mut self,
        id: InfraId,
        side: Side,
        damage: f64,
        corps: &CorpsManager,
    ) -> std::result::Result<bool, CommandError> {
        let (owner, position) = self
            .infra(id)
            .map(|i| (i.owner, i.position))
            .ok_or(CommandError::UnknownTarget)?;
        if owner == side {
            return Err(CommandError::FriendlyTarget("infrastructure"));
        }
        if !self.controls(side, position, corps) {
            return Err(CommandError::NotControlled("infrastructure"));
        }
        let infra = self
            .infrastructure
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or(CommandError::UnknownTarget)?;
        let destroyed = infra.take_damage(damage);
        if destroyed {
            tracing::info!(front = self.id.0, infra = id.0, name = %infra.name, "infrastructure destroyed");
            let ws = &self.rules.war_score;
            let score_delta = match owner {
                Side::Defender => ws.infrastructure_destroyed,
                Side::Attacker => ws.infrastructure_lost,
            };
            self.score.add(score_delta);
            let fatigue = self.rules.exhaustion.infrastructure_loss;
            self.score.add_exhaustion(owner, fatigue, &self.rules.exhaustion);
        }
        Ok(destroyed)
    }

    /// Apply damage from a corps of `side` to an enemy building
    ///
    /// The caller checks adjacency. Destruction moves the building's stock
    /// to the attacker, scores it and penalises the owner.
    pub fn damage_building(
        &mut self,
        id: BuildingId,
        side: Side,
        damage: f64,
    ) -> std::result::Result<Option<BuildingDestroyed>, CommandError> {
        let building = self
            .buildings
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or(CommandError::UnknownTarget)?;
        if building.owner == side {
            return Err(CommandError::FriendlyTarget("building"));
        }
        if !building.take_damage(damage) {
            return Ok(None);
        }

        let owner = building.owner;
        let kind = building.kind;
        let loot = std::mem::take(&mut building.resources);
        let score_delta = match owner {
            Side::Defender => kind.destroyed_score(),
            Side::Attacker => kind.lost_score(),
        };
        self.score.add(score_delta);
        self.penalties[owner.index()] += kind.destroy_penalty();
        self.score.add_exhaustion(owner, kind.fatigue(), &self.rules.exhaustion);
        for (resource, amount) in &loot {
            *self.plundered[side.index()].entry(resource.clone()).or_insert(0.0) += amount;
        }
        tracing::info!(front = self.id.0, building = id.0, ?kind, score_delta, "building destroyed");
        Ok(Some(BuildingDestroyed {
            building: id,
            kind,
            owner,
            loot,
            score_delta,
        }))
    }

    /// Fold a corps battle into score, exhaustion and casualty totals
    ///
    /// Returns the score change.
    pub fn record_battle(&mut self, winner: Side, attacker_casualties: u32, defender_casualties: u32) -> f64 {
        let delta = WarScore::battle_delta(
            &self.rules.war_score,
            winner,
            attacker_casualties,
            defender_casualties,
        );
        self.score.add(delta);
        for (side, n) in [(Side::Attacker, attacker_casualties), (Side::Defender, defender_casualties)] {
            self.casualties[side.index()] += n;
            self.score.accrue_casualties(side, n, &self.rules.exhaustion);
        }
        delta
    }

    /// Recompute each side's share of the front; returns any control bonus awarded
    pub fn update_area_control(&mut self, corps: &CorpsManager) -> f64 {
        let mut weight = [0.0_f64; 2];
        for b in self.buildings.iter().filter(|b| !b.destroyed) {
            weight[b.owner.index()] += 1.0;
        }
        for i in self.infrastructure.iter().filter(|i| !i.destroyed) {
            weight[i.owner.index()] += 1.0;
        }
        for c in corps.on_front(self.id).filter(|c| !c.is_routing()) {
            weight[c.side.index()] += 1.0;
        }
        let total = weight[0] + weight[1];
        self.area_control = if total > 0.0 {
            [weight[0] / total, weight[1] / total]
        } else {
            [0.0, 0.0]
        };
        self.score.award_control(self.area_control, &self.rules.war_score)
    }

    /// Start a new day: activate, age and tire
    pub fn advance_day(&mut self) {
        if self.status == FrontStatus::Forming {
            self.status = FrontStatus::Active;
        }
        self.days_elapsed += 1;
        let daily = self.rules.exhaustion.daily;
        for side in Side::BOTH {
            self.score.add_exhaustion(side, daily, &self.rules.exhaustion);
        }
    }

    pub fn regenerate(&mut self) {
        let rate = self.rules.regen_rate;
        for node in &mut self.resource_nodes {
            node.regenerate(rate);
        }
    }

    /// Settle the war if a peace condition holds
    pub fn check_end(&mut self) -> Option<WarOutcome> {
        if let Some(outcome) = self.outcome {
            return Some(outcome);
        }
        let score = self.score.value;
        let decisive = self.rules.war_score.decisive;
        let reason = if score >= decisive || score <= -decisive {
            PeaceReason::Score
        } else if let Some(side) = self.score.exhausted(&self.rules.exhaustion) {
            PeaceReason::Exhaustion(side)
        } else if self.days_elapsed >= self.rules.max_duration_days {
            PeaceReason::Duration
        } else {
            return None;
        };
        Some(self.conclude(reason))
    }

    /// Resolve the front on its current score
    pub fn conclude(&mut self, reason: PeaceReason) -> WarOutcome {
        if let Some(outcome) = self.outcome {
            return outcome;
        }
        let outcome = WarOutcome {
            result: WarResult::classify(self.score.value, &self.rules.war_score),
            reason,
            final_score: self.score.value,
            day: self.days_elapsed,
        };
        self.status = FrontStatus::Resolved;
        self.outcome = Some(outcome);
        tracing::info!(front = self.id.0, result = ?outcome.result, ?reason, score = outcome.final_score, "war resolved");
        outcome
    }

    /// Modifiers the front imposes on `side`'s economy
    pub fn economic_impact(&self, side: Side) -> EconomicImpact {
        let own_nodes: Vec<_> = self.resource_nodes.iter().filter(|n| n.owner == side).collect();
        let plundered = own_nodes.iter().filter(|n| n.plundered).count();
        let penalties = self.penalties[side.index()];

        let mut impact = EconomicImpact {
            production_penalty: penalties.production,
            income_penalty: penalties.income,
            penalties,
            ..Default::default()
        };
        if !own_nodes.is_empty() {
            impact.production_penalty +=
                plundered as f64 / own_nodes.len() as f64 * self.rules.plunder_production_penalty;
        }
        for infra in self.infrastructure.iter().filter(|i| i.owner == side) {
            if infra.destroyed {
                impact.lost_income += infra.effect.income;
            } else {
                let health = infra.health_ratio();
                impact.supply_bonus += infra.effect.supply * health;
                impact.defense_bonus += infra.effect.defense * health;
            }
        }
        impact
    }

    /// Drop a corps that was destroyed or disbanded
    pub fn forget_corps(&mut self, id: CorpsId) {
        for list in &mut self.corps {
            list.retain(|c| *c != id);
        }
    }

    pub fn snapshot(&self, corps: &CorpsManager) -> FrontSnapshot {
        FrontSnapshot {
            id: self.id,
            war: self.war,
            status: self.status,
            tier: self.tier.name.clone(),
            war_score: self.score.value,
            area_control: self.area_control,
            exhaustion: self.score.exhaustion,
            resource_nodes: self.resource_nodes.clone(),
            infrastructure: self.infrastructure.clone(),
            buildings: self.buildings.clone(),
            corps: corps.on_front(self.id).cloned().collect(),
            days_since_start: self.days_elapsed,
            outcome: self.outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::CorpsConfig;
    use crate::corps::ArmyPool;
    use crate::units::Army;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn economy() -> EconomySnapshot {
        EconomySnapshot {
            wealth: 2000.0,
            population: 800.0,
            army_size: 200,
            era: 1,
            buildings: [("farm", 4), ("market", 1), ("barracks", 1), ("iron_tool_workshop", 2)]
                .into_iter()
                .map(|(id, n)| (id.to_string(), n))
                .collect(),
            ..Default::default()
        }
    }

    fn front() -> Front {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let eco = economy();
        Front::generate(
            FrontId(1),
            WarId(1),
            [PolityId(1), PolityId(2)],
            [&eco, &eco],
            &BuildingCatalog::with_defaults(),
            &FrontConfig::default(),
            &mut rng,
        )
        .unwrap()
    }

    /// Corps manager with one corps per side standing at the given cells
    fn presence(front: &Front, attacker_at: HexCoord, defender_at: Option<HexCoord>) -> CorpsManager {
        let mut pool = ArmyPool::new();
        pool.deposit(PolityId(1), Army::from_pairs([("militia", 20)]));
        pool.deposit(PolityId(2), Army::from_pairs([("militia", 20)]));
        let mut corps = CorpsManager::new(CorpsConfig::default());
        let units = Army::from_pairs([("militia", 10)]);
        let a = corps
            .create(&mut pool, PolityId(1), Side::Attacker, "a", &units, attacker_at)
            .unwrap();
        corps.set_front(a, Some(front.id)).unwrap();
        if let Some(at) = defender_at {
            let d = corps
                .create(&mut pool, PolityId(2), Side::Defender, "d", &units, at)
                .unwrap();
            corps.set_front(d, Some(front.id)).unwrap();
        }
        corps
    }

    #[test]
    fn test_tier_selection() {
        let tiers = FrontConfig::default().tiers;
        assert_eq!(select_tier(0.0, &tiers).unwrap().name, "tiny");
        assert_eq!(select_tier(4999.0, &tiers).unwrap().name, "tiny");
        assert_eq!(select_tier(5000.0, &tiers).unwrap().name, "small");
        assert_eq!(select_tier(1.0e9, &tiers).unwrap().name, "epic");
        assert!(select_tier(10.0, &[]).is_none());
    }

    #[test]
    fn test_generation_seeds_both_sides() {
        let f = front();
        // 2 * (2000*0.5 + 800*2 + 200*10) = 9200
        assert_eq!(f.tier.name, "small");
        assert_eq!(f.era, 1);
        assert_eq!(f.status, FrontStatus::Forming);
        for side in Side::BOTH {
            assert_eq!(f.standing_buildings(side).count(), 4);
            assert!(f.resource_nodes.iter().filter(|n| n.owner == side).count() >= 2);
            assert!(f.infrastructure.iter().any(|i| i.owner == side));
        }
        let (start, end) = buildings::side_zone(Side::Defender, f.grid.width, f.rules());
        assert!(f
            .standing_buildings(Side::Defender)
            .all(|b| (start..end).contains(&b.position.q)));
    }

    #[test]
    fn test_generation_is_reproducible() {
        let a = front();
        let b = front();
        assert_eq!(a.grid, b.grid);
        assert_eq!(a.buildings, b.buildings);
        assert_eq!(a.resource_nodes, b.resource_nodes);
    }

    #[test]
    fn test_plunder_requires_control() {
        let mut f = front();
        let node = f.resource_nodes.iter().find(|n| n.owner == Side::Defender).unwrap().clone();
        let far = f.start_position(Side::Attacker);

        let corps = presence(&f, far, None);
        if far.distance(&node.position) > 1 {
            assert_eq!(
                f.plunder_node(node.id, Side::Attacker, &corps),
                Err(CommandError::NotControlled("resource node"))
            );
        }
        assert_eq!(
            f.plunder_node(node.id, Side::Defender, &corps),
            Err(CommandError::FriendlyTarget("resource node"))
        );

        // contested: both sides next to the node
        let contested = presence(&f, node.position, Some(node.position));
        assert_eq!(
            f.plunder_node(node.id, Side::Attacker, &contested),
            Err(CommandError::NotControlled("resource node"))
        );

        let held = presence(&f, node.position, None);
        let taken = f.plunder_node(node.id, Side::Attacker, &held).unwrap();
        assert_eq!(taken, (node.amount * 0.3).floor().max(1.0));
        assert_eq!(f.plundered[0][&node.resource], taken);
    }

    #[test]
    fn test_destroying_building_scores_and_penalises() {
        let mut f = front();
        let target = f.standing_buildings(Side::Defender).next().unwrap().clone();
        assert_eq!(
            f.damage_building(target.id, Side::Defender, 10.0),
            Err(CommandError::FriendlyTarget("building"))
        );
        assert_eq!(f.damage_building(target.id, Side::Attacker, 1.0), Ok(None));
        let destroyed = f
            .damage_building(target.id, Side::Attacker, 1.0e6)
            .unwrap()
            .unwrap();
        assert_eq!(destroyed.score_delta, target.kind.destroyed_score());
        assert_eq!(f.score.value, target.kind.destroyed_score());
        assert_eq!(f.penalties[1], target.kind.destroy_penalty());
        assert_eq!(f.score.exhaustion[1], target.kind.fatigue());
        assert_eq!(destroyed.loot, target.resources);
        // already rubble
        assert_eq!(f.damage_building(target.id, Side::Attacker, 1.0e6), Ok(None));
    }

    #[test]
    fn test_losing_own_building_costs_attacker_score() {
        let mut f = front();
        let target = f.standing_buildings(Side::Attacker).next().unwrap().clone();
        f.damage_building(target.id, Side::Defender, 1.0e6).unwrap();
        assert_eq!(f.score.value, target.kind.lost_score());
    }

    #[test]
    fn test_destroying_infrastructure_scores_and_tires_owner() {
        let mut f = front();
        let ws = f.rules().war_score.clone();
        let fatigue = f.rules().exhaustion.infrastructure_loss;

        let target = f.infrastructure.iter().find(|i| i.owner == Side::Defender).unwrap().clone();
        let corps = presence(&f, target.position, None);
        assert_eq!(f.damage_infrastructure(target.id, Side::Attacker, 1.0, &corps), Ok(false));
        assert_eq!(f.score.value, 0.0);
        assert_eq!(f.damage_infrastructure(target.id, Side::Attacker, 1.0e6, &corps), Ok(true));
        assert_eq!(f.score.value, ws.infrastructure_destroyed);
        assert_eq!(f.score.exhaustion[Side::Defender.index()], fatigue);
        assert_eq!(f.score.exhaustion[Side::Attacker.index()], 0.0);
        // rubble scores nothing further
        assert_eq!(f.damage_infrastructure(target.id, Side::Attacker, 1.0e6, &corps), Ok(false));
        assert_eq!(f.score.value, ws.infrastructure_destroyed);
    }

    #[test]
    fn test_area_control_fractions() {
        let mut f = front();
        let corps = presence(&f, f.start_position(Side::Attacker), None);
        f.update_area_control(&corps);
        let sum = f.area_control[0] + f.area_control[1];
        assert!((sum - 1.0).abs() < 1e-9);
        assert!(f.area_control[0] > f.area_control[1]);
    }

    #[test]
    fn test_score_thresholds_end_war() {
        let mut f = front();
        f.advance_day();
        assert_eq!(f.status, FrontStatus::Active);

        f.score.value = 49.0;
        assert!(f.check_end().is_none());
        f.score.value = -49.0;
        assert!(f.check_end().is_none());

        f.score.value = 100.0;
        let outcome = f.check_end().unwrap();
        assert_eq!(outcome.result, WarResult::DecisiveVictory);
        assert_eq!(outcome.reason, PeaceReason::Score);
        assert_eq!(f.status, FrontStatus::Resolved);
        // settled wars stay settled
        f.score.value = -200.0;
        assert_eq!(f.check_end(), Some(outcome));
    }

    #[test]
    fn test_duration_settles_on_score() {
        let mut f = front();
        f.score.value = 60.0;
        for _ in 0..364 {
            f.advance_day();
            assert!(f.check_end().is_none());
        }
        f.advance_day();
        let outcome = f.check_end().unwrap();
        assert_eq!(outcome.reason, PeaceReason::Duration);
        assert_eq!(outcome.result, WarResult::MinorVictory);
    }

    #[test]
    fn test_economic_impact_of_losses() {
        let mut f = front();
        let own: Vec<_> = f.resource_nodes.iter().filter(|n| n.owner == Side::Defender).map(|n| n.id).collect();
        for node in &mut f.resource_nodes {
            if node.id == own[0] {
                node.amount = 0.0;
                node.plundered = true;
            }
        }
        let impact = f.economic_impact(Side::Defender);
        let expected = 0.15 / own.len() as f64;
        assert!((impact.production_penalty - expected).abs() < 1e-9);
        assert!(impact.supply_bonus >= 0.0 && impact.defense_bonus >= 0.0);

        let untouched = f.economic_impact(Side::Attacker);
        assert_eq!(untouched.production_penalty, 0.0);
        assert_eq!(untouched.lost_income, 0.0);
    }

    #[test]
    fn test_snapshot_serializes() {
        let f = front();
        let corps = presence(&f, f.start_position(Side::Attacker), None);
        let snap = f.snapshot(&corps);
        assert_eq!(snap.corps.len(), 1);
        let json = serde_json::to_string(&snap).unwrap();
        let back: FrontSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snap);
    }
}
