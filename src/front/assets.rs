//! Resource nodes and infrastructure seeded onto a front
//!
//! Both are derived from the owner's real building inventory so that a front
//! puts genuine economic stakes in play. Economies without usable buildings
//! get fixed fallback templates.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::core::config::FrontConfig;
use crate::core::types::{HexCoord, InfraId, NodeId, Side};
use crate::front::buildings::place_in_zone;
use crate::front::economy::{BuildingCatalog, BuildingCategory, EconomySnapshot};
use crate::front::terrain::TerrainGrid;

/// (source, resource, base amount, per-era growth)
const NODE_FALLBACK: [(&str, &str, f64, f64); 5] = [
    ("farm", "food", 200.0, 1.2),
    ("mine", "iron", 80.0, 1.3),
    ("forest", "wood", 150.0, 1.1),
    ("quarry", "stone", 100.0, 1.15),
    ("treasury", "silver", 300.0, 1.4),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceNode {
    pub id: NodeId,
    /// Building (or fallback template) the node was derived from
    pub source: String,
    pub resource: String,
    pub amount: f64,
    pub max_amount: f64,
    pub owner: Side,
    pub plundered: bool,
    pub position: HexCoord,
}

impl ResourceNode {
    /// Take a share of what is left; returns the amount taken
    pub fn plunder(&mut self, rate: f64) -> f64 {
        if self.plundered {
            return 0.0;
        }
        let taken = (self.amount * rate.min(1.0)).floor().max(1.0).min(self.amount);
        self.amount -= taken;
        if self.amount <= 0.0 {
            self.amount = 0.0;
            self.plundered = true;
        }
        taken
    }

    pub fn regenerate(&mut self, rate: f64) {
        if self.plundered || self.amount >= self.max_amount {
            return;
        }
        self.amount = (self.amount + (self.max_amount * rate).ceil()).min(self.max_amount);
    }
}

/// Economic effect of an intact infrastructure item
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct InfraEffect {
    pub defense: f64,
    /// Flat daily silver
    pub income: f64,
    pub supply: f64,
}

impl InfraEffect {
    pub fn for_category(category: BuildingCategory) -> Self {
        match category {
            BuildingCategory::Military => Self { defense: 0.12, ..Default::default() },
            BuildingCategory::Civic => Self { income: 40.0, ..Default::default() },
            BuildingCategory::Gather => Self { supply: 0.08, ..Default::default() },
            BuildingCategory::Industry => Self { supply: 0.10, ..Default::default() },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Infrastructure {
    pub id: InfraId,
    pub source: String,
    pub name: String,
    pub owner: Side,
    pub durability: f64,
    pub max_durability: f64,
    pub effect: InfraEffect,
    pub destroyed: bool,
    pub position: HexCoord,
}

impl Infrastructure {
    /// Apply damage; returns true when this call destroyed the item
    pub fn take_damage(&mut self, damage: f64) -> bool {
        if self.destroyed || damage <= 0.0 {
            return false;
        }
        self.durability = (self.durability - damage).max(0.0);
        if self.durability <= 0.0 {
            self.destroyed = true;
        }
        self.destroyed
    }

    pub fn health_ratio(&self) -> f64 {
        if self.max_durability <= 0.0 {
            0.0
        } else {
            self.durability / self.max_durability
        }
    }
}

/// Shared state while seeding one front
pub struct SeedContext<'a, R: Rng> {
    pub grid: &'a TerrainGrid,
    pub buildings: &'a BuildingCatalog,
    pub config: &'a FrontConfig,
    pub era: u32,
    pub occupied: &'a mut BTreeSet<HexCoord>,
    pub rng: &'a mut R,
}

/// Resource nodes for one side
pub fn seed_resource_nodes<R: Rng>(
    ctx: &mut SeedContext<'_, R>,
    side: Side,
    economy: &EconomySnapshot,
    next_id: &mut u32,
) -> Vec<ResourceNode> {
    let cfg = ctx.config;
    let buildings = ctx.buildings;
    let mut candidates: Vec<(&str, &str, f64, u32)> = economy
        .owned()
        .filter_map(|(id, count)| {
            let def = buildings.get(id)?;
            let (resource, rate) = def.main_output()?;
            Some((def.id.as_str(), resource, rate, count))
        })
        .collect();
    candidates.shuffle(&mut *ctx.rng);

    let mut planned: Vec<(String, String, f64)> = Vec::new();
    if candidates.is_empty() {
        let by_size = (economy.wealth / 300.0 + economy.population / 200.0).floor() as usize;
        let count = by_size.clamp(cfg.min_nodes_per_side, cfg.max_nodes_per_side);
        for _ in 0..count {
            let &(source, resource, base, growth) = NODE_FALLBACK
                .choose(&mut *ctx.rng)
                .unwrap_or(&NODE_FALLBACK[0]);
            let amount = (base * growth.powi(ctx.era as i32) * ctx.rng.gen_range(0.7..1.3)).floor();
            planned.push((source.to_string(), resource.to_string(), amount));
        }
    } else {
        let count = candidates
            .len()
            .clamp(cfg.min_nodes_per_side, cfg.max_nodes_per_side)
            .min(candidates.len());
        for &(source, resource, rate, owned) in candidates.iter().take(count) {
            let days = ctx.rng.gen_range(cfg.node_days_min..cfg.node_days_max) as f64;
            let amount = (rate * owned as f64 * days).floor().max(cfg.node_min_amount);
            planned.push((source.to_string(), resource.to_string(), amount));
        }
    }

    planned
        .into_iter()
        .map(|(source, resource, amount)| {
            *next_id += 1;
            ResourceNode {
                id: NodeId(*next_id),
                source,
                resource,
                amount,
                max_amount: amount,
                owner: side,
                plundered: false,
                position: place_in_zone(ctx.grid, side, ctx.occupied, cfg, &mut *ctx.rng),
            }
        })
        .collect()
}

/// Infrastructure for one side: one item per building category, up to the cap
pub fn seed_infrastructure<R: Rng>(
    ctx: &mut SeedContext<'_, R>,
    side: Side,
    economy: &EconomySnapshot,
    next_id: &mut u32,
) -> Vec<Infrastructure> {
    let cfg = ctx.config;
    let buildings = ctx.buildings;
    let era_scale = 1.0 + ctx.era as f64 * cfg.infrastructure_per_era;

    let mut by_category: BTreeMap<BuildingCategory, Vec<&str>> = BTreeMap::new();
    for (id, _) in economy.owned() {
        if let Some(def) = buildings.get(id) {
            by_category.entry(def.category).or_default().push(def.id.as_str());
        }
    }

    // (source, name, durability, effect)
    let mut planned: Vec<(String, String, f64, InfraEffect)> = Vec::new();
    if by_category.is_empty() {
        let fallback = [
            ("supply_depot", "Supply Depot", 100.0, InfraEffect { supply: 0.1, ..Default::default() }),
            ("watchtower", "Watchtower", 60.0, InfraEffect { defense: 0.08, ..Default::default() }),
            ("market_town", "Market Town", 120.0, InfraEffect { income: 50.0, ..Default::default() }),
        ];
        if let Some(&(source, name, base, effect)) = fallback.choose(&mut *ctx.rng) {
            planned.push((source.into(), name.into(), (base * era_scale).floor(), effect));
        }
    } else {
        for (category, sources) in by_category.iter().take(cfg.max_infrastructure_per_side) {
            let Some(&source) = sources.choose(&mut *ctx.rng) else { continue };
            let level = economy.level_of(source) as f64;
            let durability = (cfg.infrastructure_base_durability
                * (1.0 + level * cfg.infrastructure_per_level)
                * era_scale)
                .floor();
            let name = buildings.get(source).map(|d| d.name.clone()).unwrap_or_default();
            planned.push((source.to_string(), name, durability, InfraEffect::for_category(*category)));
        }
    }

    planned
        .into_iter()
        .map(|(source, name, durability, effect)| {
            *next_id += 1;
            Infrastructure {
                id: InfraId(*next_id),
                source,
                name,
                owner: side,
                durability,
                max_durability: durability,
                effect,
                destroyed: false,
                position: place_in_zone(ctx.grid, side, ctx.occupied, cfg, &mut *ctx.rng),
            }
        })
        .collect()
}
