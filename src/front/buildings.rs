//! Frontline buildings
//!
//! Each side's real building inventory is sampled into a handful of frontline
//! buildings: a priority list picks the most war-relevant ones first, a
//! random fill tops up the rest.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::core::config::FrontConfig;
use crate::core::types::{BuildingId, HexCoord, Side};
use crate::front::economy::{BuildingCatalog, BuildingCategory, EconomySnapshot};
use crate::front::terrain::TerrainGrid;

/// Source buildings picked first, in order
pub const SELECTION_PRIORITY: [&str; 12] = [
    "farm",
    "large_estate",
    "mine",
    "coal_mine",
    "weapon_workshop",
    "arsenal",
    "market",
    "trade_port",
    "sawmill",
    "loom_house",
    "barracks",
    "fortress",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrontBuildingKind {
    Farm,
    Mine,
    Workshop,
    Market,
    Barracks,
    Housing,
    Fortress,
    TownCenter,
}

/// Lasting economic damage, as positive fractions
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EconomicPenalty {
    pub production: f64,
    pub income: f64,
    pub military_capacity: f64,
    pub population: f64,
    pub stability: f64,
}

impl std::ops::AddAssign for EconomicPenalty {
    fn add_assign(&mut self, rhs: Self) {
        self.production += rhs.production;
        self.income += rhs.income;
        self.military_capacity += rhs.military_capacity;
        self.population += rhs.population;
        self.stability += rhs.stability;
    }
}

impl FrontBuildingKind {
    pub const ALL: [FrontBuildingKind; 8] = [
        Self::Farm,
        Self::Mine,
        Self::Workshop,
        Self::Market,
        Self::Barracks,
        Self::Housing,
        Self::Fortress,
        Self::TownCenter,
    ];

    /// Frontline kind for a source building id
    pub fn from_source(source: &str) -> Option<Self> {
        let kind = match source {
            "farm" | "large_estate" => Self::Farm,
            "mine" | "copper_mine" | "coal_mine" | "quarry" => Self::Mine,
            "sawmill" | "iron_tool_workshop" | "bronze_foundry" => Self::Workshop,
            "weapon_workshop" | "arsenal" | "barracks" | "training_ground" => Self::Barracks,
            "market" | "trade_port" => Self::Market,
            "fortress" => Self::Fortress,
            "hut" | "house" => Self::Housing,
            "town_hall" => Self::TownCenter,
            _ => return None,
        };
        Some(kind)
    }

    pub fn from_category(category: BuildingCategory) -> Self {
        match category {
            BuildingCategory::Gather => Self::Farm,
            BuildingCategory::Industry => Self::Workshop,
            BuildingCategory::Civic => Self::Housing,
            BuildingCategory::Military => Self::Barracks,
        }
    }

    pub fn base_health(&self) -> f64 {
        match self {
            Self::Farm => 80.0,
            Self::Mine => 120.0,
            Self::Workshop => 100.0,
            Self::Market => 100.0,
            Self::Barracks => 150.0,
            Self::Housing => 80.0,
            Self::Fortress => 300.0,
            Self::TownCenter => 500.0,
        }
    }

    pub fn defense(&self) -> f64 {
        match self {
            Self::Farm => 5.0,
            Self::Mine => 10.0,
            Self::Workshop => 8.0,
            Self::Market => 5.0,
            Self::Barracks => 20.0,
            Self::Housing => 3.0,
            Self::Fortress => 50.0,
            Self::TownCenter => 30.0,
        }
    }

    pub fn resource_value(&self) -> &'static [(&'static str, f64)] {
        match self {
            Self::Farm => &[("food", 300.0)],
            Self::Mine => &[("iron", 150.0), ("copper", 100.0)],
            Self::Workshop => &[("tools", 80.0)],
            Self::Market => &[("silver", 500.0)],
            Self::Barracks => &[("weapons", 50.0)],
            Self::Housing => &[("food", 100.0), ("cloth", 50.0)],
            Self::Fortress => &[("weapons", 100.0), ("firearms", 50.0)],
            Self::TownCenter => &[("silver", 1000.0), ("food", 500.0)],
        }
    }

    pub fn destroy_penalty(&self) -> EconomicPenalty {
        let mut p = EconomicPenalty::default();
        match self {
            Self::Farm | Self::Mine => p.production = 0.10,
            Self::Workshop => p.production = 0.05,
            Self::Market => p.income = 0.10,
            Self::Barracks => p.military_capacity = 0.05,
            Self::Housing => p.population = 0.02,
            Self::Fortress => p.stability = 0.10,
            Self::TownCenter => {
                p.stability = 0.15;
                p.production = 0.10;
            }
        }
        p
    }

    /// War score for the side that destroys this building
    pub fn destroyed_score(&self) -> f64 {
        match self {
            Self::Farm => 8.0,
            Self::Mine => 12.0,
            Self::Workshop => 10.0,
            Self::Market => 15.0,
            Self::Barracks => 18.0,
            Self::Housing => 6.0,
            Self::Fortress => 25.0,
            Self::TownCenter => 35.0,
        }
    }

    /// War score for the side that loses this building
    pub fn lost_score(&self) -> f64 {
        match self {
            Self::Farm => -5.0,
            Self::Mine => -8.0,
            Self::Workshop => -7.0,
            Self::Market => -10.0,
            Self::Barracks => -12.0,
            Self::Housing => -4.0,
            Self::Fortress => -20.0,
            Self::TownCenter => -30.0,
        }
    }

    /// War exhaustion the owner accrues when this building is lost
    pub fn fatigue(&self) -> f64 {
        match self {
            Self::Farm => 0.5,
            Self::Mine => 0.8,
            Self::Workshop => 0.6,
            Self::Market => 1.0,
            Self::Barracks => 1.2,
            Self::Housing => 0.4,
            Self::Fortress => 2.0,
            Self::TownCenter => 3.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrontBuilding {
    pub id: BuildingId,
    pub owner: Side,
    pub kind: FrontBuildingKind,
    /// Building id in the owner's economy this was seeded from
    pub source: String,
    pub level: u32,
    pub health: f64,
    pub max_health: f64,
    pub defense: f64,
    pub resources: BTreeMap<String, f64>,
    pub position: HexCoord,
    pub destroyed: bool,
}

impl FrontBuilding {
    /// Apply damage; returns true when this call destroyed the building
    pub fn take_damage(&mut self, damage: f64) -> bool {
        if self.destroyed || damage <= 0.0 {
            return false;
        }
        self.health = (self.health - damage).max(0.0);
        if self.health <= 0.0 {
            self.destroyed = true;
        }
        self.destroyed
    }
}

/// A building chosen for the front, not yet placed
#[derive(Debug, Clone, PartialEq)]
pub struct BuildingSeed {
    pub kind: FrontBuildingKind,
    pub source: String,
    pub level: u32,
}

impl BuildingSeed {
    fn from_source(source: &str, level: u32, catalog: &BuildingCatalog) -> Self {
        let kind = FrontBuildingKind::from_source(source)
            .or_else(|| catalog.get(source).map(|d| FrontBuildingKind::from_category(d.category)))
            .unwrap_or(FrontBuildingKind::Housing);
        Self {
            kind,
            source: source.to_string(),
            level,
        }
    }
}

/// Pick `count` buildings from an economy's inventory
pub fn select_buildings(
    economy: &EconomySnapshot,
    catalog: &BuildingCatalog,
    count: usize,
    rng: &mut impl Rng,
) -> Vec<BuildingSeed> {
    // one entry per owned instance, capped at `count` per building id
    let mut available: Vec<(&str, u32)> = economy
        .owned()
        .flat_map(|(id, n)| {
            let level = economy.level_of(id);
            std::iter::repeat((id, level)).take((n as usize).min(count))
        })
        .collect();

    if available.is_empty() {
        return (0..count)
            .map(|i| {
                let source = if i % 2 == 0 { "farm" } else { "hut" };
                BuildingSeed::from_source(source, 0, catalog)
            })
            .collect();
    }

    let mut selected = Vec::with_capacity(count);
    for wanted in SELECTION_PRIORITY {
        if selected.len() >= count {
            break;
        }
        if let Some(idx) = available.iter().position(|(id, _)| *id == wanted) {
            let (id, level) = available.remove(idx);
            selected.push(BuildingSeed::from_source(id, level, catalog));
        }
    }

    available.shuffle(rng);
    for (id, level) in available {
        if selected.len() >= count {
            break;
        }
        selected.push(BuildingSeed::from_source(id, level, catalog));
    }
    selected
}

/// Column range `[start, end)` a side may use for its own assets
pub fn side_zone(side: Side, width: u32, config: &FrontConfig) -> (i32, i32) {
    match side {
        Side::Attacker => (0, ((width as f64 * config.attacker_zone).floor() as i32).max(1)),
        Side::Defender => (
            ((width as f64 * config.defender_zone).floor() as i32).min(width as i32 - 1),
            width as i32,
        ),
    }
}

/// Pick an open, unoccupied cell in `side`'s zone
///
/// Tries random cells first, then scans the zone; falls back to any free
/// cell in the zone when no open cell remains.
pub fn place_in_zone(
    grid: &TerrainGrid,
    side: Side,
    occupied: &mut BTreeSet<HexCoord>,
    config: &FrontConfig,
    rng: &mut impl Rng,
) -> HexCoord {
    let (start, end) = side_zone(side, grid.width, config);
    let height = grid.height as i32;

    for _ in 0..config.placement_attempts {
        let at = HexCoord::new(rng.gen_range(start..end), rng.gen_range(0..height));
        if grid.is_open(at) && occupied.insert(at) {
            return at;
        }
    }

    let zone = move || (0..height).flat_map(move |r| (start..end).map(move |q| HexCoord::new(q, r)));
    let at = zone()
        .find(|c| grid.is_open(*c) && !occupied.contains(c))
        .or_else(|| zone().find(|c| !occupied.contains(c)))
        .unwrap_or(HexCoord::new(start, 0));
    occupied.insert(at);
    at
}

/// Turn seeds into placed buildings
pub fn place_buildings(
    seeds: Vec<BuildingSeed>,
    side: Side,
    grid: &TerrainGrid,
    occupied: &mut BTreeSet<HexCoord>,
    next_id: &mut u32,
    config: &FrontConfig,
    rng: &mut impl Rng,
) -> Vec<FrontBuilding> {
    seeds
        .into_iter()
        .map(|seed| {
            let level = seed.level as f64;
            let max_health = seed.kind.base_health() * (1.0 + level * config.building_health_per_level);
            let resources = seed
                .kind
                .resource_value()
                .iter()
                .map(|&(res, amount)| {
                    let scaled = (amount * (1.0 + level * config.building_resources_per_level)).floor();
                    (res.to_string(), scaled)
                })
                .collect();
            let position = place_in_zone(grid, side, occupied, config, rng);
            *next_id += 1;
            FrontBuilding {
                id: BuildingId(*next_id),
                owner: side,
                kind: seed.kind,
                source: seed.source,
                level: seed.level,
                health: max_health,
                max_health,
                defense: seed.kind.defense(),
                resources,
                position,
                destroyed: false,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::front::terrain::FrontTerrain;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn economy(pairs: &[(&str, u32)]) -> EconomySnapshot {
        EconomySnapshot {
            buildings: pairs.iter().map(|&(id, n)| (id.to_string(), n)).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_priority_buildings_first() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let catalog = BuildingCatalog::with_defaults();
        let eco = economy(&[("hut", 5), ("market", 1), ("farm", 2), ("fortress", 1)]);
        let seeds = select_buildings(&eco, &catalog, 3, &mut rng);
        let kinds: Vec<_> = seeds.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![FrontBuildingKind::Farm, FrontBuildingKind::Market, FrontBuildingKind::Fortress]
        );
    }

    #[test]
    fn test_random_fill_and_category_mapping() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let catalog = BuildingCatalog::with_defaults();
        let eco = economy(&[("lumber_camp", 3)]);
        let seeds = select_buildings(&eco, &catalog, 4, &mut rng);
        // only 3 instances exist
        assert_eq!(seeds.len(), 3);
        // lumber_camp is not mapped directly; gather maps to farm
        assert!(seeds.iter().all(|s| s.kind == FrontBuildingKind::Farm));
    }

    #[test]
    fn test_empty_inventory_falls_back() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let seeds = select_buildings(&EconomySnapshot::default(), &BuildingCatalog::with_defaults(), 3, &mut rng);
        let kinds: Vec<_> = seeds.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![FrontBuildingKind::Farm, FrontBuildingKind::Housing, FrontBuildingKind::Farm]
        );
    }

    #[test]
    fn test_placement_respects_zones_and_scaling() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let config = FrontConfig::default();
        let mut grid = TerrainGrid::filled(10, 6, FrontTerrain::Plain);
        grid.set(HexCoord::new(0, 0), FrontTerrain::Marsh);
        let mut occupied = BTreeSet::new();
        let mut next_id = 0;
        let seeds = vec![
            BuildingSeed { kind: FrontBuildingKind::Farm, source: "farm".into(), level: 2 };
            6
        ];
        let placed = place_buildings(seeds, Side::Defender, &grid, &mut occupied, &mut next_id, &config, &mut rng);
        assert_eq!(placed.len(), 6);
        for b in &placed {
            assert!(b.position.q >= 6 && b.position.q < 10);
            assert!((b.max_health - 80.0 * 1.2).abs() < 1e-9);
            assert_eq!(b.resources["food"], (300.0f64 * 1.4).floor());
        }
        assert_eq!(occupied.len(), 6);
        assert_eq!(next_id, 6);
    }

    #[test]
    fn test_take_damage_destroys_once() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let grid = TerrainGrid::filled(6, 4, FrontTerrain::Plain);
        let mut b = place_buildings(
            vec![BuildingSeed { kind: FrontBuildingKind::Housing, source: "hut".into(), level: 0 }],
            Side::Attacker,
            &grid,
            &mut BTreeSet::new(),
            &mut 0,
            &FrontConfig::default(),
            &mut rng,
        )
        .remove(0);
        assert!(!b.take_damage(50.0));
        assert!(b.take_damage(50.0));
        assert!(!b.take_damage(50.0));
        assert_eq!(b.health, 0.0);
    }
}
