//! Corps - mobile formations drawn from a standing army
//!
//! Units move between a polity's standing [`ArmyPool`] entry and its corps by
//! exclusive transfer: a unit is always counted in exactly one place.

pub mod general;
pub mod manager;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::types::{BuildingId, CorpsId, Day, FrontId, HexCoord, InfraId, PolityId, Side};
use crate::units::Army;

pub use general::{General, GeneralBonuses, GeneralTrait};
pub use manager::{CorpsManager, MoveOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorpsState {
    #[default]
    Idle,
    Moving,
    Attacking,
    Defending,
    Retreating,
    Routing,
}

impl CorpsState {
    /// Busy states reject new orders other than retreat
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Moving | Self::Attacking | Self::Retreating)
    }
}

/// What a corps is trying to hit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "id")]
pub enum AttackTarget {
    Corps(CorpsId),
    Building(BuildingId),
    Infrastructure(InfraId),
}

/// Order currently being carried out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum CorpsCommand {
    Move { target: HexCoord },
    Attack { target: AttackTarget },
    Defend,
    Retreat { target: HexCoord },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleRecord {
    pub day: Day,
    pub enemy: Option<CorpsId>,
    pub won: bool,
    pub casualties: u32,
    pub enemy_casualties: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Corps {
    pub id: CorpsId,
    pub owner: PolityId,
    pub name: String,
    pub side: Side,
    pub front: Option<FrontId>,
    pub position: HexCoord,
    pub target: Option<HexCoord>,
    pub units: Army,
    pub state: CorpsState,
    pub morale: f64,
    pub supplies: f64,
    pub pending: Option<CorpsCommand>,
    /// Movement points carried over between days
    pub progress: f64,
    pub battle_history: Vec<BattleRecord>,
    #[serde(default)]
    pub general: Option<General>,
}

impl Corps {
    pub fn unit_count(&self) -> u32 {
        self.units.total()
    }

    pub fn is_routing(&self) -> bool {
        self.state == CorpsState::Routing
    }

    pub fn general_bonuses(&self) -> GeneralBonuses {
        self.general.as_ref().map(General::bonuses).unwrap_or_default()
    }

    /// Target of a pending attack order, if any
    pub fn attack_target(&self) -> Option<AttackTarget> {
        match self.pending {
            Some(CorpsCommand::Attack { target }) => Some(target),
            _ => None,
        }
    }
}

/// Standing armies per polity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArmyPool {
    armies: BTreeMap<PolityId, Army>,
}

impl ArmyPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn army(&self, owner: PolityId) -> Option<&Army> {
        self.armies.get(&owner)
    }

    pub fn army_mut(&mut self, owner: PolityId) -> &mut Army {
        self.armies.entry(owner).or_default()
    }

    /// Recruit units straight into a standing army
    pub fn deposit(&mut self, owner: PolityId, units: Army) {
        self.army_mut(owner).deposit(units);
    }

    pub fn total(&self, owner: PolityId) -> u32 {
        self.armies.get(&owner).map(Army::total).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_busy_states() {
        assert!(CorpsState::Moving.is_busy());
        assert!(CorpsState::Attacking.is_busy());
        assert!(CorpsState::Retreating.is_busy());
        assert!(!CorpsState::Idle.is_busy());
        assert!(!CorpsState::Defending.is_busy());
        assert!(!CorpsState::Routing.is_busy());
    }

    #[test]
    fn test_pool_accounts_per_owner() {
        let mut pool = ArmyPool::new();
        pool.deposit(PolityId(1), Army::from_pairs([("militia", 10)]));
        pool.deposit(PolityId(1), Army::from_pairs([("militia", 5), ("slinger", 3)]));
        assert_eq!(pool.total(PolityId(1)), 18);
        assert_eq!(pool.total(PolityId(2)), 0);
        assert!(pool.army(PolityId(2)).is_none());
    }

    #[test]
    fn test_command_json_shape() {
        let cmd = CorpsCommand::Attack { target: AttackTarget::Corps(CorpsId(4)) };
        let json = serde_json::to_string(&cmd).unwrap();
        assert_eq!(json, r#"{"type":"attack","target":{"kind":"corps","id":4}}"#);
        let back: CorpsCommand = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cmd);
    }
}
