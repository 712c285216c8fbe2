//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};

/// Simulation day counter
pub type Day = u32;

/// Unique identifier for polities (nations, players, AI belligerents)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PolityId(pub u32);

impl PolityId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }
}

/// Unique identifier for corps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CorpsId(pub u32);

/// Unique identifier for fronts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FrontId(pub u32);

/// Unique identifier for wars (one front per war)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WarId(pub u32);

/// Unique identifier for multi-round battles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BattleId(pub u32);

/// Identifier of a resource node on a front
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// Identifier of an infrastructure item on a front
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InfraId(pub u32);

/// Identifier of a frontline building
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BuildingId(pub u32);

/// Which side of a war a participant fights on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Attacker,
    Defender,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Attacker => Side::Defender,
            Side::Defender => Side::Attacker,
        }
    }

    /// Index into per-side `[T; 2]` arrays
    pub fn index(self) -> usize {
        match self {
            Side::Attacker => 0,
            Side::Defender => 1,
        }
    }

    /// +1 for the attacker, -1 for the defender (war score sign)
    pub fn sign(self) -> f64 {
        match self {
            Side::Attacker => 1.0,
            Side::Defender => -1.0,
        }
    }

    pub const BOTH: [Side; 2] = [Side::Attacker, Side::Defender];
}

/// Axial hex coordinate (q, r system) on a front grid
///
/// Front grids are rectangular: `q` is the column, `r` the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HexCoord {
    pub q: i32,
    pub r: i32,
}

impl HexCoord {
    pub fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    /// Get all 6 adjacent hexes
    pub fn neighbors(&self) -> [HexCoord; 6] {
        [
            HexCoord::new(self.q + 1, self.r),
            HexCoord::new(self.q + 1, self.r - 1),
            HexCoord::new(self.q, self.r - 1),
            HexCoord::new(self.q - 1, self.r),
            HexCoord::new(self.q - 1, self.r + 1),
            HexCoord::new(self.q, self.r + 1),
        ]
    }

    /// Distance in hex steps using axial coordinate formula
    pub fn distance(&self, other: &HexCoord) -> u32 {
        let dq = (self.q - other.q).abs();
        let dr = (self.r - other.r).abs();
        let ds = ((self.q + self.r) - (other.q + other.r)).abs();
        ((dq + dr + ds) / 2) as u32
    }

    /// Neighbor one step closer to `target`, or `self` when already there
    pub fn step_toward(&self, target: &HexCoord) -> HexCoord {
        if self == target {
            return *self;
        }
        let mut best = *self;
        let mut best_dist = self.distance(target);
        for n in self.neighbors() {
            let d = n.distance(target);
            if d < best_dist {
                best = n;
                best_dist = d;
            }
        }
        best
    }

    /// Greedy hex path from `self` (exclusive) to `target` (inclusive)
    pub fn line_to(&self, target: &HexCoord) -> Vec<HexCoord> {
        let mut path = Vec::with_capacity(self.distance(target) as usize);
        let mut current = *self;
        while current != *target {
            current = current.step_toward(target);
            path.push(current);
        }
        path
    }
}

impl std::fmt::Display for HexCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.q, self.r)
    }
}
