//! Front AI - per-corps decisions for computer-controlled belligerents
//!
//! Architecture mirrors the player path: an AI only produces
//! [`AiDecision`] records, which the simulation executes through the same
//! corps commands a player would issue.

pub mod commander;
pub mod strategy;

pub use commander::{local_power_balance, AiCommander, DecisionContext};
pub use strategy::{RepositionGoal, Strategy, StrategyBook};

use serde::{Deserialize, Serialize};

use crate::core::types::{BuildingId, CorpsId, HexCoord, PolityId};
use crate::units::Army;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "action")]
pub enum AiAction {
    Retreat,
    AttackCorps { target: CorpsId, at: HexCoord },
    AttackBuilding { target: BuildingId, at: HexCoord },
    Defend,
    Reposition { to: HexCoord },
    /// Form a new corps on the front from the standing army
    CreateCorps { units: Army },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiDecision {
    /// `None` for decisions that are not about an existing corps
    pub corps: Option<CorpsId>,
    pub action: AiAction,
}

/// Swappable decision maker for one belligerent
pub trait FrontAi {
    fn polity(&self) -> PolityId;

    /// Decide orders for this belligerent's corps on one front
    fn decide(&mut self, context: &DecisionContext) -> Vec<AiDecision>;

    /// Archetype used for the most recent decision round
    fn strategy(&self) -> Option<&Strategy>;
}
