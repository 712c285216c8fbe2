//! Events produced by a simulation tick
//!
//! Returned by [`WarSimulation::tick`](super::WarSimulation::tick) for logs
//! and display. Every event is serializable so a host can stream them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::ai::AiDecision;
use crate::core::error::CommandResult;
use crate::core::types::{BuildingId, CorpsId, FrontId, HexCoord, InfraId, NodeId, PolityId, Side};
use crate::front::{BuildingDestroyed, WarOutcome};

/// Outcome of one corps engagement, in front sides
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementReport {
    pub at: HexCoord,
    pub attacker: CorpsId,
    pub defender: CorpsId,
    pub winner: Side,
    pub decisive: bool,
    /// Rounds fought; `None` for an instant resolution
    pub rounds: Option<u32>,
    pub attacker_casualties: u32,
    pub defender_casualties: u32,
    pub loot: BTreeMap<String, u64>,
    pub score_delta: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum FrontEvent {
    CorpsMoved {
        front: FrontId,
        corps: CorpsId,
        from: HexCoord,
        to: HexCoord,
        arrived: bool,
    },
    CorpsRouted {
        front: FrontId,
        corps: CorpsId,
    },
    CorpsDestroyed {
        front: FrontId,
        corps: CorpsId,
    },
    Engagement {
        front: FrontId,
        report: EngagementReport,
    },
    BuildingDamaged {
        front: FrontId,
        building: BuildingId,
        damage: f64,
        remaining: f64,
    },
    BuildingDestroyed {
        front: FrontId,
        corps: CorpsId,
        destroyed: BuildingDestroyed,
    },
    NodePlundered {
        front: FrontId,
        node: NodeId,
        side: Side,
        amount: f64,
    },
    InfrastructureDamaged {
        front: FrontId,
        infra: InfraId,
        destroyed: bool,
    },
    ControlBonus {
        front: FrontId,
        score_delta: f64,
    },
    WarEnded {
        front: FrontId,
        outcome: WarOutcome,
    },
    AiOrder {
        front: FrontId,
        polity: PolityId,
        decision: AiDecision,
        result: CommandResult,
    },
}

impl FrontEvent {
    pub fn front(&self) -> FrontId {
        match self {
            Self::CorpsMoved { front, .. }
            | Self::CorpsRouted { front, .. }
            | Self::CorpsDestroyed { front, .. }
            | Self::Engagement { front, .. }
            | Self::BuildingDamaged { front, .. }
            | Self::BuildingDestroyed { front, .. }
            | Self::NodePlundered { front, .. }
            | Self::InfrastructureDamaged { front, .. }
            | Self::ControlBonus { front, .. }
            | Self::WarEnded { front, .. }
            | Self::AiOrder { front, .. } => *front,
        }
    }
}
