//! War score, exhaustion and peace terms
//!
//! The score is signed from the attacker's point of view: positive values
//! favour the attacker, negative values the defender.

use serde::{Deserialize, Serialize};

use crate::core::config::{ExhaustionConfig, WarScoreConfig};
use crate::core::types::Side;

/// Settlement of a war, from the attacker's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarResult {
    DecisiveVictory,
    MajorVictory,
    MinorVictory,
    Stalemate,
    MinorDefeat,
    MajorDefeat,
    DecisiveDefeat,
}

impl WarResult {
    /// Classify a final score against the configured thresholds
    pub fn classify(score: f64, config: &WarScoreConfig) -> Self {
        let magnitude = score.abs();
        let victory = score > 0.0;
        if magnitude >= config.decisive {
            if victory { Self::DecisiveVictory } else { Self::DecisiveDefeat }
        } else if magnitude >= config.major {
            if victory { Self::MajorVictory } else { Self::MajorDefeat }
        } else if magnitude >= config.minor {
            if victory { Self::MinorVictory } else { Self::MinorDefeat }
        } else {
            Self::Stalemate
        }
    }

    /// Side that came out ahead, `None` for a stalemate
    pub fn winner(&self) -> Option<Side> {
        match self {
            Self::DecisiveVictory | Self::MajorVictory | Self::MinorVictory => Some(Side::Attacker),
            Self::Stalemate => None,
            _ => Some(Side::Defender),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeaceReason {
    /// The score crossed the decisive threshold
    Score,
    /// A side's war exhaustion hit the ceiling
    Exhaustion(Side),
    /// The war ran out its maximum duration
    Duration,
    /// Peace arranged outside the front
    Negotiated,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WarOutcome {
    pub result: WarResult,
    pub reason: PeaceReason,
    pub final_score: f64,
    pub day: u32,
}

/// Running war score plus per-side exhaustion
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WarScore {
    pub value: f64,
    /// Indexed by [`Side::index`]
    pub exhaustion: [f64; 2],
    majority_awarded: [bool; 2],
    full_awarded: [bool; 2],
}

impl WarScore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, delta: f64) {
        self.value += delta;
    }

    /// Score change for a battle between corps, clamped per battle
    pub fn battle_delta(
        config: &WarScoreConfig,
        winner: Side,
        attacker_casualties: u32,
        defender_casualties: u32,
    ) -> f64 {
        match winner {
            Side::Attacker => (config.victory_base + defender_casualties as f64 * config.victory_per_casualty)
                .min(config.victory_max),
            Side::Defender => (config.defeat_base + attacker_casualties as f64 * config.defeat_per_casualty)
                .max(config.defeat_min),
        }
    }

    pub fn add_exhaustion(&mut self, side: Side, amount: f64, config: &ExhaustionConfig) {
        let e = &mut self.exhaustion[side.index()];
        *e = (*e + amount).clamp(0.0, config.max);
    }

    /// Exhaustion from fresh casualties
    pub fn accrue_casualties(&mut self, side: Side, casualties: u32, config: &ExhaustionConfig) {
        self.add_exhaustion(side, casualties as f64 * config.per_casualty, config);
    }

    /// Award one-off bonuses for crossing the control thresholds
    ///
    /// Returns the total score change.
    pub fn award_control(&mut self, control: [f64; 2], config: &WarScoreConfig) -> f64 {
        let mut delta = 0.0;
        for side in Side::BOTH {
            let i = side.index();
            if control[i] > config.majority_control && !self.majority_awarded[i] {
                self.majority_awarded[i] = true;
                delta += side.sign() * config.majority_control_bonus;
            }
            if control[i] > config.full_control && !self.full_awarded[i] {
                self.full_awarded[i] = true;
                delta += side.sign() * config.full_control_bonus;
            }
        }
        self.value += delta;
        delta
    }

    /// Side whose exhaustion has reached the ceiling, attacker first
    pub fn exhausted(&self, config: &ExhaustionConfig) -> Option<Side> {
        Side::BOTH.into_iter().find(|s| self.exhaustion[s.index()] >= config.max)
    }
}
