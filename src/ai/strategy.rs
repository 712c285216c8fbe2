//! Strategy archetypes loaded from TOML
//!
//! Archetypes are authored in `data/ai_strategies.toml`; the shipped file is
//! compiled in as the default book.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::config::AiConfig;
use crate::core::error::{FrontlineError, Result};

const DEFAULT_STRATEGIES: &str = include_str!("../../data/ai_strategies.toml");

/// Where a corps goes when it neither attacks nor defends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepositionGoal {
    /// Push toward the centre column
    Midline,
    /// Stand next to an own building or infrastructure item
    OwnAssets,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    pub name: String,
    pub attack_weight: f64,
    pub defend_weight: f64,
    /// Local power balance below which corps fall back
    pub retreat_threshold: f64,
    pub reposition: RepositionGoal,
}

impl Strategy {
    /// Chance left over for repositioning
    pub fn reposition_weight(&self) -> f64 {
        (1.0 - self.attack_weight - self.defend_weight).max(0.0)
    }
}

#[derive(Debug, Clone)]
pub struct StrategyBook {
    strategies: Vec<Strategy>,
}

impl StrategyBook {
    /// The shipped archetypes
    pub fn with_defaults() -> Self {
        match Self::parse_toml(DEFAULT_STRATEGIES) {
            Ok(book) => book,
            Err(e) => {
                tracing::error!("built-in strategy book is invalid: {e}");
                Self { strategies: Vec::new() }
            }
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse_toml(&content)
    }

    pub fn parse_toml(content: &str) -> Result<Self> {
        #[derive(Deserialize)]
        struct TomlStrategies {
            #[serde(default)]
            strategy: Vec<Strategy>,
        }

        let data: TomlStrategies = toml::from_str(content)?;
        for s in &data.strategy {
            if s.attack_weight < 0.0 || s.defend_weight < 0.0 || s.attack_weight + s.defend_weight > 1.0 {
                return Err(FrontlineError::InvalidConfig(format!(
                    "strategy {}: weights must be non-negative and sum to at most 1",
                    s.name
                )));
            }
        }
        Ok(Self { strategies: data.strategy })
    }

    pub fn get(&self, name: &str) -> Option<&Strategy> {
        self.strategies.iter().find(|s| s.name == name)
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Archetype for a belligerent's aggression trait
    ///
    /// High aggression is aggressive, low is defensive; the middle band
    /// flips a coin between opportunistic and balanced.
    pub fn select(&self, aggression: f64, config: &AiConfig, rng: &mut impl Rng) -> Option<&Strategy> {
        let name = if aggression > config.aggressive_trait {
            "aggressive"
        } else if aggression < config.defensive_trait {
            "defensive"
        } else if rng.gen_bool(0.5) {
            "opportunistic"
        } else {
            "balanced"
        };
        self.get(name).or_else(|| self.strategies.first())
    }
}
