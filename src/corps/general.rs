//! Generals commanding corps
//!
//! A general carries one or two traits and a level. Traits and level feed a
//! flat set of bonuses; a corps without a general fights at a penalty.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Experience needed to leave each level, starting at level 1
pub const LEVEL_UP_XP: [u32; 6] = [100, 250, 500, 1000, 2000, 4000];
pub const MAX_LEVEL: u32 = LEVEL_UP_XP.len() as u32 + 1;

/// Highest level a freshly generated general can start at
const MAX_START_LEVEL: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneralTrait {
    Aggressive,
    Defensive,
    Swift,
    Inspiring,
    Cunning,
    Veteran,
    Logistics,
    SiegeMaster,
}

impl GeneralTrait {
    pub const ALL: [GeneralTrait; 8] = [
        Self::Aggressive,
        Self::Defensive,
        Self::Swift,
        Self::Inspiring,
        Self::Cunning,
        Self::Veteran,
        Self::Logistics,
        Self::SiegeMaster,
    ];

    pub fn bonuses(self) -> GeneralBonuses {
        let none = GeneralBonuses::default();
        match self {
            Self::Aggressive => GeneralBonuses { attack: 0.12, defense: -0.05, ..none },
            Self::Defensive => GeneralBonuses { attack: -0.05, defense: 0.12, ..none },
            Self::Swift => GeneralBonuses { speed: 0.15, morale: 0.05, ..none },
            Self::Inspiring => GeneralBonuses { attack: 0.03, morale: 0.15, ..none },
            Self::Cunning => GeneralBonuses { attack: 0.08, defense: 0.08, ..none },
            Self::Veteran => GeneralBonuses { attack: 0.05, defense: 0.05, morale: 0.1, ..none },
            Self::Logistics => GeneralBonuses { supply: 0.2, ..none },
            Self::SiegeMaster => GeneralBonuses { siege: 0.2, ..none },
        }
    }
}

/// Fractional bonuses (0.1 = +10%)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneralBonuses {
    pub attack: f64,
    pub defense: f64,
    pub speed: f64,
    /// Shrinks morale lost to defeats
    pub morale: f64,
    /// Shrinks supply consumption
    pub supply: f64,
    /// Extra damage against buildings and infrastructure
    pub siege: f64,
}

impl GeneralBonuses {
    fn add(&mut self, other: GeneralBonuses) {
        self.attack += other.attack;
        self.defense += other.defense;
        self.speed += other.speed;
        self.morale += other.morale;
        self.supply += other.supply;
        self.siege += other.siege;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct General {
    pub name: String,
    pub level: u32,
    pub experience: u32,
    pub traits: Vec<GeneralTrait>,
}

impl General {
    pub fn new(name: impl Into<String>, traits: Vec<GeneralTrait>) -> Self {
        Self {
            name: name.into(),
            level: 1,
            experience: 0,
            traits,
        }
    }

    /// Random general with one or two distinct traits
    ///
    /// `seniority` raises the starting level by one per ~3 points.
    pub fn generate(name: impl Into<String>, seniority: u32, rng: &mut impl Rng) -> Self {
        let count = rng.gen_range(1..=2);
        let traits = GeneralTrait::ALL
            .choose_multiple(rng, count)
            .copied()
            .collect();
        let mut general = Self::new(name, traits);
        general.level = (1 + seniority * 3 / 10).min(MAX_START_LEVEL);
        general
    }

    /// Trait bonuses plus level: +2% attack and defense, +1% morale per level
    pub fn bonuses(&self) -> GeneralBonuses {
        let mut total = GeneralBonuses::default();
        for t in &self.traits {
            total.add(t.bonuses());
        }
        let ranks = self.level.saturating_sub(1) as f64;
        total.attack += ranks * 0.02;
        total.defense += ranks * 0.02;
        total.morale += ranks * 0.01;
        total
    }

    /// Experience still needed for the next level, `None` at the cap
    pub fn xp_to_next(&self) -> Option<u32> {
        LEVEL_UP_XP
            .get(self.level.saturating_sub(1) as usize)
            .map(|need| need.saturating_sub(self.experience))
    }

    /// Add experience, levelling up as often as it allows
    ///
    /// Returns the number of levels gained.
    pub fn award_xp(&mut self, xp: u32) -> u32 {
        self.experience = self.experience.saturating_add(xp);
        let mut gained = 0;
        while let Some(&need) = LEVEL_UP_XP.get(self.level.saturating_sub(1) as usize) {
            if self.experience < need {
                break;
            }
            self.experience -= need;
            self.level += 1;
            gained += 1;
        }
        if gained > 0 {
            tracing::info!(general = %self.name, level = self.level, "general promoted");
        }
        gained
    }
}
