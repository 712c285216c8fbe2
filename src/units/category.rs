//! Unit categories and per-category tallies

use serde::{Deserialize, Serialize};

/// Broad tactical category; determines counter relationships
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitCategory {
    Infantry,
    Archer,
    Cavalry,
    Gunpowder,
    Siege,
}

impl UnitCategory {
    pub const ALL: [UnitCategory; 5] = [
        UnitCategory::Infantry,
        UnitCategory::Archer,
        UnitCategory::Cavalry,
        UnitCategory::Gunpowder,
        UnitCategory::Siege,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            UnitCategory::Infantry => "infantry",
            UnitCategory::Archer => "archer",
            UnitCategory::Cavalry => "cavalry",
            UnitCategory::Gunpowder => "gunpowder",
            UnitCategory::Siege => "siege",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }
}

/// A value per category, indexed by [`UnitCategory`]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PerCategory<T>(pub [T; 5]);

impl<T: Copy> PerCategory<T> {
    pub fn splat(value: T) -> Self {
        Self([value; 5])
    }

    pub fn get(&self, category: UnitCategory) -> T {
        self.0[category.index()]
    }

    pub fn set(&mut self, category: UnitCategory, value: T) {
        self.0[category.index()] = value;
    }

    pub fn iter(&self) -> impl Iterator<Item = (UnitCategory, T)> + '_ {
        UnitCategory::ALL.into_iter().map(move |c| (c, self.get(c)))
    }
}

impl PerCategory<u32> {
    pub fn add(&mut self, category: UnitCategory, count: u32) {
        self.0[category.index()] += count;
    }

    pub fn total(&self) -> u32 {
        self.0.iter().sum()
    }

    /// Share of the total held by `category`; zero for an empty tally
    pub fn share(&self, category: UnitCategory) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            self.get(category) as f64 / total as f64
        }
    }

    /// Category with the most units, first in declaration order on ties
    pub fn dominant(&self) -> Option<UnitCategory> {
        if self.total() == 0 {
            return None;
        }
        let mut best = UnitCategory::Infantry;
        for c in UnitCategory::ALL {
            if self.get(c) > self.get(best) {
                best = c;
            }
        }
        Some(best)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_names_round_trip() {
        for c in UnitCategory::ALL {
            assert_eq!(UnitCategory::from_name(c.name()), Some(c));
        }
        assert_eq!(UnitCategory::from_name("dragon"), None);
    }

    #[test]
    fn test_share_and_dominant() {
        let mut counts = PerCategory::<u32>::default();
        assert_eq!(counts.share(UnitCategory::Cavalry), 0.0);
        assert_eq!(counts.dominant(), None);

        counts.add(UnitCategory::Cavalry, 30);
        counts.add(UnitCategory::Archer, 10);
        assert_eq!(counts.total(), 40);
        assert!((counts.share(UnitCategory::Cavalry) - 0.75).abs() < 1e-9);
        assert_eq!(counts.dominant(), Some(UnitCategory::Cavalry));
    }
}
