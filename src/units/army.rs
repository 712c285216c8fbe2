//! Army compositions - unit id to head count

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::error::CommandError;

/// Per-unit-type losses of one side
pub type Losses = BTreeMap<String, u32>;

/// Mapping from unit-type id to a non-negative count
///
/// Zero entries are pruned so two armies with the same units compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, u32>", into = "BTreeMap<String, u32>")]
pub struct Army(BTreeMap<String, u32>);

impl Army {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        let mut army = Self::new();
        for (id, count) in pairs {
            army.add(id, count);
        }
        army
    }

    pub fn get(&self, id: &str) -> u32 {
        self.0.get(id).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u32 {
        self.0.values().fold(0u32, |acc, n| acc.saturating_add(*n))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.0.iter().map(|(id, count)| (id.as_str(), *count))
    }

    pub fn add(&mut self, id: impl Into<String>, count: u32) {
        if count == 0 {
            return;
        }
        let have = self.0.entry(id.into()).or_insert(0);
        *have = have.saturating_add(count);
    }

    /// Move every unit of `other` into this army
    pub fn deposit(&mut self, other: Army) {
        for (id, count) in other.0 {
            self.add(id, count);
        }
    }

    /// Remove `request` from this army as one atomic transfer
    ///
    /// Availability of every unit type is checked before anything is
    /// removed, so a failed withdrawal leaves the army untouched.
    pub fn try_withdraw(&mut self, request: &Army) -> Result<Army, CommandError> {
        if request.is_empty() {
            return Err(CommandError::EmptyComposition);
        }
        for (id, requested) in request.iter() {
            let available = self.get(id);
            if available < requested {
                return Err(CommandError::InsufficientUnits {
                    unit: id.to_string(),
                    requested,
                    available,
                });
            }
        }
        for (id, requested) in request.iter() {
            self.remove(id, requested);
        }
        Ok(request.clone())
    }

    /// Apply battle losses, returning how many units were actually removed
    pub fn apply_losses(&mut self, losses: &Losses) -> u32 {
        let mut removed = 0;
        for (id, &lost) in losses {
            let have = self.get(id);
            debug_assert!(lost <= have, "loss of {lost} {id} exceeds {have} present");
            let taken = lost.min(have);
            self.remove(id, taken);
            removed += taken;
        }
        removed
    }

    /// Remove every unit, returning them
    pub fn drain(&mut self) -> Army {
        std::mem::take(self)
    }

    /// Copy with each count scaled by `fraction` and floored
    pub fn scaled(&self, fraction: f64) -> Army {
        let fraction = fraction.clamp(0.0, 1.0);
        Army::from_pairs(
            self.iter()
                .map(|(id, count)| (id, (count as f64 * fraction).floor() as u32)),
        )
    }

    fn remove(&mut self, id: &str, count: u32) {
        if let Some(have) = self.0.get_mut(id) {
            *have = have.saturating_sub(count);
            if *have == 0 {
                self.0.remove(id);
            }
        }
    }
}

impl From<BTreeMap<String, u32>> for Army {
    fn from(counts: BTreeMap<String, u32>) -> Self {
        Army::from_pairs(counts)
    }
}

impl From<Army> for BTreeMap<String, u32> {
    fn from(army: Army) -> Self {
        army.0
    }
}

impl FromIterator<(String, u32)> for Army {
    fn from_iter<T: IntoIterator<Item = (String, u32)>>(iter: T) -> Self {
        Army::from_pairs(iter)
    }
}

/// Total units across a loss table
pub fn total_losses(losses: &Losses) -> u32 {
    losses.values().sum()
}
