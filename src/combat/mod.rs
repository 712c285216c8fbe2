//! Combat resolution
//!
//! Two resolution paths share the same profile builder:
//! - [`resolver::simulate_battle`] decides an engagement in one step
//! - [`battle::Battle`] fights it out round by round

pub mod abilities;
pub mod battle;
pub mod profile;
pub mod resolver;

use rand::Rng;

pub use battle::{Battle, BattleKind, BattleResult, BattleSide, Combatant, EndReason, Tactic};
pub use profile::{counter_pressure, CombatProfile, ForceSummary, ProfileBuilder, UnitProfile};
pub use resolver::{apply_loss_cap, compute_loot, resolve_profiles, simulate_battle, BattleReport};

/// Uniform multiplier in `[1 - spread, 1 + spread]`
pub(crate) fn jitter(rng: &mut impl Rng, spread: f64) -> f64 {
    if spread <= 0.0 {
        return 1.0;
    }
    1.0 - spread + rng.gen::<f64>() * 2.0 * spread
}

/// Round down, then add one with probability equal to the fractional part
///
/// Keeps the expected value of many small loss rolls intact.
pub(crate) fn stochastic_round(x: f64, rng: &mut impl Rng) -> u32 {
    if !(x > 0.0) {
        return 0;
    }
    let whole = x.floor();
    let frac = x - whole;
    let extra = if rng.gen::<f64>() < frac { 1 } else { 0 };
    (whole as u32).saturating_add(extra)
}
