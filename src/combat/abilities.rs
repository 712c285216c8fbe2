//! Situational ability modifiers
//!
//! Abilities grant flat bonuses (see [`Ability::attack_bonus`]) plus
//! adjustments that scale with how much of the enemy force sits in the
//! categories the ability exploits.

use crate::units::{Ability, PerCategory, UnitCategory, UnitType};

/// Minimum speed for the charge ability to take effect
pub const CHARGE_MIN_SPEED: f64 = 6.0;

/// Flat attack and defense change from heavy armor
pub const HEAVY_ARMOR_DEFENSE: f64 = 0.12;
pub const HEAVY_ARMOR_ATTACK: f64 = -0.05;

/// Enemy-composition-dependent modifiers for one unit type
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SituationalMods {
    pub attack: f64,
    pub defense: f64,
    /// Relative change to the counter pressure this unit suffers
    pub pressure: f64,
}

/// Sum of the flat ability bonuses of a unit
pub fn flat_bonuses(unit: &UnitType) -> (f64, f64) {
    unit.abilities.iter().fold((0.0, 0.0), |(atk, def), a| {
        (atk + a.attack_bonus(), def + a.defense_bonus())
    })
}

/// Situational modifiers for `unit` facing an enemy with `enemy` head counts
pub fn situational_modifiers(unit: &UnitType, enemy: &PerCategory<u32>) -> SituationalMods {
    let mut mods = SituationalMods::default();
    if enemy.total() == 0 {
        // Heavy armor is the only composition-independent situational effect
        if unit.has_ability(Ability::HeavyArmor) {
            mods.defense += HEAVY_ARMOR_DEFENSE;
            mods.attack += HEAVY_ARMOR_ATTACK;
        }
        return mods;
    }

    let inf = enemy.share(UnitCategory::Infantry);
    let arch = enemy.share(UnitCategory::Archer);
    let cav = enemy.share(UnitCategory::Cavalry);
    let gun = enemy.share(UnitCategory::Gunpowder);
    let siege = enemy.share(UnitCategory::Siege);

    for ability in &unit.abilities {
        match ability {
            Ability::AreaDamage => mods.attack += 0.18 * (inf + arch),
            Ability::SuppressiveFire => mods.attack += 0.12 * (inf + arch),
            Ability::Firearm => {
                mods.attack += 0.10 * (inf + cav);
                mods.defense -= 0.08 * cav;
            }
            Ability::ArmorPiercing => mods.attack += 0.08 * (inf + gun + siege),
            Ability::Charge if unit.speed >= CHARGE_MIN_SPEED => {
                mods.attack += 0.10 * (gun + arch)
            }
            Ability::BayonetCharge => mods.attack += 0.06 * cav,
            Ability::SlowReload => mods.attack -= 0.12 * cav,
            Ability::HeavyArmor => {
                mods.defense += HEAVY_ARMOR_DEFENSE;
                mods.attack += HEAVY_ARMOR_ATTACK;
            }
            Ability::FirearmResistant => {
                mods.pressure -= 0.15 * gun;
                mods.defense += 0.05 * gun;
            }
            Ability::PrecisionShot | Ability::PrecisionStrike => {
                mods.attack += 0.08 * (siege + inf)
            }
            Ability::DismountedCombat => mods.defense += 0.08 * cav,
            _ => {}
        }
    }
    mods
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::UnitCatalog;

    fn counts(pairs: &[(UnitCategory, u32)]) -> PerCategory<u32> {
        let mut c = PerCategory::default();
        for &(cat, n) in pairs {
            c.add(cat, n);
        }
        c
    }

    #[test]
    fn test_area_damage_scales_with_soft_targets() {
        let catalog = UnitCatalog::with_defaults();
        let trebuchet = catalog.get("trebuchet").unwrap();

        let all_infantry = situational_modifiers(trebuchet, &counts(&[(UnitCategory::Infantry, 10)]));
        let all_cavalry = situational_modifiers(trebuchet, &counts(&[(UnitCategory::Cavalry, 10)]));
        assert!((all_infantry.attack - 0.18).abs() < 1e-9);
        assert_eq!(all_cavalry.attack, 0.0);
    }

    #[test]
    fn test_charge_requires_speed() {
        let catalog = UnitCatalog::with_defaults();
        let archers = counts(&[(UnitCategory::Archer, 10)]);

        let chariot = catalog.get("chariot").unwrap(); // speed 6
        assert!((situational_modifiers(chariot, &archers).attack - 0.10).abs() < 1e-9);

        let mut slow = chariot.clone();
        slow.speed = 4.0;
        assert_eq!(situational_modifiers(&slow, &archers).attack, 0.0);
    }

    #[test]
    fn test_firearm_resistant_eases_pressure() {
        let catalog = UnitCatalog::with_defaults();
        let cuirassier = catalog.get("cuirassier").unwrap();
        let mods = situational_modifiers(cuirassier, &counts(&[(UnitCategory::Gunpowder, 4)]));
        assert!((mods.pressure + 0.15).abs() < 1e-9);
        // heavy armor +0.12 and firearm resistance +0.05
        assert!((mods.defense - 0.17).abs() < 1e-9);
        assert!((mods.attack - (HEAVY_ARMOR_ATTACK + 0.10)).abs() < 1e-9);
    }

    #[test]
    fn test_flat_bonuses_sum() {
        let catalog = UnitCatalog::with_defaults();
        let hoplite = catalog.get("hoplite").unwrap();
        assert_eq!(flat_bonuses(hoplite), (0.0, 0.16));
    }
}
