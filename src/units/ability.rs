//! Ability tags carried by unit types

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ability {
    RapidLevy,
    Ranged,
    AntiCavalry,
    HighMobility,
    Charge,
    Mobility,
    Phalanx,
    HoldGround,
    ShieldWall,
    ArmorPiercing,
    FastMove,
    Siege,
    HeavyArmor,
    Noble,
    AreaDamage,
    Firearm,
    SlowReload,
    FirearmResistant,
    BayonetCharge,
    Volley,
    PrecisionShot,
    PrecisionStrike,
    DismountedCombat,
    SuppressiveFire,
    Scout,
}

impl Ability {
    const TAGS: [(&'static str, Ability); 25] = [
        ("rapid_levy", Ability::RapidLevy),
        ("ranged", Ability::Ranged),
        ("anti_cavalry", Ability::AntiCavalry),
        ("high_mobility", Ability::HighMobility),
        ("charge", Ability::Charge),
        ("mobility", Ability::Mobility),
        ("phalanx", Ability::Phalanx),
        ("hold_ground", Ability::HoldGround),
        ("shield_wall", Ability::ShieldWall),
        ("armor_piercing", Ability::ArmorPiercing),
        ("fast_move", Ability::FastMove),
        ("siege", Ability::Siege),
        ("heavy_armor", Ability::HeavyArmor),
        ("noble", Ability::Noble),
        ("area_damage", Ability::AreaDamage),
        ("firearm", Ability::Firearm),
        ("slow_reload", Ability::SlowReload),
        ("firearm_resistant", Ability::FirearmResistant),
        ("bayonet_charge", Ability::BayonetCharge),
        ("volley", Ability::Volley),
        ("precision_shot", Ability::PrecisionShot),
        ("precision_strike", Ability::PrecisionStrike),
        ("dismounted_combat", Ability::DismountedCombat),
        ("suppressive_fire", Ability::SuppressiveFire),
        ("scout", Ability::Scout),
    ];

    /// Parse a snake_case tag as authored in the catalog
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::TAGS
            .iter()
            .find(|(name, _)| *name == tag)
            .map(|(_, ability)| *ability)
    }

    pub fn tag(self) -> &'static str {
        Self::TAGS
            .iter()
            .find(|(_, ability)| *ability == self)
            .map(|(name, _)| *name)
            .unwrap_or("unknown")
    }

    /// Unconditional attack bonus granted by the ability
    pub fn attack_bonus(self) -> f64 {
        match self {
            Ability::AreaDamage => 0.12,
            Ability::SuppressiveFire => 0.10,
            Ability::Firearm => 0.06,
            Ability::ArmorPiercing => 0.06,
            Ability::Charge => 0.06,
            Ability::Volley => 0.05,
            Ability::Ranged => 0.05,
            Ability::Mobility => 0.04,
            Ability::FastMove => 0.04,
            Ability::Scout => 0.03,
            Ability::Siege => 0.08,
            Ability::PrecisionStrike => 0.08,
            _ => 0.0,
        }
    }

    /// Unconditional defense bonus granted by the ability
    pub fn defense_bonus(self) -> f64 {
        match self {
            Ability::HoldGround | Ability::Phalanx | Ability::ShieldWall => 0.08,
            _ => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_round_trip() {
        for (tag, ability) in Ability::TAGS {
            assert_eq!(Ability::from_tag(tag), Some(ability));
            assert_eq!(ability.tag(), tag);
        }
        assert_eq!(Ability::from_tag("teleport"), None);
    }

    #[test]
    fn test_flat_bonuses() {
        assert_eq!(Ability::AreaDamage.attack_bonus(), 0.12);
        assert_eq!(Ability::Phalanx.defense_bonus(), 0.08);
        assert_eq!(Ability::Noble.attack_bonus(), 0.0);
        assert_eq!(Ability::Noble.defense_bonus(), 0.0);
    }
}
