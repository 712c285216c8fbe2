//! Registry of active and archived fronts

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::config::FrontConfig;
use crate::core::error::{CommandError, CommandOk, FrontlineError, Result};
use crate::core::types::{CorpsId, FrontId, PolityId, WarId};
use crate::corps::CorpsManager;
use crate::front::economy::{BuildingCatalog, EconomySnapshot};
use crate::front::scoring::{PeaceReason, WarOutcome};
use crate::front::Front;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrontRegistry {
    fronts: BTreeMap<FrontId, Front>,
    next_front: u32,
    next_war: u32,
}

impl FrontRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a front between `attacker` and `defender`
    #[allow(clippy::too_many_arguments)]
    pub fn declare_war<R: Rng>(
        &mut self,
        attacker: PolityId,
        defender: PolityId,
        economies: [&EconomySnapshot; 2],
        catalog: &BuildingCatalog,
        config: &FrontConfig,
        rng: &mut R,
    ) -> Result<FrontId> {
        if attacker == defender {
            return Err(FrontlineError::InvalidWar(format!("{attacker:?} cannot fight itself")));
        }
        if self.find_by_pair(attacker, defender).is_some() {
            return Err(FrontlineError::InvalidWar(format!(
                "{attacker:?} and {defender:?} are already at war"
            )));
        }
        self.next_front += 1;
        self.next_war += 1;
        let id = FrontId(self.next_front);
        let front = Front::generate(
            id,
            WarId(self.next_war),
            [attacker, defender],
            economies,
            catalog,
            config,
            rng,
        )?;
        tracing::info!(front = id.0, attacker = attacker.0, defender = defender.0, "war declared");
        self.fronts.insert(id, front);
        Ok(id)
    }

    pub fn get(&self, id: FrontId) -> Option<&Front> {
        self.fronts.get(&id)
    }

    pub fn get_mut(&mut self, id: FrontId) -> Option<&mut Front> {
        self.fronts.get_mut(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Front> {
        self.fronts.values()
    }

    /// Ids of unresolved fronts, in creation order
    pub fn active_ids(&self) -> Vec<FrontId> {
        self.fronts.values().filter(|f| f.is_active()).map(|f| f.id).collect()
    }

    pub fn archived(&self) -> impl Iterator<Item = &Front> {
        self.fronts.values().filter(|f| !f.is_active())
    }

    /// Active front between two polities, in either order
    pub fn find_by_pair(&self, a: PolityId, b: PolityId) -> Option<&Front> {
        self.fronts.values().find(|f| {
            f.is_active() && (f.belligerents == [a, b] || f.belligerents == [b, a])
        })
    }

    /// Put a corps on a front at its side's start cell
    ///
    /// A corps released from an earlier war fights for whichever side its
    /// owner holds here.
    pub fn assign(
        &mut self,
        front: FrontId,
        corps_id: CorpsId,
        corps: &mut CorpsManager,
    ) -> std::result::Result<CommandOk, CommandError> {
        let f = self.fronts.get_mut(&front).ok_or(CommandError::UnknownTarget)?;
        if !f.is_active() {
            return Err(CommandError::FrontClosed);
        }
        let c = corps.get(corps_id).ok_or(CommandError::UnknownCorps(corps_id))?;
        if c.front.is_some() {
            return Err(CommandError::AlreadyAssigned);
        }
        let side = f.side_of(c.owner).ok_or(CommandError::NotBelligerent(c.owner))?;
        if f.corps[side.index()].len() >= f.tier.max_corps {
            return Err(CommandError::CorpsCap(f.tier.max_corps));
        }
        corps.enlist(corps_id, front, side, f.start_position(side))?;
        f.corps[side.index()].push(corps_id);
        Ok(CommandOk::new(format!("corps assigned to front {}", front.0)))
    }

    /// Take a corps off its front
    pub fn unassign(&mut self, corps_id: CorpsId, corps: &mut CorpsManager) -> std::result::Result<(), CommandError> {
        let front = corps
            .get(corps_id)
            .ok_or(CommandError::UnknownCorps(corps_id))?
            .front;
        if let Some(f) = front.and_then(|id| self.fronts.get_mut(&id)) {
            f.forget_corps(corps_id);
        }
        corps.set_front(corps_id, None)
    }

    /// Close a front by treaty; its corps are released
    pub fn make_peace(&mut self, front: FrontId, corps: &mut CorpsManager) -> Result<WarOutcome> {
        let f = self.fronts.get_mut(&front).ok_or(FrontlineError::FrontNotFound(front))?;
        let outcome = f.conclude(PeaceReason::Negotiated);
        self.release(front, corps);
        Ok(outcome)
    }

    /// Detach every corps from a resolved front
    pub fn release(&mut self, front: FrontId, corps: &mut CorpsManager) {
        let Some(f) = self.fronts.get_mut(&front) else { return };
        for id in std::mem::take(&mut f.corps).into_iter().flatten() {
            // a corps destroyed this tick is already gone
            let _ = corps.set_front(id, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::CorpsConfig;
    use crate::core::types::{HexCoord, Side};
    use crate::corps::{ArmyPool, CorpsState};
    use crate::units::Army;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn declare(registry: &mut FrontRegistry, a: u32, b: u32) -> Result<FrontId> {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let eco = EconomySnapshot::default();
        registry.declare_war(
            PolityId(a),
            PolityId(b),
            [&eco, &eco],
            &BuildingCatalog::with_defaults(),
            &FrontConfig::default(),
            &mut rng,
        )
    }

    #[test]
    fn test_one_front_per_pair() {
        let mut registry = FrontRegistry::new();
        let id = declare(&mut registry, 1, 2).unwrap();
        assert!(matches!(declare(&mut registry, 2, 1), Err(FrontlineError::InvalidWar(_))));
        assert!(matches!(declare(&mut registry, 3, 3), Err(FrontlineError::InvalidWar(_))));
        assert_eq!(registry.find_by_pair(PolityId(2), PolityId(1)).map(|f| f.id), Some(id));
        assert_eq!(registry.get(id).unwrap().tier.name, "tiny");
    }

    #[test]
    fn test_assignment_rules() {
        let mut registry = FrontRegistry::new();
        let front = declare(&mut registry, 1, 2).unwrap();
        let mut pool = ArmyPool::new();
        pool.deposit(PolityId(1), Army::from_pairs([("militia", 50)]));
        pool.deposit(PolityId(3), Army::from_pairs([("militia", 50)]));
        let mut corps = CorpsManager::new(CorpsConfig::default());
        let units = Army::from_pairs([("militia", 5)]);
        let origin = HexCoord::new(0, 0);

        let ids: Vec<_> = (0..3)
            .map(|_| corps.create(&mut pool, PolityId(1), Side::Attacker, "c", &units, origin).unwrap())
            .collect();
        registry.assign(front, ids[0], &mut corps).unwrap();
        assert_eq!(registry.assign(front, ids[0], &mut corps), Err(CommandError::AlreadyAssigned));
        registry.assign(front, ids[1], &mut corps).unwrap();
        // tiny fronts hold two corps per side
        assert_eq!(registry.assign(front, ids[2], &mut corps), Err(CommandError::CorpsCap(2)));

        let start = registry.get(front).unwrap().start_position(Side::Attacker);
        assert_eq!(corps.get(ids[0]).unwrap().position, start);

        let outsider = corps
            .create(&mut pool, PolityId(3), Side::Attacker, "x", &units, origin)
            .unwrap();
        assert_eq!(
            registry.assign(front, outsider, &mut corps),
            Err(CommandError::NotBelligerent(PolityId(3)))
        );

        registry.make_peace(front, &mut corps).unwrap();
        assert!(corps.get(ids[0]).unwrap().front.is_none());
        assert_eq!(registry.assign(front, ids[2], &mut corps), Err(CommandError::FrontClosed));
        assert_eq!(registry.archived().count(), 1);
        assert!(registry.find_by_pair(PolityId(1), PolityId(2)).is_none());
    }

    #[test]
    fn test_released_corps_joins_next_war_on_owners_side() {
        let mut registry = FrontRegistry::new();
        let first = declare(&mut registry, 1, 2).unwrap();
        let mut pool = ArmyPool::new();
        pool.deposit(PolityId(1), Army::from_pairs([("militia", 20)]));
        let mut corps = CorpsManager::new(CorpsConfig::default());
        let id = corps
            .create(&mut pool, PolityId(1), Side::Attacker, "c", &Army::from_pairs([("militia", 20)]), HexCoord::new(0, 0))
            .unwrap();
        registry.assign(first, id, &mut corps).unwrap();
        corps.defend(id).unwrap();
        registry.make_peace(first, &mut corps).unwrap();

        // polity 1 is now the one attacked
        let second = declare(&mut registry, 4, 1).unwrap();
        registry.assign(second, id, &mut corps).unwrap();
        let c = corps.get(id).unwrap();
        assert_eq!(c.front, Some(second));
        assert_eq!(c.side, Side::Defender);
        assert_eq!(c.state, CorpsState::Idle);
        assert_eq!(c.pending, None);
        assert_eq!(c.position, registry.get(second).unwrap().start_position(Side::Defender));
        assert_eq!(registry.get(second).unwrap().corps[Side::Defender.index()], vec![id]);
    }
}
