//! AI commander - strategy-weighted orders for idle corps

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::ai::strategy::{RepositionGoal, Strategy, StrategyBook};
use crate::ai::{AiAction, AiDecision, FrontAi};
use crate::core::config::AiConfig;
use crate::core::types::{HexCoord, PolityId, Side};
use crate::corps::manager::corps_strength;
use crate::corps::{Corps, CorpsManager};
use crate::front::Front;
use crate::units::{Army, UnitCatalog};

/// Read-only state an AI sees when deciding
pub struct DecisionContext<'a> {
    pub front: &'a Front,
    pub corps: &'a CorpsManager,
    pub catalog: &'a UnitCatalog,
    pub config: &'a AiConfig,
    /// Standing army available for new corps
    pub standing: Option<&'a Army>,
}

impl<'a> DecisionContext<'a> {
    fn strength(&self, corps: &Corps) -> f64 {
        corps_strength(corps, self.catalog, self.corps.config())
    }

    fn enemies(&self, side: Side) -> impl Iterator<Item = &'a Corps> + '_ {
        self.corps.on_front(self.front.id).filter(move |c| c.side != side)
    }
}

/// `friendly / (friendly + enemy)` within the configured radius
///
/// Returns the configured no-enemy balance (above 1) when nothing hostile is
/// close, so an unopposed corps always reads as dominant.
pub fn local_power_balance(corps: &Corps, context: &DecisionContext) -> f64 {
    let friendly = context.strength(corps);
    let enemy: f64 = context
        .enemies(corps.side)
        .filter(|e| e.position.distance(&corps.position) <= context.config.local_radius)
        .map(|e| context.strength(e))
        .sum();
    if enemy <= 0.0 {
        return context.config.no_enemy_balance;
    }
    friendly / (friendly + enemy)
}

pub struct AiCommander {
    polity: PolityId,
    /// Aggression trait in [0, 1]
    aggression: f64,
    book: StrategyBook,
    current: Option<Strategy>,
    rng: ChaCha8Rng,
}

impl AiCommander {
    pub fn new(polity: PolityId, aggression: f64, book: StrategyBook, seed: u64) -> Self {
        Self {
            polity,
            aggression: aggression.clamp(0.0, 1.0),
            book,
            current: None,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn aggression(&self) -> f64 {
        self.aggression
    }

    fn decide_for(&mut self, corps: &Corps, strategy: &Strategy, context: &DecisionContext) -> Option<AiAction> {
        let config = context.config;
        let balance = local_power_balance(corps, context);
        if corps.morale < config.retreat_morale
            || corps.supplies < config.retreat_supplies
            || balance < strategy.retreat_threshold
        {
            return Some(AiAction::Retreat);
        }

        let roll: f64 = self.rng.gen();
        if roll < strategy.attack_weight && balance > config.attack_balance_threshold {
            attack_action(corps, context)
        } else if roll < strategy.attack_weight + strategy.defend_weight {
            Some(AiAction::Defend)
        } else {
            let to = self.reposition_point(corps, strategy, context);
            Some(AiAction::Reposition { to })
        }
    }

    fn reposition_point(&mut self, corps: &Corps, strategy: &Strategy, context: &DecisionContext) -> HexCoord {
        let front = context.front;
        let grid = &front.grid;
        let forward = match corps.side {
            Side::Attacker => 1,
            Side::Defender => -1,
        };

        let wanted = match strategy.reposition {
            RepositionGoal::OwnAssets => {
                let asset = front
                    .standing_buildings(corps.side)
                    .map(|b| b.position)
                    .chain(
                        front
                            .infrastructure
                            .iter()
                            .filter(|i| i.owner == corps.side && !i.destroyed)
                            .map(|i| i.position),
                    )
                    .next();
                asset.map(|at| HexCoord::new(at.q + forward, at.r))
            }
            RepositionGoal::Midline => None,
        };

        let wanted = wanted.unwrap_or_else(|| {
            let centre = grid.width as i32 / 2;
            let spread = context.config.midline_spread;
            let q = match corps.side {
                Side::Attacker => (corps.position.q + 2).min(centre + spread),
                Side::Defender => (corps.position.q - 2).max(centre - spread),
            };
            let r = corps.position.r + self.rng.gen_range(-spread..=spread);
            HexCoord::new(q, r)
        });

        let clamped = HexCoord::new(
            wanted.q.clamp(0, grid.width as i32 - 1),
            wanted.r.clamp(0, grid.height as i32 - 1),
        );
        grid.nearest_open(clamped).unwrap_or(corps.position)
    }
}

/// Weakest enemy corps on the front, else the nearest enemy building
fn attack_action(corps: &Corps, context: &DecisionContext) -> Option<AiAction> {
    let weakest = context
        .enemies(corps.side)
        .map(|e| (context.strength(e), e))
        .min_by(|a, b| a.0.total_cmp(&b.0).then(a.1.id.cmp(&b.1.id)));
    if let Some((_, enemy)) = weakest {
        return Some(AiAction::AttackCorps {
            target: enemy.id,
            at: enemy.position,
        });
    }
    context
        .front
        .standing_buildings(corps.side.opposite())
        .min_by_key(|b| (b.position.distance(&corps.position), b.id))
        .map(|b| AiAction::AttackBuilding {
            target: b.id,
            at: b.position,
        })
}

impl FrontAi for AiCommander {
    fn polity(&self) -> PolityId {
        self.polity
    }

    fn decide(&mut self, context: &DecisionContext) -> Vec<AiDecision> {
        let front = context.front;
        if !front.is_active() || front.side_of(self.polity).is_none() {
            return Vec::new();
        }
        let Some(strategy) = self
            .book
            .select(self.aggression, context.config, &mut self.rng)
            .cloned()
        else {
            return Vec::new();
        };

        let own: Vec<&Corps> = context
            .corps
            .on_front(front.id)
            .filter(|c| c.owner == self.polity)
            .collect();

        let mut decisions = Vec::new();
        if own.is_empty() {
            if let Some(army) = context.standing {
                let units = army.scaled(context.config.auto_corps_share);
                if !units.is_empty() {
                    decisions.push(AiDecision {
                        corps: None,
                        action: AiAction::CreateCorps { units },
                    });
                }
            }
        } else {
            for corps in own {
                if corps.state.is_busy() {
                    continue;
                }
                if let Some(action) = self.decide_for(corps, &strategy, context) {
                    decisions.push(AiDecision {
                        corps: Some(corps.id),
                        action,
                    });
                }
            }
        }

        tracing::debug!(
            polity = self.polity.0,
            strategy = %strategy.name,
            decisions = decisions.len(),
            "ai decisions"
        );
        self.current = Some(strategy);
        decisions
    }

    fn strategy(&self) -> Option<&Strategy> {
        self.current.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{CorpsConfig, FrontConfig};
    use crate::core::types::{CorpsId, FrontId, WarId};
    use crate::corps::ArmyPool;
    use crate::front::{BuildingCatalog, EconomySnapshot};
    use rand::SeedableRng;

    struct World {
        front: Front,
        corps: CorpsManager,
        pool: ArmyPool,
        catalog: UnitCatalog,
        config: AiConfig,
    }

    fn world() -> World {
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        let eco = EconomySnapshot::default();
        let front = Front::generate(
            FrontId(1),
            WarId(1),
            [PolityId(1), PolityId(2)],
            [&eco, &eco],
            &BuildingCatalog::with_defaults(),
            &FrontConfig::default(),
            &mut rng,
        )
        .unwrap();
        let mut pool = ArmyPool::new();
        pool.deposit(PolityId(1), Army::from_pairs([("militia", 200)]));
        pool.deposit(PolityId(2), Army::from_pairs([("militia", 200)]));
        World {
            front,
            corps: CorpsManager::new(CorpsConfig::default()),
            pool,
            catalog: UnitCatalog::with_defaults(),
            config: AiConfig::default(),
        }
    }

    fn field(w: &mut World, owner: u32, side: Side, count: u32, at: HexCoord) -> CorpsId {
        let units = Army::from_pairs([("militia", count)]);
        let id = w
            .corps
            .create(&mut w.pool, PolityId(owner), side, "c", &units, at)
            .unwrap();
        w.corps.set_front(id, Some(w.front.id)).unwrap();
        id
    }

    fn context<'a>(w: &'a World, standing: Option<&'a Army>) -> DecisionContext<'a> {
        DecisionContext {
            front: &w.front,
            corps: &w.corps,
            catalog: &w.catalog,
            config: &w.config,
            standing,
        }
    }

    #[test]
    fn test_balance_without_enemies_is_dominant() {
        let mut w = world();
        let id = field(&mut w, 1, Side::Attacker, 10, HexCoord::new(1, 2));
        let ctx = context(&w, None);
        assert_eq!(local_power_balance(w.corps.get(id).unwrap(), &ctx), 2.0);
    }

    #[test]
    fn test_outnumbered_corps_retreats() {
        let mut w = world();
        let weak = field(&mut w, 1, Side::Attacker, 5, HexCoord::new(2, 2));
        field(&mut w, 2, Side::Defender, 100, HexCoord::new(3, 2));
        let ctx = context(&w, None);
        assert!(local_power_balance(w.corps.get(weak).unwrap(), &ctx) < 0.1);

        for seed in 0..5 {
            let mut ai = AiCommander::new(PolityId(1), 0.5, StrategyBook::with_defaults(), seed);
            let decisions = ai.decide(&ctx);
            assert_eq!(
                decisions,
                vec![AiDecision { corps: Some(weak), action: AiAction::Retreat }]
            );
        }
    }

    #[test]
    fn test_empty_side_creates_corps_from_half_the_army() {
        let w = world();
        let standing = Army::from_pairs([("militia", 40)]);
        let ctx = context(&w, Some(&standing));
        let mut ai = AiCommander::new(PolityId(2), 0.5, StrategyBook::with_defaults(), 1);
        let decisions = ai.decide(&ctx);
        assert_eq!(decisions.len(), 1);
        assert_eq!(
            decisions[0].action,
            AiAction::CreateCorps { units: Army::from_pairs([("militia", 20)]) }
        );
    }

    #[test]
    fn test_busy_corps_skipped() {
        let mut w = world();
        let id = field(&mut w, 1, Side::Attacker, 10, HexCoord::new(1, 2));
        let grid = w.front.grid.clone();
        let target = grid.nearest_open(HexCoord::new(4, 2)).unwrap();
        w.corps.move_to(id, target, &grid, &w.catalog).unwrap();
        let ctx = context(&w, None);
        let mut ai = AiCommander::new(PolityId(1), 0.9, StrategyBook::with_defaults(), 4);
        assert!(ai.decide(&ctx).is_empty());
        assert_eq!(ai.strategy().map(|s| s.name.as_str()), Some("aggressive"));
    }

    #[test]
    fn test_dominant_aggressor_attacks_weakest() {
        let mut w = world();
        let own = field(&mut w, 1, Side::Attacker, 200, HexCoord::new(1, 2));
        field(&mut w, 2, Side::Defender, 20, HexCoord::new(4, 1));
        let weak = field(&mut w, 2, Side::Defender, 5, HexCoord::new(5, 3));
        let ctx = context(&w, None);

        let mut attacks = 0;
        for seed in 0..40 {
            let mut ai = AiCommander::new(PolityId(1), 0.9, StrategyBook::with_defaults(), seed);
            for d in ai.decide(&ctx) {
                assert_eq!(d.corps, Some(own));
                if let AiAction::AttackCorps { target, .. } = d.action {
                    assert_eq!(target, weak);
                    attacks += 1;
                }
            }
        }
        // attack weight 0.7
        assert!(attacks > 15, "only {attacks} attacks");
    }

    #[test]
    fn test_reposition_stays_on_open_cells() {
        let mut w = world();
        field(&mut w, 1, Side::Attacker, 10, HexCoord::new(0, 0));
        let ctx = context(&w, None);
        for seed in 0..30 {
            let mut ai = AiCommander::new(PolityId(1), 0.1, StrategyBook::with_defaults(), seed);
            for d in ai.decide(&ctx) {
                if let AiAction::Reposition { to } = d.action {
                    assert!(w.front.grid.is_open(to));
                }
            }
        }
    }
}
