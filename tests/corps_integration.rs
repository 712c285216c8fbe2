//! Corps lifecycle integration tests
//!
//! Unit conservation between standing armies and corps, movement estimates
//! and the command state machine.

use proptest::prelude::*;

use frontline::core::config::CorpsConfig;
use frontline::core::error::CommandError;
use frontline::core::types::{HexCoord, PolityId, Side};
use frontline::corps::{ArmyPool, CorpsManager, CorpsState};
use frontline::front::{FrontTerrain, TerrainGrid};
use frontline::units::{Army, UnitCatalog};

const OWNER: PolityId = PolityId(3);

fn catalog_with_runner() -> UnitCatalog {
    let mut catalog = UnitCatalog::with_defaults();
    let mut runner = catalog.get("militia").cloned().unwrap();
    runner.id = "runner".into();
    runner.speed = 5.0;
    catalog.add(runner);
    catalog
}

#[test]
fn test_eta_plain_versus_forest() {
    let catalog = catalog_with_runner();
    let mut pool = ArmyPool::new();
    pool.deposit(OWNER, Army::from_pairs([("runner", 10)]));
    let mut corps = CorpsManager::new(CorpsConfig::default());
    let id = corps
        .create(&mut pool, OWNER, Side::Attacker, "scouts", &Army::from_pairs([("runner", 10)]), HexCoord::new(0, 3))
        .unwrap();

    let plain = TerrainGrid::filled(12, 6, FrontTerrain::Plain);
    let forest = TerrainGrid::filled(12, 6, FrontTerrain::Forest);
    let target = HexCoord::new(10, 3);
    assert_eq!(corps.eta(id, target, &plain, &catalog), Some(2));
    assert_eq!(corps.eta(id, target, &forest, &catalog), Some(4));
}

#[test]
fn test_last_order_wins_and_busy_rejects() {
    let catalog = UnitCatalog::with_defaults();
    let grid = TerrainGrid::filled(12, 6, FrontTerrain::Plain);
    let mut pool = ArmyPool::new();
    pool.deposit(OWNER, Army::from_pairs([("militia", 20)]));
    let mut corps = CorpsManager::new(CorpsConfig::default());
    let id = corps
        .create(&mut pool, OWNER, Side::Attacker, "1st", &Army::from_pairs([("militia", 20)]), HexCoord::new(1, 3))
        .unwrap();

    corps.defend(id).unwrap();
    corps.move_to(id, HexCoord::new(8, 3), &grid, &catalog).unwrap();
    assert_eq!(corps.get(id).unwrap().state, CorpsState::Moving);
    assert_eq!(corps.defend(id), Err(CommandError::Busy("moving")));

    // retreat is always accepted
    corps.retreat(id, &grid, &catalog).unwrap();
    assert_eq!(corps.get(id).unwrap().state, CorpsState::Retreating);
}

#[test]
fn test_move_outside_front_rejected() {
    let catalog = UnitCatalog::with_defaults();
    let grid = TerrainGrid::filled(12, 6, FrontTerrain::Plain);
    let mut pool = ArmyPool::new();
    pool.deposit(OWNER, Army::from_pairs([("militia", 5)]));
    let mut corps = CorpsManager::new(CorpsConfig::default());
    let id = corps
        .create(&mut pool, OWNER, Side::Defender, "2nd", &Army::from_pairs([("militia", 5)]), HexCoord::new(10, 3))
        .unwrap();

    assert!(matches!(
        corps.move_to(id, HexCoord::new(20, 3), &grid, &catalog),
        Err(CommandError::OutOfBounds(_))
    ));
    assert_eq!(corps.get(id).unwrap().state, CorpsState::Idle);
}

#[derive(Debug, Clone)]
enum Op {
    Create(u32),
    Reinforce(usize, u32),
    Disband(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u32..80).prop_map(Op::Create),
        (0usize..10, 0u32..40).prop_map(|(i, n)| Op::Reinforce(i, n)),
        (0usize..10).prop_map(Op::Disband),
    ]
}

proptest! {
    #[test]
    fn prop_units_conserved_across_transfers(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let mut pool = ArmyPool::new();
        pool.deposit(OWNER, Army::from_pairs([("militia", 200), ("archer", 50)]));
        let mut corps = CorpsManager::new(CorpsConfig::default());
        let mut ids = Vec::new();

        for op in ops {
            match op {
                Op::Create(n) => {
                    let request = Army::from_pairs([("militia", n), ("archer", n / 4)]);
                    if let Ok(id) = corps.create(&mut pool, OWNER, Side::Attacker, "c", &request, HexCoord::new(0, 0)) {
                        ids.push(id);
                    }
                }
                Op::Reinforce(i, n) => {
                    if let Some(&id) = ids.get(i) {
                        let _ = corps.reinforce(id, &mut pool, &Army::from_pairs([("militia", n)]));
                    }
                }
                Op::Disband(i) => {
                    if i < ids.len() {
                        let id = ids.remove(i);
                        prop_assert!(corps.disband(id, &mut pool).is_ok());
                    }
                }
            }
            prop_assert_eq!(pool.total(OWNER) + corps.units_held(OWNER), 250);
            prop_assert!(corps.owned_by(OWNER).count() <= 8);
        }
    }
}
