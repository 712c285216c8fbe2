//! Whole-war integration tests: two AI belligerents fight until peace

use frontline::core::config::{EngagementMode, RulesConfig};
use frontline::core::types::{PolityId, Side};
use frontline::front::{BuildingCatalog, EconomySnapshot, PeaceReason};
use frontline::simulation::{FrontEvent, WarSimulation};
use frontline::units::{Army, UnitCatalog};

fn economy() -> EconomySnapshot {
    let mut eco = EconomySnapshot {
        wealth: 3000.0,
        population: 2000.0,
        army_size: 200,
        era: 1,
        ..Default::default()
    };
    for (id, n) in [("farm", 4), ("market", 1), ("barracks", 1), ("lumber_camp", 2)] {
        eco.buildings.insert(id.to_string(), n);
    }
    eco
}

fn ai_war(rules: RulesConfig, seed: u64) -> (WarSimulation, Vec<FrontEvent>) {
    let mut sim = WarSimulation::new(UnitCatalog::with_defaults(), BuildingCatalog::with_defaults(), rules, seed);
    for polity in [PolityId(1), PolityId(2)] {
        sim.set_economy(polity, economy());
        sim.recruit(polity, Army::from_pairs([("militia", 120), ("spearman", 60), ("archer", 40)]));
    }
    let front = sim.declare_war(PolityId(1), PolityId(2)).unwrap();
    sim.add_ai_commander(PolityId(1), 0.85);
    sim.add_ai_commander(PolityId(2), 0.5);

    let mut log = Vec::new();
    while sim.front(front).unwrap().is_active() && sim.day() < 400 {
        log.extend(sim.tick());
        sim.check_invariants().unwrap();
    }
    (sim, log)
}

#[test]
fn test_ai_war_reaches_peace() {
    let (sim, log) = ai_war(RulesConfig::default(), 17);
    let front = sim.registry().iter().next().unwrap();
    let outcome = front.outcome.expect("war never ended");
    assert!(outcome.day <= 365);
    assert_eq!(
        log.iter().filter(|e| matches!(e, FrontEvent::WarEnded { .. })).count(),
        1
    );
    // corps outlive the front but no longer belong to it
    assert!(sim.corps().iter().all(|c| c.front.is_none()));
    if outcome.reason == PeaceReason::Score {
        assert!(outcome.final_score.abs() >= 100.0);
    }
}

#[test]
fn test_ai_orders_go_through_command_results() {
    let (_, log) = ai_war(RulesConfig::default(), 23);
    let orders: Vec<_> = log
        .iter()
        .filter_map(|e| match e {
            FrontEvent::AiOrder { result, .. } => Some(result),
            _ => None,
        })
        .collect();
    assert!(!orders.is_empty());
    for result in orders {
        assert_eq!(result.success, result.error.is_none());
    }
}

#[test]
fn test_rounds_mode_war_is_reproducible() {
    let mut rules = RulesConfig::default();
    rules.battle.engagement = EngagementMode::Rounds;
    let (_, first) = ai_war(rules.clone(), 5);
    let (_, second) = ai_war(rules, 5);
    assert_eq!(first, second);
}

#[test]
fn test_casualties_leave_the_ledger() {
    let (sim, log) = ai_war(RulesConfig::default(), 31);
    let lost: [u32; 2] = log.iter().fold([0, 0], |mut acc, e| {
        if let FrontEvent::Engagement { report, .. } = e {
            acc[0] += report.attacker_casualties;
            acc[1] += report.defender_casualties;
        }
        acc
    });
    let front = sim.registry().iter().next().unwrap();
    assert_eq!(front.casualties, lost);
    for (side, polity) in [(Side::Attacker, PolityId(1)), (Side::Defender, PolityId(2))] {
        let held = sim.pool().total(polity) + sim.corps().units_held(polity);
        assert_eq!(held, 220 - lost[side.index()]);
    }
}
