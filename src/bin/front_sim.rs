//! Front simulator
//!
//! Headless runner for single battles, seeded battle sweeps and whole wars
//! between two AI belligerents. Output is JSON on stdout; logs go to stderr
//! and follow `RUST_LOG`.

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::Serialize;

use frontline::combat::simulate_battle;
use frontline::core::config::RulesConfig;
use frontline::core::error::Result;
use frontline::core::types::PolityId;
use frontline::front::{BuildingCatalog, EconomySnapshot, WarOutcome};
use frontline::simulation::{FrontEvent, WarSimulation};
use frontline::units::{Army, UnitCatalog};

#[derive(Parser, Debug)]
#[command(name = "front_sim")]
#[command(about = "Resolve battles and run AI wars on a generated front")]
struct Args {
    /// Rules file overriding the built-in defaults
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Unit catalog overriding the built-in one
    #[arg(long)]
    units: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve one battle between two armies
    Battle {
        /// Attacker composition, e.g. "spearman=40,archer=20"
        #[arg(long)]
        attacker: String,
        #[arg(long)]
        defender: String,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Defender wealth used for loot
        #[arg(long)]
        wealth: Option<f64>,
    },
    /// Resolve the same battle under many seeds and summarise
    Sweep {
        #[arg(long)]
        attacker: String,
        #[arg(long)]
        defender: String,
        #[arg(long, default_value_t = 1000)]
        runs: u64,
        #[arg(long, default_value_t = 0)]
        first_seed: u64,
    },
    /// Run a war between two AI polities until peace
    War {
        #[arg(long, default_value_t = 42)]
        seed: u64,
        #[arg(long, default_value = "militia=120,spearman=60,archer=40")]
        attacker: String,
        #[arg(long, default_value = "militia=120,spearman=60,archer=40")]
        defender: String,
        /// Attacker aggression trait in [0, 1]
        #[arg(long, default_value_t = 0.8)]
        attacker_aggression: f64,
        #[arg(long, default_value_t = 0.4)]
        defender_aggression: f64,
        /// Economy snapshot (JSON) used for both sides
        #[arg(long)]
        economy: Option<PathBuf>,
        /// Stop after this many days even without peace
        #[arg(long, default_value_t = 400)]
        max_days: u32,
        /// Print every event instead of only the summary
        #[arg(long, short = 'v')]
        verbose: bool,
    },
}

#[derive(Serialize)]
struct SweepSummary {
    runs: u64,
    attacker_wins: u64,
    decisive: u64,
    win_rate: f64,
    decisive_rate: f64,
    mean_attacker_casualties: f64,
    mean_defender_casualties: f64,
}

#[derive(Serialize)]
struct WarSummary {
    days: u32,
    outcome: Option<WarOutcome>,
    engagements: usize,
    buildings_destroyed: usize,
    events: Option<Vec<FrontEvent>>,
}

/// Parse `id=count` pairs separated by commas
fn parse_army(text: &str) -> std::result::Result<Army, String> {
    let mut army = Army::new();
    for part in text.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (id, count) = part
            .split_once('=')
            .ok_or_else(|| format!("expected unit=count, got {part:?}"))?;
        let count: u32 = count
            .trim()
            .parse()
            .map_err(|e| format!("bad count for {id}: {e}"))?;
        army.add(id.trim(), count);
    }
    Ok(army)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();
    if let Err(e) = run(args) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let rules = match &args.rules {
        Some(path) => RulesConfig::load(path)?,
        None => RulesConfig::default(),
    };
    let catalog = match &args.units {
        Some(path) => UnitCatalog::load_from_toml(path)?,
        None => UnitCatalog::with_defaults(),
    };
    let army = |text: &str| {
        parse_army(text).map_err(frontline::core::error::FrontlineError::InvalidConfig)
    };

    match args.command {
        Command::Battle {
            attacker,
            defender,
            seed,
            wealth,
        } => {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let report = simulate_battle(
                &catalog,
                &rules.combat,
                &army(&attacker)?,
                &army(&defender)?,
                wealth,
                &mut rng,
            );
            print_json(&report)
        }
        Command::Sweep {
            attacker,
            defender,
            runs,
            first_seed,
        } => {
            let (attacker, defender) = (army(&attacker)?, army(&defender)?);
            tracing::info!(runs, "starting sweep");
            let results: Vec<(bool, bool, u32, u32)> = (first_seed..first_seed + runs)
                .into_par_iter()
                .map(|seed| {
                    let mut rng = ChaCha8Rng::seed_from_u64(seed);
                    let r = simulate_battle(&catalog, &rules.combat, &attacker, &defender, None, &mut rng);
                    (r.victory, r.decisive, r.attacker_casualties(), r.defender_casualties())
                })
                .collect();

            let n = results.len().max(1) as f64;
            let wins = results.iter().filter(|r| r.0).count() as u64;
            let decisive = results.iter().filter(|r| r.1).count() as u64;
            print_json(&SweepSummary {
                runs,
                attacker_wins: wins,
                decisive,
                win_rate: wins as f64 / n,
                decisive_rate: decisive as f64 / n,
                mean_attacker_casualties: results.iter().map(|r| r.2 as f64).sum::<f64>() / n,
                mean_defender_casualties: results.iter().map(|r| r.3 as f64).sum::<f64>() / n,
            })
        }
        Command::War {
            seed,
            attacker,
            defender,
            attacker_aggression,
            defender_aggression,
            economy,
            max_days,
            verbose,
        } => {
            let mut sim = WarSimulation::new(catalog, BuildingCatalog::with_defaults(), rules, seed);
            let (a, d) = (PolityId(1), PolityId(2));
            if let Some(path) = economy {
                let eco: EconomySnapshot = serde_json::from_str(&std::fs::read_to_string(path)?)?;
                sim.set_economy(a, eco.clone());
                sim.set_economy(d, eco);
            }
            sim.recruit(a, army(&attacker)?);
            sim.recruit(d, army(&defender)?);
            let front = sim.declare_war(a, d)?;
            sim.add_ai_commander(a, attacker_aggression);
            sim.add_ai_commander(d, defender_aggression);

            let mut log = Vec::new();
            let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
            while sim.day() < max_days && sim.front(front).is_some_and(|f| f.is_active()) {
                for event in sim.tick() {
                    let kind = match &event {
                        FrontEvent::Engagement { .. } => "engagement",
                        FrontEvent::BuildingDestroyed { .. } => "building_destroyed",
                        _ => "other",
                    };
                    *counts.entry(kind).or_insert(0) += 1;
                    if verbose {
                        log.push(event);
                    }
                }
            }
            sim.check_invariants()?;

            print_json(&WarSummary {
                days: sim.day(),
                outcome: sim.front(front).and_then(|f| f.outcome),
                engagements: counts.get("engagement").copied().unwrap_or(0),
                buildings_destroyed: counts.get("building_destroyed").copied().unwrap_or(0),
                events: verbose.then_some(log),
            })
        }
    }
}
