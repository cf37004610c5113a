//! Colony Simulation Runner
//!
//! Runs the default household headless: a few agents, a stocked fridge and
//! some posted cooking jobs, with periodic world snapshots.

use clap::Parser;
use colony_core::components::MotiveKind;
use colony_core::events::EventLogger;
use colony_core::output::{write_snapshot, SnapshotGenerator};
use colony_core::setup::{default_recipes, furnish_household, household_grid};
use colony_core::{RecipeBook, SimConfig, Simulation};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

const AGENT_NAMES: [&str; 4] = ["Ada", "Bram", "Cleo", "Dov"];

/// Command line arguments for the simulation
#[derive(Parser, Debug)]
#[command(name = "colony_sim")]
#[command(about = "A motive-driven household simulation")]
struct Args {
    /// Random seed for reproducibility
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Number of ticks to simulate
    #[arg(long, default_value_t = 3000)]
    ticks: u64,

    /// Number of agents to spawn (at most 4)
    #[arg(long, default_value_t = 2)]
    agents: usize,

    /// Simulation config (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Recipe catalog (TOML); the built-in catalog is used when absent
    #[arg(long)]
    recipes: Option<PathBuf>,

    /// Number of cook_simple_meal jobs to post at start
    #[arg(long, default_value_t = 2)]
    meals: usize,

    /// Append published events to this JSONL file
    #[arg(long)]
    event_log: Option<PathBuf>,

    /// Interval between world snapshots (in ticks, 0 disables)
    #[arg(long, default_value_t = 500)]
    snapshot_interval: u64,

    /// Directory scanned for JSON command files every tick
    #[arg(long)]
    commands_dir: Option<PathBuf>,
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", message);
    process::exit(1);
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    println!("Colony Simulation");
    println!("=================");
    println!("Seed: {}", args.seed);
    println!("Ticks: {}", args.ticks);
    println!("Snapshot interval: {}", args.snapshot_interval);
    println!();

    // Ensure output directories exist
    fs::create_dir_all("output/snapshots").unwrap_or_else(|e| {
        eprintln!("Warning: Could not create output directories: {}", e);
    });

    let config = match &args.config {
        Some(path) => SimConfig::from_file(path).unwrap_or_else(|e| fail(e)),
        None => SimConfig::default(),
    };
    let recipes = match &args.recipes {
        Some(path) => RecipeBook::from_file(path),
        None => default_recipes(),
    }
    .unwrap_or_else(|e| fail(e));
    println!("Loaded {} recipes", recipes.len());

    let mut sim = Simulation::new(config, household_grid(), recipes, args.seed);
    if let Some(path) = &args.event_log {
        let logger = EventLogger::new(path).unwrap_or_else(|e| fail(e));
        sim = sim.with_event_logger(logger);
    }
    if let Some(dir) = &args.commands_dir {
        sim = sim.with_command_dir(dir.clone());
    }

    // Furnish the house
    println!("Furnishing household...");
    let house = furnish_household(&mut sim.objects_mut(), 4, 2);
    println!("  Placed {} stations", house.stations.len());

    // Spawn agents
    println!("Spawning agents...");
    let count = args.agents.min(AGENT_NAMES.len());
    for (name, position) in AGENT_NAMES.iter().zip(&house.spawn_points).take(count) {
        let motives = BTreeMap::from([(MotiveKind::Hunger, 0.0)]);
        sim.spawn_agent(name, *position, &motives);
    }
    println!("  Spawned {} agents", count);

    for _ in 0..args.meals {
        if let Err(e) = sim.post_job("cook_simple_meal", 5) {
            eprintln!("Warning: {}", e);
        }
    }
    println!("  Posted {} jobs", sim.board().len());
    println!();

    let mut snapshots = SnapshotGenerator::new(args.snapshot_interval);
    let mut events = 0usize;

    println!("Running simulation...");
    for _ in 0..args.ticks {
        events += sim.step().len();
        for record in sim.take_command_results() {
            if let Err(e) = record.result {
                eprintln!("Command {} rejected: {}", record.label, e);
            }
        }

        let tick = sim.tick();
        if snapshots.should_snapshot(tick) {
            let id = snapshots.next_id();
            let snapshot = sim.snapshot(&id);
            let path = Path::new("output/snapshots").join(format!("{}.json", id));
            match write_snapshot(&snapshot, &path) {
                Ok(()) => println!("  Tick {}: snapshot {} written", tick, id),
                Err(e) => eprintln!("Warning: Could not write snapshot: {}", e),
            }
        }
    }

    if let Err(e) = sim.flush_event_log() {
        eprintln!("Warning: Could not flush event log: {}", e);
    }

    let final_state = sim.snapshot("final");
    println!();
    println!("Simulation complete!");
    println!("  Ticks: {}", sim.tick());
    println!("  Events: {}", events);
    println!("  Snapshots: {}", snapshots.snapshot_count());
    println!("  Jobs on board: {}", final_state.jobs.len());
    for agent in &final_state.agents {
        println!(
            "  {} is {} ({}), hunger {:.1}",
            agent.name,
            agent.state,
            agent.sub_state,
            agent.motives.get("hunger").copied().unwrap_or_default()
        );
    }

    if let Err(e) = write_snapshot(&final_state, "output/final_state.json") {
        eprintln!("Warning: Could not write final state: {}", e);
    }
}
