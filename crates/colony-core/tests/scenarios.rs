//! End-to-end household scenarios
//!
//! Full tick pipeline runs: cooking, interruption and hand-off, contention
//! for a single need station, self-posted meals, and crowded movement.

use bevy_math::{IVec2, Vec2};
use colony_core::commands::{Command, CommandOutcome, ItemPlacement};
use colony_core::components::{AgentId, MotiveKind, SlotKind};
use colony_core::config::MovementConfig;
use colony_core::jobs::JobState;
use colony_core::nav::{circle_hits_wall, BodyIndex, MoveStatus, Mover};
use colony_core::setup::{default_recipes, furnish_household, household_grid, Household};
use colony_core::{SimConfig, Simulation};
use std::collections::BTreeMap;

fn prompt_config() -> SimConfig {
    let mut config = SimConfig::default();
    config.agents.start_jitter_ticks = 0;
    config
}

fn household(raw_food: usize, bread: usize, seed: u64) -> (Simulation, Household) {
    let mut sim = Simulation::new(prompt_config(), household_grid(), default_recipes().unwrap(), seed);
    let house = furnish_household(&mut sim.objects_mut(), raw_food, bread);
    (sim, house)
}

/// Steps until `done` holds, up to `max_ticks`.
fn run_until(sim: &mut Simulation, max_ticks: u64, mut done: impl FnMut(&mut Simulation) -> bool) -> bool {
    for _ in 0..max_ticks {
        sim.step();
        if done(sim) {
            return true;
        }
    }
    false
}

fn job_state(sim: &Simulation, job: colony_core::JobId) -> Option<JobState> {
    sim.board().get(job).map(|j| j.state())
}

#[test]
fn test_cook_simple_meal_completes() {
    let (mut sim, house) = household(1, 0, 7);
    sim.spawn_agent("Ada", house.spawn_points[0], &BTreeMap::new());
    let job = sim.post_job("cook_simple_meal", 5).unwrap();

    assert!(run_until(&mut sim, 2_000, |sim| job_state(sim, job) == Some(JobState::Completed)));

    let objects = sim.objects();
    assert_eq!(objects.count_tag("raw_food"), 0);
    assert_eq!(objects.count_tag("chopped_food"), 0);
    assert_eq!(objects.count_tag("cooked_meal"), 1);

    let stove = objects.station(house.station("stove").unwrap()).unwrap();
    assert_eq!(stove.items_in(SlotKind::Output).len(), 1);
    assert_eq!(stove.reserved_by(), None);
    assert!(objects.check_invariants().is_ok());
}

#[test]
fn test_interrupted_job_resumes_with_another_agent() {
    let (mut sim, house) = household(1, 0, 11);
    let ada = sim.spawn_agent("Ada", house.spawn_points[0], &BTreeMap::new());
    let job = sim.post_job("cook_simple_meal", 5).unwrap();

    // Chopping done, walking to the stove
    assert!(run_until(&mut sim, 2_000, |sim| {
        sim.board().get(job).is_some_and(|j| j.step_index() >= 1)
    }));
    assert_eq!(sim.execute(&Command::InterruptJob { job }), Ok(CommandOutcome::Applied));

    let interrupted = sim.board().get(job).unwrap();
    assert_eq!(interrupted.state(), JobState::Interrupted);
    assert_eq!(interrupted.step_index(), 1);
    assert_eq!(interrupted.claimed_by(), None);
    assert!(sim.objects().held_by(ada).is_empty());
    assert_eq!(sim.objects().count_tag("chopped_food"), 1);

    sim.execute(&Command::RemoveAgent { agent: ada }).unwrap();
    let bram = sim.spawn_agent("Bram", house.spawn_points[1], &BTreeMap::new());

    assert!(run_until(&mut sim, 500, |sim| {
        sim.board().get(job).and_then(|j| j.claimed_by()) == Some(bram)
    }));
    assert_eq!(sim.board().get(job).unwrap().step_index(), 1);

    assert!(run_until(&mut sim, 2_000, |sim| job_state(sim, job) == Some(JobState::Completed)));
    assert_eq!(sim.objects().count_tag("cooked_meal"), 1);
    assert_eq!(sim.objects().count_tag("chopped_food"), 0);
    assert!(sim.objects().check_invariants().is_ok());
}

#[test]
fn test_busy_stove_keeps_job_on_the_board() {
    let (mut sim, house) = household(1, 0, 9);
    let stove = house.station("stove").unwrap();
    assert!(sim.objects_mut().reserve_station(stove, AgentId(99)));
    sim.spawn_agent("Ada", house.spawn_points[0], &BTreeMap::new());
    let job = sim.post_job("cook_simple_meal", 5).unwrap();

    for _ in 0..300 {
        sim.step();
        assert_eq!(job_state(&sim, job), Some(JobState::Posted));
    }

    sim.objects_mut().release_station(stove);
    assert!(run_until(&mut sim, 2_000, |sim| job_state(sim, job) == Some(JobState::Completed)));
}

#[test]
fn test_one_bed_two_exhausted_agents() {
    let (mut sim, house) = household(0, 0, 3);
    let exhausted = BTreeMap::from([(MotiveKind::Energy, -60.0)]);
    let ada = sim.spawn_agent("Ada", house.spawn_points[0], &exhausted);
    let bram = sim.spawn_agent("Bram", house.spawn_points[1], &exhausted);
    let bed = house.station("bed").unwrap();

    sim.run(3);
    assert_eq!(sim.objects().station(bed).unwrap().reserved_by(), Some(ada));

    for _ in 0..100 {
        sim.step();
        assert_ne!(sim.objects().station(bed).unwrap().reserved_by(), Some(bram));
    }
    let ada_view = sim.agent(ada).unwrap();
    assert!(ada_view.sub_state == "need_target" || ada_view.sub_state == "using_object");
}

#[test]
fn test_hungry_agent_posts_and_eats_a_meal() {
    let (mut sim, house) = household(0, 0, 5);
    let outcome = sim.execute(&Command::SpawnItem {
        tag: "cooked_meal".to_string(),
        state: None,
        placement: ItemPlacement::Container {
            container: house.fridge,
        },
    });
    assert!(matches!(outcome, Ok(CommandOutcome::Item(_))));

    let hungry = BTreeMap::from([(MotiveKind::Hunger, -60.0)]);
    let ada = sim.spawn_agent("Ada", house.spawn_points[0], &hungry);

    assert!(run_until(&mut sim, 1_000, |sim| sim.objects().count_tag("cooked_meal") == 0));

    let eat = sim
        .board()
        .jobs()
        .find(|j| j.recipe.name == "eat_meal")
        .map(|j| j.state());
    assert_eq!(eat, Some(JobState::Completed));
    let hunger = sim.agent(ada).unwrap().motives["hunger"];
    assert!(hunger > -30.0, "hunger {}", hunger);
}

#[test]
fn test_wall_command_blocks_the_doorway() {
    let (mut sim, _) = household(0, 0, 1);
    for y in [5, 6] {
        sim.queue(Command::AddWall { x: 8, y });
    }
    sim.step();
    assert!(sim.grid().find_path(IVec2::new(2, 5), IVec2::new(12, 5)).is_none());
    assert!(sim
        .take_command_results()
        .iter()
        .all(|r| r.result == Ok(CommandOutcome::Applied)));
}

#[test]
fn test_crowd_through_doorway_settles() {
    let grid = household_grid();
    let config = MovementConfig::default();
    let starts = [
        Vec2::new(5.5, 5.5),
        Vec2::new(5.5, 6.5),
        Vec2::new(11.5, 5.5),
        Vec2::new(11.5, 6.5),
    ];
    let goals = [
        Vec2::new(12.5, 6.5),
        Vec2::new(12.5, 5.5),
        Vec2::new(4.5, 6.5),
        Vec2::new(4.5, 5.5),
    ];
    let mut movers: Vec<Mover> = starts.iter().map(|p| Mover::new(*p, config.radius)).collect();
    for (mover, goal) in movers.iter_mut().zip(goals) {
        assert!(mover.set_destination(goal, &grid));
    }

    let mut bodies = BodyIndex::new();
    for _ in 0..3_000 {
        bodies.clear();
        for (i, mover) in movers.iter().enumerate() {
            bodies.update(AgentId(i as u64 + 1), mover.position, mover.radius);
        }
        for (i, mover) in movers.iter_mut().enumerate() {
            mover.step(AgentId(i as u64 + 1), &grid, &bodies, 0.1, &config);
            assert!(!circle_hits_wall(&grid, mover.position, mover.radius * 0.5));
        }
        if movers.iter().all(|m| m.status() != MoveStatus::Moving) {
            break;
        }
    }

    for mover in &movers {
        assert!(matches!(mover.status(), MoveStatus::Arrived | MoveStatus::Abandoned));
    }
}
