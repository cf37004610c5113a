//! Simulation Host
//!
//! Owns the ECS world and the tick schedule. One `step` runs the pipeline:
//! clock, commands, motive decay, body index, controllers, then publication.

use bevy_ecs::prelude::*;
use bevy_math::Vec2;
use colony_events::{AgentSnapshot, EventCategory, SimEvent, WorldSnapshot};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::commands::{
    self, apply_commands, Command, CommandDir, CommandOutcome, CommandRecord, CommandResults,
    PendingCommands,
};
use crate::components::{AgentId, IdAllocator, JobId, MotiveKind, WorldObjects};
use crate::config::SimConfig;
use crate::error::{SimError, SimResult};
use crate::events::{publish_events, EventBus, EventLogger, PublishedEvents, SubscriptionId, TickEvents};
use crate::jobs::{JobBoard, RecipeBook};
use crate::nav::{BodyIndex, NavGrid};
use crate::output::{agent_snapshots, generate_snapshot};
use crate::systems::{
    advance_clock, build_body_index, decay_motives, run_controllers, SimClock,
};
use crate::SimRng;

pub struct Simulation {
    world: World,
    schedule: Schedule,
}

impl Simulation {
    pub fn new(config: SimConfig, grid: NavGrid, recipes: RecipeBook, seed: u64) -> Self {
        let mut world = World::new();

        world.insert_resource(SimClock::from_config(&config.time));
        world.insert_resource(SimRng(SmallRng::seed_from_u64(seed)));
        world.insert_resource(WorldObjects::new());
        world.insert_resource(JobBoard::new());
        world.insert_resource(IdAllocator::new());
        world.insert_resource(BodyIndex::new());
        world.insert_resource(grid);
        world.insert_resource(recipes);
        world.insert_resource(config);

        world.insert_resource(TickEvents::new());
        world.insert_resource(EventBus::new());
        world.insert_resource(PublishedEvents::default());

        world.insert_resource(PendingCommands::new());
        world.insert_resource(CommandDir::default());
        world.insert_resource(CommandResults::default());

        let mut schedule = Schedule::default();
        schedule.add_systems(
            (
                advance_clock,
                apply_commands,
                decay_motives,
                build_body_index,
                run_controllers,
                publish_events,
            )
                .chain(),
        );

        Self { world, schedule }
    }

    /// Replaces the clock, e.g. with one driven by a fixed time source.
    pub fn with_clock(mut self, clock: SimClock) -> Self {
        self.world.insert_resource(clock);
        self
    }

    pub fn with_event_logger(mut self, logger: EventLogger) -> Self {
        self.world.insert_resource(logger);
        self
    }

    /// Scans `dir` for command files at the start of every tick.
    pub fn with_command_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.world.insert_resource(CommandDir(Some(dir.into())));
        self
    }

    /// Runs one tick and returns the events it published.
    pub fn step(&mut self) -> Vec<SimEvent> {
        self.schedule.run(&mut self.world);
        self.world.resource::<PublishedEvents>().events.clone()
    }

    /// Runs `ticks` ticks and returns how many events were published.
    pub fn run(&mut self, ticks: u64) -> usize {
        (0..ticks).map(|_| self.step().len()).sum()
    }

    /// Applies a command immediately. Its events go out with the next tick.
    pub fn execute(&mut self, command: &Command) -> SimResult<CommandOutcome> {
        commands::execute(&mut self.world, command)
    }

    /// Queues a command for the start of the next tick.
    pub fn queue(&mut self, command: Command) {
        self.world.resource_mut::<PendingCommands>().push(command);
    }

    /// Results of queued and file commands applied since the last call.
    pub fn take_command_results(&mut self) -> Vec<CommandRecord> {
        std::mem::take(&mut self.world.resource_mut::<CommandResults>().records)
    }

    pub fn spawn_agent(
        &mut self,
        name: &str,
        position: Vec2,
        motives: &BTreeMap<MotiveKind, f32>,
    ) -> AgentId {
        commands::spawn_agent(&mut self.world, name, position, motives)
    }

    pub fn post_job(&mut self, recipe: &str, priority: i32) -> SimResult<JobId> {
        let command = Command::PostJob {
            recipe: recipe.to_string(),
            priority,
        };
        match self.execute(&command)? {
            CommandOutcome::Job(id) => Ok(id),
            _ => Err(SimError::UnknownRecipe(recipe.to_string())),
        }
    }

    /// Drops completed and failed jobs from the board.
    pub fn purge_finished_jobs(&mut self) -> usize {
        self.world.resource_mut::<JobBoard>().purge_finished()
    }

    pub fn subscribe(&mut self, categories: impl IntoIterator<Item = EventCategory>) -> SubscriptionId {
        self.world.resource_mut::<EventBus>().subscribe(categories)
    }

    pub fn drain_events(&mut self, subscription: SubscriptionId) -> Vec<SimEvent> {
        self.world.resource_mut::<EventBus>().drain(subscription)
    }

    pub fn snapshot(&mut self, snapshot_id: &str) -> WorldSnapshot {
        generate_snapshot(&mut self.world, snapshot_id)
    }

    pub fn agents(&mut self) -> Vec<AgentSnapshot> {
        agent_snapshots(&mut self.world)
    }

    pub fn agent(&mut self, id: AgentId) -> Option<AgentSnapshot> {
        self.agents().into_iter().find(|a| a.agent_id == id.raw())
    }

    pub fn tick(&self) -> u64 {
        self.world.resource::<SimClock>().tick()
    }

    pub fn clock_mut(&mut self) -> Mut<'_, SimClock> {
        self.world.resource_mut::<SimClock>()
    }

    pub fn objects(&self) -> &WorldObjects {
        self.world.resource::<WorldObjects>()
    }

    pub fn objects_mut(&mut self) -> Mut<'_, WorldObjects> {
        self.world.resource_mut::<WorldObjects>()
    }

    pub fn board(&self) -> &JobBoard {
        self.world.resource::<JobBoard>()
    }

    pub fn grid(&self) -> &NavGrid {
        self.world.resource::<NavGrid>()
    }

    pub fn config(&self) -> &SimConfig {
        self.world.resource::<SimConfig>()
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Flushes the event log, if one is attached.
    pub fn flush_event_log(&mut self) -> std::io::Result<()> {
        match self.world.get_resource_mut::<EventLogger>() {
            Some(mut logger) => logger.flush(),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::{default_recipes, furnish_household, household_grid};
    use colony_events::EventKind;

    fn household(seed: u64) -> Simulation {
        let mut sim = Simulation::new(
            SimConfig::default(),
            household_grid(),
            default_recipes().unwrap(),
            seed,
        );
        furnish_household(&mut sim.objects_mut(), 2, 1);
        sim
    }

    #[test]
    fn test_step_advances_clock() {
        let mut sim = household(1);
        sim.run(5);
        assert_eq!(sim.tick(), 5);
    }

    #[test]
    fn test_queued_command_applies_next_tick() {
        let mut sim = household(1);
        let sub = sim.subscribe([EventCategory::World]);
        sim.queue(Command::AddWall { x: 3, y: 5 });
        assert!(!sim.grid().is_wall(bevy_math::IVec2::new(3, 5)));

        sim.step();
        assert!(sim.grid().is_wall(bevy_math::IVec2::new(3, 5)));
        let records = sim.take_command_results();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].result, Ok(CommandOutcome::Applied));
        assert!(sim
            .drain_events(sub)
            .iter()
            .any(|e| e.kind == EventKind::WallChanged { x: 3, y: 5, wall: true }));
    }

    #[test]
    fn test_unknown_recipe_is_rejected() {
        let mut sim = household(1);
        assert_eq!(
            sim.post_job("souffle", 1),
            Err(SimError::UnknownRecipe("souffle".to_string()))
        );
        assert!(sim.board().is_empty());
    }

    #[test]
    fn test_spawned_agent_shows_up_in_snapshot() {
        let mut sim = household(3);
        let ada = sim.spawn_agent("Ada", Vec2::new(4.5, 5.5), &BTreeMap::new());
        sim.step();

        let snapshot = sim.snapshot("snap_000001");
        assert_eq!(snapshot.agents.len(), 1);
        assert_eq!(snapshot.stations.len(), 6);
        assert_eq!(snapshot.containers.len(), 1);
        assert_eq!(sim.agent(ada).unwrap().name, "Ada");
    }
}
