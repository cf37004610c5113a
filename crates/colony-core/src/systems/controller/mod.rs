//! Agent Controller
//!
//! One state machine per agent, advanced once per tick in agent id order.
//! Movement is stepped first so each state handler sees this tick's move
//! outcome.
//!
//! The handlers are split by concern:
//! - `needs`: idle decisions, need-station walks and direct use
//! - `hauling`: fetching job requirements into hand
//! - `working`: station reservation, step timers, transforms and completion
//! - `cleanup`: dropping and releasing everything an agent holds

mod cleanup;
mod hauling;
mod needs;
mod working;

pub use cleanup::stand_down;

use bevy_ecs::prelude::*;
use colony_events::EventKind;
use rand::rngs::SmallRng;

use super::clock::{SimClock, TimeDeltas};
use crate::components::{
    AgentId, Controller, ControllerState, JobId, Motives, WaitReason, WalkGoal, WorldObjects,
};
use crate::config::SimConfig;
use crate::events::TickEvents;
use crate::jobs::{JobBoard, RecipeBook};
use crate::nav::{BodyIndex, MoveStatus, Mover, NavGrid};
use crate::SimRng;

/// Shared world state every handler works against.
pub(crate) struct Ctx<'a> {
    pub objects: &'a mut WorldObjects,
    pub board: &'a mut JobBoard,
    pub events: &'a mut TickEvents,
    pub rng: &'a mut SmallRng,
    pub grid: &'a NavGrid,
    pub recipes: &'a RecipeBook,
    pub config: &'a SimConfig,
    pub tick: u64,
    pub deltas: TimeDeltas,
}

/// The components of the agent being updated.
pub(crate) struct AgentMut<'a> {
    pub id: AgentId,
    pub motives: &'a mut Motives,
    pub controller: &'a mut Controller,
    pub mover: &'a mut Mover,
}

impl Ctx<'_> {
    /// Drops everything and hands the job back to the board, keeping its
    /// progress.
    pub fn abandon_job(&mut self, agent: &mut AgentMut, reason: &str) {
        if let Some(job) = stand_down(agent.id, agent.controller, agent.mover, self.objects) {
            tracing::warn!(agent = %agent.id, job = %job, reason, "job abandoned");
            self.board.abandon(job, self.objects, reason);
        }
    }

    /// Drops everything and fails the job.
    pub fn fail_job(&mut self, agent: &mut AgentMut, reason: &str) {
        if let Some(job) = stand_down(agent.id, agent.controller, agent.mover, self.objects) {
            self.board.fail(job, reason, self.objects);
        }
    }
}

/// System: moves and updates every agent.
#[allow(clippy::too_many_arguments)]
pub fn run_controllers(
    mut objects: ResMut<WorldObjects>,
    mut board: ResMut<JobBoard>,
    mut events: ResMut<TickEvents>,
    mut rng: ResMut<SimRng>,
    mut bodies: ResMut<BodyIndex>,
    grid: Res<NavGrid>,
    recipes: Res<RecipeBook>,
    config: Res<SimConfig>,
    clock: Res<SimClock>,
    mut query: Query<(Entity, &AgentId, &mut Motives, &mut Controller, &mut Mover)>,
) {
    let mut order: Vec<(AgentId, Entity)> = query.iter().map(|(e, id, ..)| (*id, e)).collect();
    order.sort();

    let mut ctx = Ctx {
        objects: &mut objects,
        board: &mut board,
        events: &mut events,
        rng: &mut rng.0,
        grid: &grid,
        recipes: &recipes,
        config: &config,
        tick: clock.tick(),
        deltas: clock.deltas(),
    };

    for (_, entity) in order {
        let Ok((_, id, mut motives, mut controller, mut mover)) = query.get_mut(entity) else {
            continue;
        };
        let id = *id;

        let before = mover.status();
        let status = mover.step(id, ctx.grid, &bodies, ctx.deltas.real_seconds, &ctx.config.movement);
        if status == MoveStatus::Abandoned && before != MoveStatus::Abandoned {
            ctx.events.push(EventKind::PathAbandoned {
                agent: id.raw(),
                reason: "stuck".to_string(),
            });
        }
        bodies.update(id, mover.position, mover.radius);

        let from = controller.state.name();
        let mut agent = AgentMut {
            id,
            motives: &mut motives,
            controller: &mut controller,
            mover: &mut mover,
        };
        update_agent(&mut ctx, &mut agent);

        let to = agent.controller.state.name();
        if from != to {
            tracing::debug!(agent = %id, from, to, sub = agent.controller.state.sub_state(), "state changed");
            ctx.events.push(EventKind::AgentStateChanged {
                agent: id.raw(),
                from: from.to_string(),
                to: to.to_string(),
            });
        }
    }
}

/// Runs one decision step for an agent.
pub(crate) fn update_agent(ctx: &mut Ctx, agent: &mut AgentMut) {
    let (critical, depleted) = agent.controller.take_signals();

    if let Some(kind) = depleted {
        let busy = !matches!(agent.controller.state, ControllerState::Idle);
        if busy && !agent.controller.state.is_using_object() {
            tracing::debug!(agent = %agent.id, motive = %kind, "standing down for depleted motive");
            ctx.abandon_job(agent, "motive depleted");
        }
    }

    if critical {
        match agent.controller.state {
            ControllerState::Walking(WalkGoal::Wander)
            | ControllerState::Waiting(WaitReason::StartDelay { .. }) => {
                agent.mover.stop();
                agent.controller.state = ControllerState::Idle;
            }
            ControllerState::Waiting(WaitReason::ForStation { .. }) => {
                ctx.abandon_job(agent, "motive critical");
            }
            _ => {}
        }
    }

    if let Some(job) = agent.controller.job {
        let held = ctx.board.get(job).is_some_and(|j| j.is_held_by(agent.id));
        if !held {
            tracing::debug!(agent = %agent.id, job = %job, "lost hold on job");
            stand_down(agent.id, agent.controller, agent.mover, ctx.objects);
        }
    }

    let state = agent.controller.state.clone();
    match state {
        ControllerState::Idle => {
            if let Some(job) = agent.controller.job {
                abandon_orphan(ctx, agent, job);
            }
            needs::decide(ctx, agent);
        }
        ControllerState::Walking(WalkGoal::Wander) => {
            if agent.mover.status() != MoveStatus::Moving {
                let wake_tick = ctx.tick + ctx.config.agents.wander_pause_ticks;
                agent.controller.state = ControllerState::Waiting(WaitReason::StartDelay { wake_tick });
            }
        }
        ControllerState::Walking(WalkGoal::Need { station, motive }) => {
            needs::walk_to_need(ctx, agent, station, motive);
        }
        ControllerState::Waiting(WaitReason::StartDelay { wake_tick }) => {
            if ctx.tick >= wake_tick {
                agent.controller.state = ControllerState::Idle;
            }
        }
        ControllerState::Waiting(WaitReason::UsingObject { station, motive }) => {
            needs::use_object(ctx, agent, station, motive);
        }
        ControllerState::Waiting(WaitReason::ForStation { tag, waited }) => {
            with_job(ctx, agent, |ctx, agent, job| {
                working::wait_for_station(ctx, agent, job, &tag, waited)
            });
        }
        ControllerState::Hauling(task) => {
            with_job(ctx, agent, |ctx, agent, job| hauling::update(ctx, agent, job, task));
        }
        ControllerState::Working(phase) => {
            with_job(ctx, agent, |ctx, agent, job| working::update(ctx, agent, job, phase));
        }
    }
}

/// Runs a job handler, or stands the agent down when it holds no job.
fn with_job(ctx: &mut Ctx, agent: &mut AgentMut, f: impl FnOnce(&mut Ctx, &mut AgentMut, JobId)) {
    match agent.controller.job {
        Some(job) => f(ctx, agent, job),
        None => {
            stand_down(agent.id, agent.controller, agent.mover, ctx.objects);
        }
    }
}

fn abandon_orphan(ctx: &mut Ctx, agent: &mut AgentMut, job: JobId) {
    agent.controller.job = None;
    if ctx.board.get(job).is_some_and(|j| j.is_held_by(agent.id)) {
        ctx.board.abandon(job, ctx.objects, "holder went idle");
    }
}

/// Claims a job and starts hauling for it.
pub(crate) fn claim_job(ctx: &mut Ctx, agent: &mut AgentMut, job: JobId) -> bool {
    let reserve = ctx.config.agents.reserve_inputs_on_claim;
    if !ctx.board.claim(job, agent.id, ctx.objects, reserve) {
        return false;
    }
    agent.controller.job = Some(job);
    agent.controller.last_station = None;
    agent.controller.state = ControllerState::Hauling(Default::default());
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{ItemState, MotiveKind, Placement, StationSpec};
    use crate::jobs::{Recipe, RecipeInput, RecipeStep};
    use bevy_math::Vec2;
    use rand::SeedableRng;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    struct Fixture {
        objects: WorldObjects,
        board: JobBoard,
        events: TickEvents,
        rng: SmallRng,
        grid: NavGrid,
        recipes: RecipeBook,
        config: SimConfig,
    }

    struct TestAgent {
        id: AgentId,
        motives: Motives,
        controller: Controller,
        mover: Mover,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                objects: WorldObjects::new(),
                board: JobBoard::new(),
                events: TickEvents::new(),
                rng: SmallRng::seed_from_u64(7),
                grid: NavGrid::walled(12, 8),
                recipes: RecipeBook::new(),
                config: SimConfig::default(),
            }
        }

        fn update(&mut self, agent: &mut TestAgent, tick: u64) {
            let mut ctx = Ctx {
                objects: &mut self.objects,
                board: &mut self.board,
                events: &mut self.events,
                rng: &mut self.rng,
                grid: &self.grid,
                recipes: &self.recipes,
                config: &self.config,
                tick,
                deltas: TimeDeltas {
                    real_seconds: 0.1,
                    game_minutes: 0.1,
                },
            };
            let mut view = AgentMut {
                id: agent.id,
                motives: &mut agent.motives,
                controller: &mut agent.controller,
                mover: &mut agent.mover,
            };
            update_agent(&mut ctx, &mut view);
        }
    }

    fn idle_body(id: u64, position: Vec2) -> TestAgent {
        let mut controller = Controller::new(0);
        controller.state = ControllerState::Idle;
        TestAgent {
            id: AgentId(id),
            motives: Motives::default(),
            controller,
            mover: Mover::new(position, 0.3),
        }
    }

    fn bed_spec() -> StationSpec {
        StationSpec {
            name: "bed".to_string(),
            tag: "bed".to_string(),
            position: [9.5, 4.5],
            footprint: None,
            input_slots: 0,
            output_slots: 0,
            advertisements: BTreeMap::from([(MotiveKind::Energy, 5.0)]),
        }
    }

    fn scrub_recipe() -> Recipe {
        Recipe {
            name: "scrub".to_string(),
            inputs: vec![RecipeInput {
                tag: "soap".to_string(),
                quantity: 1,
                consumed: false,
            }],
            tools: Vec::new(),
            steps: vec![RecipeStep {
                station_tag: String::new(),
                action: "scrub".to_string(),
                duration: 0.2,
                animation: String::new(),
                input_transform: BTreeMap::new(),
            }],
            outputs: Vec::new(),
            motive_effects: BTreeMap::new(),
        }
    }

    #[test]
    fn test_only_first_agent_gets_the_bed() {
        let mut fx = Fixture::new();
        let bed = fx.objects.spawn_station(&bed_spec());

        let mut first = idle_body(1, Vec2::new(2.5, 2.5));
        let mut second = idle_body(2, Vec2::new(2.5, 5.5));
        first.motives.set(MotiveKind::Energy, -60.0);
        second.motives.set(MotiveKind::Energy, -60.0);

        fx.update(&mut first, 1);
        fx.update(&mut second, 1);

        assert_eq!(
            first.controller.state,
            ControllerState::Walking(WalkGoal::Need {
                station: bed,
                motive: MotiveKind::Energy
            })
        );
        assert!(!matches!(
            second.controller.state,
            ControllerState::Walking(WalkGoal::Need { .. })
        ));
        assert_eq!(fx.objects.station(bed).unwrap().reserved_by(), Some(AgentId(1)));
    }

    #[test]
    fn test_idle_agent_claims_highest_priority_job() {
        let mut fx = Fixture::new();
        fx.objects
            .spawn_item("soap", ItemState::Raw, Placement::Ground(Vec2::new(6.5, 3.5)));
        let recipe = Arc::new(scrub_recipe());
        let low = fx.board.post(recipe.clone(), 1);
        let high = fx.board.post(recipe, 5);

        let mut agent = idle_body(1, Vec2::new(2.5, 2.5));
        fx.update(&mut agent, 1);
        assert_eq!(agent.controller.job, Some(high));
        assert!(matches!(agent.controller.state, ControllerState::Hauling(_)));
        assert!(fx.board.get(low).unwrap().claimed_by().is_none());

        // Next decision picks a source and starts walking
        fx.update(&mut agent, 2);
        match &agent.controller.state {
            ControllerState::Hauling(task) => assert!(task.target.is_some()),
            other => panic!("expected hauling, got {:?}", other),
        }
        assert_eq!(agent.mover.status(), MoveStatus::Moving);
    }

    #[test]
    fn test_hauling_without_source_releases_job() {
        let mut fx = Fixture::new();
        let job = fx.board.post(Arc::new(scrub_recipe()), 1);
        let mut agent = idle_body(1, Vec2::new(2.5, 2.5));
        assert!(fx.board.claim(job, agent.id, &mut fx.objects, true));
        agent.controller.job = Some(job);
        agent.controller.state = ControllerState::Hauling(Default::default());

        fx.update(&mut agent, 1);
        assert_eq!(agent.controller.state, ControllerState::Idle);
        assert_eq!(agent.controller.job, None);
        let job = fx.board.get(job).unwrap();
        assert_eq!(job.state(), crate::jobs::JobState::Posted);
        assert!(job.claimed_by().is_none());
    }

    #[test]
    fn test_critical_crossing_cuts_wander_short() {
        let mut fx = Fixture::new();
        let bed = fx.objects.spawn_station(&bed_spec());
        let mut agent = idle_body(1, Vec2::new(2.5, 2.5));
        assert!(agent.mover.set_destination(Vec2::new(2.5, 6.5), &fx.grid));
        agent.controller.state = ControllerState::Walking(WalkGoal::Wander);
        agent.motives.set(MotiveKind::Energy, -55.0);
        agent.controller.note_critical();

        // Goes idle, then decides again within the same update
        fx.update(&mut agent, 1);
        assert_eq!(
            agent.controller.state,
            ControllerState::Walking(WalkGoal::Need {
                station: bed,
                motive: MotiveKind::Energy
            })
        );
    }
}
