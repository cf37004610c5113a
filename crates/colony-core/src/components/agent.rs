//! Agent Components
//!
//! Components for individual agents: name, controller state, and the bundle
//! that spawns a complete agent.

use bevy_ecs::prelude::*;
use bevy_math::Vec2;
use serde::{Deserialize, Serialize};

use super::ids::{AgentId, ItemId, JobId, StationId};
use super::motive::{MotiveKind, Motives};
use crate::nav::Mover;

/// Human-readable name for an agent
#[derive(Component, Debug, Clone, Serialize, Deserialize)]
pub struct AgentName(pub String);

/// Why an agent is walking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WalkGoal {
    /// Aimless stroll to a random cell
    Wander,
    /// Heading to a station to use it directly
    Need { station: StationId, motive: MotiveKind },
}

/// Why an agent is standing still.
#[derive(Debug, Clone, PartialEq)]
pub enum WaitReason {
    /// Scheduled pause; no decisions until `wake_tick`
    StartDelay { wake_tick: u64 },
    /// Directly using a need station
    UsingObject { station: StationId, motive: MotiveKind },
    /// Every station of `tag` is reserved; `waited` counts seconds
    ForStation { tag: String, waited: f32 },
}

/// The item a hauling agent is walking to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HaulTarget {
    pub item: ItemId,
    pub position: Vec2,
}

/// Progress of gathering a job's items.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HaulTask {
    pub target: Option<HaulTarget>,
    /// Sources that failed this haul
    pub tried: Vec<ItemId>,
}

/// Progress through the current recipe step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WorkPhase {
    FindStation,
    Approach { station: StationId },
    Work { station: Option<StationId>, elapsed: f32 },
}

/// Top-level controller state.
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerState {
    Idle,
    Walking(WalkGoal),
    Waiting(WaitReason),
    Hauling(HaulTask),
    Working(WorkPhase),
}

impl ControllerState {
    pub fn name(&self) -> &'static str {
        match self {
            ControllerState::Idle => "idle",
            ControllerState::Walking(_) => "walking",
            ControllerState::Waiting(_) => "waiting",
            ControllerState::Hauling(_) => "hauling",
            ControllerState::Working(_) => "working",
        }
    }

    pub fn sub_state(&self) -> &'static str {
        match self {
            ControllerState::Idle => "",
            ControllerState::Walking(WalkGoal::Wander) => "wander",
            ControllerState::Walking(WalkGoal::Need { .. }) => "need_target",
            ControllerState::Waiting(WaitReason::StartDelay { .. }) => "start_delay",
            ControllerState::Waiting(WaitReason::UsingObject { .. }) => "using_object",
            ControllerState::Waiting(WaitReason::ForStation { .. }) => "waiting_for_station",
            ControllerState::Hauling(task) if task.target.is_some() => "fetching",
            ControllerState::Hauling(_) => "gathering",
            ControllerState::Working(WorkPhase::FindStation) => "find_station",
            ControllerState::Working(WorkPhase::Approach { .. }) => "approach_station",
            ControllerState::Working(WorkPhase::Work { .. }) => "work",
        }
    }

    pub fn is_using_object(&self) -> bool {
        matches!(self, ControllerState::Waiting(WaitReason::UsingObject { .. }))
    }
}

/// Component: per-agent decision state.
#[derive(Component, Debug, Clone)]
pub struct Controller {
    pub state: ControllerState,
    /// The job this agent holds, if any
    pub job: Option<JobId>,
    /// Station that hosted the most recent job step
    pub last_station: Option<StationId>,
    critical_crossed: bool,
    depleted: Option<MotiveKind>,
}

impl Controller {
    /// A controller that makes its first decision at `wake_tick`.
    pub fn new(wake_tick: u64) -> Self {
        Self {
            state: ControllerState::Waiting(WaitReason::StartDelay { wake_tick }),
            job: None,
            last_station: None,
            critical_crossed: false,
            depleted: None,
        }
    }

    pub fn note_critical(&mut self) {
        self.critical_crossed = true;
    }

    pub fn note_depleted(&mut self, kind: MotiveKind) {
        self.depleted.get_or_insert(kind);
    }

    /// Returns and clears the threshold crossings seen since the last call.
    pub fn take_signals(&mut self) -> (bool, Option<MotiveKind>) {
        let signals = (self.critical_crossed, self.depleted);
        self.critical_crossed = false;
        self.depleted = None;
        signals
    }
}

/// Everything a freshly spawned agent needs.
#[derive(Bundle)]
pub struct AgentBundle {
    pub id: AgentId,
    pub name: AgentName,
    pub motives: Motives,
    pub controller: Controller,
    pub mover: Mover,
}

impl AgentBundle {
    pub fn new(id: AgentId, name: impl Into<String>, motives: Motives, position: Vec2, radius: f32, wake_tick: u64) -> Self {
        Self {
            id,
            name: AgentName(name.into()),
            motives,
            controller: Controller::new(wake_tick),
            mover: Mover::new(position, radius),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_controller_waits_for_start() {
        let controller = Controller::new(7);
        assert_eq!(controller.state.name(), "waiting");
        assert_eq!(controller.state.sub_state(), "start_delay");
        assert_eq!(
            controller.state,
            ControllerState::Waiting(WaitReason::StartDelay { wake_tick: 7 })
        );
    }

    #[test]
    fn test_signals_are_taken_once() {
        let mut controller = Controller::new(0);
        controller.note_critical();
        controller.note_depleted(MotiveKind::Energy);
        controller.note_depleted(MotiveKind::Fun);
        assert_eq!(controller.take_signals(), (true, Some(MotiveKind::Energy)));
        assert_eq!(controller.take_signals(), (false, None));
    }

    #[test]
    fn test_spawn_bundle() {
        let mut world = World::new();
        let entity = world
            .spawn(AgentBundle::new(
                AgentId(1),
                "Ada",
                Motives::default(),
                Vec2::new(2.5, 2.5),
                0.3,
                0,
            ))
            .id();
        let name = world.get::<AgentName>(entity).unwrap();
        assert_eq!(name.0, "Ada");
        assert_eq!(world.get::<Mover>(entity).unwrap().position, Vec2::new(2.5, 2.5));
    }
}
