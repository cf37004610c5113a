//! Snapshot Generation
//!
//! Read-only views of agents, jobs, items, stations and containers, and the
//! whole-world snapshot written at regular intervals.

use bevy_ecs::prelude::*;
use colony_events::{
    AgentSnapshot, ContainerSnapshot, EntityKind, ItemSnapshot, JobProgress, JobSnapshot,
    StationSnapshot, WorldSnapshot,
};
use std::fs;
use std::path::Path;

use crate::components::{
    AgentId, AgentName, Container, Controller, Item, Motives, SlotKind, Station, WorldObjects,
};
use crate::jobs::{Job, JobBoard};
use crate::nav::Mover;
use crate::systems::SimClock;

/// Resource to track snapshot generation
#[derive(Resource, Debug)]
pub struct SnapshotGenerator {
    next_snapshot_id: u64,
    snapshot_interval: u64,
}

impl SnapshotGenerator {
    pub fn new(snapshot_interval: u64) -> Self {
        Self {
            next_snapshot_id: 1,
            snapshot_interval,
        }
    }

    /// An interval of zero disables periodic snapshots.
    pub fn should_snapshot(&self, tick: u64) -> bool {
        self.snapshot_interval > 0 && tick > 0 && tick % self.snapshot_interval == 0
    }

    pub fn next_id(&mut self) -> String {
        let id = colony_events::generate_snapshot_id(self.next_snapshot_id);
        self.next_snapshot_id += 1;
        id
    }

    pub fn snapshot_count(&self) -> u64 {
        self.next_snapshot_id - 1
    }
}

fn progress(job: &Job) -> JobProgress {
    JobProgress {
        job_id: job.id.raw(),
        recipe: job.recipe.name.clone(),
        step_index: job.step_index(),
        step_count: job.recipe.step_count(),
        state: job.state().as_str().to_string(),
    }
}

pub fn job_snapshot(job: &Job) -> JobSnapshot {
    JobSnapshot {
        kind: EntityKind::Job,
        progress: progress(job),
        priority: job.priority,
        claimed_by: job.claimed_by().map(AgentId::raw),
        target_station: job.target_station().map(|s| s.raw()),
        gathered_items: job.gathered_items().iter().map(|i| i.raw()).collect(),
        failure_reason: job.failure_reason().map(str::to_string),
    }
}

pub fn item_snapshot(item: &Item) -> ItemSnapshot {
    ItemSnapshot {
        kind: EntityKind::Item,
        item_id: item.id.raw(),
        tag: item.tag.clone(),
        state: item.state.as_str().to_string(),
        location: item.location.describe(),
        reserved_by: item.reserved_by().map(AgentId::raw),
    }
}

pub fn station_snapshot(station: &Station) -> StationSnapshot {
    let slots = |kind: SlotKind| -> Vec<Option<u64>> {
        station
            .slots(kind)
            .iter()
            .map(|slot| slot.map(|id| id.raw()))
            .collect()
    };
    StationSnapshot {
        kind: EntityKind::Station,
        station_id: station.id.raw(),
        name: station.name.clone(),
        tag: station.tag.clone(),
        position: station.position.to_array(),
        reserved_by: station.reserved_by().map(AgentId::raw),
        input_slots: slots(SlotKind::Input),
        output_slots: slots(SlotKind::Output),
        advertisements: station
            .advertisements
            .iter()
            .map(|(kind, rate)| (kind.to_string(), *rate))
            .collect(),
    }
}

pub fn container_snapshot(container: &Container) -> ContainerSnapshot {
    ContainerSnapshot {
        kind: EntityKind::Container,
        container_id: container.id.raw(),
        name: container.name.clone(),
        position: container.position.to_array(),
        capacity: container.capacity,
        items: container.items().iter().map(|i| i.raw()).collect(),
        reserved_by: container.reserved_by().map(AgentId::raw),
    }
}

fn agent_view(
    id: AgentId,
    name: &AgentName,
    motives: &Motives,
    controller: &Controller,
    mover: &Mover,
    objects: &WorldObjects,
    board: &JobBoard,
) -> AgentSnapshot {
    AgentSnapshot {
        kind: EntityKind::Agent,
        agent_id: id.raw(),
        name: name.0.clone(),
        state: controller.state.name().to_string(),
        sub_state: controller.state.sub_state().to_string(),
        position: mover.position.to_array(),
        collision_radius: mover.radius,
        motives: motives
            .iter()
            .map(|(kind, value)| (kind.to_string(), value))
            .collect(),
        held_items: objects.held_by(id).into_iter().map(|i| i.raw()).collect(),
        job: controller.job.and_then(|j| board.get(j)).map(progress),
    }
}

/// Snapshots every agent, in id order.
pub fn agent_snapshots(world: &mut World) -> Vec<AgentSnapshot> {
    let mut query = world.query::<(&AgentId, &AgentName, &Motives, &Controller, &Mover)>();
    let objects = world.resource::<WorldObjects>();
    let board = world.resource::<JobBoard>();
    let mut agents: Vec<AgentSnapshot> = query
        .iter(world)
        .map(|(id, name, motives, controller, mover)| {
            agent_view(*id, name, motives, controller, mover, objects, board)
        })
        .collect();
    agents.sort_by_key(|a| a.agent_id);
    agents
}

/// Generate a complete world snapshot
pub fn generate_snapshot(world: &mut World, snapshot_id: &str) -> WorldSnapshot {
    let agents = agent_snapshots(world);
    let timestamp = world.resource::<SimClock>().timestamp();
    let objects = world.resource::<WorldObjects>();
    let board = world.resource::<JobBoard>();

    WorldSnapshot {
        snapshot_id: snapshot_id.to_string(),
        timestamp,
        agents,
        jobs: board.jobs().map(job_snapshot).collect(),
        items: objects.items().map(item_snapshot).collect(),
        stations: objects.stations().map(station_snapshot).collect(),
        containers: objects.containers().map(container_snapshot).collect(),
    }
}

/// Write snapshot to file
pub fn write_snapshot(snapshot: &WorldSnapshot, path: impl AsRef<Path>) -> std::io::Result<()> {
    let json = serde_json::to_string_pretty(snapshot)?;
    fs::write(path, json)?;
    Ok(())
}
