//! Commands
//!
//! External mutations of the running simulation: spawning and removing
//! entities, setting motives, posting and interrupting jobs, editing walls.
//! Commands queued on [`PendingCommands`] or dropped as JSON files into the
//! command directory are applied at the start of a tick by the same executor
//! that backs `Simulation::execute`.

use bevy_ecs::prelude::*;
use bevy_math::{IVec2, Vec2};
use colony_events::EventKind;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::components::{
    to_vec2, AgentBundle, AgentId, ContainerId, ContainerSpec, Controller, IdAllocator, ItemId,
    ItemState, JobId, MotiveKind, Motives, Placement, SlotKind, StationId, StationSpec,
    WorldObjects,
};
use crate::config::SimConfig;
use crate::error::{SimError, SimResult};
use crate::events::TickEvents;
use crate::jobs::{JobBoard, JobState, RecipeBook};
use crate::nav::{BodyIndex, Mover, NavGrid};
use crate::systems::{publish_motive_signals, stand_down, SimClock};
use crate::SimRng;

/// Where a spawned item goes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemPlacement {
    Ground { position: [f32; 2] },
    Container { container: ContainerId },
    Slot { station: StationId, slot: SlotKind },
}

impl ItemPlacement {
    fn resolve(self) -> Placement {
        match self {
            ItemPlacement::Ground { position } => Placement::Ground(to_vec2(position)),
            ItemPlacement::Container { container } => Placement::Container(container),
            ItemPlacement::Slot { station, slot } => Placement::Slot {
                station,
                kind: slot,
            },
        }
    }
}

/// A single mutation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    SpawnItem {
        tag: String,
        /// Inferred from the tag when absent
        #[serde(default, skip_serializing_if = "Option::is_none")]
        state: Option<ItemState>,
        placement: ItemPlacement,
    },
    RemoveItem {
        item: ItemId,
    },
    SpawnStation {
        #[serde(flatten)]
        spec: StationSpec,
    },
    RemoveStation {
        station: StationId,
    },
    SpawnContainer {
        #[serde(flatten)]
        spec: ContainerSpec,
    },
    RemoveContainer {
        container: ContainerId,
    },
    SpawnAgent {
        name: String,
        position: [f32; 2],
        /// Starting values; unspecified motives start full
        #[serde(default)]
        motives: BTreeMap<MotiveKind, f32>,
    },
    RemoveAgent {
        agent: AgentId,
    },
    SetMotive {
        agent: AgentId,
        motive: MotiveKind,
        value: f32,
    },
    PostJob {
        recipe: String,
        #[serde(default)]
        priority: i32,
    },
    InterruptJob {
        job: JobId,
    },
    AddWall {
        x: i32,
        y: i32,
    },
    RemoveWall {
        x: i32,
        y: i32,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::SpawnItem { .. } => "spawn_item",
            Command::RemoveItem { .. } => "remove_item",
            Command::SpawnStation { .. } => "spawn_station",
            Command::RemoveStation { .. } => "remove_station",
            Command::SpawnContainer { .. } => "spawn_container",
            Command::RemoveContainer { .. } => "remove_container",
            Command::SpawnAgent { .. } => "spawn_agent",
            Command::RemoveAgent { .. } => "remove_agent",
            Command::SetMotive { .. } => "set_motive",
            Command::PostJob { .. } => "post_job",
            Command::InterruptJob { .. } => "interrupt_job",
            Command::AddWall { .. } => "add_wall",
            Command::RemoveWall { .. } => "remove_wall",
        }
    }
}

/// What a successful command produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CommandOutcome {
    Applied,
    Item(ItemId),
    Station(StationId),
    Container(ContainerId),
    Agent(AgentId),
    Job(JobId),
}

/// A command file as dropped into the command directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandFile {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub command: Command,
}

/// A command waiting for the next tick, with the file it came from.
#[derive(Debug, Clone)]
pub struct QueuedCommand {
    pub label: String,
    pub source: Option<PathBuf>,
    pub command: Command,
}

/// Resource: commands to apply at the start of the next tick.
#[derive(Resource, Debug, Default)]
pub struct PendingCommands {
    queue: Vec<QueuedCommand>,
}

impl PendingCommands {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: Command) {
        self.queue.push(QueuedCommand {
            label: command.name().to_string(),
            source: None,
            command,
        });
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

/// Resource: optional directory scanned for command files each tick.
#[derive(Resource, Debug, Default, Clone)]
pub struct CommandDir(pub Option<PathBuf>);

/// Outcome of one applied command.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandRecord {
    pub label: String,
    pub result: SimResult<CommandOutcome>,
}

/// Resource: results of commands applied by the tick pipeline.
#[derive(Resource, Debug, Default)]
pub struct CommandResults {
    pub records: Vec<CommandRecord>,
}

/// Loads every `*.json` command file in `dir`, in file name order.
/// Malformed files are set aside as `*.rejected` with a warning.
pub fn scan_command_files(dir: &Path) -> Vec<QueuedCommand> {
    if !dir.exists() {
        if let Err(e) = fs::create_dir_all(dir) {
            tracing::warn!(dir = %dir.display(), error = %e, "could not create command directory");
        }
        return Vec::new();
    }
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut paths: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("json"))
        .collect();
    paths.sort();

    let mut queued = Vec::new();
    for path in paths {
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %e, "could not read command file");
                continue;
            }
        };
        match serde_json::from_str::<CommandFile>(&content) {
            Ok(file) => queued.push(QueuedCommand {
                label: file.id,
                source: Some(path),
                command: file.command,
            }),
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %e, "could not parse command file");
                set_aside(&path);
            }
        }
    }
    queued
}

/// Renames a command file to `*.rejected` so later scans skip it.
fn set_aside(path: &Path) {
    if let Err(e) = fs::rename(path, path.with_extension("rejected")) {
        tracing::warn!(file = %path.display(), error = %e, "could not set aside command file");
    }
}

/// System: applies queued commands and command files.
pub fn apply_commands(world: &mut World) {
    let dir = world.get_resource::<CommandDir>().and_then(|d| d.0.clone());
    let mut queued = world
        .get_resource_mut::<PendingCommands>()
        .map(|mut p| std::mem::take(&mut p.queue))
        .unwrap_or_default();
    if let Some(dir) = dir {
        queued.extend(scan_command_files(&dir));
    }

    for entry in queued {
        let result = execute(world, &entry.command);
        match &result {
            Ok(outcome) => {
                tracing::info!(command = %entry.label, ?outcome, "command applied");
                if let Some(path) = &entry.source {
                    if let Err(e) = fs::remove_file(path) {
                        tracing::warn!(file = %path.display(), error = %e, "could not delete command file");
                    }
                }
            }
            Err(e) => {
                tracing::warn!(command = %entry.label, error = %e, "command rejected");
                if let Some(path) = &entry.source {
                    set_aside(path);
                }
            }
        }
        if let Some(mut results) = world.get_resource_mut::<CommandResults>() {
            results.records.push(CommandRecord {
                label: entry.label,
                result,
            });
        }
    }
}

/// Applies one command to the world.
pub fn execute(world: &mut World, command: &Command) -> SimResult<CommandOutcome> {
    match command {
        Command::SpawnItem {
            tag,
            state,
            placement,
        } => spawn_item(world, tag, *state, *placement),
        Command::RemoveItem { item } => {
            let removed = world
                .resource_mut::<WorldObjects>()
                .remove_item(*item)
                .ok_or(SimError::UnknownItem(*item))?;
            push_event(world, EventKind::ItemRemoved {
                item: item.raw(),
                tag: removed.tag,
            });
            Ok(CommandOutcome::Applied)
        }
        Command::SpawnStation { spec } => {
            let id = world.resource_mut::<WorldObjects>().spawn_station(spec);
            push_event(world, EventKind::EntitySpawned {
                kind: "station".to_string(),
                id: id.raw(),
            });
            Ok(CommandOutcome::Station(id))
        }
        Command::RemoveStation { station } => {
            world
                .resource_mut::<WorldObjects>()
                .remove_station(*station)
                .ok_or(SimError::UnknownStation(*station))?;
            push_event(world, EventKind::EntityRemoved {
                kind: "station".to_string(),
                id: station.raw(),
            });
            Ok(CommandOutcome::Applied)
        }
        Command::SpawnContainer { spec } => {
            let id = world.resource_mut::<WorldObjects>().spawn_container(spec);
            push_event(world, EventKind::EntitySpawned {
                kind: "container".to_string(),
                id: id.raw(),
            });
            Ok(CommandOutcome::Container(id))
        }
        Command::RemoveContainer { container } => {
            world
                .resource_mut::<WorldObjects>()
                .remove_container(*container)
                .ok_or(SimError::UnknownContainer(*container))?;
            push_event(world, EventKind::EntityRemoved {
                kind: "container".to_string(),
                id: container.raw(),
            });
            Ok(CommandOutcome::Applied)
        }
        Command::SpawnAgent {
            name,
            position,
            motives,
        } => Ok(CommandOutcome::Agent(spawn_agent(world, name, to_vec2(*position), motives))),
        Command::RemoveAgent { agent } => remove_agent(world, *agent),
        Command::SetMotive {
            agent,
            motive,
            value,
        } => set_motive(world, *agent, *motive, *value),
        Command::PostJob { recipe, priority } => {
            let recipe = world
                .resource::<RecipeBook>()
                .get(recipe)
                .ok_or_else(|| SimError::UnknownRecipe(recipe.clone()))?;
            let id = world.resource_mut::<JobBoard>().post(recipe, *priority);
            Ok(CommandOutcome::Job(id))
        }
        Command::InterruptJob { job } => interrupt_job(world, *job),
        Command::AddWall { x, y } => set_wall(world, IVec2::new(*x, *y), true),
        Command::RemoveWall { x, y } => set_wall(world, IVec2::new(*x, *y), false),
    }
}

fn push_event(world: &mut World, event: EventKind) {
    world.resource_mut::<TickEvents>().push(event);
}

fn find_agent(world: &mut World, agent: AgentId) -> SimResult<Entity> {
    let mut query = world.query::<(Entity, &AgentId)>();
    query
        .iter(world)
        .find(|(_, id)| **id == agent)
        .map(|(entity, _)| entity)
        .ok_or(SimError::UnknownAgent(agent))
}

fn spawn_item(
    world: &mut World,
    tag: &str,
    state: Option<ItemState>,
    placement: ItemPlacement,
) -> SimResult<CommandOutcome> {
    let placement = placement.resolve();
    {
        let objects = world.resource::<WorldObjects>();
        match placement {
            Placement::Container(c) if objects.container(c).is_none() => {
                return Err(SimError::UnknownContainer(c));
            }
            Placement::Slot { station, .. } if objects.station(station).is_none() => {
                return Err(SimError::UnknownStation(station));
            }
            _ => {}
        }
    }

    let state = state
        .or_else(|| ItemState::infer_from_tag(tag))
        .unwrap_or_default();
    let id = world
        .resource_mut::<WorldObjects>()
        .spawn_item(tag, state, placement)
        .ok_or_else(|| SimError::PlacementRejected(format!("no room for {}", tag)))?;
    push_event(world, EventKind::ItemSpawned {
        item: id.raw(),
        tag: tag.to_string(),
    });
    Ok(CommandOutcome::Item(id))
}

/// Spawns an agent. Its first decision is delayed by a random number of
/// ticks up to the configured jitter.
pub fn spawn_agent(
    world: &mut World,
    name: &str,
    position: Vec2,
    initial: &BTreeMap<MotiveKind, f32>,
) -> AgentId {
    let (mut motives, radius, jitter) = {
        let config = world.resource::<SimConfig>();
        (
            Motives::with_rates(&config.motives.decay_rates, config.motives.default_rate),
            config.movement.radius,
            config.agents.start_jitter_ticks,
        )
    };
    for (kind, value) in initial {
        motives.set(*kind, *value);
    }

    let offset = world.resource_mut::<SimRng>().0.gen_range(0..=jitter);
    let wake_tick = world.resource::<SimClock>().tick() + offset;
    let id = world.resource_mut::<IdAllocator>().next_agent();

    world.spawn(AgentBundle::new(id, name, motives, position, radius, wake_tick));
    world.resource_mut::<BodyIndex>().update(id, position, radius);
    tracing::info!(agent = %id, name, wake_tick, "agent spawned");
    push_event(world, EventKind::EntitySpawned {
        kind: "agent".to_string(),
        id: id.raw(),
    });
    id
}

/// Stands an agent down and returns the job it held.
fn stand_down_agent(world: &mut World, entity: Entity, agent: AgentId) -> Option<JobId> {
    world.resource_scope(|world, mut objects: Mut<WorldObjects>| {
        let mut query = world.query::<(&mut Controller, &mut Mover)>();
        let (mut controller, mut mover) = query.get_mut(world, entity).ok()?;
        stand_down(agent, &mut controller, &mut mover, &mut objects)
    })
}

fn remove_agent(world: &mut World, agent: AgentId) -> SimResult<CommandOutcome> {
    let entity = find_agent(world, agent)?;
    let job = stand_down_agent(world, entity, agent);

    world.resource_scope(|world, mut board: Mut<JobBoard>| {
        let mut objects = world.resource_mut::<WorldObjects>();
        if let Some(job) = job {
            board.abandon(job, &mut objects, "agent removed");
        }
        objects.release_all_for(agent);
    });
    world.despawn(entity);
    world.resource_mut::<BodyIndex>().remove(agent);

    tracing::info!(agent = %agent, "agent removed");
    push_event(world, EventKind::EntityRemoved {
        kind: "agent".to_string(),
        id: agent.raw(),
    });
    Ok(CommandOutcome::Applied)
}

fn set_motive(world: &mut World, agent: AgentId, motive: MotiveKind, value: f32) -> SimResult<CommandOutcome> {
    let entity = find_agent(world, agent)?;
    world.resource_scope(|world, mut events: Mut<TickEvents>| {
        let mut query = world.query::<(&mut Motives, &mut Controller)>();
        if let Ok((mut motives, mut controller)) = query.get_mut(world, entity) {
            let signals = motives.set(motive, value);
            publish_motive_signals(agent, signals, &mut controller, &mut events);
        }
    });
    Ok(CommandOutcome::Applied)
}

/// Interrupts an in-progress job, standing its holder down. The job keeps
/// its recipe and step index for whoever claims it next.
fn interrupt_job(world: &mut World, job: JobId) -> SimResult<CommandOutcome> {
    let (state, holder) = world
        .resource::<JobBoard>()
        .get(job)
        .map(|j| (j.state(), j.claimed_by()))
        .ok_or(SimError::UnknownJob(job))?;
    if state != JobState::InProgress {
        return Err(SimError::JobNotInProgress(job));
    }

    if let Some(agent) = holder {
        if let Ok(entity) = find_agent(world, agent) {
            stand_down_agent(world, entity, agent);
        }
    }
    world.resource_scope(|world, mut board: Mut<JobBoard>| {
        let mut objects = world.resource_mut::<WorldObjects>();
        board.interrupt(job, &mut objects);
    });
    Ok(CommandOutcome::Applied)
}

fn set_wall(world: &mut World, cell: IVec2, wall: bool) -> SimResult<CommandOutcome> {
    let changed = {
        let mut grid = world.resource_mut::<NavGrid>();
        if !grid.in_bounds(cell) {
            return Err(SimError::OutOfBounds(cell));
        }
        grid.set_wall(cell, wall)
    };
    if changed {
        push_event(world, EventKind::WallChanged {
            x: cell.x,
            y: cell.y,
            wall,
        });
    }
    Ok(CommandOutcome::Applied)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_json_shape() {
        let json = r#"{"type": "spawn_item", "tag": "raw_food", "placement": {"kind": "ground", "position": [2.5, 3.5]}}"#;
        let command: Command = serde_json::from_str(json).unwrap();
        assert_eq!(
            command,
            Command::SpawnItem {
                tag: "raw_food".to_string(),
                state: None,
                placement: ItemPlacement::Ground {
                    position: [2.5, 3.5]
                },
            }
        );

        let json = r#"{"type": "spawn_station", "name": "stove", "tag": "stove", "position": [4.5, 1.5]}"#;
        let command: Command = serde_json::from_str(json).unwrap();
        match command {
            Command::SpawnStation { spec } => {
                assert_eq!(spec.tag, "stove");
                assert_eq!(spec.input_slots, 2);
            }
            other => panic!("unexpected {:?}", other),
        }

        let json = r#"{"type": "spawn_container", "name": "fridge", "position": [2.5, 8.5], "capacity": 6}"#;
        let command: Command = serde_json::from_str(json).unwrap();
        assert_eq!(
            command,
            Command::SpawnContainer {
                spec: ContainerSpec {
                    name: "fridge".to_string(),
                    position: [2.5, 8.5],
                    capacity: 6,
                    allowed_tags: Vec::new(),
                },
            }
        );
    }

    #[test]
    fn test_command_file_parsing() {
        let json = r#"{
            "id": "starve_ada",
            "reason": "exercise the fridge",
            "command": {"type": "set_motive", "agent": 1, "motive": "hunger", "value": -60.0}
        }"#;
        let file: CommandFile = serde_json::from_str(json).unwrap();
        assert_eq!(file.id, "starve_ada");
        assert_eq!(
            file.command,
            Command::SetMotive {
                agent: AgentId(1),
                motive: MotiveKind::Hunger,
                value: -60.0
            }
        );
    }

    #[test]
    fn test_scan_reads_sorted_and_skips_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("b.json"),
            r#"{"id": "second", "command": {"type": "add_wall", "x": 3, "y": 3}}"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("a.json"),
            r#"{"id": "first", "command": {"type": "post_job", "recipe": "eat_meal"}}"#,
        )
        .unwrap();
        fs::write(dir.path().join("c.json"), "not json").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let queued = scan_command_files(dir.path());
        let labels: Vec<&str> = queued.iter().map(|q| q.label.as_str()).collect();
        assert_eq!(labels, vec!["first", "second"]);
        assert!(queued.iter().all(|q| q.source.is_some()));
        assert!(dir.path().join("c.rejected").exists());
    }
}
