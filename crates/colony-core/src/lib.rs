//! Colony Simulation Core
//!
//! Motive-driven agents in a grid household. Agents decay their needs, use
//! stations that advertise need relief, and carry out multi-step recipe jobs
//! that gather items, work them at stations and produce outputs. Items,
//! containers and stations are reserved by one agent at a time. Movement runs
//! on A* paths with smoothing, local avoidance and stuck recovery.

use bevy_ecs::prelude::*;
use rand::rngs::SmallRng;

pub mod commands;
pub mod components;
pub mod config;
pub mod error;
pub mod events;
pub mod jobs;
pub mod nav;
pub mod output;
pub mod setup;
pub mod simulation;
pub mod systems;

/// Seeded random number generator resource for deterministic simulation
#[derive(Resource)]
pub struct SimRng(pub SmallRng);

pub use commands::{Command, CommandFile, CommandOutcome, ItemPlacement};
pub use components::*;
pub use config::SimConfig;
pub use error::{ConfigError, SimError, SimResult};
pub use jobs::{Job, JobBoard, JobState, Recipe, RecipeBook};
pub use nav::{MoveStatus, Mover, NavGrid};
pub use simulation::Simulation;
