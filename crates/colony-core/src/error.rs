//! Error Types
//!
//! Configuration loading errors and command-surface errors. Failures inside
//! a tick never surface here; the controller recovers from them locally.

use bevy_math::IVec2;
use thiserror::Error;

use crate::components::{AgentId, ContainerId, ItemId, JobId, StationId};

/// Error loading configuration or recipe files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("invalid recipe '{recipe}': {reason}")]
    InvalidRecipe { recipe: String, reason: String },
}

/// Error returned by the command surface.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error("unknown agent {0}")]
    UnknownAgent(AgentId),
    #[error("unknown item {0}")]
    UnknownItem(ItemId),
    #[error("unknown job {0}")]
    UnknownJob(JobId),
    #[error("unknown station {0}")]
    UnknownStation(StationId),
    #[error("unknown container {0}")]
    UnknownContainer(ContainerId),
    #[error("unknown recipe '{0}'")]
    UnknownRecipe(String),
    #[error("cell ({}, {}) is out of bounds", .0.x, .0.y)]
    OutOfBounds(IVec2),
    #[error("job {0} is not in progress")]
    JobNotInProgress(JobId),
    #[error("placement rejected: {0}")]
    PlacementRejected(String),
}

pub type SimResult<T> = Result<T, SimError>;
