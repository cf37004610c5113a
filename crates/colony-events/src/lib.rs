//! Shared event and snapshot types for the colony simulation.
//!
//! This crate contains pure data structures with no simulation logic.
//! It is a dependency for all other crates in the workspace.

pub mod event;
pub mod snapshot;
pub mod timestamp;

// Re-export timestamp types
pub use timestamp::{ClockTime, ParseClockError, SimTimestamp, MINUTES_PER_DAY};

// Re-export event types
pub use event::{generate_event_id, EventCategory, EventKind, SimEvent};

// Re-export snapshot types
pub use snapshot::{
    generate_snapshot_id, AgentSnapshot, ContainerSnapshot, EntityKind, EntitySnapshot,
    ItemSnapshot, JobProgress, JobSnapshot, StationSnapshot, WorldSnapshot,
};
