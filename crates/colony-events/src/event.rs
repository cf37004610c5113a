//! Event Types
//!
//! Every observable state change in the simulation is published as a
//! [`SimEvent`]. Events carry plain numeric ids so this crate stays free of
//! simulation types.

use serde::{Deserialize, Serialize};

use crate::SimTimestamp;

/// Coarse event categories used for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    /// Motive value changes and threshold crossings
    Motive,
    /// Job lifecycle on the board
    Job,
    /// Agent controller state changes and movement outcomes
    Agent,
    /// Item creation, transformation and removal
    Item,
    /// World structure changes (walls, stations, containers)
    World,
}

impl EventCategory {
    /// Returns all categories.
    pub fn all() -> &'static [EventCategory] {
        &[
            EventCategory::Motive,
            EventCategory::Job,
            EventCategory::Agent,
            EventCategory::Item,
            EventCategory::World,
        ]
    }
}

/// The payload of an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    MotiveChanged {
        agent: u64,
        motive: String,
        value: f32,
    },
    /// A motive dropped into the critical band.
    MotiveCritical {
        agent: u64,
        motive: String,
        value: f32,
    },
    /// A motive reached the depletion floor.
    MotiveDepleted {
        agent: u64,
        motive: String,
    },
    JobPosted {
        job: u64,
        recipe: String,
        priority: i32,
    },
    JobClaimed {
        job: u64,
        agent: u64,
    },
    JobStarted {
        job: u64,
        agent: u64,
    },
    /// A claimed job went back to the board before work began.
    JobReleased {
        job: u64,
        reason: String,
    },
    JobInterrupted {
        job: u64,
        step: usize,
    },
    JobStepCompleted {
        job: u64,
        step: usize,
    },
    JobCompleted {
        job: u64,
        recipe: String,
    },
    JobFailed {
        job: u64,
        reason: String,
    },
    JobsPurged {
        count: usize,
    },
    AgentStateChanged {
        agent: u64,
        from: String,
        to: String,
    },
    PathAbandoned {
        agent: u64,
        reason: String,
    },
    ItemSpawned {
        item: u64,
        tag: String,
    },
    ItemTransformed {
        item: u64,
        from: String,
        to: String,
    },
    ItemRemoved {
        item: u64,
        tag: String,
    },
    WallChanged {
        x: i32,
        y: i32,
        wall: bool,
    },
    EntitySpawned {
        kind: String,
        id: u64,
    },
    EntityRemoved {
        kind: String,
        id: u64,
    },
}

impl EventKind {
    /// Returns the subscription category of this payload.
    pub fn category(&self) -> EventCategory {
        match self {
            EventKind::MotiveChanged { .. }
            | EventKind::MotiveCritical { .. }
            | EventKind::MotiveDepleted { .. } => EventCategory::Motive,
            EventKind::JobPosted { .. }
            | EventKind::JobClaimed { .. }
            | EventKind::JobStarted { .. }
            | EventKind::JobReleased { .. }
            | EventKind::JobInterrupted { .. }
            | EventKind::JobStepCompleted { .. }
            | EventKind::JobCompleted { .. }
            | EventKind::JobFailed { .. }
            | EventKind::JobsPurged { .. } => EventCategory::Job,
            EventKind::AgentStateChanged { .. } | EventKind::PathAbandoned { .. } => {
                EventCategory::Agent
            }
            EventKind::ItemSpawned { .. }
            | EventKind::ItemTransformed { .. }
            | EventKind::ItemRemoved { .. } => EventCategory::Item,
            EventKind::WallChanged { .. }
            | EventKind::EntitySpawned { .. }
            | EventKind::EntityRemoved { .. } => EventCategory::World,
        }
    }

    /// Returns the job id this payload refers to, if any.
    pub fn job_id(&self) -> Option<u64> {
        match self {
            EventKind::JobPosted { job, .. }
            | EventKind::JobClaimed { job, .. }
            | EventKind::JobStarted { job, .. }
            | EventKind::JobReleased { job, .. }
            | EventKind::JobInterrupted { job, .. }
            | EventKind::JobStepCompleted { job, .. }
            | EventKind::JobCompleted { job, .. }
            | EventKind::JobFailed { job, .. } => Some(*job),
            _ => None,
        }
    }
}

/// A complete simulation event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimEvent {
    /// Unique identifier (e.g., "evt_00000042")
    pub event_id: String,
    /// When the event occurred
    pub timestamp: SimTimestamp,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl SimEvent {
    pub fn new(event_id: impl Into<String>, timestamp: SimTimestamp, kind: EventKind) -> Self {
        Self {
            event_id: event_id.into(),
            timestamp,
            kind,
        }
    }

    pub fn category(&self) -> EventCategory {
        self.kind.category()
    }

    /// Serializes the event to a JSON line (for JSONL format).
    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes an event from a JSON line.
    pub fn from_jsonl(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}

/// Generates an event ID with the given sequence number.
pub fn generate_event_id(sequence: u64) -> String {
    format!("evt_{:08}", sequence)
}
