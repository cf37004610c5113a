//! Snapshot Types
//!
//! Read-only views of simulation entities. These are the whole contract an
//! inspector or debug layer needs from the simulation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::SimTimestamp;

/// Generates a snapshot ID with the given sequence number.
pub fn generate_snapshot_id(sequence: u64) -> String {
    format!("snap_{:06}", sequence)
}

/// Closed set of inspectable entity kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Agent,
    Job,
    Item,
    Station,
    Container,
}

/// Recipe progress of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobProgress {
    pub job_id: u64,
    pub recipe: String,
    pub step_index: usize,
    pub step_count: usize,
    pub state: String,
}

/// Agent snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub kind: EntityKind,
    pub agent_id: u64,
    pub name: String,
    /// Top-level controller state ("idle", "walking", ...)
    pub state: String,
    /// Detail of the current state ("wander", "approach_station", ...)
    pub sub_state: String,
    pub position: [f32; 2],
    pub collision_radius: f32,
    pub motives: BTreeMap<String, f32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub held_items: Vec<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job: Option<JobProgress>,
}

/// Job snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub kind: EntityKind,
    pub progress: JobProgress,
    pub priority: i32,
    pub claimed_by: Option<u64>,
    pub target_station: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub gathered_items: Vec<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

/// Item snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSnapshot {
    pub kind: EntityKind,
    pub item_id: u64,
    pub tag: String,
    pub state: String,
    /// Location summary ("in_container:3", "in_hand:1", "in_slot:2/input/0", "on_ground")
    pub location: String,
    pub reserved_by: Option<u64>,
}

/// Station snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationSnapshot {
    pub kind: EntityKind,
    pub station_id: u64,
    pub name: String,
    pub tag: String,
    pub position: [f32; 2],
    pub reserved_by: Option<u64>,
    pub input_slots: Vec<Option<u64>>,
    pub output_slots: Vec<Option<u64>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub advertisements: BTreeMap<String, f32>,
}

/// Container snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerSnapshot {
    pub kind: EntityKind,
    pub container_id: u64,
    pub name: String,
    pub position: [f32; 2],
    pub capacity: usize,
    pub items: Vec<u64>,
    pub reserved_by: Option<u64>,
}

/// A snapshot of any single entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntitySnapshot {
    Agent(AgentSnapshot),
    Job(JobSnapshot),
    Item(ItemSnapshot),
    Station(StationSnapshot),
    Container(ContainerSnapshot),
}

impl EntitySnapshot {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntitySnapshot::Agent(s) => s.kind,
            EntitySnapshot::Job(s) => s.kind,
            EntitySnapshot::Item(s) => s.kind,
            EntitySnapshot::Station(s) => s.kind,
            EntitySnapshot::Container(s) => s.kind,
        }
    }
}

/// Complete world snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub snapshot_id: String,
    pub timestamp: SimTimestamp,
    pub agents: Vec<AgentSnapshot>,
    pub jobs: Vec<JobSnapshot>,
    pub items: Vec<ItemSnapshot>,
    pub stations: Vec<StationSnapshot>,
    pub containers: Vec<ContainerSnapshot>,
}

impl WorldSnapshot {
    /// Returns the number of items carrying the given tag.
    pub fn count_items(&self, tag: &str) -> usize {
        self.items.iter().filter(|i| i.tag == tag).count()
    }

    pub fn agent(&self, agent_id: u64) -> Option<&AgentSnapshot> {
        self.agents.iter().find(|a| a.agent_id == agent_id)
    }

    pub fn job(&self, job_id: u64) -> Option<&JobSnapshot> {
        self.jobs.iter().find(|j| j.progress.job_id == job_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: u64, tag: &str) -> ItemSnapshot {
        ItemSnapshot {
            kind: EntityKind::Item,
            item_id: id,
            tag: tag.to_string(),
            state: "raw".to_string(),
            location: "on_ground".to_string(),
            reserved_by: None,
        }
    }

    #[test]
    fn test_snapshot_id_format() {
        assert_eq!(generate_snapshot_id(3), "snap_000003");
    }

    #[test]
    fn test_world_snapshot_item_count() {
        let snapshot = WorldSnapshot {
            snapshot_id: generate_snapshot_id(1),
            timestamp: SimTimestamp::start(),
            agents: Vec::new(),
            jobs: Vec::new(),
            items: vec![item(1, "raw_food"), item(2, "raw_food"), item(3, "cooked_meal")],
            stations: Vec::new(),
            containers: Vec::new(),
        };
        assert_eq!(snapshot.count_items("raw_food"), 2);
        assert_eq!(snapshot.count_items("cooked_meal"), 1);
        assert_eq!(snapshot.count_items("soap"), 0);
    }

    #[test]
    fn test_entity_kind_accessor() {
        let snap = EntitySnapshot::Item(item(9, "plate"));
        assert_eq!(snap.kind(), EntityKind::Item);
        let json = serde_json::to_string(&snap).unwrap();
        assert!(json.contains(r#""kind":"item""#));
    }
}
