//! Entity identifiers
//!
//! Every simulation entity is addressed by a small copyable id. Ids are
//! allocated sequentially so runs with the same seed stay identical.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            pub fn raw(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "_{:04}"), self.0)
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }
    };
}

entity_id!(
    /// Component: unique identifier for an agent
    #[derive(Component)]
    AgentId,
    "agent"
);
entity_id!(ItemId, "item");
entity_id!(ContainerId, "container");
entity_id!(StationId, "station");
entity_id!(JobId, "job");

/// Resource: hands out sequential ids per entity kind.
#[derive(Resource, Debug, Default)]
pub struct IdAllocator {
    next_agent: u64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_agent(&mut self) -> AgentId {
        self.next_agent += 1;
        AgentId(self.next_agent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display() {
        assert_eq!(AgentId(7).to_string(), "agent_0007");
        assert_eq!(StationId(12).to_string(), "station_0012");
        assert_eq!(JobId(3).to_string(), "job_0003");
    }

    #[test]
    fn test_agent_ids_are_sequential() {
        let mut ids = IdAllocator::new();
        assert_eq!(ids.next_agent(), AgentId(1));
        assert_eq!(ids.next_agent(), AgentId(2));
    }

    #[test]
    fn test_ids_serialize_transparent() {
        assert_eq!(serde_json::to_string(&ItemId(5)).unwrap(), "5");
    }
}
