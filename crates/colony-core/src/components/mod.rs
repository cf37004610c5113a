//! ECS Components
//!
//! Agent components, entity ids, motives, and the items, containers and
//! stations owned by the world object registry.

pub mod agent;
pub mod container;
pub mod ids;
pub mod item;
pub mod motive;
pub mod objects;
pub mod station;

pub use agent::*;
pub use container::Container;
pub use ids::*;
pub use item::{Item, ItemLocation, ItemState, SlotKind};
pub use motive::*;
pub use objects::{to_vec2, ContainerSpec, ItemSource, Placement, StationSpec, WorldObjects};
pub use station::Station;
