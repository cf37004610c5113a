//! Navigation
//!
//! Grid pathfinding, path smoothing and per-agent steering.

pub mod grid;
pub mod smoothing;
pub mod steering;

pub use grid::NavGrid;
pub use smoothing::{line_of_sight, smooth_path};
pub use steering::{circle_hits_wall, Body, BodyIndex, MoveStatus, Mover};
