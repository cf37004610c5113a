//! ECS Systems
//!
//! The per-tick pipeline: clock, commands, motive decay, body index, agent
//! controllers, then event publication.

pub mod bodies;
pub mod clock;
pub mod controller;
pub mod motives;

pub use bodies::build_body_index;
pub use clock::{advance_clock, FixedTimeSource, SimClock, TimeDeltas, TimeSource};
pub use controller::{run_controllers, stand_down};
pub use motives::{decay_motives, publish_motive_signals};
