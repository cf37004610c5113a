//! World Setup
//!
//! The default household layout and recipe catalog.

pub mod household;
pub mod recipes;

pub use household::*;
pub use recipes::*;
