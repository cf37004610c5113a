//! Output Generation
//!
//! Snapshot generation for inspection and periodic world dumps.

pub mod snapshot;

pub use snapshot::*;
