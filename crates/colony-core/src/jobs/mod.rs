//! Jobs
//!
//! Recipe definitions, the job state machine and the shared job board.

pub mod board;
pub mod job;
pub mod recipe;

pub use board::{check_recipe, JobBoard, MissingRequirement, StartCheck};
pub use job::{Job, JobState};
pub use recipe::{Recipe, RecipeBook, RecipeInput, RecipeOutput, RecipeStep, TransformTarget};
