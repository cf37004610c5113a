//! Job State Machine
//!
//! A job is one execution of a recipe. It tracks who holds it, how far it
//! got, and what it has reserved. Movement and timers belong to the agent
//! working it.
//!
//! ```text
//! POSTED → CLAIMED → IN_PROGRESS → COMPLETED
//!    ↑        │           │      → FAILED
//!    └────────┘           ↓
//!  (release)        INTERRUPTED → CLAIMED
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use super::recipe::Recipe;
use crate::components::{AgentId, ItemId, ItemLocation, JobId, StationId, WorldObjects};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Posted,
    Claimed,
    InProgress,
    Interrupted,
    Completed,
    Failed,
}

impl JobState {
    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Posted => "posted",
            JobState::Claimed => "claimed",
            JobState::InProgress => "in_progress",
            JobState::Interrupted => "interrupted",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }

    /// POSTED and INTERRUPTED jobs can be claimed.
    pub fn is_claimable(self) -> bool {
        matches!(self, JobState::Posted | JobState::Interrupted)
    }

    pub fn is_finished(self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One execution of a recipe.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub recipe: Arc<Recipe>,
    pub priority: i32,
    state: JobState,
    claimed_by: Option<AgentId>,
    step_index: usize,
    gathered_items: Vec<ItemId>,
    target_station: Option<StationId>,
    failure_reason: Option<String>,
}

impl Job {
    pub fn new(id: JobId, recipe: Arc<Recipe>, priority: i32) -> Self {
        Self {
            id,
            recipe,
            priority,
            state: JobState::Posted,
            claimed_by: None,
            step_index: 0,
            gathered_items: Vec::new(),
            target_station: None,
            failure_reason: None,
        }
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn claimed_by(&self) -> Option<AgentId> {
        self.claimed_by
    }

    pub fn step_index(&self) -> usize {
        self.step_index
    }

    pub fn gathered_items(&self) -> &[ItemId] {
        &self.gathered_items
    }

    pub fn target_station(&self) -> Option<StationId> {
        self.target_station
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    pub fn is_held_by(&self, agent: AgentId) -> bool {
        self.claimed_by == Some(agent)
            && matches!(self.state, JobState::Claimed | JobState::InProgress)
    }

    /// Claims for `agent`. Re-claiming by the holder is a no-op success.
    pub fn claim(&mut self, agent: AgentId) -> bool {
        if self.is_held_by(agent) {
            return true;
        }
        if !self.state.is_claimable() || self.claimed_by.is_some() {
            return false;
        }
        self.claimed_by = Some(agent);
        self.state = JobState::Claimed;
        true
    }

    /// CLAIMED → IN_PROGRESS.
    pub fn start(&mut self) -> bool {
        if self.state != JobState::Claimed {
            return false;
        }
        self.state = JobState::InProgress;
        true
    }

    /// IN_PROGRESS → INTERRUPTED, keeping the recipe and step index.
    pub fn interrupt(&mut self, objects: &mut WorldObjects) -> bool {
        if self.state != JobState::InProgress {
            return false;
        }
        self.release_reservations(objects);
        self.claimed_by = None;
        self.state = JobState::Interrupted;
        true
    }

    /// CLAIMED → POSTED, for hauling abandoned before work began.
    pub fn release(&mut self, objects: &mut WorldObjects) -> bool {
        if self.state != JobState::Claimed {
            return false;
        }
        self.release_reservations(objects);
        self.claimed_by = None;
        self.state = JobState::Posted;
        true
    }

    pub fn complete(&mut self, objects: &mut WorldObjects) -> bool {
        if self.state.is_finished() {
            return false;
        }
        self.release_reservations(objects);
        self.state = JobState::Completed;
        true
    }

    pub fn fail(&mut self, reason: impl Into<String>, objects: &mut WorldObjects) -> bool {
        if self.state.is_finished() {
            return false;
        }
        self.release_reservations(objects);
        self.failure_reason = Some(reason.into());
        self.state = JobState::Failed;
        true
    }

    /// Moves to the next step. Returns whether steps remain.
    pub fn advance_step(&mut self) -> bool {
        if self.step_index < self.recipe.step_count() {
            self.step_index += 1;
        }
        self.step_index < self.recipe.step_count()
    }

    pub fn add_gathered(&mut self, item: ItemId) {
        if !self.gathered_items.contains(&item) {
            self.gathered_items.push(item);
        }
    }

    pub fn forget_gathered(&mut self, item: ItemId) {
        self.gathered_items.retain(|i| *i != item);
    }

    pub fn set_target_station(&mut self, station: Option<StationId>) {
        self.target_station = station;
    }

    /// Releases the target station and every gathered item held by the
    /// claimant. Items in someone's hands are never touched.
    fn release_reservations(&mut self, objects: &mut WorldObjects) {
        let holder = self.claimed_by;
        if let Some(station) = self.target_station.take() {
            let ours = objects
                .station(station)
                .is_some_and(|s| holder.is_some() && s.reserved_by() == holder);
            if ours {
                objects.release_station(station);
            }
        }
        for item in self.gathered_items.drain(..) {
            let releasable = objects.item(item).is_some_and(|i| {
                holder.is_some()
                    && i.reserved_by() == holder
                    && !matches!(i.location, ItemLocation::InHand(_))
            });
            if releasable {
                objects.release_item(item);
            }
        }
    }
}
