//! Job Board
//!
//! Registry of every posted job and the claim/release/interrupt protocol
//! agents use to share work. Lifecycle changes are queued as events and
//! drained once per tick.

use bevy_ecs::prelude::*;
use colony_events::EventKind;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::job::{Job, JobState};
use super::recipe::Recipe;
use crate::components::{AgentId, JobId, MotiveKind, WorldObjects};

/// A requirement that keeps a job from starting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissingRequirement {
    Item {
        tag: String,
        needed: usize,
        available: usize,
    },
    Tool {
        tag: String,
    },
    Station {
        tag: String,
    },
}

impl fmt::Display for MissingRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingRequirement::Item {
                tag,
                needed,
                available,
            } => write!(f, "need {} {} ({} available)", needed, tag, available),
            MissingRequirement::Tool { tag } => write!(f, "missing tool {}", tag),
            MissingRequirement::Station { tag } => write!(f, "no free station tagged {}", tag),
        }
    }
}

/// Result of validating whether a job could start right now.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartCheck {
    pub missing: Vec<MissingRequirement>,
}

impl StartCheck {
    pub fn is_ok(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Checks whether `agent` could run `recipe` from `step` with what the world
/// holds now: items in hand or available, tools, and a station per tag that
/// is free or already reserved by `agent`.
pub fn check_recipe(recipe: &Recipe, step: usize, agent: AgentId, objects: &WorldObjects) -> StartCheck {
    let mut check = StartCheck::default();
    let count = |tag: &str| {
        let held = objects
            .held_by(agent)
            .into_iter()
            .filter(|id| objects.item(*id).is_some_and(|i| i.tag == tag))
            .count();
        held + objects.count_available(tag, agent)
    };

    for input in &recipe.inputs {
        let tag = recipe.tag_at_step(&input.tag, step);
        let available = count(&tag);
        if available < input.quantity {
            check.missing.push(MissingRequirement::Item {
                tag,
                needed: input.quantity,
                available,
            });
        }
    }
    for tool in &recipe.tools {
        if count(tool) == 0 {
            check.missing.push(MissingRequirement::Tool { tag: tool.clone() });
        }
    }
    for tag in recipe.station_tags_from(step) {
        if !objects.stations_tagged(tag).any(|s| s.is_available_to(agent)) {
            check.missing.push(MissingRequirement::Station {
                tag: tag.to_string(),
            });
        }
    }
    check
}

/// Resource: all jobs, keyed by id.
#[derive(Resource, Debug, Default)]
pub struct JobBoard {
    jobs: BTreeMap<JobId, Job>,
    next_id: u64,
    events: Vec<EventKind>,
}

impl JobBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn post(&mut self, recipe: Arc<Recipe>, priority: i32) -> JobId {
        self.next_id += 1;
        let id = JobId(self.next_id);
        tracing::info!(job = %id, recipe = %recipe.name, priority, "job posted");
        self.events.push(EventKind::JobPosted {
            job: id.raw(),
            recipe: recipe.name.clone(),
            priority,
        });
        self.jobs.insert(id, Job::new(id, recipe, priority));
        id
    }

    pub fn get(&self, id: JobId) -> Option<&Job> {
        self.jobs.get(&id)
    }

    pub fn jobs(&self) -> impl Iterator<Item = &Job> {
        self.jobs.values()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Claimable jobs in id order.
    pub fn available(&self) -> Vec<JobId> {
        self.jobs
            .values()
            .filter(|j| j.state().is_claimable())
            .map(|j| j.id)
            .collect()
    }

    /// Claimable jobs whose recipe satisfies `motive`.
    pub fn for_motive(&self, motive: MotiveKind) -> Vec<JobId> {
        self.jobs
            .values()
            .filter(|j| j.state().is_claimable() && j.recipe.fulfills(motive))
            .map(|j| j.id)
            .collect()
    }

    /// The job with the highest priority; the first seen wins ties.
    pub fn highest_priority(&self, candidates: impl IntoIterator<Item = JobId>) -> Option<JobId> {
        let mut best: Option<(JobId, i32)> = None;
        for id in candidates {
            let Some(job) = self.jobs.get(&id) else {
                continue;
            };
            match best {
                Some((_, priority)) if job.priority <= priority => {}
                _ => best = Some((id, job.priority)),
            }
        }
        best.map(|(id, _)| id)
    }

    /// Claims a job. On success, optionally reserves stored inputs and tools
    /// up front; missing items never fail the claim.
    pub fn claim(&mut self, id: JobId, agent: AgentId, objects: &mut WorldObjects, reserve_inputs: bool) -> bool {
        let Some(job) = self.jobs.get_mut(&id) else {
            return false;
        };
        let already_held = job.is_held_by(agent);
        if !job.claim(agent) {
            return false;
        }
        if already_held {
            return true;
        }

        if reserve_inputs {
            for (tag, quantity) in job.recipe.requirements_at(job.step_index()) {
                let stored = objects
                    .available_sources(&tag, agent)
                    .into_iter()
                    .filter(|s| s.stored)
                    .take(quantity)
                    .collect::<Vec<_>>();
                for source in stored {
                    if objects.reserve_item(source.item, agent) {
                        job.add_gathered(source.item);
                    }
                }
            }
        }

        tracing::info!(job = %id, agent = %agent, "job claimed");
        self.events.push(EventKind::JobClaimed {
            job: id.raw(),
            agent: agent.raw(),
        });
        true
    }

    pub fn start(&mut self, id: JobId) -> bool {
        let Some(job) = self.jobs.get_mut(&id) else {
            return false;
        };
        let agent = job.claimed_by();
        if !job.start() {
            return false;
        }
        self.events.push(EventKind::JobStarted {
            job: id.raw(),
            agent: agent.map_or(0, AgentId::raw),
        });
        true
    }

    /// Returns a claimed job to the board.
    pub fn release(&mut self, id: JobId, objects: &mut WorldObjects, reason: &str) -> bool {
        let released = self.jobs.get_mut(&id).is_some_and(|job| job.release(objects));
        if released {
            tracing::info!(job = %id, reason, "job released");
            self.events.push(EventKind::JobReleased {
                job: id.raw(),
                reason: reason.to_string(),
            });
        }
        released
    }

    /// Interrupts an in-progress job, keeping its progress.
    pub fn interrupt(&mut self, id: JobId, objects: &mut WorldObjects) -> bool {
        let Some(job) = self.jobs.get_mut(&id) else {
            return false;
        };
        let step = job.step_index();
        if !job.interrupt(objects) {
            return false;
        }
        tracing::info!(job = %id, step, "job interrupted");
        self.events.push(EventKind::JobInterrupted { job: id.raw(), step });
        true
    }

    /// Hands the job back: interrupted if work began, released otherwise.
    pub fn abandon(&mut self, id: JobId, objects: &mut WorldObjects, reason: &str) -> bool {
        match self.jobs.get(&id).map(Job::state) {
            Some(JobState::InProgress) => self.interrupt(id, objects),
            Some(JobState::Claimed) => self.release(id, objects, reason),
            _ => false,
        }
    }

    pub fn complete(&mut self, id: JobId, objects: &mut WorldObjects) -> bool {
        let Some(job) = self.jobs.get_mut(&id) else {
            return false;
        };
        if !job.complete(objects) {
            return false;
        }
        tracing::info!(job = %id, recipe = %job.recipe.name, "job completed");
        self.events.push(EventKind::JobCompleted {
            job: id.raw(),
            recipe: job.recipe.name.clone(),
        });
        true
    }

    pub fn fail(&mut self, id: JobId, reason: &str, objects: &mut WorldObjects) -> bool {
        let failed = self.jobs.get_mut(&id).is_some_and(|job| job.fail(reason, objects));
        if failed {
            tracing::warn!(job = %id, reason, "job failed");
            self.events.push(EventKind::JobFailed {
                job: id.raw(),
                reason: reason.to_string(),
            });
        }
        failed
    }

    /// Finishes the current step. Returns whether steps remain, or `None`
    /// for an unknown job.
    pub fn advance_step(&mut self, id: JobId) -> Option<bool> {
        let job = self.jobs.get_mut(&id)?;
        let step = job.step_index();
        let remaining = job.advance_step();
        self.events.push(EventKind::JobStepCompleted { job: id.raw(), step });
        Some(remaining)
    }

    /// Lets the controller record reservations and targets on a held job.
    pub fn job_mut(&mut self, id: JobId) -> Option<&mut Job> {
        self.jobs.get_mut(&id)
    }

    /// Validates whether `agent` could start the job now.
    pub fn can_start(&self, id: JobId, agent: AgentId, objects: &WorldObjects) -> StartCheck {
        match self.jobs.get(&id) {
            Some(job) => check_recipe(&job.recipe, job.step_index(), agent, objects),
            None => StartCheck::default(),
        }
    }

    /// Removes completed and failed jobs. Returns how many were removed.
    pub fn purge_finished(&mut self) -> usize {
        let before = self.jobs.len();
        self.jobs.retain(|_, job| !job.state().is_finished());
        let count = before - self.jobs.len();
        if count > 0 {
            self.events.push(EventKind::JobsPurged { count });
        }
        count
    }

    pub fn drain_events(&mut self) -> Vec<EventKind> {
        std::mem::take(&mut self.events)
    }
}
