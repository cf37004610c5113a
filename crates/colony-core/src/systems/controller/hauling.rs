//! Fetching a job's requirements into hand.

use super::{AgentMut, Ctx};
use crate::components::{
    AgentId, ControllerState, HaulTarget, HaulTask, ItemId, ItemSource, JobId, WorkPhase,
    WorldObjects,
};
use crate::jobs::{JobState, Recipe};
use crate::nav::MoveStatus;

/// Requirements for `step` not yet in the agent's hands, as `(tag, count)`.
pub(crate) fn missing_in_hand(
    objects: &WorldObjects,
    recipe: &Recipe,
    step: usize,
    agent: AgentId,
) -> Vec<(String, usize)> {
    let held = objects.held_by(agent);
    recipe
        .requirements_at(step)
        .into_iter()
        .filter_map(|(tag, quantity)| {
            let have = held
                .iter()
                .filter(|id| objects.item(**id).is_some_and(|i| i.tag == tag))
                .count();
            (have < quantity).then(|| (tag, quantity - have))
        })
        .collect()
}

pub(super) fn update(ctx: &mut Ctx, agent: &mut AgentMut, job_id: JobId, mut task: HaulTask) {
    let Some((recipe, step, state)) = ctx
        .board
        .get(job_id)
        .map(|j| (j.recipe.clone(), j.step_index(), j.state()))
    else {
        ctx.abandon_job(agent, "job vanished");
        return;
    };

    if let Some(target) = task.target {
        match agent.mover.status() {
            MoveStatus::Moving => {
                let reachable = ctx
                    .objects
                    .item(target.item)
                    .is_some_and(|i| i.is_available_to(agent.id));
                if reachable {
                    agent.controller.state = ControllerState::Hauling(task);
                    return;
                }
                agent.mover.stop();
                give_up_on(ctx, agent, job_id, &mut task, target.item);
            }
            MoveStatus::Arrived => {
                if ctx.objects.pick_up(target.item, agent.id) {
                    tracing::debug!(agent = %agent.id, item = %target.item, "picked up");
                } else {
                    give_up_on(ctx, agent, job_id, &mut task, target.item);
                }
            }
            MoveStatus::Abandoned | MoveStatus::Idle => {
                give_up_on(ctx, agent, job_id, &mut task, target.item);
            }
        }
        task.target = None;
    }

    let missing = missing_in_hand(ctx.objects, &recipe, step, agent.id);
    if missing.is_empty() {
        if state == JobState::Claimed {
            ctx.board.start(job_id);
        }
        agent.controller.state = ControllerState::Working(WorkPhase::FindStation);
        return;
    }

    // One requirement at a time, in recipe order
    let Some((tag, _)) = missing.first() else {
        return;
    };
    let position = agent.mover.position;
    let mut sources: Vec<ItemSource> = ctx
        .objects
        .available_sources(tag, agent.id)
        .into_iter()
        .filter(|s| !task.tried.contains(&s.item))
        .collect();
    // Stored items first, then nearest
    sources.sort_by(|a, b| {
        b.stored
            .cmp(&a.stored)
            .then(a.position.distance(position).total_cmp(&b.position.distance(position)))
    });

    for source in sources {
        if !ctx.objects.reserve_item(source.item, agent.id) {
            task.tried.push(source.item);
            continue;
        }
        if agent.mover.set_destination(source.position, ctx.grid) {
            if let Some(job) = ctx.board.job_mut(job_id) {
                job.add_gathered(source.item);
            }
            task.target = Some(HaulTarget {
                item: source.item,
                position: source.position,
            });
            agent.controller.state = ControllerState::Hauling(task);
            return;
        }
        give_up_on(ctx, agent, job_id, &mut task, source.item);
    }

    let reason = format!("no source for {}", tag);
    ctx.abandon_job(agent, &reason);
}

/// Marks a source as tried and drops the agent's claim on it.
fn give_up_on(ctx: &mut Ctx, agent: &AgentMut, job_id: JobId, task: &mut HaulTask, item: ItemId) {
    task.tried.push(item);
    let ours = ctx.objects.item(item).is_some_and(|i| {
        i.reserved_by() == Some(agent.id) && !i.location.is_in_hand_of(agent.id)
    });
    if ours {
        ctx.objects.release_item(item);
    }
    if let Some(job) = ctx.board.job_mut(job_id) {
        job.forget_gathered(item);
    }
}
