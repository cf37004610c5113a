//! Station work, step transforms and job completion.

use colony_events::EventKind;

use super::{stand_down, AgentMut, Ctx};
use crate::components::{
    ControllerState, HaulTask, ItemId, ItemState, JobId, Placement, SlotKind, StationId,
    WaitReason, WorkPhase,
};
use crate::jobs::{Recipe, RecipeStep};
use crate::nav::MoveStatus;
use crate::systems::motives::publish_motive_signals;

pub(super) fn update(ctx: &mut Ctx, agent: &mut AgentMut, job_id: JobId, phase: WorkPhase) {
    let Some((recipe, step_index)) = ctx
        .board
        .get(job_id)
        .map(|j| (j.recipe.clone(), j.step_index()))
    else {
        ctx.abandon_job(agent, "job vanished");
        return;
    };
    let Some(step) = recipe.step(step_index).cloned() else {
        complete(ctx, agent, job_id, &recipe);
        return;
    };

    match phase {
        WorkPhase::FindStation => find_station(ctx, agent, job_id, &step),
        WorkPhase::Approach { station } => approach(ctx, agent, station),
        WorkPhase::Work { station, elapsed } => {
            work(ctx, agent, job_id, &recipe, step_index, &step, station, elapsed)
        }
    }
}

fn find_station(ctx: &mut Ctx, agent: &mut AgentMut, job_id: JobId, step: &RecipeStep) {
    if !step.needs_station() {
        agent.controller.state = ControllerState::Working(WorkPhase::Work {
            station: None,
            elapsed: 0.0,
        });
        return;
    }
    let tag = step.station_tag.as_str();

    // A station kept from the previous step
    if let Some(station) = ctx.board.get(job_id).and_then(|j| j.target_station()) {
        let kept = ctx
            .objects
            .station(station)
            .is_some_and(|s| s.tag == tag && s.reserved_by() == Some(agent.id));
        if kept {
            begin_approach(ctx, agent, station);
            return;
        }
    }

    if ctx.objects.stations_tagged(tag).next().is_none() {
        ctx.fail_job(agent, &format!("no station tagged {}", tag));
        return;
    }
    match reserve_nearest(ctx, agent, job_id, tag) {
        Some(station) => begin_approach(ctx, agent, station),
        None => {
            tracing::debug!(agent = %agent.id, tag, "every station busy, waiting");
            agent.controller.state = ControllerState::Waiting(WaitReason::ForStation {
                tag: tag.to_string(),
                waited: 0.0,
            });
        }
    }
}

/// Retries the reservation each tick until the wait limit runs out.
pub(super) fn wait_for_station(ctx: &mut Ctx, agent: &mut AgentMut, job_id: JobId, tag: &str, waited: f32) {
    if ctx.objects.stations_tagged(tag).next().is_none() {
        ctx.fail_job(agent, &format!("no station tagged {}", tag));
        return;
    }
    if let Some(station) = reserve_nearest(ctx, agent, job_id, tag) {
        begin_approach(ctx, agent, station);
        return;
    }
    let waited = waited + ctx.deltas.real_seconds;
    if waited > ctx.config.agents.station_wait_limit {
        ctx.fail_job(agent, &format!("timed out waiting for station {}", tag));
        return;
    }
    agent.controller.state = ControllerState::Waiting(WaitReason::ForStation {
        tag: tag.to_string(),
        waited,
    });
}

/// Reserves the closest free station with `tag` and records it on the job.
fn reserve_nearest(ctx: &mut Ctx, agent: &AgentMut, job_id: JobId, tag: &str) -> Option<StationId> {
    let position = agent.mover.position;
    let mut candidates: Vec<(f32, StationId)> = ctx
        .objects
        .stations_tagged(tag)
        .filter(|s| s.is_available_to(agent.id))
        .map(|s| (position.distance(s.footprint), s.id))
        .collect();
    candidates.sort_by(|a, b| a.0.total_cmp(&b.0));

    let station = candidates
        .into_iter()
        .map(|(_, id)| id)
        .find(|id| ctx.objects.reserve_station(*id, agent.id))?;
    if let Some(job) = ctx.board.job_mut(job_id) {
        job.set_target_station(Some(station));
    }
    Some(station)
}

fn begin_approach(ctx: &mut Ctx, agent: &mut AgentMut, station: StationId) {
    let Some(footprint) = ctx.objects.station(station).map(|s| s.footprint) else {
        agent.controller.state = ControllerState::Working(WorkPhase::FindStation);
        return;
    };
    if agent.mover.is_near(footprint, ctx.config.movement.arrive_distance) {
        agent.mover.stop();
    } else if !agent.mover.set_destination(footprint, ctx.grid) {
        ctx.fail_job(agent, &format!("no path to {}", station));
        return;
    }
    agent.controller.state = ControllerState::Working(WorkPhase::Approach { station });
}

fn approach(ctx: &mut Ctx, agent: &mut AgentMut, station: StationId) {
    let ours = ctx
        .objects
        .station(station)
        .is_some_and(|s| s.reserved_by() == Some(agent.id));
    if !ours {
        agent.mover.stop();
        agent.controller.state = ControllerState::Working(WorkPhase::FindStation);
        return;
    }
    match agent.mover.status() {
        MoveStatus::Moving => {}
        MoveStatus::Abandoned => ctx.fail_job(agent, &format!("stuck approaching {}", station)),
        MoveStatus::Arrived | MoveStatus::Idle => {
            for item in ctx.objects.held_by(agent.id) {
                if !ctx.objects.place_in_station(item, station, SlotKind::Input) {
                    break;
                }
            }
            agent.controller.state = ControllerState::Working(WorkPhase::Work {
                station: Some(station),
                elapsed: 0.0,
            });
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn work(
    ctx: &mut Ctx,
    agent: &mut AgentMut,
    job_id: JobId,
    recipe: &Recipe,
    step_index: usize,
    step: &RecipeStep,
    station: Option<StationId>,
    elapsed: f32,
) {
    if let Some(station) = station {
        let ours = ctx
            .objects
            .station(station)
            .is_some_and(|s| s.reserved_by() == Some(agent.id));
        if !ours {
            ctx.fail_job(agent, &format!("lost station {}", station));
            return;
        }
    }

    let elapsed = elapsed + ctx.deltas.real_seconds;
    if elapsed < step.duration {
        agent.controller.state = ControllerState::Working(WorkPhase::Work { station, elapsed });
        return;
    }

    // Transform what the step worked on
    let mut worked = ctx.objects.held_by(agent.id);
    if let Some(station) = station {
        worked.extend(slot_items_of(ctx, agent, station));
    }
    for item in worked {
        let Some(tag) = ctx.objects.item(item).map(|i| i.tag.clone()) else {
            continue;
        };
        let Some(target) = step.input_transform.get(&tag) else {
            continue;
        };
        if ctx.objects.transform_item(item, target.tag(), target.state()).is_some() {
            ctx.events.push(EventKind::ItemTransformed {
                item: item.raw(),
                from: tag,
                to: target.tag().to_string(),
            });
        }
    }

    let next_same_station = recipe
        .step(step_index + 1)
        .is_some_and(|next| next.needs_station() && next.station_tag == step.station_tag);
    match station {
        Some(station) if !next_same_station => {
            for item in slot_items_of(ctx, agent, station) {
                let slot = ctx
                    .objects
                    .station(station)
                    .and_then(|s| s.slot_of(item));
                if let Some((kind, index)) = slot {
                    ctx.objects.take_from_station(station, kind, index, agent.id);
                }
            }
            ctx.objects.release_station(station);
            if let Some(job) = ctx.board.job_mut(job_id) {
                job.set_target_station(None);
            }
            agent.controller.last_station = Some(station);
        }
        Some(_) => {}
        None => agent.controller.last_station = None,
    }

    match ctx.board.advance_step(job_id) {
        Some(true) if next_same_station => {
            agent.controller.state = ControllerState::Working(WorkPhase::FindStation);
        }
        Some(true) => {
            agent.controller.state = ControllerState::Hauling(HaulTask::default());
        }
        Some(false) => complete(ctx, agent, job_id, recipe),
        None => {
            stand_down(agent.id, agent.controller, agent.mover, ctx.objects);
        }
    }
}

/// Items in the station's input slots reserved by the agent.
fn slot_items_of(ctx: &Ctx, agent: &AgentMut, station: StationId) -> Vec<ItemId> {
    let Some(s) = ctx.objects.station(station) else {
        return Vec::new();
    };
    s.items_in(SlotKind::Input)
        .into_iter()
        .filter(|id| {
            ctx.objects
                .item(*id)
                .is_some_and(|i| i.reserved_by() == Some(agent.id))
        })
        .collect()
}

/// Applies motive effects, consumes inputs, hands over outputs and closes
/// the job.
fn complete(ctx: &mut Ctx, agent: &mut AgentMut, job_id: JobId, recipe: &Recipe) {
    for (kind, amount) in &recipe.motive_effects {
        let signals = agent.motives.fulfill(*kind, *amount);
        publish_motive_signals(agent.id, signals, agent.controller, ctx.events);
    }

    // Consumed inputs are matched by the tag they were hauled under
    for input in recipe.inputs.iter().filter(|i| i.consumed) {
        let eaten: Vec<ItemId> = ctx
            .objects
            .held_by(agent.id)
            .into_iter()
            .filter(|id| ctx.objects.item(*id).is_some_and(|i| i.tag == input.tag))
            .take(input.quantity)
            .collect();
        for id in eaten {
            if let Some(item) = ctx.objects.remove_item(id) {
                ctx.events.push(EventKind::ItemRemoved {
                    item: id.raw(),
                    tag: item.tag,
                });
            }
        }
    }

    let position = agent.mover.position;
    let mut outputs: Vec<ItemId> = Vec::new();
    for output in &recipe.outputs {
        let finished: Vec<ItemId> = ctx
            .objects
            .held_by(agent.id)
            .into_iter()
            .filter(|id| !outputs.contains(id))
            .filter(|id| ctx.objects.item(*id).is_some_and(|i| i.tag == output.tag))
            .take(output.quantity)
            .collect();
        let shortfall = output.quantity.saturating_sub(finished.len());
        outputs.extend(finished);

        let state = ItemState::infer_from_tag(&output.tag).unwrap_or_default();
        for _ in 0..shortfall {
            if let Some(id) = ctx.objects.spawn_item(&output.tag, state, Placement::Ground(position)) {
                ctx.events.push(EventKind::ItemSpawned {
                    item: id.raw(),
                    tag: output.tag.clone(),
                });
                outputs.push(id);
            }
        }
    }

    let drop_at = agent
        .controller
        .last_station
        .and_then(|s| ctx.objects.station(s))
        .map_or(position, |s| s.footprint);
    for item in outputs {
        let placed = agent
            .controller
            .last_station
            .is_some_and(|s| ctx.objects.place_in_station(item, s, SlotKind::Output));
        if placed {
            ctx.objects.release_item(item);
        } else {
            ctx.objects.drop_item(item, drop_at);
        }
    }
    for leftover in ctx.objects.held_by(agent.id) {
        ctx.objects.drop_item(leftover, position);
    }

    ctx.board.complete(job_id, ctx.objects);
    tracing::debug!(agent = %agent.id, job = %job_id, recipe = %recipe.name, "job finished");
    agent.controller.job = None;
    agent.controller.last_station = None;
    agent.controller.state = ControllerState::Idle;
}
