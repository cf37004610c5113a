//! Idle decisions and need fulfillment.

use rand::Rng;

use super::{claim_job, AgentMut, Ctx};
use crate::components::{ControllerState, JobId, MotiveKind, StationId, WaitReason, WalkGoal};
use crate::jobs::check_recipe;
use crate::nav::MoveStatus;
use crate::systems::motives::publish_motive_signals;

const WANDER_ATTEMPTS: usize = 8;

/// Picks the next activity for an idle agent.
pub(super) fn decide(ctx: &mut Ctx, agent: &mut AgentMut) {
    let depleted = MotiveKind::all()
        .iter()
        .copied()
        .find(|kind| agent.motives.is_depleted(*kind));
    if let Some(kind) = depleted {
        if seek_need(ctx, agent, &[kind]) || take_consumption_job(ctx, agent, kind) {
            return;
        }
    }

    let critical = agent.motives.critical_set();
    if !critical.is_empty() {
        if let Some((urgent, _)) = agent.motives.most_urgent() {
            if critical.contains(&urgent) && seek_need(ctx, agent, &[urgent]) {
                return;
            }
        }
        if seek_need(ctx, agent, &critical) {
            return;
        }
        for kind in &critical {
            if take_consumption_job(ctx, agent, *kind) {
                return;
            }
        }
    }

    if take_best_job(ctx, agent) {
        return;
    }
    wander(ctx, agent);
}

/// Reserves the best-scoring station that advertises one of `motives` and
/// walks to it. Score is `rate / (1 + distance / need_distance_scale)`.
fn seek_need(ctx: &mut Ctx, agent: &mut AgentMut, motives: &[MotiveKind]) -> bool {
    let position = agent.mover.position;
    let scale = ctx.config.agents.need_distance_scale.max(f32::EPSILON);

    let mut candidates: Vec<(f32, StationId, MotiveKind)> = Vec::new();
    for station in ctx.objects.stations() {
        if !station.is_available_to(agent.id) {
            continue;
        }
        for &kind in motives {
            let rate = station.rate_for(kind);
            if rate <= 0.0 {
                continue;
            }
            let distance = position.distance(station.footprint);
            candidates.push((rate / (1.0 + distance / scale), station.id, kind));
        }
    }
    candidates.sort_by(|a, b| b.0.total_cmp(&a.0));

    for (_, station, motive) in candidates {
        let Some(footprint) = ctx.objects.station(station).map(|s| s.footprint) else {
            continue;
        };
        if !ctx.objects.reserve_station(station, agent.id) {
            continue;
        }
        if agent.mover.set_destination(footprint, ctx.grid) {
            tracing::debug!(agent = %agent.id, station = %station, motive = %motive, "heading to need station");
            agent.controller.state = ControllerState::Walking(WalkGoal::Need { station, motive });
            return true;
        }
        ctx.objects.release_station(station);
    }
    false
}

/// Claims a consumption job for `motive`, posting one from the recipe book
/// when none on the board can start.
fn take_consumption_job(ctx: &mut Ctx, agent: &mut AgentMut, motive: MotiveKind) -> bool {
    let objects = &*ctx.objects;
    let startable: Vec<JobId> = ctx
        .board
        .for_motive(motive)
        .into_iter()
        .filter(|id| ctx.board.can_start(*id, agent.id, objects).is_ok())
        .collect();
    if let Some(job) = ctx.board.highest_priority(startable) {
        return claim_job(ctx, agent, job);
    }

    let recipe = ctx
        .recipes
        .for_motive(motive)
        .find(|r| check_recipe(r, 0, agent.id, objects).is_ok())
        .cloned();
    let Some(recipe) = recipe else {
        return false;
    };
    tracing::info!(agent = %agent.id, recipe = %recipe.name, motive = %motive, "posting consumption job");
    let job = ctx.board.post(recipe, ctx.config.agents.consumption_priority);
    claim_job(ctx, agent, job)
}

/// Claims the highest-priority job the agent could start now.
fn take_best_job(ctx: &mut Ctx, agent: &mut AgentMut) -> bool {
    let objects = &*ctx.objects;
    let startable: Vec<JobId> = ctx
        .board
        .available()
        .into_iter()
        .filter(|id| ctx.board.can_start(*id, agent.id, objects).is_ok())
        .collect();
    match ctx.board.highest_priority(startable) {
        Some(job) => claim_job(ctx, agent, job),
        None => false,
    }
}

/// Walks to a random walkable cell that is not adjacent to the current one.
fn wander(ctx: &mut Ctx, agent: &mut AgentMut) {
    let cells = ctx.grid.walkable_cells();
    let here = agent.mover.cell(ctx.grid);
    if !cells.is_empty() {
        for _ in 0..WANDER_ATTEMPTS {
            let cell = cells[ctx.rng.gen_range(0..cells.len())];
            let offset = (cell - here).abs();
            if offset.x.max(offset.y) <= 1 {
                continue;
            }
            if agent.mover.set_destination(ctx.grid.cell_center(cell), ctx.grid) {
                agent.controller.state = ControllerState::Walking(WalkGoal::Wander);
                return;
            }
        }
    }
    let wake_tick = ctx.tick + ctx.config.agents.wander_pause_ticks;
    agent.controller.state = ControllerState::Waiting(WaitReason::StartDelay { wake_tick });
}

/// Follows the path to a reserved need station.
pub(super) fn walk_to_need(ctx: &mut Ctx, agent: &mut AgentMut, station: StationId, motive: MotiveKind) {
    let ours = ctx
        .objects
        .station(station)
        .is_some_and(|s| s.reserved_by() == Some(agent.id));
    if !ours {
        agent.mover.stop();
        agent.controller.state = ControllerState::Idle;
        return;
    }
    match agent.mover.status() {
        MoveStatus::Moving => {}
        MoveStatus::Arrived => {
            agent.controller.state = ControllerState::Waiting(WaitReason::UsingObject { station, motive });
        }
        MoveStatus::Abandoned | MoveStatus::Idle => {
            ctx.objects.release_station(station);
            agent.controller.state = ControllerState::Idle;
        }
    }
}

/// Uses a station directly, fulfilling everything it advertises.
pub(super) fn use_object(ctx: &mut Ctx, agent: &mut AgentMut, station: StationId, motive: MotiveKind) {
    let advertisements = ctx
        .objects
        .station(station)
        .filter(|s| s.reserved_by() == Some(agent.id))
        .map(|s| s.advertisements.clone());
    let Some(advertisements) = advertisements else {
        agent.controller.state = ControllerState::Idle;
        return;
    };

    let minutes = ctx.deltas.game_minutes;
    if minutes > 0.0 {
        for (kind, rate) in advertisements {
            let signals = agent.motives.fulfill(kind, rate * minutes);
            publish_motive_signals(agent.id, signals, agent.controller, ctx.events);
        }
    }

    if agent.motives.value(motive) >= ctx.config.motives.satisfied_value {
        tracing::debug!(agent = %agent.id, station = %station, motive = %motive, "need satisfied");
        ctx.objects.release_station(station);
        agent.controller.state = ControllerState::Idle;
    }
}
