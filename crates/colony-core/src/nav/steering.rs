//! Steering
//!
//! Per-agent movement along a smoothed path: periodic look-ahead, inverse
//! square avoidance of nearby bodies, stuck detection with radius shrinking,
//! and sub-stepped collision against walls and other agents.

use bevy_ecs::prelude::*;
use bevy_math::{IVec2, Vec2};
use std::collections::BTreeMap;

use super::grid::NavGrid;
use super::smoothing::{line_of_sight, smooth_path};
use crate::components::AgentId;
use crate::config::MovementConfig;

const WIGGLE_FREQUENCY: f32 = 9.0;
const WIGGLE_STRENGTH: f32 = 0.6;
const MAX_SUBSTEPS: usize = 32;
const OVERLAP_EPSILON: f32 = 1e-4;

/// Outcome of the current move order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MoveStatus {
    #[default]
    Idle,
    Moving,
    Arrived,
    /// Stuck for too long at minimum radius
    Abandoned,
}

/// A body another agent steers around.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    pub position: Vec2,
    pub radius: f32,
}

/// Resource: current positions and radii of all agents.
#[derive(Resource, Debug, Default)]
pub struct BodyIndex {
    bodies: BTreeMap<AgentId, Body>,
}

impl BodyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.bodies.clear();
    }

    pub fn update(&mut self, agent: AgentId, position: Vec2, radius: f32) {
        self.bodies.insert(agent, Body { position, radius });
    }

    pub fn remove(&mut self, agent: AgentId) {
        self.bodies.remove(&agent);
    }

    pub fn get(&self, agent: AgentId) -> Option<&Body> {
        self.bodies.get(&agent)
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Bodies other than `exclude` whose centers lie within `range`.
    pub fn neighbors(&self, position: Vec2, range: f32, exclude: AgentId) -> impl Iterator<Item = &Body> + '_ {
        self.bodies
            .iter()
            .filter(move |(id, body)| **id != exclude && body.position.distance(position) <= range)
            .map(|(_, body)| body)
    }
}

/// Component: an agent's body and its current move order.
#[derive(Component, Debug, Clone)]
pub struct Mover {
    pub position: Vec2,
    pub base_radius: f32,
    pub radius: f32,
    status: MoveStatus,
    destination: Option<Vec2>,
    path: Vec<Vec2>,
    lookahead_timer: f32,
    stuck_timer: f32,
    give_up_timer: f32,
    avoidance: bool,
    wiggle_phase: f32,
}

impl Mover {
    pub fn new(position: Vec2, radius: f32) -> Self {
        Self {
            position,
            base_radius: radius,
            radius,
            status: MoveStatus::Idle,
            destination: None,
            path: Vec::new(),
            lookahead_timer: 0.0,
            stuck_timer: 0.0,
            give_up_timer: 0.0,
            avoidance: true,
            wiggle_phase: 0.0,
        }
    }

    pub fn status(&self) -> MoveStatus {
        self.status
    }

    pub fn destination(&self) -> Option<Vec2> {
        self.destination
    }

    /// Remaining waypoints, next first.
    pub fn path(&self) -> &[Vec2] {
        &self.path
    }

    pub fn is_stuck(&self) -> bool {
        !self.avoidance
    }

    pub fn cell(&self, grid: &NavGrid) -> IVec2 {
        grid.world_to_cell(self.position)
    }

    /// Plans a path to `goal`. Returns false, leaving the mover idle, when
    /// no path exists.
    pub fn set_destination(&mut self, goal: Vec2, grid: &NavGrid) -> bool {
        let Some(raw) = grid.find_world_path(self.position, goal) else {
            self.stop();
            return false;
        };
        self.path = smooth_path(grid, self.position, &raw, self.radius);
        self.destination = Some(goal);
        self.status = MoveStatus::Moving;
        self.lookahead_timer = 0.0;
        self.stuck_timer = 0.0;
        self.give_up_timer = 0.0;
        self.avoidance = true;
        true
    }

    /// Drops the current move order.
    pub fn stop(&mut self) {
        self.path.clear();
        self.destination = None;
        self.status = MoveStatus::Idle;
        self.stuck_timer = 0.0;
        self.give_up_timer = 0.0;
        self.avoidance = true;
    }

    /// True when standing within `tolerance` of `point`.
    pub fn is_near(&self, point: Vec2, tolerance: f32) -> bool {
        self.position.distance(point) <= tolerance
    }

    /// Advances the move order by `dt` scaled seconds.
    pub fn step(
        &mut self,
        me: AgentId,
        grid: &NavGrid,
        bodies: &BodyIndex,
        dt: f32,
        config: &MovementConfig,
    ) -> MoveStatus {
        if dt <= 0.0 {
            return self.status;
        }
        if self.status != MoveStatus::Moving {
            self.regrow(dt, config);
            return self.status;
        }

        self.lookahead_timer += dt;
        if self.lookahead_timer >= config.lookahead_interval {
            self.lookahead_timer = 0.0;
            self.look_ahead(grid);
        }

        // Skip waypoints already reached
        while self.path.len() > 1 && self.is_near(self.path[0], config.arrive_distance) {
            self.path.remove(0);
        }
        let Some(&target) = self.path.first() else {
            self.finish(MoveStatus::Arrived);
            return self.status;
        };
        if self.path.len() == 1 && self.is_near(target, config.arrive_distance) {
            self.finish(MoveStatus::Arrived);
            return self.status;
        }

        let to_target = target - self.position;
        let dist_before = to_target.length();
        let dir = to_target / dist_before;
        let desired = dir * config.speed;

        let mut velocity = desired;
        if self.avoidance {
            velocity += self.avoidance_force(me, bodies, config);
        }
        if self.stuck_timer > 0.0 {
            self.wiggle_phase += dt * WIGGLE_FREQUENCY;
            let perpendicular = Vec2::new(-dir.y, dir.x);
            velocity += perpendicular * self.wiggle_phase.sin() * WIGGLE_STRENGTH * config.speed;
        }
        let velocity = velocity.clamp_length_max(config.speed * 1.5);

        let mut displacement = velocity * dt;
        // Never overshoot the final waypoint
        if self.path.len() == 1 && displacement.length() > dist_before {
            displacement = to_target;
        }
        self.move_substepped(displacement, me, grid, bodies);

        let dist_after = self.position.distance(target);
        let achievable = (config.speed * dt).min(dist_before);
        let progress = dist_before - dist_after;
        if achievable > 0.0 && progress < config.progress_ratio * achievable {
            self.stuck_timer += dt;
        } else {
            self.stuck_timer = (self.stuck_timer - dt).max(0.0);
        }

        if self.stuck_timer > config.stuck_threshold {
            self.avoidance = false;
            self.radius = (self.radius - config.shrink_rate * dt).max(config.min_radius);
            if self.radius <= config.min_radius + f32::EPSILON {
                self.give_up_timer += dt;
                if self.give_up_timer > config.give_up_seconds {
                    tracing::debug!(agent = %me, "path abandoned after prolonged stuck");
                    self.finish(MoveStatus::Abandoned);
                    return self.status;
                }
            }
        } else {
            self.avoidance = true;
            self.give_up_timer = 0.0;
            self.regrow(dt, config);
        }

        if self.path.len() == 1 && self.is_near(target, config.arrive_distance) {
            self.finish(MoveStatus::Arrived);
        }
        self.status
    }

    fn finish(&mut self, status: MoveStatus) {
        self.path.clear();
        self.destination = None;
        self.status = status;
        self.stuck_timer = 0.0;
        self.give_up_timer = 0.0;
        self.avoidance = true;
    }

    fn regrow(&mut self, dt: f32, config: &MovementConfig) {
        self.radius = (self.radius + config.grow_rate * dt).min(self.base_radius);
    }

    /// Skips to the furthest waypoint visible from the live position. Only
    /// when none is visible does the path get planned again.
    fn look_ahead(&mut self, grid: &NavGrid) {
        let visible = (0..self.path.len())
            .rev()
            .find(|&i| line_of_sight(grid, self.position, self.path[i], self.radius));
        match visible {
            Some(furthest) => {
                self.path.drain(..furthest);
            }
            None => self.replan(grid),
        }
    }

    fn replan(&mut self, grid: &NavGrid) {
        let Some(goal) = self.destination else {
            return;
        };
        if let Some(raw) = grid.find_world_path(self.position, goal) {
            self.path = smooth_path(grid, self.position, &raw, self.radius);
        }
    }

    fn avoidance_force(&self, me: AgentId, bodies: &BodyIndex, config: &MovementConfig) -> Vec2 {
        let mut push = Vec2::ZERO;
        for body in bodies.neighbors(self.position, config.avoid_radius, me) {
            let away = self.position - body.position;
            let dist_sq = away.length_squared().max(0.01);
            push += away.normalize_or_zero() * (config.avoid_strength / dist_sq);
        }
        push.clamp_length_max(config.speed)
    }

    fn move_substepped(&mut self, displacement: Vec2, me: AgentId, grid: &NavGrid, bodies: &BodyIndex) {
        let length = displacement.length();
        if length <= f32::EPSILON {
            return;
        }
        let max_step = (self.radius * 0.25).max(0.01);
        let steps = ((length / max_step).ceil() as usize).clamp(1, MAX_SUBSTEPS);
        let sub = displacement / steps as f32;
        for _ in 0..steps {
            let from = self.position;
            let candidates = [from + sub, from + Vec2::new(sub.x, 0.0), from + Vec2::new(0.0, sub.y)];
            match candidates.into_iter().find(|to| self.can_occupy(from, *to, me, grid, bodies)) {
                Some(to) => self.position = to,
                None => break,
            }
        }
    }

    fn can_occupy(&self, from: Vec2, to: Vec2, me: AgentId, grid: &NavGrid, bodies: &BodyIndex) -> bool {
        if to == from || circle_hits_wall(grid, to, self.radius) {
            return false;
        }
        let reach = self.radius * 2.0 + self.base_radius * 2.0;
        for body in bodies.neighbors(from, reach, me) {
            let contact = self.radius + body.radius;
            let before = contact - from.distance(body.position);
            let after = contact - to.distance(body.position);
            if after > 0.0 && after > before + OVERLAP_EPSILON {
                return false;
            }
        }
        true
    }
}

/// True when a circle overlaps any wall cell.
pub fn circle_hits_wall(grid: &NavGrid, center: Vec2, radius: f32) -> bool {
    let min = grid.world_to_cell(center - Vec2::splat(radius));
    let max = grid.world_to_cell(center + Vec2::splat(radius));
    for y in min.y..=max.y {
        for x in min.x..=max.x {
            let cell = IVec2::new(x, y);
            if !grid.is_wall(cell) {
                continue;
            }
            let lo = Vec2::new(x as f32, y as f32);
            let closest = center.clamp(lo, lo + Vec2::ONE);
            if closest.distance_squared(center) < radius * radius {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> MovementConfig {
        MovementConfig::default()
    }

    fn run(mover: &mut Mover, grid: &NavGrid, bodies: &BodyIndex, ticks: usize) -> MoveStatus {
        let cfg = config();
        for _ in 0..ticks {
            let status = mover.step(AgentId(1), grid, bodies, 0.1, &cfg);
            if status != MoveStatus::Moving {
                return status;
            }
        }
        mover.status()
    }

    #[test]
    fn test_walks_to_destination() {
        let grid = NavGrid::walled(10, 10);
        let mut mover = Mover::new(Vec2::new(1.5, 1.5), 0.3);
        assert!(mover.set_destination(Vec2::new(8.5, 7.5), &grid));
        let status = run(&mut mover, &grid, &BodyIndex::new(), 200);
        assert_eq!(status, MoveStatus::Arrived);
        assert!(mover.is_near(Vec2::new(8.5, 7.5), 0.2));
    }

    #[test]
    fn test_unreachable_destination() {
        let mut grid = NavGrid::walled(10, 10);
        for y in 0..10 {
            grid.set_wall(IVec2::new(5, y), true);
        }
        let mut mover = Mover::new(Vec2::new(1.5, 1.5), 0.3);
        assert!(!mover.set_destination(Vec2::new(8.5, 1.5), &grid));
        assert_eq!(mover.status(), MoveStatus::Idle);
    }

    #[test]
    fn test_never_enters_walls() {
        let mut grid = NavGrid::walled(12, 8);
        for y in 1..6 {
            grid.set_wall(IVec2::new(6, y), true);
        }
        let mut mover = Mover::new(Vec2::new(2.5, 2.5), 0.3);
        assert!(mover.set_destination(Vec2::new(9.5, 2.5), &grid));
        let cfg = config();
        for _ in 0..400 {
            mover.step(AgentId(1), &grid, &BodyIndex::new(), 0.1, &cfg);
            assert!(!circle_hits_wall(&grid, mover.position, mover.radius));
            if mover.status() != MoveStatus::Moving {
                break;
            }
        }
        assert_eq!(mover.status(), MoveStatus::Arrived);
    }

    #[test]
    fn test_look_ahead_skips_waypoints_once_visible() {
        let mut grid = NavGrid::walled(12, 8);
        for y in 1..6 {
            grid.set_wall(IVec2::new(6, y), true);
        }
        let goal = Vec2::new(9.5, 2.5);
        let mut mover = Mover::new(Vec2::new(2.5, 2.5), 0.3);
        assert!(mover.set_destination(goal, &grid));
        assert!(mover.path().len() > 1);
        let detour = mover.path().to_vec();

        // The partition comes down mid-walk
        for y in 1..6 {
            grid.set_wall(IVec2::new(6, y), false);
        }
        let cfg = config();
        for _ in 0..3 {
            mover.step(AgentId(1), &grid, &BodyIndex::new(), 0.1, &cfg);
        }
        assert_eq!(mover.path(), &[goal]);
        assert_eq!(detour.last(), Some(&goal));

        assert_eq!(run(&mut mover, &grid, &BodyIndex::new(), 200), MoveStatus::Arrived);
    }

    #[test]
    fn test_blocked_agent_shrinks_then_abandons() {
        // A one-cell corridor fully plugged by a stationary body
        let mut grid = NavGrid::walled(12, 3);
        grid.set_wall(IVec2::new(0, 1), false);
        let mut bodies = BodyIndex::new();
        bodies.update(AgentId(2), Vec2::new(6.5, 1.5), 0.5);

        let mut mover = Mover::new(Vec2::new(1.5, 1.5), 0.3);
        assert!(mover.set_destination(Vec2::new(10.5, 1.5), &grid));

        let cfg = config();
        let mut smallest = mover.radius;
        let mut status = MoveStatus::Moving;
        for _ in 0..2_000 {
            status = mover.step(AgentId(1), &grid, &bodies, 0.1, &cfg);
            smallest = smallest.min(mover.radius);
            if status != MoveStatus::Moving {
                break;
            }
        }
        assert!(smallest < 0.3);
        assert!(matches!(status, MoveStatus::Abandoned | MoveStatus::Arrived));
    }

    #[test]
    fn test_radius_regrows_when_idle() {
        let grid = NavGrid::new(4, 4);
        let mut mover = Mover::new(Vec2::new(1.5, 1.5), 0.3);
        mover.radius = 0.1;
        let cfg = config();
        for _ in 0..100 {
            mover.step(AgentId(1), &grid, &BodyIndex::new(), 0.1, &cfg);
        }
        assert!((mover.radius - 0.3).abs() < 1e-4);
    }

    #[test]
    fn test_body_index_neighbors() {
        let mut bodies = BodyIndex::new();
        bodies.update(AgentId(1), Vec2::new(0.0, 0.0), 0.3);
        bodies.update(AgentId(2), Vec2::new(0.5, 0.0), 0.3);
        bodies.update(AgentId(3), Vec2::new(5.0, 0.0), 0.3);
        let near: Vec<_> = bodies.neighbors(Vec2::ZERO, 1.0, AgentId(1)).collect();
        assert_eq!(near.len(), 1);
        assert_eq!(near[0].position, Vec2::new(0.5, 0.0));
    }

    #[test]
    fn test_circle_wall_overlap() {
        let mut grid = NavGrid::new(4, 4);
        grid.set_wall(IVec2::new(2, 1), true);
        assert!(circle_hits_wall(&grid, Vec2::new(1.8, 1.5), 0.3));
        assert!(!circle_hits_wall(&grid, Vec2::new(1.5, 1.5), 0.3));
    }
}
