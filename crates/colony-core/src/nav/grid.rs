//! Navigation Grid
//!
//! A rectangular grid of unit cells. Cell `(x, y)` covers the square
//! `[x, x + 1) × [y, y + 1)` in world units. Paths are found with
//! 8-directional A*; diagonal moves never cut a wall corner.

use bevy_ecs::prelude::*;
use bevy_math::{IVec2, Vec2};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};

const STRAIGHT_COST: f32 = 1.0;
const DIAGONAL_COST: f32 = std::f32::consts::SQRT_2;

const NEIGHBORS: [IVec2; 8] = [
    IVec2::new(1, 0),
    IVec2::new(-1, 0),
    IVec2::new(0, 1),
    IVec2::new(0, -1),
    IVec2::new(1, 1),
    IVec2::new(1, -1),
    IVec2::new(-1, 1),
    IVec2::new(-1, -1),
];

/// Resource: the walkable floor plan.
#[derive(Resource, Debug, Clone)]
pub struct NavGrid {
    width: i32,
    height: i32,
    walls: Vec<bool>,
}

impl NavGrid {
    /// Creates an open grid with no walls.
    pub fn new(width: i32, height: i32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            width,
            height,
            walls: vec![false; (width * height) as usize],
        }
    }

    /// Creates an open grid surrounded by a one-cell wall border.
    pub fn walled(width: i32, height: i32) -> Self {
        let mut grid = Self::new(width, height);
        for x in 0..grid.width {
            grid.set_wall(IVec2::new(x, 0), true);
            grid.set_wall(IVec2::new(x, grid.height - 1), true);
        }
        for y in 0..grid.height {
            grid.set_wall(IVec2::new(0, y), true);
            grid.set_wall(IVec2::new(grid.width - 1, y), true);
        }
        grid
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn in_bounds(&self, cell: IVec2) -> bool {
        cell.x >= 0 && cell.y >= 0 && cell.x < self.width && cell.y < self.height
    }

    fn index(&self, cell: IVec2) -> Option<usize> {
        self.in_bounds(cell)
            .then(|| (cell.y * self.width + cell.x) as usize)
    }

    /// Out-of-bounds cells read as walls.
    pub fn is_wall(&self, cell: IVec2) -> bool {
        self.index(cell).map_or(true, |i| self.walls[i])
    }

    pub fn is_walkable(&self, cell: IVec2) -> bool {
        !self.is_wall(cell)
    }

    /// Sets wall occupancy. Returns false for out-of-bounds cells.
    pub fn set_wall(&mut self, cell: IVec2, wall: bool) -> bool {
        match self.index(cell) {
            Some(i) => {
                self.walls[i] = wall;
                true
            }
            None => false,
        }
    }

    /// All walkable cells in row-major order.
    pub fn walkable_cells(&self) -> Vec<IVec2> {
        let mut cells = Vec::new();
        for y in 0..self.height {
            for x in 0..self.width {
                let cell = IVec2::new(x, y);
                if self.is_walkable(cell) {
                    cells.push(cell);
                }
            }
        }
        cells
    }

    pub fn world_to_cell(&self, position: Vec2) -> IVec2 {
        IVec2::new(position.x.floor() as i32, position.y.floor() as i32)
    }

    pub fn cell_center(&self, cell: IVec2) -> Vec2 {
        Vec2::new(cell.x as f32 + 0.5, cell.y as f32 + 0.5)
    }

    /// Nearest walkable cell to `cell` by ring search, the cell itself first.
    pub fn nearest_walkable(&self, cell: IVec2) -> Option<IVec2> {
        if self.is_walkable(cell) {
            return Some(cell);
        }
        let max_ring = self.width.max(self.height);
        for ring in 1..=max_ring {
            let mut best: Option<(i32, IVec2)> = None;
            for dy in -ring..=ring {
                for dx in -ring..=ring {
                    if dx.abs() != ring && dy.abs() != ring {
                        continue;
                    }
                    let candidate = cell + IVec2::new(dx, dy);
                    if !self.is_walkable(candidate) {
                        continue;
                    }
                    let d = dx * dx + dy * dy;
                    if best.map_or(true, |(bd, _)| d < bd) {
                        best = Some((d, candidate));
                    }
                }
            }
            if let Some((_, found)) = best {
                return Some(found);
            }
        }
        None
    }

    fn can_step(&self, from: IVec2, delta: IVec2) -> bool {
        let to = from + delta;
        if !self.is_walkable(to) {
            return false;
        }
        if delta.x != 0 && delta.y != 0 {
            // No corner cutting
            let side_a = IVec2::new(from.x + delta.x, from.y);
            let side_b = IVec2::new(from.x, from.y + delta.y);
            return self.is_walkable(side_a) && self.is_walkable(side_b);
        }
        true
    }

    /// Finds a cell path from `start` to `goal`, both inclusive.
    ///
    /// Returns `None` when either end is a wall or the goal is unreachable.
    pub fn find_path(&self, start: IVec2, goal: IVec2) -> Option<Vec<IVec2>> {
        if !self.is_walkable(start) || !self.is_walkable(goal) {
            return None;
        }
        if start == goal {
            return Some(vec![start]);
        }

        let mut open = BinaryHeap::new();
        let mut came_from: BTreeMap<(i32, i32), IVec2> = BTreeMap::new();
        let mut cost_so_far: BTreeMap<(i32, i32), f32> = BTreeMap::new();
        let mut sequence = 0u64;

        cost_so_far.insert(key(start), 0.0);
        open.push(OpenNode {
            cell: start,
            priority: octile(start, goal),
            sequence,
        });

        while let Some(OpenNode { cell, .. }) = open.pop() {
            if cell == goal {
                return Some(reconstruct(&came_from, start, goal));
            }
            let current_cost = cost_so_far.get(&key(cell)).copied().unwrap_or(f32::MAX);
            for delta in NEIGHBORS {
                if !self.can_step(cell, delta) {
                    continue;
                }
                let next = cell + delta;
                let step = if delta.x != 0 && delta.y != 0 {
                    DIAGONAL_COST
                } else {
                    STRAIGHT_COST
                };
                let new_cost = current_cost + step;
                let better = cost_so_far
                    .get(&key(next))
                    .map_or(true, |known| new_cost < *known);
                if better {
                    cost_so_far.insert(key(next), new_cost);
                    came_from.insert(key(next), cell);
                    sequence += 1;
                    open.push(OpenNode {
                        cell: next,
                        priority: new_cost + octile(next, goal),
                        sequence,
                    });
                }
            }
        }
        None
    }

    /// Path in world coordinates through cell centers, ending exactly at
    /// `goal`. The start cell is omitted.
    pub fn find_world_path(&self, from: Vec2, goal: Vec2) -> Option<Vec<Vec2>> {
        let start = self.nearest_walkable(self.world_to_cell(from))?;
        let target = self.world_to_cell(goal);
        let end = self.nearest_walkable(target)?;
        let cells = self.find_path(start, end)?;
        let mut points: Vec<Vec2> = cells.iter().skip(1).map(|c| self.cell_center(*c)).collect();
        let last = if end == target { goal } else { self.cell_center(end) };
        match points.last_mut() {
            Some(p) => *p = last,
            None => points.push(last),
        }
        Some(points)
    }
}

fn key(cell: IVec2) -> (i32, i32) {
    (cell.x, cell.y)
}

/// Octile distance: exact cost on an open 8-connected grid.
fn octile(a: IVec2, b: IVec2) -> f32 {
    let d = (a - b).abs();
    let (lo, hi) = if d.x < d.y { (d.x, d.y) } else { (d.y, d.x) };
    (hi - lo) as f32 * STRAIGHT_COST + lo as f32 * DIAGONAL_COST
}

fn reconstruct(came_from: &BTreeMap<(i32, i32), IVec2>, start: IVec2, goal: IVec2) -> Vec<IVec2> {
    let mut path = vec![goal];
    let mut current = goal;
    while current != start {
        match came_from.get(&key(current)) {
            Some(prev) => {
                current = *prev;
                path.push(current);
            }
            None => break,
        }
    }
    path.reverse();
    path
}

/// Min-heap entry; earlier insertions win ties so expansion order is stable.
#[derive(Debug, Clone, Copy)]
struct OpenNode {
    cell: IVec2,
    priority: f32,
    sequence: u64,
}

impl PartialEq for OpenNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenNode {}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .total_cmp(&self.priority)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}
