//! Path Smoothing
//!
//! Drops intermediate waypoints that a straight walk can skip.

use bevy_math::Vec2;

use super::grid::NavGrid;

/// Distance between samples along a sight line, in world units.
const SAMPLE_STEP: f32 = 0.1;

/// True when a body of `clearance` radius can walk straight from `a` to `b`
/// without touching a wall cell.
pub fn line_of_sight(grid: &NavGrid, a: Vec2, b: Vec2, clearance: f32) -> bool {
    let delta = b - a;
    let length = delta.length();
    if length <= f32::EPSILON {
        return grid.is_walkable(grid.world_to_cell(a));
    }
    let dir = delta / length;
    let side = Vec2::new(-dir.y, dir.x) * clearance;
    let samples = (length / SAMPLE_STEP).ceil() as usize;
    for i in 0..=samples {
        let t = (i as f32 * SAMPLE_STEP).min(length);
        let p = a + dir * t;
        for probe in [p, p + side, p - side] {
            if grid.is_wall(grid.world_to_cell(probe)) {
                return false;
            }
        }
    }
    true
}

/// Keeps only the waypoints needed to walk from `start` to the end of `path`.
///
/// From each kept point, scans backward from the end for the furthest
/// visible waypoint and skips straight to it.
pub fn smooth_path(grid: &NavGrid, start: Vec2, path: &[Vec2], clearance: f32) -> Vec<Vec2> {
    let mut smoothed = Vec::new();
    if path.is_empty() {
        return smoothed;
    }
    let mut anchor = start;
    let mut next = 0;
    while next < path.len() {
        let mut chosen = next;
        for candidate in (next..path.len()).rev() {
            if line_of_sight(grid, anchor, path[candidate], clearance) {
                chosen = candidate;
                break;
            }
        }
        smoothed.push(path[chosen]);
        anchor = path[chosen];
        next = chosen + 1;
    }
    smoothed
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy_math::IVec2;

    #[test]
    fn test_open_room_collapses_to_goal() {
        let grid = NavGrid::new(10, 10);
        let path = grid.find_world_path(Vec2::new(1.5, 1.5), Vec2::new(8.5, 5.5)).unwrap();
        assert!(path.len() > 2);
        let smoothed = smooth_path(&grid, Vec2::new(1.5, 1.5), &path, 0.2);
        assert_eq!(smoothed, vec![Vec2::new(8.5, 5.5)]);
    }

    #[test]
    fn test_corner_is_kept() {
        // An L-shaped corridor: the corner waypoint must survive
        let mut grid = NavGrid::new(6, 6);
        for y in 0..6 {
            for x in 0..6 {
                let corridor = y == 1 || x == 4;
                if !corridor {
                    grid.set_wall(IVec2::new(x, y), true);
                }
            }
        }
        let start = Vec2::new(0.5, 1.5);
        let goal = Vec2::new(4.5, 5.5);
        let path = grid.find_world_path(start, goal).unwrap();
        let smoothed = smooth_path(&grid, start, &path, 0.2);
        assert!(smoothed.len() >= 2);
        assert_eq!(smoothed.last(), Some(&goal));
        assert!(smoothed.contains(&Vec2::new(4.5, 1.5)));
    }

    #[test]
    fn test_line_of_sight_blocked_by_wall() {
        let mut grid = NavGrid::new(5, 5);
        grid.set_wall(IVec2::new(2, 2), true);
        assert!(!line_of_sight(&grid, Vec2::new(0.5, 2.5), Vec2::new(4.5, 2.5), 0.0));
        assert!(line_of_sight(&grid, Vec2::new(0.5, 0.5), Vec2::new(4.5, 0.5), 0.2));
    }
}
