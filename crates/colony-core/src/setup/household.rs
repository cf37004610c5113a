//! Household Setup
//!
//! A two-room house: a kitchen with a counter, a stove and a stocked fridge,
//! and a living room with the need stations.

use bevy_math::{IVec2, Vec2};
use std::collections::BTreeMap;

use crate::components::{
    ContainerId, ContainerSpec, ItemState, MotiveKind, Placement, StationId, StationSpec,
    WorldObjects,
};
use crate::nav::NavGrid;

pub const HOUSE_WIDTH: i32 = 16;
pub const HOUSE_HEIGHT: i32 = 12;

/// Column of the wall between kitchen and living room.
const DIVIDER_X: i32 = 8;
/// Doorway rows in the divider.
const DOOR_ROWS: [i32; 2] = [5, 6];

/// Handles to what `furnish_household` placed.
#[derive(Debug, Clone)]
pub struct Household {
    pub fridge: ContainerId,
    pub stations: BTreeMap<String, StationId>,
    pub spawn_points: Vec<Vec2>,
}

impl Household {
    pub fn station(&self, name: &str) -> Option<StationId> {
        self.stations.get(name).copied()
    }
}

/// Outer walls plus a divider with a two-cell doorway.
pub fn household_grid() -> NavGrid {
    let mut grid = NavGrid::walled(HOUSE_WIDTH, HOUSE_HEIGHT);
    for y in 1..HOUSE_HEIGHT - 1 {
        if !DOOR_ROWS.contains(&y) {
            grid.set_wall(IVec2::new(DIVIDER_X, y), true);
        }
    }
    grid
}

fn station(name: &str, tag: &str, cell: [i32; 2], slots: usize) -> StationSpec {
    StationSpec {
        name: name.to_string(),
        tag: tag.to_string(),
        position: [cell[0] as f32 + 0.5, cell[1] as f32 + 0.5],
        footprint: None,
        input_slots: slots,
        output_slots: slots,
        advertisements: BTreeMap::new(),
    }
}

fn need_station(name: &str, cell: [i32; 2], motive: MotiveKind, rate: f32) -> StationSpec {
    let mut spec = station(name, name, cell, 0);
    spec.advertisements.insert(motive, rate);
    spec
}

/// Places stations, the fridge and its starting food.
pub fn furnish_household(objects: &mut WorldObjects, raw_food: usize, bread: usize) -> Household {
    let specs = [
        station("counter", "counter", [2, 2], 2),
        station("stove", "stove", [5, 2], 2),
        need_station("bed", [13, 2], MotiveKind::Energy, 2.0),
        need_station("sofa", [10, 2], MotiveKind::Fun, 1.5),
        need_station("toilet", [13, 9], MotiveKind::Bladder, 5.0),
        need_station("shower", [10, 9], MotiveKind::Hygiene, 3.0),
    ];

    let mut stations = BTreeMap::new();
    for spec in &specs {
        let id = objects.spawn_station(spec);
        stations.insert(spec.name.clone(), id);
    }

    let fridge = objects.spawn_container(&ContainerSpec {
        name: "fridge".to_string(),
        position: [2.5, 8.5],
        capacity: 12,
        allowed_tags: Vec::new(),
    });
    let stock = [("raw_food", raw_food), ("bread", bread)];
    for (tag, count) in stock {
        for _ in 0..count {
            if objects
                .spawn_item(tag, ItemState::Raw, Placement::Container(fridge))
                .is_none()
            {
                tracing::warn!(tag, "fridge is full");
            }
        }
    }

    tracing::info!(
        stations = stations.len(),
        items = objects.items().count(),
        "household furnished"
    );

    Household {
        fridge,
        stations,
        spawn_points: vec![
            Vec2::new(4.5, 5.5),
            Vec2::new(11.5, 5.5),
            Vec2::new(5.5, 7.5),
            Vec2::new(12.5, 6.5),
        ],
    }
}
