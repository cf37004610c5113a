//! Body Index System
//!
//! Rebuilds the body index at the start of each tick so steering can query
//! nearby agents.

use bevy_ecs::prelude::*;

use crate::components::AgentId;
use crate::nav::{BodyIndex, Mover};

/// System to rebuild the BodyIndex from agent positions
pub fn build_body_index(mut bodies: ResMut<BodyIndex>, query: Query<(&AgentId, &Mover)>) {
    bodies.clear();
    for (id, mover) in query.iter() {
        bodies.update(*id, mover.position, mover.radius);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy_math::Vec2;

    #[test]
    fn test_body_index_rebuild() {
        let mut world = World::new();
        world.insert_resource(BodyIndex::new());
        world.spawn((AgentId(1), Mover::new(Vec2::new(1.5, 1.5), 0.3)));
        world.spawn((AgentId(2), Mover::new(Vec2::new(2.5, 1.5), 0.25)));

        let mut schedule = Schedule::default();
        schedule.add_systems(build_body_index);
        schedule.run(&mut world);

        let bodies = world.resource::<BodyIndex>();
        assert_eq!(bodies.len(), 2);
        assert_eq!(bodies.get(AgentId(2)).unwrap().radius, 0.25);
        let near: Vec<_> = bodies.neighbors(Vec2::new(1.5, 1.5), 1.5, AgentId(1)).collect();
        assert_eq!(near.len(), 1);
    }
}
