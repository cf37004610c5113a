//! Releasing everything an agent holds.

use crate::components::{AgentId, Controller, ControllerState, JobId, WorldObjects};
use crate::nav::Mover;

/// Drops held items where the agent stands, clears every reservation it
/// holds, stops movement and returns it to idle.
///
/// Returns the job the agent was holding. The job itself is left untouched;
/// callers decide whether it is released, interrupted or failed.
pub fn stand_down(
    agent: AgentId,
    controller: &mut Controller,
    mover: &mut Mover,
    objects: &mut WorldObjects,
) -> Option<JobId> {
    for item in objects.held_by(agent) {
        objects.drop_item(item, mover.position);
    }
    let released = objects.release_all_for(agent);
    if released > 0 {
        tracing::debug!(agent = %agent, released, "reservations cleared");
    }
    mover.stop();
    controller.state = ControllerState::Idle;
    controller.last_station = None;
    controller.job.take()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{ItemState, Placement, StationSpec};
    use bevy_math::Vec2;
    use std::collections::BTreeMap;

    #[test]
    fn test_stand_down_drops_and_releases() {
        let mut objects = WorldObjects::new();
        let agent = AgentId(1);
        let bed = objects.spawn_station(&StationSpec {
            name: "bed".to_string(),
            tag: "bed".to_string(),
            position: [3.5, 3.5],
            footprint: None,
            input_slots: 0,
            output_slots: 0,
            advertisements: BTreeMap::new(),
        });
        let soap = objects
            .spawn_item("soap", ItemState::Raw, Placement::Ground(Vec2::new(1.5, 1.5)))
            .unwrap();
        assert!(objects.pick_up(soap, agent));
        assert!(objects.reserve_station(bed, agent));

        let mut controller = Controller::new(0);
        controller.job = Some(JobId(4));
        let mut mover = Mover::new(Vec2::new(2.5, 2.5), 0.3);

        let job = stand_down(agent, &mut controller, &mut mover, &mut objects);
        assert_eq!(job, Some(JobId(4)));
        assert_eq!(controller.state, ControllerState::Idle);
        assert!(objects.held_by(agent).is_empty());
        assert_eq!(objects.item_position(soap), Some(Vec2::new(2.5, 2.5)));
        assert_eq!(objects.item(soap).unwrap().reserved_by(), None);
        assert_eq!(objects.station(bed).unwrap().reserved_by(), None);
        assert!(objects.check_invariants().is_ok());
    }
}
