//! Events
//!
//! Tick-local event queue, the subscription bus and the JSONL logger.

pub mod bus;
pub mod logger;

pub use bus::{EventBus, SubscriptionId, TickEvents};
pub use logger::EventLogger;

use bevy_ecs::prelude::*;
use colony_events::SimEvent;

use crate::jobs::JobBoard;
use crate::systems::SimClock;

/// Resource: the events published by the most recent tick.
#[derive(Resource, Debug, Default)]
pub struct PublishedEvents {
    pub events: Vec<SimEvent>,
}

/// System: stamps this tick's events, fans them out and logs them.
pub fn publish_events(
    mut tick_events: ResMut<TickEvents>,
    mut board: ResMut<JobBoard>,
    mut bus: ResMut<EventBus>,
    mut published: ResMut<PublishedEvents>,
    clock: Res<SimClock>,
    logger: Option<ResMut<EventLogger>>,
) {
    let timestamp = clock.timestamp();
    let mut payloads = tick_events.drain();
    payloads.extend(board.drain_events());

    published.events = payloads
        .into_iter()
        .map(|kind| bus.publish(timestamp, kind))
        .collect();

    if let Some(mut logger) = logger {
        if let Err(e) = logger.log_batch(&published.events) {
            tracing::warn!(error = %e, "failed to write event log");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimeConfig;
    use colony_events::{EventCategory, EventKind};

    #[test]
    fn test_publish_drains_board_and_tick_events() {
        let mut world = World::new();
        world.insert_resource(TickEvents::new());
        world.insert_resource(JobBoard::new());
        world.insert_resource(EventBus::new());
        world.insert_resource(PublishedEvents::default());
        world.insert_resource(SimClock::from_config(&TimeConfig::default()));
        world.insert_resource(EventLogger::null());

        let sub = world
            .resource_mut::<EventBus>()
            .subscribe([EventCategory::Job, EventCategory::World]);
        world
            .resource_mut::<TickEvents>()
            .push(EventKind::WallChanged { x: 1, y: 2, wall: true });
        world.resource_mut::<JobBoard>().purge_finished();
        world
            .resource_mut::<TickEvents>()
            .push(EventKind::JobsPurged { count: 0 });

        let mut schedule = Schedule::default();
        schedule.add_systems(publish_events);
        schedule.run(&mut world);

        assert_eq!(world.resource::<PublishedEvents>().events.len(), 2);
        assert!(world.resource::<TickEvents>().is_empty());
        assert_eq!(world.resource::<EventLogger>().event_count(), 2);
        assert_eq!(world.resource_mut::<EventBus>().drain(sub).len(), 2);
    }
}
