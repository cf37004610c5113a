//! Event Bus
//!
//! Systems queue raw event payloads into [`TickEvents`] during a tick. The
//! publish step stamps them with ids and the tick timestamp and fans them out
//! to explicit per-category subscriptions.

use bevy_ecs::prelude::*;
use colony_events::{generate_event_id, EventCategory, EventKind, SimEvent, SimTimestamp};
use std::collections::{BTreeMap, BTreeSet};

/// Resource: event payloads raised during the current tick.
#[derive(Resource, Debug, Default)]
pub struct TickEvents {
    events: Vec<EventKind>,
}

impl TickEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: EventKind) {
        self.events.push(event);
    }

    pub fn extend(&mut self, events: impl IntoIterator<Item = EventKind>) {
        self.events.extend(events);
    }

    pub fn drain(&mut self) -> Vec<EventKind> {
        std::mem::take(&mut self.events)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

#[derive(Debug)]
struct Subscription {
    categories: BTreeSet<EventCategory>,
    inbox: Vec<SimEvent>,
}

/// Resource: stamps events and delivers them to subscribers.
#[derive(Resource, Debug, Default)]
pub struct EventBus {
    next_event_id: u64,
    next_subscription: u64,
    subscriptions: BTreeMap<SubscriptionId, Subscription>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers interest in the given categories.
    pub fn subscribe(&mut self, categories: impl IntoIterator<Item = EventCategory>) -> SubscriptionId {
        self.next_subscription += 1;
        let id = SubscriptionId(self.next_subscription);
        self.subscriptions.insert(
            id,
            Subscription {
                categories: categories.into_iter().collect(),
                inbox: Vec::new(),
            },
        );
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscriptions.remove(&id).is_some()
    }

    /// Stamps a payload and delivers it to every matching subscriber.
    pub fn publish(&mut self, timestamp: SimTimestamp, kind: EventKind) -> SimEvent {
        self.next_event_id += 1;
        let event = SimEvent::new(generate_event_id(self.next_event_id), timestamp, kind);
        let category = event.category();
        for subscription in self.subscriptions.values_mut() {
            if subscription.categories.contains(&category) {
                subscription.inbox.push(event.clone());
            }
        }
        event
    }

    /// Takes everything delivered to a subscription since the last drain.
    pub fn drain(&mut self, id: SubscriptionId) -> Vec<SimEvent> {
        self.subscriptions
            .get_mut(&id)
            .map(|s| std::mem::take(&mut s.inbox))
            .unwrap_or_default()
    }

    /// Total events published so far
    pub fn published(&self) -> u64 {
        self.next_event_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawned(item: u64) -> EventKind {
        EventKind::ItemSpawned {
            item,
            tag: "soap".to_string(),
        }
    }

    #[test]
    fn test_category_filtering() {
        let mut bus = EventBus::new();
        let jobs = bus.subscribe([EventCategory::Job]);
        let items = bus.subscribe([EventCategory::Item, EventCategory::World]);

        bus.publish(SimTimestamp::start(), spawned(1));
        bus.publish(
            SimTimestamp::start(),
            EventKind::JobsPurged { count: 2 },
        );

        let job_events = bus.drain(jobs);
        assert_eq!(job_events.len(), 1);
        assert_eq!(job_events[0].kind, EventKind::JobsPurged { count: 2 });

        let item_events = bus.drain(items);
        assert_eq!(item_events.len(), 1);
        assert_eq!(item_events[0].event_id, "evt_00000001");

        assert!(bus.drain(items).is_empty());
        assert_eq!(bus.published(), 2);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let mut bus = EventBus::new();
        let all = bus.subscribe(EventCategory::all().iter().copied());
        assert!(bus.unsubscribe(all));
        bus.publish(SimTimestamp::start(), spawned(1));
        assert!(bus.drain(all).is_empty());
        assert!(!bus.unsubscribe(all));
    }

    #[test]
    fn test_tick_events_queue() {
        let mut events = TickEvents::new();
        assert!(events.is_empty());
        events.push(spawned(1));
        events.extend([spawned(2), spawned(3)]);
        assert_eq!(events.len(), 3);
        assert_eq!(events.drain().len(), 3);
        assert!(events.is_empty());
    }
}
