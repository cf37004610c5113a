//! Motive Systems
//!
//! Decays every agent's needs by the tick's game minutes and turns threshold
//! crossings into events and controller signals.

use bevy_ecs::prelude::*;
use colony_events::EventKind;

use super::clock::SimClock;
use crate::components::{AgentId, Controller, MotiveSignal, Motives};
use crate::events::TickEvents;

/// Queues events for motive signals and flags crossings on the controller.
pub fn publish_motive_signals(
    agent: AgentId,
    signals: Vec<MotiveSignal>,
    controller: &mut Controller,
    events: &mut TickEvents,
) {
    for signal in signals {
        match signal {
            MotiveSignal::Changed { kind, value } => events.push(EventKind::MotiveChanged {
                agent: agent.raw(),
                motive: kind.to_string(),
                value,
            }),
            MotiveSignal::Critical { kind, value } => {
                tracing::debug!(agent = %agent, motive = %kind, value, "motive critical");
                controller.note_critical();
                events.push(EventKind::MotiveCritical {
                    agent: agent.raw(),
                    motive: kind.to_string(),
                    value,
                });
            }
            MotiveSignal::Depleted { kind } => {
                tracing::debug!(agent = %agent, motive = %kind, "motive depleted");
                controller.note_depleted(kind);
                events.push(EventKind::MotiveDepleted {
                    agent: agent.raw(),
                    motive: kind.to_string(),
                });
            }
        }
    }
}

/// System: decays motives, in agent id order.
pub fn decay_motives(
    clock: Res<SimClock>,
    mut events: ResMut<TickEvents>,
    mut query: Query<(Entity, &AgentId, &mut Motives, &mut Controller)>,
) {
    let minutes = clock.deltas().game_minutes;
    if minutes <= 0.0 {
        return;
    }
    let mut order: Vec<(AgentId, Entity)> = query.iter().map(|(e, id, _, _)| (*id, e)).collect();
    order.sort();

    for (_, entity) in order {
        let Ok((_, id, mut motives, mut controller)) = query.get_mut(entity) else {
            continue;
        };
        let signals = motives.decay(minutes);
        publish_motive_signals(*id, signals, &mut controller, &mut events);
    }
}
