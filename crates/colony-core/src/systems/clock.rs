//! Simulation Clock
//!
//! Turns a time source into per-tick deltas. Every delta is scaled by the
//! speed multiplier and is zero while paused.

use bevy_ecs::prelude::*;
use colony_events::SimTimestamp;

use crate::config::TimeConfig;

/// Elapsed time for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TimeDeltas {
    /// Real seconds, drives movement and work timers
    pub real_seconds: f32,
    /// Game minutes, drives motive decay and fulfillment
    pub game_minutes: f32,
}

/// Supplies unscaled time for each tick.
pub trait TimeSource: Send + Sync {
    fn next_deltas(&mut self) -> TimeDeltas;
}

/// A fixed step per tick.
#[derive(Debug, Clone, Copy)]
pub struct FixedTimeSource {
    pub tick_seconds: f32,
    pub game_minutes_per_second: f32,
}

impl FixedTimeSource {
    pub fn new(tick_seconds: f32, game_minutes_per_second: f32) -> Self {
        Self {
            tick_seconds,
            game_minutes_per_second,
        }
    }
}

impl TimeSource for FixedTimeSource {
    fn next_deltas(&mut self) -> TimeDeltas {
        TimeDeltas {
            real_seconds: self.tick_seconds,
            game_minutes: self.tick_seconds * self.game_minutes_per_second,
        }
    }
}

/// Resource: tick counter, elapsed game time and the current deltas.
#[derive(Resource)]
pub struct SimClock {
    tick: u64,
    game_minutes: f64,
    speed: f32,
    paused: bool,
    deltas: TimeDeltas,
    source: Box<dyn TimeSource>,
}

impl SimClock {
    pub fn new(source: impl TimeSource + 'static) -> Self {
        Self {
            tick: 0,
            game_minutes: 0.0,
            speed: 1.0,
            paused: false,
            deltas: TimeDeltas::default(),
            source: Box::new(source),
        }
    }

    pub fn from_config(config: &TimeConfig) -> Self {
        let mut clock = Self::new(FixedTimeSource::new(
            config.tick_seconds,
            config.game_minutes_per_second,
        ));
        clock.set_speed(config.speed);
        clock.set_paused(config.paused);
        clock
    }

    /// Moves to the next tick and computes its deltas.
    pub fn advance(&mut self) -> TimeDeltas {
        self.tick += 1;
        let raw = self.source.next_deltas();
        let scale = if self.paused { 0.0 } else { self.speed };
        self.deltas = TimeDeltas {
            real_seconds: raw.real_seconds * scale,
            game_minutes: raw.game_minutes * scale,
        };
        self.game_minutes += f64::from(self.deltas.game_minutes);
        self.deltas
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn deltas(&self) -> TimeDeltas {
        self.deltas
    }

    pub fn game_minutes(&self) -> f64 {
        self.game_minutes
    }

    pub fn timestamp(&self) -> SimTimestamp {
        SimTimestamp::new(self.tick, self.game_minutes)
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// Negative speeds clamp to zero.
    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed.max(0.0);
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }
}

/// System: advances the clock by one tick.
pub fn advance_clock(mut clock: ResMut<SimClock>) {
    clock.advance();
}
