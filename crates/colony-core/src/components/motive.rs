//! Motive Components
//!
//! Decaying need values that drive agent behavior. Values live in
//! [-100, 100]; lower is more urgent.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Upper bound of every motive value.
pub const MOTIVE_MAX: f32 = 100.0;
/// Values at or below this are critical.
pub const MOTIVE_CRITICAL: f32 = -50.0;
/// Depletion floor; also the lower clamp.
pub const MOTIVE_FLOOR: f32 = -100.0;

/// The closed set of needs. Declaration order breaks urgency ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotiveKind {
    Hunger,
    Energy,
    Bladder,
    Hygiene,
    Fun,
}

impl MotiveKind {
    /// Returns all motive kinds in enumeration order.
    pub fn all() -> &'static [MotiveKind] {
        &[
            MotiveKind::Hunger,
            MotiveKind::Energy,
            MotiveKind::Bladder,
            MotiveKind::Hygiene,
            MotiveKind::Fun,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MotiveKind::Hunger => "hunger",
            MotiveKind::Energy => "energy",
            MotiveKind::Bladder => "bladder",
            MotiveKind::Hygiene => "hygiene",
            MotiveKind::Fun => "fun",
        }
    }
}

impl fmt::Display for MotiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a motive name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown motive '{0}'")]
pub struct UnknownMotive(pub String);

impl FromStr for MotiveKind {
    type Err = UnknownMotive;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hunger" => Ok(MotiveKind::Hunger),
            "energy" => Ok(MotiveKind::Energy),
            "bladder" => Ok(MotiveKind::Bladder),
            "hygiene" => Ok(MotiveKind::Hygiene),
            "fun" => Ok(MotiveKind::Fun),
            _ => Err(UnknownMotive(s.to_string())),
        }
    }
}

/// Notification produced by a motive mutation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MotiveSignal {
    /// Value changed through fulfillment or direct assignment
    Changed { kind: MotiveKind, value: f32 },
    /// First downward crossing into the critical band
    Critical { kind: MotiveKind, value: f32 },
    /// Value reached the depletion floor
    Depleted { kind: MotiveKind },
}

/// A single need value with its decay rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Motive {
    value: f32,
    /// Points lost per game minute
    pub decay_rate: f32,
    pub active: bool,
    #[serde(skip)]
    critical_latched: bool,
    #[serde(skip)]
    depleted_latched: bool,
}

impl Motive {
    pub fn new(value: f32, decay_rate: f32) -> Self {
        let value = value.clamp(MOTIVE_FLOOR, MOTIVE_MAX);
        Self {
            value,
            decay_rate,
            active: true,
            critical_latched: value <= MOTIVE_CRITICAL,
            depleted_latched: value <= MOTIVE_FLOOR,
        }
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn is_critical(&self) -> bool {
        self.value <= MOTIVE_CRITICAL
    }

    pub fn is_depleted(&self) -> bool {
        self.value <= MOTIVE_FLOOR
    }
}

/// Component: all needs of one agent.
#[derive(Component, Debug, Clone, Serialize, Deserialize)]
pub struct Motives {
    motives: BTreeMap<MotiveKind, Motive>,
}

impl Default for Motives {
    fn default() -> Self {
        Self::with_rates(&BTreeMap::new(), 0.2)
    }
}

impl Motives {
    /// Creates every motive at full value with the given decay rates.
    ///
    /// Kinds missing from `rates` use `fallback_rate`.
    pub fn with_rates(rates: &BTreeMap<MotiveKind, f32>, fallback_rate: f32) -> Self {
        let motives = MotiveKind::all()
            .iter()
            .map(|kind| {
                let rate = rates.get(kind).copied().unwrap_or(fallback_rate);
                (*kind, Motive::new(MOTIVE_MAX, rate))
            })
            .collect();
        Self { motives }
    }

    pub fn get(&self, kind: MotiveKind) -> Option<&Motive> {
        self.motives.get(&kind)
    }

    /// Returns the current value, or the maximum for unknown kinds.
    pub fn value(&self, kind: MotiveKind) -> f32 {
        self.motives.get(&kind).map_or(MOTIVE_MAX, Motive::value)
    }

    pub fn set_active(&mut self, kind: MotiveKind, active: bool) {
        if let Some(m) = self.motives.get_mut(&kind) {
            m.active = active;
        }
    }

    /// Reduces every active motive by `rate * delta_minutes`.
    pub fn decay(&mut self, delta_minutes: f32) -> Vec<MotiveSignal> {
        let mut signals = Vec::new();
        if delta_minutes <= 0.0 {
            return signals;
        }
        for (kind, motive) in self.motives.iter_mut() {
            if !motive.active {
                continue;
            }
            let next = motive.value - motive.decay_rate * delta_minutes;
            motive.value = next.clamp(MOTIVE_FLOOR, MOTIVE_MAX);
            settle(*kind, motive, &mut signals);
        }
        signals
    }

    /// Raises a motive by `amount`, clamped.
    pub fn fulfill(&mut self, kind: MotiveKind, amount: f32) -> Vec<MotiveSignal> {
        let current = self.value(kind);
        self.set(kind, current + amount)
    }

    /// Assigns a motive value directly, clamped.
    pub fn set(&mut self, kind: MotiveKind, value: f32) -> Vec<MotiveSignal> {
        let mut signals = Vec::new();
        let Some(motive) = self.motives.get_mut(&kind) else {
            return signals;
        };
        let clamped = value.clamp(MOTIVE_FLOOR, MOTIVE_MAX);
        if clamped != motive.value {
            motive.value = clamped;
            signals.push(MotiveSignal::Changed { kind, value: clamped });
        }
        settle(kind, motive, &mut signals);
        signals
    }

    /// The active motive with the lowest value; ties go to enumeration order.
    pub fn most_urgent(&self) -> Option<(MotiveKind, f32)> {
        let mut best: Option<(MotiveKind, f32)> = None;
        for (kind, motive) in self.motives.iter().filter(|(_, m)| m.active) {
            match best {
                Some((_, value)) if motive.value >= value => {}
                _ => best = Some((*kind, motive.value)),
            }
        }
        best
    }

    pub fn has_critical(&self) -> bool {
        self.motives.values().any(|m| m.active && m.is_critical())
    }

    /// Active critical motives, most urgent first.
    pub fn critical_set(&self) -> Vec<MotiveKind> {
        let mut critical: Vec<(MotiveKind, f32)> = self
            .motives
            .iter()
            .filter(|(_, m)| m.active && m.is_critical())
            .map(|(k, m)| (*k, m.value))
            .collect();
        critical.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        critical.into_iter().map(|(k, _)| k).collect()
    }

    pub fn is_depleted(&self, kind: MotiveKind) -> bool {
        self.motives.get(&kind).is_some_and(|m| m.active && m.is_depleted())
    }

    pub fn iter(&self) -> impl Iterator<Item = (MotiveKind, f32)> + '_ {
        self.motives.iter().map(|(k, m)| (*k, m.value))
    }
}

/// Updates the threshold latches and records crossing signals.
fn settle(kind: MotiveKind, motive: &mut Motive, signals: &mut Vec<MotiveSignal>) {
    if motive.value <= MOTIVE_CRITICAL {
        if !motive.critical_latched {
            motive.critical_latched = true;
            signals.push(MotiveSignal::Critical {
                kind,
                value: motive.value,
            });
        }
    } else {
        motive.critical_latched = false;
    }

    if motive.value <= MOTIVE_FLOOR {
        if !motive.depleted_latched {
            motive.depleted_latched = true;
            signals.push(MotiveSignal::Depleted { kind });
        }
    } else {
        motive.depleted_latched = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform(rate: f32) -> Motives {
        Motives::with_rates(&BTreeMap::new(), rate)
    }

    fn count_critical(signals: &[MotiveSignal]) -> usize {
        signals
            .iter()
            .filter(|s| matches!(s, MotiveSignal::Critical { .. }))
            .count()
    }

    fn count_depleted(signals: &[MotiveSignal]) -> usize {
        signals
            .iter()
            .filter(|s| matches!(s, MotiveSignal::Depleted { .. }))
            .count()
    }

    #[test]
    fn test_values_stay_clamped() {
        let mut motives = uniform(10.0);
        motives.decay(1_000.0);
        for (_, value) in motives.iter() {
            assert_eq!(value, MOTIVE_FLOOR);
        }
        motives.fulfill(MotiveKind::Fun, 10_000.0);
        assert_eq!(motives.value(MotiveKind::Fun), MOTIVE_MAX);
        motives.set(MotiveKind::Energy, -400.0);
        assert_eq!(motives.value(MotiveKind::Energy), MOTIVE_FLOOR);
    }

    #[test]
    fn test_critical_fires_once_per_crossing() {
        let mut motives = Motives::with_rates(
            &BTreeMap::from([(MotiveKind::Hunger, 1.0)]),
            0.0,
        );
        let mut signals = Vec::new();
        // 100 -> -60 in steps of 10
        for _ in 0..16 {
            signals.extend(motives.decay(10.0));
        }
        assert_eq!(count_critical(&signals), 1);
        assert_eq!(count_depleted(&signals), 0);

        // Still in the band: no repeat
        assert_eq!(count_critical(&motives.decay(5.0)), 0);

        // Raise above the threshold, then cross again
        motives.fulfill(MotiveKind::Hunger, 30.0);
        let again = motives.decay(30.0);
        assert_eq!(count_critical(&again), 1);
    }

    #[test]
    fn test_depletion_fires_once_until_raised() {
        let mut motives = Motives::with_rates(
            &BTreeMap::from([(MotiveKind::Bladder, 5.0)]),
            0.0,
        );
        let first = motives.decay(100.0);
        assert_eq!(count_critical(&first), 1);
        assert_eq!(count_depleted(&first), 1);
        assert!(motives.is_depleted(MotiveKind::Bladder));

        assert_eq!(count_depleted(&motives.decay(10.0)), 0);

        motives.fulfill(MotiveKind::Bladder, 1.0);
        let again = motives.decay(1.0);
        assert_eq!(count_depleted(&again), 1);
        // Never left the critical band, so no new critical signal
        assert_eq!(count_critical(&again), 0);
    }

    #[test]
    fn test_fulfill_only_reports_change() {
        let mut motives = uniform(0.0);
        motives.set(MotiveKind::Hygiene, 0.0);
        let signals = motives.fulfill(MotiveKind::Hygiene, 20.0);
        assert_eq!(
            signals,
            vec![MotiveSignal::Changed {
                kind: MotiveKind::Hygiene,
                value: 20.0
            }]
        );
    }

    #[test]
    fn test_set_into_critical_band_signals() {
        let mut motives = uniform(0.0);
        let signals = motives.set(MotiveKind::Energy, -75.0);
        assert_eq!(count_critical(&signals), 1);
        assert!(motives.has_critical());
        assert_eq!(motives.critical_set(), vec![MotiveKind::Energy]);
    }

    #[test]
    fn test_most_urgent_tie_break() {
        let mut motives = uniform(0.0);
        motives.set(MotiveKind::Fun, 10.0);
        motives.set(MotiveKind::Bladder, 10.0);
        assert_eq!(motives.most_urgent(), Some((MotiveKind::Bladder, 10.0)));

        motives.set(MotiveKind::Fun, 5.0);
        assert_eq!(motives.most_urgent(), Some((MotiveKind::Fun, 5.0)));
    }

    #[test]
    fn test_inactive_motives_ignored() {
        let mut motives = uniform(1.0);
        motives.set_active(MotiveKind::Hunger, false);
        motives.decay(10.0);
        assert_eq!(motives.value(MotiveKind::Hunger), MOTIVE_MAX);

        motives.set(MotiveKind::Hunger, -90.0);
        assert!(!motives.has_critical());
        assert_ne!(motives.most_urgent().map(|(k, _)| k), Some(MotiveKind::Hunger));
    }

    #[test]
    fn test_critical_set_ordering() {
        let mut motives = uniform(0.0);
        motives.set(MotiveKind::Fun, -60.0);
        motives.set(MotiveKind::Hunger, -80.0);
        assert_eq!(
            motives.critical_set(),
            vec![MotiveKind::Hunger, MotiveKind::Fun]
        );
    }

    #[test]
    fn test_motive_name_parse() {
        assert_eq!("hunger".parse::<MotiveKind>().unwrap(), MotiveKind::Hunger);
        assert_eq!("Hygiene".parse::<MotiveKind>().unwrap(), MotiveKind::Hygiene);
        assert!("thirst".parse::<MotiveKind>().is_err());
        assert_eq!(MotiveKind::Bladder.to_string(), "bladder");
    }
}
