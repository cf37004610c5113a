//! Simulation Timestamp Types
//!
//! Simulation time is tracked both as a monotonic tick counter and as elapsed
//! game minutes. Game minutes are rendered as a day clock for humans.
//!
//! # Example
//!
//! ```
//! use colony_events::{ClockTime, SimTimestamp};
//!
//! let ts = SimTimestamp::new(100, 1_950.0);
//! assert_eq!(ts.tick, 100);
//! assert_eq!(ts.clock, ClockTime::new(2, 8, 30));
//! assert_eq!(ts.clock.to_string(), "day_2.08:30");
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Number of game minutes in one simulated day.
pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// Human-readable time of day.
///
/// Serializes to strings like "day_3.14:05". Days are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClockTime {
    pub day: u32,
    pub hour: u8,
    pub minute: u8,
}

impl ClockTime {
    /// Creates a new ClockTime.
    pub fn new(day: u32, hour: u8, minute: u8) -> Self {
        Self { day, hour, minute }
    }

    /// Converts elapsed game minutes into a clock reading.
    ///
    /// Negative or non-finite inputs read as the start of day 1.
    pub fn from_game_minutes(minutes: f64) -> Self {
        let whole = if minutes.is_finite() && minutes > 0.0 {
            minutes.floor() as u64
        } else {
            0
        };
        let per_day = u64::from(MINUTES_PER_DAY);
        let day = (whole / per_day) as u32 + 1;
        let in_day = whole % per_day;
        Self {
            day,
            hour: (in_day / 60) as u8,
            minute: (in_day % 60) as u8,
        }
    }

    /// Returns the game minutes elapsed since the start of day 1.
    pub fn as_game_minutes(&self) -> u64 {
        u64::from(self.day.saturating_sub(1)) * u64::from(MINUTES_PER_DAY)
            + u64::from(self.hour) * 60
            + u64::from(self.minute)
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "day_{}.{:02}:{:02}", self.day, self.hour, self.minute)
    }
}

/// Error type for parsing ClockTime from strings.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseClockError {
    InvalidFormat(String),
    InvalidDay(String),
    InvalidHour(String),
    InvalidMinute(String),
}

impl fmt::Display for ParseClockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseClockError::InvalidFormat(s) => {
                write!(f, "invalid clock format: '{}', expected 'day_N.HH:MM'", s)
            }
            ParseClockError::InvalidDay(s) => write!(f, "invalid day: '{}'", s),
            ParseClockError::InvalidHour(s) => write!(f, "invalid hour: '{}'", s),
            ParseClockError::InvalidMinute(s) => write!(f, "invalid minute: '{}'", s),
        }
    }
}

impl std::error::Error for ParseClockError {}

impl FromStr for ClockTime {
    type Err = ParseClockError;

    /// Parses a ClockTime from a string like "day_3.14:05".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (day_part, time_part) = s
            .split_once('.')
            .ok_or_else(|| ParseClockError::InvalidFormat(s.to_string()))?;

        let day = day_part
            .strip_prefix("day_")
            .ok_or_else(|| ParseClockError::InvalidFormat(s.to_string()))?
            .parse::<u32>()
            .map_err(|_| ParseClockError::InvalidDay(day_part.to_string()))?;
        if day == 0 {
            return Err(ParseClockError::InvalidDay(day_part.to_string()));
        }

        let (hour_part, minute_part) = time_part
            .split_once(':')
            .ok_or_else(|| ParseClockError::InvalidFormat(s.to_string()))?;
        let hour = hour_part
            .parse::<u8>()
            .ok()
            .filter(|h| *h < 24)
            .ok_or_else(|| ParseClockError::InvalidHour(hour_part.to_string()))?;
        let minute = minute_part
            .parse::<u8>()
            .ok()
            .filter(|m| *m < 60)
            .ok_or_else(|| ParseClockError::InvalidMinute(minute_part.to_string()))?;

        Ok(ClockTime { day, hour, minute })
    }
}

// Serialize ClockTime as a plain string
impl Serialize for ClockTime {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ClockTime {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A point in simulation time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimTimestamp {
    /// Monotonically increasing simulation tick.
    pub tick: u64,
    /// Day clock derived from elapsed game minutes.
    pub clock: ClockTime,
}

impl SimTimestamp {
    /// Creates a timestamp from a tick and the elapsed game minutes.
    pub fn new(tick: u64, game_minutes: f64) -> Self {
        Self {
            tick,
            clock: ClockTime::from_game_minutes(game_minutes),
        }
    }

    /// Creates a timestamp for the start of the simulation.
    pub fn start() -> Self {
        Self::new(0, 0.0)
    }
}
