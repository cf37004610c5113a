//! Simulation Configuration
//!
//! Tuning parameters loaded from TOML. Every section is optional and falls
//! back to its defaults, so a config file only needs the values it changes.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::components::MotiveKind;
use crate::error::ConfigError;

/// Complete simulation configuration.
#[derive(Resource, Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimConfig {
    #[serde(default)]
    pub time: TimeConfig,
    #[serde(default)]
    pub motives: MotiveConfig,
    #[serde(default)]
    pub movement: MovementConfig,
    #[serde(default)]
    pub agents: AgentConfig,
}

impl SimConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::IoError)?;
        Self::from_str(&content)
    }

    /// Parses configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::TomlError)
    }

    /// Renders the configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::TomlSerialize)
    }
}

/// Clock settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeConfig {
    /// Real seconds covered by one tick at speed 1
    pub tick_seconds: f32,
    /// Game minutes that pass per scaled real second
    pub game_minutes_per_second: f32,
    /// Speed multiplier applied to every delta
    pub speed: f32,
    pub paused: bool,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            tick_seconds: 0.1,
            game_minutes_per_second: 1.0,
            speed: 1.0,
            paused: false,
        }
    }
}

/// Need decay and satisfaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MotiveConfig {
    /// Points lost per game minute, per motive
    pub decay_rates: BTreeMap<MotiveKind, f32>,
    /// Rate for motives missing from `decay_rates`
    pub default_rate: f32,
    /// Direct use of an object stops once the motive reaches this value
    pub satisfied_value: f32,
}

impl Default for MotiveConfig {
    fn default() -> Self {
        Self {
            decay_rates: BTreeMap::from([
                (MotiveKind::Hunger, 0.5),
                (MotiveKind::Energy, 0.3),
                (MotiveKind::Bladder, 0.6),
                (MotiveKind::Hygiene, 0.25),
                (MotiveKind::Fun, 0.4),
            ]),
            default_rate: 0.3,
            satisfied_value: 80.0,
        }
    }
}

/// Steering and stuck recovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    /// Walking speed in cells per scaled second
    pub speed: f32,
    /// Collision radius when unobstructed
    pub radius: f32,
    /// Smallest radius a stuck agent shrinks to
    pub min_radius: f32,
    /// Radius lost per second while stuck
    pub shrink_rate: f32,
    /// Radius regained per second while moving freely
    pub grow_rate: f32,
    /// Seconds of poor progress before an agent counts as stuck
    pub stuck_threshold: f32,
    /// Seconds stuck at minimum radius before the path is abandoned
    pub give_up_seconds: f32,
    /// Seconds between path re-plans from the live position
    pub lookahead_interval: f32,
    /// Bodies within this distance push each other apart
    pub avoid_radius: f32,
    pub avoid_strength: f32,
    /// Fraction of achievable distance that counts as progress
    pub progress_ratio: f32,
    /// Distance at which a waypoint counts as reached
    pub arrive_distance: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            speed: 3.0,
            radius: 0.3,
            min_radius: 0.08,
            shrink_rate: 0.6,
            grow_rate: 0.1,
            stuck_threshold: 0.6,
            give_up_seconds: 2.5,
            lookahead_interval: 0.2,
            avoid_radius: 1.0,
            avoid_strength: 0.3,
            progress_ratio: 0.3,
            arrive_distance: 0.15,
        }
    }
}

/// Agent decision making.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// New agents wait up to this many ticks before their first decision
    pub start_jitter_ticks: u64,
    /// Distance at which a need station's score halves
    pub need_distance_scale: f32,
    /// Seconds to wait for a busy station before the job fails
    pub station_wait_limit: f32,
    /// Reserve container inputs as soon as a job is claimed
    pub reserve_inputs_on_claim: bool,
    /// Ticks to linger after a wander before deciding again
    pub wander_pause_ticks: u64,
    /// Priority of consumption jobs an agent posts for itself
    pub consumption_priority: i32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            start_jitter_ticks: 10,
            need_distance_scale: 10.0,
            station_wait_limit: 10.0,
            reserve_inputs_on_claim: true,
            wander_pause_ticks: 20,
            consumption_priority: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SimConfig::default();
        assert_eq!(config.time.speed, 1.0);
        assert_eq!(config.motives.decay_rates.get(&MotiveKind::Hunger), Some(&0.5));
        assert!(config.movement.min_radius < config.movement.radius);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let toml = r#"
[time]
speed = 4.0

[motives.decay_rates]
hunger = 2.0

[agents]
station_wait_limit = 3.5
"#;
        let config = SimConfig::from_str(toml).unwrap();
        assert_eq!(config.time.speed, 4.0);
        assert_eq!(config.time.tick_seconds, 0.1);
        assert_eq!(config.motives.decay_rates.get(&MotiveKind::Hunger), Some(&2.0));
        assert_eq!(config.motives.decay_rates.get(&MotiveKind::Fun), None);
        assert_eq!(config.agents.station_wait_limit, 3.5);
        assert!(config.agents.reserve_inputs_on_claim);
    }

    #[test]
    fn test_config_round_trips_through_toml() {
        let config = SimConfig::default();
        let text = config.to_toml().unwrap();
        let parsed = SimConfig::from_str(&text).unwrap();
        assert_eq!(parsed.movement.speed, config.movement.speed);
        assert_eq!(parsed.agents.consumption_priority, config.agents.consumption_priority);
    }

    #[test]
    fn test_bad_toml_is_an_error() {
        assert!(matches!(
            SimConfig::from_str("[time]\nspeed = \"fast\""),
            Err(ConfigError::TomlError(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let result = SimConfig::from_file(Path::new("/nonexistent/colony.toml"));
        assert!(matches!(result, Err(ConfigError::IoError(_))));
    }
}
