//! Match timing configuration.
//!
//! Loaded from RON like the rest of the game data. Durations are written as
//! seconds (`placement_time: 10.0`) and held as [`Duration`] in memory.
//!
//! ```
//! use party_core::config::MatchConfig;
//!
//! let config = MatchConfig::from_ron_str("(placement_time: 8.0, survival_time: 0.0)").unwrap();
//! assert!(config.survival_time.is_zero());
//! assert_eq!(config.fixed_tick_rate, 50);
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default fixed-timestep rate in Hz (0.02 s per tick).
pub const DEFAULT_TICK_RATE: u32 = 50;

/// Serde support for durations written as fractional seconds.
pub mod duration_secs {
    use std::time::Duration;

    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    /// Serialize a duration as seconds.
    pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(value.as_secs_f64())
    }

    /// Deserialize seconds into a duration, rejecting negative or non-finite values.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs)
            .map_err(|_| D::Error::custom(format!("invalid duration in seconds: {secs}")))
    }
}

/// Timers and rules for one match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Length of each placement window.
    #[serde(with = "duration_secs")]
    pub placement_time: Duration,
    /// Cooldown between placement passes (multi-player only).
    #[serde(with = "duration_secs")]
    pub inter_placement_delay: Duration,
    /// Survival window; zero means unbounded (ends on death or goal only).
    #[serde(with = "duration_secs")]
    pub survival_time: Duration,
    /// Pause between the end of a round and the next round start.
    #[serde(with = "duration_secs")]
    pub intermission_delay: Duration,
    /// Pause between replay loops.
    #[serde(with = "duration_secs")]
    pub replay_restart_delay: Duration,
    /// Placement windows per round before survival (multi-player only).
    pub placement_passes: u32,
    /// Fixed-timestep rate for recording and playback, in Hz.
    pub fixed_tick_rate: u32,
    /// A goal reached during survival ends the match and starts the replay.
    pub goal_ends_match: bool,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            placement_time: Duration::from_secs(10),
            inter_placement_delay: Duration::from_secs(1),
            survival_time: Duration::from_secs(20),
            intermission_delay: Duration::from_secs(3),
            replay_restart_delay: Duration::from_secs(2),
            placement_passes: 1,
            fixed_tick_rate: DEFAULT_TICK_RATE,
            goal_ends_match: false,
        }
    }
}

impl MatchConfig {
    /// Load and validate a config from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_ron_str(&contents)
    }

    /// Parse and validate a config from a RON string.
    pub fn from_ron_str(ron: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(ron)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fixed_tick_rate == 0 {
            return Err(ConfigError::Invalid {
                field: "fixed_tick_rate",
                message: "must be at least 1 Hz".to_string(),
            });
        }
        if self.placement_passes == 0 {
            return Err(ConfigError::Invalid {
                field: "placement_passes",
                message: "at least one placement pass is required".to_string(),
            });
        }
        Ok(())
    }

    /// Length of one fixed tick.
    #[must_use]
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs(1) / self.fixed_tick_rate.max(1)
    }

    /// Replay restart delay converted to whole fixed ticks, rounded up.
    #[must_use]
    pub fn replay_restart_ticks(&self) -> u64 {
        let tick_nanos = self.tick_duration().as_nanos().max(1);
        let delay_nanos = self.replay_restart_delay.as_nanos();
        u64::try_from(delay_nanos.div_ceil(tick_nanos)).unwrap_or(u64::MAX)
    }

    /// Survival timer, or `None` when unbounded.
    #[must_use]
    pub fn survival_limit(&self) -> Option<Duration> {
        (!self.survival_time.is_zero()).then_some(self.survival_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = MatchConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tick_duration(), Duration::from_millis(20));
    }

    #[test]
    fn test_partial_ron_uses_defaults() {
        let config = MatchConfig::from_ron_str("(placement_time: 4.5, goal_ends_match: true)").unwrap();
        assert_eq!(config.placement_time, Duration::from_millis(4500));
        assert_eq!(config.survival_time, Duration::from_secs(20));
        assert!(config.goal_ends_match);
    }

    #[test]
    fn test_zero_tick_rate_rejected() {
        let err = MatchConfig::from_ron_str("(fixed_tick_rate: 0)").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "fixed_tick_rate", .. }));
    }

    #[test]
    fn test_zero_passes_rejected() {
        let err = MatchConfig::from_ron_str("(placement_passes: 0)").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "placement_passes", .. }));
    }

    #[test]
    fn test_negative_duration_rejected() {
        assert!(MatchConfig::from_ron_str("(placement_time: -1.0)").is_err());
    }

    #[test]
    fn test_replay_restart_ticks_round_up() {
        let config = MatchConfig {
            replay_restart_delay: Duration::from_millis(2010),
            ..MatchConfig::default()
        };
        // 2.01 s at 20 ms per tick
        assert_eq!(config.replay_restart_ticks(), 101);
    }

    #[test]
    fn test_unbounded_survival() {
        let config = MatchConfig {
            survival_time: Duration::ZERO,
            ..MatchConfig::default()
        };
        assert_eq!(config.survival_limit(), None);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("match.ron");
        std::fs::write(&path, "(intermission_delay: 5.0)").unwrap();
        let config = MatchConfig::load(&path).unwrap();
        assert_eq!(config.intermission_delay, Duration::from_secs(5));
    }
}
