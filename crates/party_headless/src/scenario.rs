//! Scenario loading and configuration.
//!
//! Scenarios define a scripted match for headless runs: timing config,
//! players and their movement, an optional camera, and a timeline of
//! deaths, goals and terminal triggers.

use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use party_core::config::{duration_secs, MatchConfig};
use party_core::error::ConfigError;
use party_core::frame::{ActorId, CameraView, Pose, StandInBlueprint};
use party_core::math::{Fixed, Vec3Fixed};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// The embedded match config is out of range.
    #[error("Invalid match config: {0}")]
    Config(#[from] ConfigError),
    /// Parsed, but inconsistent.
    #[error("Invalid scenario: {0}")]
    Invalid(String),
}

/// A point or direction written as plain numbers in RON.
///
/// Converted to fixed-point once at load time.
pub type Triple = (f64, f64, f64);

/// Convert to fixed-point, or `None` if any component is not finite or out
/// of range.
fn checked_vec3((x, y, z): Triple) -> Option<Vec3Fixed> {
    Some(Vec3Fixed::new(
        Fixed::checked_from_num(x)?,
        Fixed::checked_from_num(y)?,
        Fixed::checked_from_num(z)?,
    ))
}

/// Unvalidated values fall back to the origin.
fn to_vec3(value: Triple) -> Vec3Fixed {
    checked_vec3(value).unwrap_or(Vec3Fixed::ZERO)
}

fn check_vec3(value: Triple, what: &str) -> Result<(), ScenarioError> {
    match checked_vec3(value) {
        Some(_) => Ok(()),
        None => Err(ScenarioError::Invalid(format!(
            "{what} {value:?} is not representable"
        ))),
    }
}

/// One player in the scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSetup {
    /// Player id, unique within the scenario.
    pub id: u32,
    /// Display name for logs.
    #[serde(default)]
    pub name: String,
    /// Spawn position.
    pub spawn: Triple,
    /// Displacement per fixed tick.
    #[serde(default)]
    pub velocity: Triple,
    /// Stand-in visual; `None` means the player is not replayed.
    #[serde(default)]
    pub stand_in: Option<String>,
}

impl PlayerSetup {
    /// Player id as an engine handle.
    #[must_use]
    pub const fn actor(&self) -> ActorId {
        ActorId(self.id)
    }

    /// Spawn pose in fixed-point.
    #[must_use]
    pub fn spawn_pose(&self) -> Pose {
        Pose::at(to_vec3(self.spawn))
    }

    /// Per-tick velocity in fixed-point.
    #[must_use]
    pub fn velocity(&self) -> Vec3Fixed {
        to_vec3(self.velocity)
    }

    /// Stand-in blueprint, if the player is replayed.
    #[must_use]
    pub fn blueprint(&self) -> Option<StandInBlueprint> {
        self.stand_in.as_deref().map(StandInBlueprint::new)
    }
}

/// The gameplay camera.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraSetup {
    /// Starting position.
    pub position: Triple,
    /// Field of view in degrees.
    #[serde(default = "default_fov")]
    pub fov: f64,
    /// Displacement per fixed tick.
    #[serde(default)]
    pub velocity: Triple,
}

fn default_fov() -> f64 {
    60.0
}

impl CameraSetup {
    /// Starting view in fixed-point.
    #[must_use]
    pub fn view(&self) -> CameraView {
        let fov = Fixed::checked_from_num(self.fov).unwrap_or_else(|| Fixed::from_num(60));
        CameraView::new(Pose::at(to_vec3(self.position)), fov)
    }

    /// Per-tick velocity in fixed-point.
    #[must_use]
    pub fn velocity(&self) -> Vec3Fixed {
        to_vec3(self.velocity)
    }
}

/// Something the script does at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// The player's character dies (the match notices on its next update).
    Kill(u32),
    /// A hazard reports the player dead directly.
    Hazard(u32),
    /// The player touches the goal.
    Goal(u32),
    /// Fire the terminal trigger and start the replay.
    Terminal,
    /// Start the next round right away.
    Restart,
}

impl Action {
    /// Player the action refers to, if any.
    #[must_use]
    pub const fn player(&self) -> Option<u32> {
        match self {
            Self::Kill(id) | Self::Hazard(id) | Self::Goal(id) => Some(*id),
            Self::Terminal | Self::Restart => None,
        }
    }
}

/// A timed action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEvent {
    /// Wall time since the run started, in seconds.
    #[serde(with = "duration_secs")]
    pub at: Duration,
    /// What happens.
    pub action: Action,
}

/// When a run stops.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunLimits {
    /// Wall time limit in seconds.
    pub max_seconds: f64,
    /// Stop after this many full replay loops.
    pub replay_loops: u64,
}

impl Default for RunLimits {
    fn default() -> Self {
        Self {
            max_seconds: 120.0,
            replay_loops: 1,
        }
    }
}

/// A complete scenario configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Phase timings.
    #[serde(default)]
    pub config: MatchConfig,
    /// Players, in registration order.
    pub players: Vec<PlayerSetup>,
    /// Gameplay camera; without one the replay keeps a static camera.
    #[serde(default)]
    pub camera: Option<CameraSetup>,
    /// Scripted actions, in any order.
    #[serde(default)]
    pub timeline: Vec<TimelineEvent>,
    /// Run limits.
    #[serde(default)]
    pub limits: RunLimits,
}

impl Default for Scenario {
    fn default() -> Self {
        Self::gauntlet_duo()
    }
}

impl Scenario {
    /// Load and validate a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Load from a RON string (useful for embedded scenarios).
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Check cross-references serde cannot express.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        self.config.validate()?;
        if self.players.is_empty() {
            return Err(ScenarioError::Invalid("at least one player is required".into()));
        }
        let mut ids = BTreeSet::new();
        for player in &self.players {
            if !ids.insert(player.id) {
                return Err(ScenarioError::Invalid(format!("duplicate player id {}", player.id)));
            }
            check_vec3(player.spawn, &format!("player {} spawn", player.id))?;
            check_vec3(player.velocity, &format!("player {} velocity", player.id))?;
        }
        if let Some(camera) = &self.camera {
            check_vec3(camera.position, "camera position")?;
            check_vec3(camera.velocity, "camera velocity")?;
            if !camera.fov.is_finite() || camera.fov <= 0.0 || camera.fov >= 180.0 {
                return Err(ScenarioError::Invalid(format!(
                    "camera fov {} must be between 0 and 180 degrees",
                    camera.fov
                )));
            }
        }
        for event in &self.timeline {
            if let Some(id) = event.action.player() {
                if !ids.contains(&id) {
                    return Err(ScenarioError::Invalid(format!(
                        "timeline refers to unknown player {id}"
                    )));
                }
            }
        }
        if !self.limits.max_seconds.is_finite() || self.limits.max_seconds <= 0.0 {
            return Err(ScenarioError::Invalid("max_seconds must be positive".into()));
        }
        Ok(())
    }

    /// Timeline sorted by time; ties keep file order.
    #[must_use]
    pub fn sorted_timeline(&self) -> Vec<TimelineEvent> {
        let mut timeline = self.timeline.clone();
        timeline.sort_by_key(|e| e.at);
        timeline
    }

    /// Two runners: a wipe in round 1, a goal in round 2, then the
    /// terminal trigger early in round 3.
    #[must_use]
    pub fn gauntlet_duo() -> Self {
        let player = |id: u32, name: &str, x: f64, dx: f64| PlayerSetup {
            id,
            name: name.to_string(),
            spawn: (x, 0.0, 0.0),
            velocity: (dx, 0.0, 0.125),
            stand_in: Some(format!("ghost_{name}")),
        };
        let at = |secs: u64, action| TimelineEvent {
            at: Duration::from_secs(secs),
            action,
        };
        Self {
            name: "Gauntlet Duo".to_string(),
            description: "Two players, a wipe, a goal, then the terminal trigger".to_string(),
            config: MatchConfig {
                placement_time: Duration::from_secs(10),
                inter_placement_delay: Duration::ZERO,
                survival_time: Duration::from_secs(20),
                intermission_delay: Duration::from_secs(3),
                ..MatchConfig::default()
            },
            players: vec![player(0, "red", -2.0, 0.05), player(1, "blue", 2.0, -0.05)],
            camera: Some(CameraSetup {
                position: (0.0, 8.0, -12.0),
                fov: 60.0,
                velocity: (0.0, 0.0, 0.125),
            }),
            timeline: vec![
                at(15, Action::Kill(0)),
                at(22, Action::Hazard(1)),
                at(40, Action::Goal(0)),
                at(45, Action::Terminal),
            ],
            limits: RunLimits::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"(
        name: "Sample",
        config: (placement_time: 5.0, survival_time: 0.0),
        players: [
            (id: 1, name: "solo", spawn: (0.0, 0.0, 0.0), velocity: (0.5, 0.0, 0.0), stand_in: Some("ghost")),
        ],
        timeline: [
            (at: 12.0, action: Terminal),
            (at: 8.5, action: Kill(1)),
        ],
        limits: (max_seconds: 30.0),
    )"#;

    #[test]
    fn test_parse_sample() {
        let scenario = Scenario::from_ron_str(SAMPLE).unwrap();
        assert_eq!(scenario.players.len(), 1);
        assert_eq!(scenario.config.survival_limit(), None);
        assert!(scenario.camera.is_none());
        assert_eq!(scenario.limits.replay_loops, 1);
        assert_eq!(scenario.players[0].velocity(), Vec3Fixed::new(Fixed::from_num(0.5), Fixed::ZERO, Fixed::ZERO));
    }

    #[test]
    fn test_timeline_sorted() {
        let scenario = Scenario::from_ron_str(SAMPLE).unwrap();
        let timeline = scenario.sorted_timeline();
        assert_eq!(timeline[0].action, Action::Kill(1));
        assert_eq!(timeline[1].at, Duration::from_secs(12));
    }

    #[test]
    fn test_unknown_timeline_player_rejected() {
        let mut scenario = Scenario::gauntlet_duo();
        scenario.timeline.push(TimelineEvent {
            at: Duration::ZERO,
            action: Action::Goal(7),
        });
        assert!(matches!(scenario.validate(), Err(ScenarioError::Invalid(_))));
    }

    #[test]
    fn test_duplicate_player_rejected() {
        let mut scenario = Scenario::gauntlet_duo();
        scenario.players[1].id = 0;
        assert!(matches!(scenario.validate(), Err(ScenarioError::Invalid(_))));
    }

    #[test]
    fn test_bad_config_surfaces() {
        let err = Scenario::from_ron_str(
            r#"(name: "x", config: (fixed_tick_rate: 0), players: [(id: 0, spawn: (0.0, 0.0, 0.0))])"#,
        )
        .unwrap_err();
        assert!(matches!(err, ScenarioError::Config(_)));
    }

    #[test]
    fn test_builtin_round_trips_through_ron() {
        let scenario = Scenario::gauntlet_duo();
        let text = ron::to_string(&scenario).unwrap();
        assert_eq!(Scenario::from_ron_str(&text).unwrap(), scenario);
    }

    #[test]
    fn test_out_of_range_spawn_rejected() {
        let err = Scenario::from_ron_str(
            r#"(name: "far", players: [(id: 0, spawn: (1e10, 0.0, 0.0))])"#,
        )
        .unwrap_err();
        assert!(matches!(err, ScenarioError::Invalid(_)));
    }

    #[test]
    fn test_bad_camera_rejected() {
        let mut scenario = Scenario::gauntlet_duo();
        if let Some(camera) = scenario.camera.as_mut() {
            camera.velocity = (0.0, f64::NAN, 0.0);
        }
        assert!(matches!(scenario.validate(), Err(ScenarioError::Invalid(_))));

        let mut scenario = Scenario::gauntlet_duo();
        if let Some(camera) = scenario.camera.as_mut() {
            camera.fov = 1e12;
        }
        assert!(matches!(scenario.validate(), Err(ScenarioError::Invalid(_))));
    }

    #[test]
    fn test_unvalidated_coordinates_do_not_panic() {
        let player = PlayerSetup {
            id: 0,
            name: String::new(),
            spawn: (f64::INFINITY, 1e300, -1e300),
            velocity: (f64::NAN, 0.0, 0.0),
            stand_in: None,
        };
        assert_eq!(player.spawn_pose().position, Vec3Fixed::ZERO);
        assert_eq!(player.velocity(), Vec3Fixed::ZERO);
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            Scenario::load("/definitely/not/here.ron"),
            Err(ScenarioError::FileNotFound(_))
        ));
    }
}
