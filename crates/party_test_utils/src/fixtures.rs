//! Test fixtures and helpers.
//!
//! Pre-built configs, poses and matches for consistent testing.

use std::time::Duration;

use fixed::types::I32F32;
use party_core::config::MatchConfig;
use party_core::frame::{ActorId, CameraView, Pose, StandInBlueprint};
use party_core::game::Match;
use party_core::math::Vec3Fixed;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: recorded poses never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// Pose at integer coordinates with identity rotation.
#[must_use]
pub fn pose_at(x: i32, y: i32, z: i32) -> Pose {
    Pose::at(Vec3Fixed::from_ints(x, y, z))
}

/// Camera at integer coordinates with a 60° field of view.
#[must_use]
pub fn camera_at(x: i32, y: i32, z: i32) -> CameraView {
    CameraView::new(pose_at(x, y, z), fixed(60))
}

/// Stand-in blueprint used by every fixture player.
#[must_use]
pub fn ghost() -> StandInBlueprint {
    StandInBlueprint::new("ghost")
}

/// Timings of the reference two-player round: 10 s placement, no
/// cooldown, 20 s survival, 3 s intermission.
#[must_use]
pub fn reference_config() -> MatchConfig {
    MatchConfig {
        placement_time: Duration::from_secs(10),
        inter_placement_delay: Duration::ZERO,
        survival_time: Duration::from_secs(20),
        intermission_delay: Duration::from_secs(3),
        ..MatchConfig::default()
    }
}

/// Parse a config from RON, panicking on error.
///
/// # Panics
///
/// Panics if the RON is malformed or fails validation.
#[must_use]
pub fn config_from_ron(ron: &str) -> MatchConfig {
    MatchConfig::from_ron_str(ron).unwrap_or_else(|e| panic!("bad fixture config: {e}"))
}

/// A match with `players` registered at `(i, 0, 0)`, each with a ghost
/// stand-in.
///
/// # Panics
///
/// Panics if registration fails, which only happens on duplicate ids.
#[must_use]
pub fn match_with_players(config: MatchConfig, players: u32) -> Match {
    let mut game = Match::new(config);
    for i in 0..players {
        let x = i32::try_from(i).unwrap_or(i32::MAX);
        game.register_player(ActorId(i), pose_at(x, 0, 0), Some(ghost()))
            .unwrap_or_else(|e| panic!("fixture registration failed: {e}"));
    }
    game
}
