//! Recorded data leaves: actor handles, poses and frame samples.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::math::{option_fixed_serde, Fixed, QuatFixed, Vec3Fixed};

/// Stable handle for an actor (player character) across rounds.
///
/// Never a reference into an engine scene graph; the host maps it to
/// whatever it renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(pub u32);

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "actor#{}", self.0)
    }
}

/// Players are actors; the alias keeps call sites readable.
pub type PlayerId = ActorId;

/// World-space position and rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Pose {
    /// Position in world space.
    pub position: Vec3Fixed,
    /// Orientation.
    pub rotation: QuatFixed,
}

impl Pose {
    /// Create a pose.
    #[must_use]
    pub const fn new(position: Vec3Fixed, rotation: QuatFixed) -> Self {
        Self { position, rotation }
    }

    /// Pose at `position` with identity rotation.
    #[must_use]
    pub const fn at(position: Vec3Fixed) -> Self {
        Self::new(position, QuatFixed::IDENTITY)
    }
}

/// Camera pose plus field of view, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CameraView {
    /// Camera transform.
    pub pose: Pose,
    /// Vertical field of view in degrees.
    #[serde(with = "crate::math::fixed_serde")]
    pub fov: Fixed,
}

impl CameraView {
    /// Create a camera view.
    #[must_use]
    pub const fn new(pose: Pose, fov: Fixed) -> Self {
        Self { pose, fov }
    }
}

/// One fixed-tick snapshot of an actor or the camera.
///
/// Immutable once written; a track is a tick-ordered, append-only
/// `Vec<FrameSample>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameSample {
    /// Fixed tick since recording started (0 = the `start()` sample).
    pub tick: u64,
    /// Position at this tick.
    pub position: Vec3Fixed,
    /// Rotation at this tick.
    pub rotation: QuatFixed,
    /// Field of view; only camera samples carry one.
    #[serde(with = "option_fixed_serde")]
    pub fov: Option<Fixed>,
}

impl FrameSample {
    /// Sample of an actor pose.
    #[must_use]
    pub const fn from_pose(tick: u64, pose: Pose) -> Self {
        Self {
            tick,
            position: pose.position,
            rotation: pose.rotation,
            fov: None,
        }
    }

    /// Sample of a camera view.
    #[must_use]
    pub const fn from_view(tick: u64, view: CameraView) -> Self {
        Self {
            tick,
            position: view.pose.position,
            rotation: view.pose.rotation,
            fov: Some(view.fov),
        }
    }

    /// The pose stored in this sample.
    #[must_use]
    pub const fn pose(&self) -> Pose {
        Pose::new(self.position, self.rotation)
    }

    /// The camera view stored in this sample, if it carries a FOV.
    #[must_use]
    pub fn view(&self) -> Option<CameraView> {
        self.fov.map(|fov| CameraView::new(self.pose(), fov))
    }
}

/// Visual identity needed to spawn a replay stand-in for an actor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StandInBlueprint {
    /// Host-side asset key for the ghost model.
    pub visual: String,
    /// Whether the source asset carries collision; stand-ins always drop it.
    #[serde(default)]
    pub collidable: bool,
}

impl StandInBlueprint {
    /// Blueprint for a visual asset.
    #[must_use]
    pub fn new(visual: impl Into<String>) -> Self {
        Self {
            visual: visual.into(),
            collidable: true,
        }
    }

    /// Copy of this blueprint with physics and collision stripped.
    #[must_use]
    pub fn non_interactive(&self) -> Self {
        Self {
            visual: self.visual.clone(),
            collidable: false,
        }
    }
}

/// A finished recording for one actor, ready for hand-off to replay.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActorTrack {
    /// The recorded actor.
    pub actor: ActorId,
    /// Recorded samples, in tick order.
    pub samples: Vec<FrameSample>,
    /// How to spawn a stand-in; `None` means the actor is skipped in replay.
    pub blueprint: Option<StandInBlueprint>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_sample_round_trips_view() {
        let view = CameraView::new(Pose::at(Vec3Fixed::from_ints(1, 2, 3)), Fixed::from_num(60));
        let sample = FrameSample::from_view(4, view);
        assert_eq!(sample.tick, 4);
        assert_eq!(sample.view(), Some(view));
    }

    #[test]
    fn test_actor_sample_has_no_view() {
        let sample = FrameSample::from_pose(0, Pose::default());
        assert_eq!(sample.fov, None);
        assert_eq!(sample.view(), None);
    }

    #[test]
    fn test_non_interactive_blueprint_drops_collision() {
        let blueprint = StandInBlueprint::new("ghost_liver");
        assert!(blueprint.collidable);
        let ghost = blueprint.non_interactive();
        assert!(!ghost.collidable);
        assert_eq!(ghost.visual, "ghost_liver");
    }
}
