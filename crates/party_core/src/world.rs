//! Collaborator interfaces the engine consumes from the host.
//!
//! The engine never inspects movement, input or rendering state. It reads
//! poses, asks actors whether they are alive, respawns them, and toggles what
//! is visible during replay. Hosts implement these traits once for their
//! scene; tests use a scripted double.

use crate::frame::{ActorId, CameraView, Pose};

/// Read access to live poses, sampled on the fixed tick.
pub trait PoseSource {
    /// Current pose of an actor, or `None` if it is inactive this tick.
    fn actor_pose(&self, actor: ActorId) -> Option<Pose>;

    /// Current gameplay camera view, or `None` if the scene has no camera.
    fn camera_view(&self) -> Option<CameraView>;
}

/// Capability every player character implements.
///
/// Resolved at compile time, so death handling never probes for optional
/// methods at runtime.
pub trait PlayerActor {
    /// Whether the character currently considers itself alive.
    fn is_alive(&self) -> bool;

    /// Teleport back to `pose` and reactivate.
    fn respawn_at(&mut self, pose: Pose);

    /// Enable or disable collision with the live world.
    fn set_collision_enabled(&mut self, enabled: bool);
}

/// Lookup from player id to its character.
pub trait PlayerRoster {
    /// Mutable access to the character for `id`, if it exists in the scene.
    fn actor_mut(&mut self, id: ActorId) -> Option<&mut dyn PlayerActor>;

    /// Shared access to the character for `id`.
    fn actor(&self, id: ActorId) -> Option<&dyn PlayerActor>;
}

/// Scene-side effects of replay playback.
pub trait ReplayStage {
    /// Show or hide the live actor while its stand-in plays.
    fn set_actor_visible(&mut self, actor: ActorId, visible: bool);

    /// Switch the replay presentation (panel, replay camera) on or off.
    fn set_replay_view(&mut self, active: bool);

    /// Move the replay camera.
    fn apply_replay_camera(&mut self, view: CameraView);
}

/// Everything a [`Match`](crate::game::Match) needs from the host.
pub trait ArenaWorld: PoseSource + PlayerRoster + ReplayStage {}

impl<T: PoseSource + PlayerRoster + ReplayStage> ArenaWorld for T {}
