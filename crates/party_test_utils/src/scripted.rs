//! Scripted host world.
//!
//! A deterministic stand-in for a game scene. Actors move by a constant
//! per-tick velocity, the camera can follow a velocity of its own, and every
//! replay-side effect is logged so tests can assert on it.

use std::collections::BTreeSet;

use party_core::frame::{ActorId, CameraView, Pose};
use party_core::math::Vec3Fixed;
use party_core::world::{PlayerActor, PlayerRoster, PoseSource, ReplayStage};

/// A player character driven by a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptedActor {
    /// Scene id.
    pub id: ActorId,
    /// Current pose.
    pub pose: Pose,
    /// Displacement applied on every [`ScriptedWorld::step`].
    pub velocity: Vec3Fixed,
    /// Whether the character thinks it is alive.
    pub alive: bool,
    /// Whether collision is on.
    pub collision: bool,
    /// Times `respawn_at` was called.
    pub respawns: u32,
    /// When false, `actor_pose` reports `None` (inactive this tick).
    pub active: bool,
}

impl ScriptedActor {
    /// Living, active actor at `pose` that does not move.
    #[must_use]
    pub fn new(id: ActorId, pose: Pose) -> Self {
        Self {
            id,
            pose,
            velocity: Vec3Fixed::ZERO,
            alive: true,
            collision: true,
            respawns: 0,
            active: true,
        }
    }
}

impl PlayerActor for ScriptedActor {
    fn is_alive(&self) -> bool {
        self.alive
    }

    fn respawn_at(&mut self, pose: Pose) {
        self.pose = pose;
        self.alive = true;
        self.respawns += 1;
    }

    fn set_collision_enabled(&mut self, enabled: bool) {
        self.collision = enabled;
    }
}

/// Deterministic host scene implementing every collaborator trait.
#[derive(Debug, Clone, Default)]
pub struct ScriptedWorld {
    actors: Vec<ScriptedActor>,
    camera: Option<CameraView>,
    camera_velocity: Vec3Fixed,
    hidden: BTreeSet<ActorId>,
    replay_view: bool,
    replay_camera: Vec<CameraView>,
    steps: u64,
}

impl ScriptedWorld {
    /// Empty scene with no camera.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an actor moving by `velocity` per step.
    #[must_use]
    pub fn with_actor(mut self, id: ActorId, pose: Pose, velocity: Vec3Fixed) -> Self {
        let mut actor = ScriptedActor::new(id, pose);
        actor.velocity = velocity;
        self.actors.push(actor);
        self
    }

    /// Add a gameplay camera moving by `velocity` per step.
    #[must_use]
    pub fn with_camera(mut self, view: CameraView, velocity: Vec3Fixed) -> Self {
        self.camera = Some(view);
        self.camera_velocity = velocity;
        self
    }

    /// Move every living actor and the camera one step.
    pub fn step(&mut self) {
        for actor in self.actors.iter_mut().filter(|a| a.alive) {
            actor.pose.position += actor.velocity;
        }
        if let Some(camera) = self.camera.as_mut() {
            camera.pose.position += self.camera_velocity;
        }
        self.steps += 1;
    }

    /// Make an actor report itself dead.
    pub fn kill(&mut self, id: ActorId) {
        if let Some(actor) = self.actor_entry_mut(id) {
            actor.alive = false;
        }
    }

    /// Toggle whether an actor reports a pose.
    pub fn set_active(&mut self, id: ActorId, active: bool) {
        if let Some(actor) = self.actor_entry_mut(id) {
            actor.active = active;
        }
    }

    /// Actor by id.
    #[must_use]
    pub fn actor_entry(&self, id: ActorId) -> Option<&ScriptedActor> {
        self.actors.iter().find(|a| a.id == id)
    }

    fn actor_entry_mut(&mut self, id: ActorId) -> Option<&mut ScriptedActor> {
        self.actors.iter_mut().find(|a| a.id == id)
    }

    /// Actors hidden by replay.
    #[must_use]
    pub fn hidden(&self) -> &BTreeSet<ActorId> {
        &self.hidden
    }

    /// Whether the replay presentation is on.
    #[must_use]
    pub const fn replay_view(&self) -> bool {
        self.replay_view
    }

    /// Every view applied to the replay camera, in order.
    #[must_use]
    pub fn replay_camera(&self) -> &[CameraView] {
        &self.replay_camera
    }

    /// Number of `step` calls.
    #[must_use]
    pub const fn steps(&self) -> u64 {
        self.steps
    }
}

impl PoseSource for ScriptedWorld {
    fn actor_pose(&self, actor: ActorId) -> Option<Pose> {
        self.actor_entry(actor).filter(|a| a.active).map(|a| a.pose)
    }

    fn camera_view(&self) -> Option<CameraView> {
        self.camera
    }
}

impl PlayerRoster for ScriptedWorld {
    fn actor_mut(&mut self, id: ActorId) -> Option<&mut dyn PlayerActor> {
        self.actor_entry_mut(id).map(|a| a as &mut dyn PlayerActor)
    }

    fn actor(&self, id: ActorId) -> Option<&dyn PlayerActor> {
        self.actor_entry(id).map(|a| a as &dyn PlayerActor)
    }
}

impl ReplayStage for ScriptedWorld {
    fn set_actor_visible(&mut self, actor: ActorId, visible: bool) {
        if visible {
            self.hidden.remove(&actor);
        } else {
            self.hidden.insert(actor);
        }
    }

    fn set_replay_view(&mut self, active: bool) {
        self.replay_view = active;
    }

    fn apply_replay_camera(&mut self, view: CameraView) {
        self.replay_camera.push(view);
    }
}
