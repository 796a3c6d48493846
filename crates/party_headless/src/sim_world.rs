//! Scripted scene for headless runs.
//!
//! Characters glide at a constant per-tick velocity; nothing else moves.
//! Replay-side effects are tracked so the runner can report and hash them.

use party_core::frame::{ActorId, CameraView, Pose};
use party_core::math::Vec3Fixed;
use party_core::world::{PlayerActor, PlayerRoster, PoseSource, ReplayStage};

use crate::scenario::Scenario;

/// One scripted character.
#[derive(Debug, Clone)]
pub struct SimActor {
    id: ActorId,
    name: String,
    pose: Pose,
    velocity: Vec3Fixed,
    alive: bool,
    collision: bool,
    visible: bool,
}

impl SimActor {
    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current pose.
    #[must_use]
    pub const fn pose(&self) -> Pose {
        self.pose
    }

    /// Whether the live character is shown.
    #[must_use]
    pub const fn visible(&self) -> bool {
        self.visible
    }

    /// Whether collision is on.
    #[must_use]
    pub const fn collision(&self) -> bool {
        self.collision
    }
}

impl PlayerActor for SimActor {
    fn is_alive(&self) -> bool {
        self.alive
    }

    fn respawn_at(&mut self, pose: Pose) {
        self.pose = pose;
        self.alive = true;
    }

    fn set_collision_enabled(&mut self, enabled: bool) {
        self.collision = enabled;
    }
}

/// The headless scene.
#[derive(Debug, Clone)]
pub struct SimWorld {
    actors: Vec<SimActor>,
    camera: Option<(CameraView, Vec3Fixed)>,
    replay_view: bool,
    replay_camera: Option<CameraView>,
    camera_cuts: u64,
}

impl SimWorld {
    /// Build the scene a scenario describes.
    #[must_use]
    pub fn from_scenario(scenario: &Scenario) -> Self {
        let actors = scenario
            .players
            .iter()
            .map(|p| SimActor {
                id: p.actor(),
                name: p.name.clone(),
                pose: p.spawn_pose(),
                velocity: p.velocity(),
                alive: true,
                collision: true,
                visible: true,
            })
            .collect();
        Self {
            actors,
            camera: scenario.camera.as_ref().map(|c| (c.view(), c.velocity())),
            replay_view: false,
            replay_camera: None,
            camera_cuts: 0,
        }
    }

    /// Advance characters and camera by one fixed tick.
    ///
    /// Dead characters stay put; the replay camera does not move on its own.
    pub fn step(&mut self) {
        for actor in self.actors.iter_mut().filter(|a| a.alive) {
            actor.pose.position += actor.velocity;
        }
        if let Some((view, velocity)) = self.camera.as_mut() {
            view.pose.position += *velocity;
        }
    }

    /// The character's own death (fall, crush) as opposed to a hazard report.
    pub fn kill(&mut self, id: ActorId) -> bool {
        match self.actors.iter_mut().find(|a| a.id == id) {
            Some(actor) => {
                actor.alive = false;
                true
            }
            None => false,
        }
    }

    /// Character by id.
    #[must_use]
    pub fn sim_actor(&self, id: ActorId) -> Option<&SimActor> {
        self.actors.iter().find(|a| a.id == id)
    }

    /// Whether the replay presentation is on.
    #[must_use]
    pub const fn replay_view(&self) -> bool {
        self.replay_view
    }

    /// Last view applied to the replay camera.
    #[must_use]
    pub const fn replay_camera(&self) -> Option<CameraView> {
        self.replay_camera
    }

    /// Number of replay camera updates applied.
    #[must_use]
    pub const fn camera_cuts(&self) -> u64 {
        self.camera_cuts
    }
}

impl PoseSource for SimWorld {
    fn actor_pose(&self, actor: ActorId) -> Option<Pose> {
        self.sim_actor(actor).map(|a| a.pose)
    }

    fn camera_view(&self) -> Option<CameraView> {
        self.camera.map(|(view, _)| view)
    }
}

impl PlayerRoster for SimWorld {
    fn actor_mut(&mut self, id: ActorId) -> Option<&mut dyn PlayerActor> {
        self.actors
            .iter_mut()
            .find(|a| a.id == id)
            .map(|a| a as &mut dyn PlayerActor)
    }

    fn actor(&self, id: ActorId) -> Option<&dyn PlayerActor> {
        self.sim_actor(id).map(|a| a as &dyn PlayerActor)
    }
}

impl ReplayStage for SimWorld {
    fn set_actor_visible(&mut self, actor: ActorId, visible: bool) {
        if let Some(a) = self.actors.iter_mut().find(|a| a.id == actor) {
            a.visible = visible;
        }
    }

    fn set_replay_view(&mut self, active: bool) {
        self.replay_view = active;
        if !active {
            self.replay_camera = None;
        }
    }

    fn apply_replay_camera(&mut self, view: CameraView) {
        self.replay_camera = Some(view);
        self.camera_cuts += 1;
    }
}
