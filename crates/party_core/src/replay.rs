//! Replay playback of recorded rounds.
//!
//! The [`ReplayDirector`] owns one [`PlaybackTrack`] per recorded actor and a
//! camera path. Every fixed tick it moves all stand-ins and the replay camera
//! to the same shared cursor, so actors and camera stay in lock-step. The
//! camera path is the timing reference: an actor track shorter than it holds
//! its last pose, a longer one is cut to the camera length.
//!
//! Samples are looked up by their recorded tick, not their position in the
//! track. A tick with no sample (the actor was inactive) holds the previous
//! pose, so stand-ins never run ahead of the camera after a gap.
//!
//! When the cursor runs off the end, playback pauses for a configured number
//! of fixed ticks and then loops from tick 0. It never stops on its own; the
//! host calls [`ReplayDirector::end`] on reset or scene change.
//!
//! # Stand-ins
//!
//! Stand-ins ("ghosts") live in an arena owned by the director. They are
//! created in [`ReplayDirector::begin`], carry no collision, and are destroyed
//! in [`ReplayDirector::end`]. Hosts read [`ReplayDirector::stand_ins`] to
//! render them.

use serde::{Deserialize, Serialize};

use crate::error::ReplayError;
use crate::frame::{ActorId, ActorTrack, FrameSample, Pose, StandInBlueprint};
use crate::world::ReplayStage;

/// Handle to a stand-in in the director's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StandInId(pub u32);

/// A non-interactive, visual-only actor driven by a recorded track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StandIn {
    /// Arena handle.
    pub id: StandInId,
    /// The live actor this stand-in replaces during playback.
    pub actor: ActorId,
    /// Visual identity, always with collision stripped.
    pub blueprint: StandInBlueprint,
    /// Current pose.
    pub pose: Pose,
}

/// Explicitly managed storage for stand-ins.
#[derive(Debug, Clone, Default)]
struct StandInArena {
    next_id: u32,
    slots: Vec<StandIn>,
}

impl StandInArena {
    fn spawn(&mut self, actor: ActorId, blueprint: &StandInBlueprint, pose: Pose) -> StandInId {
        let id = StandInId(self.next_id);
        self.next_id += 1;
        self.slots.push(StandIn {
            id,
            actor,
            blueprint: blueprint.non_interactive(),
            pose,
        });
        id
    }

    fn get_mut(&mut self, id: StandInId) -> Option<&mut StandIn> {
        self.slots.iter_mut().find(|s| s.id == id)
    }

    fn clear(&mut self) -> usize {
        let count = self.slots.len();
        self.slots.clear();
        count
    }
}

/// Read-only view over a recorded track plus the stand-in it drives.
#[derive(Debug, Clone)]
pub struct PlaybackTrack {
    actor: ActorId,
    samples: Vec<FrameSample>,
    stand_in: StandInId,
}

impl PlaybackTrack {
    /// Recorded actor.
    #[must_use]
    pub const fn actor(&self) -> ActorId {
        self.actor
    }

    /// Stand-in driven by this track.
    #[must_use]
    pub const fn stand_in(&self) -> StandInId {
        self.stand_in
    }

    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the track is empty (never true for a spawned track).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sample for the shared cursor: the latest one recorded at or before
    /// that tick, or the first one if the track starts later.
    #[must_use]
    pub fn sample_at(&self, cursor: usize) -> Option<&FrameSample> {
        sample_for_tick(&self.samples, cursor)
    }
}

fn sample_for_tick(samples: &[FrameSample], cursor: usize) -> Option<&FrameSample> {
    let tick = u64::try_from(cursor).unwrap_or(u64::MAX);
    match samples.partition_point(|s| s.tick <= tick) {
        0 => samples.first(),
        after => samples.get(after - 1),
    }
}

/// Loop length covered by a tick-ordered track.
fn span(samples: &[FrameSample]) -> usize {
    samples
        .last()
        .map_or(0, |s| usize::try_from(s.tick.saturating_add(1)).unwrap_or(usize::MAX))
}

/// Timing reference for a replay session.
#[derive(Debug, Clone)]
enum CameraPath {
    /// Recorded camera samples drive both timing and the replay camera.
    Recorded(Vec<FrameSample>),
    /// No camera was recorded; only the frame count is known.
    Static { frames: usize },
}

impl CameraPath {
    fn frames(&self) -> usize {
        match self {
            Self::Recorded(samples) => span(samples),
            Self::Static { frames } => *frames,
        }
    }
}

/// Where the shared cursor is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Playback {
    #[default]
    Idle,
    Playing {
        cursor: usize,
    },
    Pausing {
        remaining: u64,
    },
}

/// Outcome of one fixed tick of playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayStep {
    /// No session is active.
    Idle,
    /// Frame `index` was applied to every stand-in and the camera.
    Frame {
        /// Cursor that was applied.
        index: usize,
    },
    /// Waiting between loops; `remaining` ticks left after this one.
    Paused {
        /// Ticks left before looping.
        remaining: u64,
    },
}

/// Drives stand-ins and the replay camera through recorded tracks.
#[derive(Debug, Clone)]
pub struct ReplayDirector {
    restart_delay_ticks: u64,
    arena: StandInArena,
    tracks: Vec<PlaybackTrack>,
    camera: Option<CameraPath>,
    playback: Playback,
    loops_completed: u64,
    hidden: Vec<ActorId>,
}

impl ReplayDirector {
    /// Create an idle director that pauses `restart_delay_ticks` between loops.
    #[must_use]
    pub fn new(restart_delay_ticks: u64) -> Self {
        Self {
            restart_delay_ticks,
            arena: StandInArena::default(),
            tracks: Vec::new(),
            camera: None,
            playback: Playback::Idle,
            loops_completed: 0,
            hidden: Vec::new(),
        }
    }

    /// Start looping playback of `tracks`, timed by `camera_track`.
    ///
    /// Returns the number of frames per loop. An empty camera track is
    /// rejected and leaves the director, including any running session,
    /// untouched. An accepted call ends the previous session first.
    pub fn begin<S: ReplayStage + ?Sized>(
        &mut self,
        tracks: Vec<ActorTrack>,
        camera_track: Vec<FrameSample>,
        stage: &mut S,
    ) -> Result<usize, ReplayError> {
        if camera_track.is_empty() {
            tracing::error!("Replay requested with an empty camera track; ignored");
            return Err(ReplayError::EmptyReplay);
        }
        self.end(stage);
        Ok(self.enter(tracks, CameraPath::Recorded(camera_track), stage))
    }

    /// Start looping playback with no recorded camera.
    ///
    /// The longest actor track sets the loop length; the replay camera is
    /// left where the host put it.
    pub fn begin_with_static_camera<S: ReplayStage + ?Sized>(
        &mut self,
        tracks: Vec<ActorTrack>,
        stage: &mut S,
    ) -> Result<usize, ReplayError> {
        let frames = tracks.iter().map(|t| span(&t.samples)).max().unwrap_or(0);
        if frames == 0 {
            tracing::error!("Replay requested with no recorded samples; ignored");
            return Err(ReplayError::NoTracks);
        }
        self.end(stage);
        tracing::warn!("Replaying without a recorded camera path");
        Ok(self.enter(tracks, CameraPath::Static { frames }, stage))
    }

    fn enter<S: ReplayStage + ?Sized>(
        &mut self,
        tracks: Vec<ActorTrack>,
        camera: CameraPath,
        stage: &mut S,
    ) -> usize {
        let frames = camera.frames();

        for track in tracks {
            let Some(blueprint) = track.blueprint.as_ref() else {
                tracing::warn!(actor = %track.actor, "No stand-in blueprint; actor skipped in replay");
                continue;
            };
            let mut samples = track.samples;
            if span(&samples) > frames {
                tracing::debug!(
                    actor = %track.actor,
                    recorded = span(&samples),
                    frames,
                    "Actor track longer than camera track; truncating"
                );
                samples.retain(|s| usize::try_from(s.tick).map_or(false, |t| t < frames));
            }
            let Some(first) = samples.first() else {
                tracing::warn!(actor = %track.actor, "Empty track; actor skipped in replay");
                continue;
            };

            let stand_in = self.arena.spawn(track.actor, blueprint, first.pose());
            stage.set_actor_visible(track.actor, false);
            self.hidden.push(track.actor);

            self.tracks.push(PlaybackTrack {
                actor: track.actor,
                samples,
                stand_in,
            });
        }

        stage.set_replay_view(true);
        self.camera = Some(camera);
        self.playback = Playback::Playing { cursor: 0 };
        self.loops_completed = 0;

        tracing::info!(
            frames,
            stand_ins = self.tracks.len(),
            "Replay started; looping until reset"
        );
        frames
    }

    /// Advance playback by one fixed tick.
    pub fn step<S: ReplayStage + ?Sized>(&mut self, stage: &mut S) -> ReplayStep {
        let frames = self.frames_per_loop();
        match self.playback {
            Playback::Idle => ReplayStep::Idle,
            Playback::Playing { cursor } => {
                self.apply_frame(cursor, stage);
                let next = cursor + 1;
                self.playback = if next < frames {
                    Playback::Playing { cursor: next }
                } else {
                    self.loops_completed += 1;
                    tracing::debug!(loops = self.loops_completed, "Replay loop finished");
                    if self.restart_delay_ticks == 0 {
                        Playback::Playing { cursor: 0 }
                    } else {
                        Playback::Pausing {
                            remaining: self.restart_delay_ticks,
                        }
                    }
                };
                ReplayStep::Frame { index: cursor }
            }
            Playback::Pausing { remaining } => {
                let remaining = remaining.saturating_sub(1);
                self.playback = if remaining == 0 {
                    Playback::Playing { cursor: 0 }
                } else {
                    Playback::Pausing { remaining }
                };
                ReplayStep::Paused { remaining }
            }
        }
    }

    fn apply_frame<S: ReplayStage + ?Sized>(&mut self, cursor: usize, stage: &mut S) {
        for track in &self.tracks {
            let Some(sample) = track.sample_at(cursor) else {
                continue;
            };
            if let Some(stand_in) = self.arena.get_mut(track.stand_in) {
                stand_in.pose = sample.pose();
            }
        }
        if let Some(CameraPath::Recorded(samples)) = &self.camera {
            if let Some(view) = sample_for_tick(samples, cursor).and_then(FrameSample::view) {
                stage.apply_replay_camera(view);
            }
        }
    }

    /// Jump back to tick 0 of the current session.
    pub fn rewind(&mut self) {
        if self.playback != Playback::Idle {
            self.playback = Playback::Playing { cursor: 0 };
        }
    }

    /// Tear down the session: destroy stand-ins, show live actors, drop tracks.
    pub fn end<S: ReplayStage + ?Sized>(&mut self, stage: &mut S) {
        if self.playback == Playback::Idle && self.arena.slots.is_empty() {
            return;
        }
        for actor in self.hidden.drain(..) {
            stage.set_actor_visible(actor, true);
        }
        stage.set_replay_view(false);
        let destroyed = self.arena.clear();
        self.tracks.clear();
        self.camera = None;
        self.playback = Playback::Idle;
        tracing::info!(destroyed, loops = self.loops_completed, "Replay ended");
    }

    /// Whether a session is active.
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.playback != Playback::Idle
    }

    /// Cursor of the next frame to apply, or `None` while paused or idle.
    #[must_use]
    pub fn cursor(&self) -> Option<usize> {
        match self.playback {
            Playback::Playing { cursor } => Some(cursor),
            _ => None,
        }
    }

    /// Number of frames in one loop.
    #[must_use]
    pub fn frames_per_loop(&self) -> usize {
        self.camera.as_ref().map_or(0, CameraPath::frames)
    }

    /// Number of full loops played in this session.
    #[must_use]
    pub const fn loops_completed(&self) -> u64 {
        self.loops_completed
    }

    /// Pause between loops, in fixed ticks.
    #[must_use]
    pub const fn restart_delay_ticks(&self) -> u64 {
        self.restart_delay_ticks
    }

    /// All live stand-ins.
    #[must_use]
    pub fn stand_ins(&self) -> &[StandIn] {
        &self.arena.slots
    }

    /// Playback tracks of the current session.
    #[must_use]
    pub fn tracks(&self) -> &[PlaybackTrack] {
        &self.tracks
    }

    /// Whether the current session replays a recorded camera path.
    #[must_use]
    pub fn has_camera_path(&self) -> bool {
        matches!(self.camera, Some(CameraPath::Recorded(_)))
    }
}
