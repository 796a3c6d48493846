//! Fixed-tick pose recording.
//!
//! Recorders are driven only from the fixed-timestep update, so the number
//! of samples depends on simulated time and never on render frame rate.
//! Samples are stored raw: no interpolation, no compression.
//!
//! # Tick count
//!
//! `start()` writes tick 0. Each of the following N fixed ticks appends one
//! sample, so a session of N ticks yields N + 1 samples for an actor that
//! stayed active throughout.
//!
//! ```
//! use party_core::frame::{ActorId, Pose};
//! use party_core::recording::ActorRecorder;
//!
//! let mut recorder = ActorRecorder::new(ActorId(1), None);
//! recorder.start(Some(Pose::default()));
//! for _ in 0..5 {
//!     recorder.capture(Some(Pose::default()));
//! }
//! recorder.stop();
//! assert_eq!(recorder.snapshot().len(), 6);
//! ```

use std::mem;

use serde::{Deserialize, Serialize};

use crate::frame::{ActorId, ActorTrack, CameraView, FrameSample, Pose, StandInBlueprint};
use crate::world::PoseSource;

/// Lifecycle of a recorder buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RecorderState {
    /// Not sampling; the buffer (possibly empty) can be read.
    #[default]
    Idle,
    /// Sampling on every fixed tick.
    Recording,
    /// Buffer handed off to replay; untouched until the next `start()`.
    Consumed,
}

/// Append-only sample storage shared by actor and camera recorders.
#[derive(Debug, Clone, Default)]
struct SampleBuffer {
    samples: Vec<FrameSample>,
    next_tick: u64,
    state: RecorderState,
}

impl SampleBuffer {
    fn restart(&mut self) {
        self.samples.clear();
        self.next_tick = 0;
        self.state = RecorderState::Recording;
    }

    /// Advance one tick, appending `sample` (built for that tick) if present.
    fn tick_with(&mut self, sample: impl FnOnce(u64) -> Option<FrameSample>) {
        if self.state != RecorderState::Recording {
            return;
        }
        let tick = self.next_tick;
        self.next_tick += 1;
        if let Some(sample) = sample(tick) {
            #[cfg(feature = "debug-validation")]
            debug_assert!(
                self.samples.last().map_or(true, |last| last.tick < sample.tick),
                "samples must be strictly tick-ordered"
            );
            self.samples.push(sample);
        }
    }

    fn stop(&mut self) {
        if self.state == RecorderState::Recording {
            self.state = RecorderState::Idle;
        }
    }

    fn take(&mut self) -> Vec<FrameSample> {
        self.stop();
        self.state = RecorderState::Consumed;
        self.next_tick = 0;
        mem::take(&mut self.samples)
    }
}

/// Per-actor pose recorder.
#[derive(Debug, Clone)]
pub struct ActorRecorder {
    actor: ActorId,
    blueprint: Option<StandInBlueprint>,
    buffer: SampleBuffer,
}

impl ActorRecorder {
    /// Create an idle recorder for `actor`.
    #[must_use]
    pub fn new(actor: ActorId, blueprint: Option<StandInBlueprint>) -> Self {
        Self {
            actor,
            blueprint,
            buffer: SampleBuffer::default(),
        }
    }

    /// The recorded actor.
    #[must_use]
    pub const fn actor(&self) -> ActorId {
        self.actor
    }

    /// Stand-in blueprint handed to replay along with the track.
    #[must_use]
    pub fn blueprint(&self) -> Option<&StandInBlueprint> {
        self.blueprint.as_ref()
    }

    /// Clear the buffer and record `pose` as tick 0.
    ///
    /// Calling this while already recording restarts the session.
    pub fn start(&mut self, pose: Option<Pose>) {
        self.buffer.restart();
        self.capture(pose);
        tracing::debug!(actor = %self.actor, "Actor recording started");
    }

    /// Record one fixed tick. `None` means the actor is inactive this tick.
    pub fn capture(&mut self, pose: Option<Pose>) {
        self.buffer
            .tick_with(|tick| pose.map(|pose| FrameSample::from_pose(tick, pose)));
    }

    /// Freeze the buffer.
    pub fn stop(&mut self) {
        self.buffer.stop();
    }

    /// Copy of everything recorded so far.
    #[must_use]
    pub fn snapshot(&self) -> Vec<FrameSample> {
        self.buffer.samples.clone()
    }

    /// Hand the recording off; the recorder is consumed until the next start.
    pub fn take_track(&mut self) -> ActorTrack {
        ActorTrack {
            actor: self.actor,
            samples: self.buffer.take(),
            blueprint: self.blueprint.clone(),
        }
    }

    /// Current recorder state.
    #[must_use]
    pub const fn state(&self) -> RecorderState {
        self.buffer.state
    }

    /// Whether the recorder is sampling.
    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.buffer.state == RecorderState::Recording
    }

    /// Number of recorded samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.samples.len()
    }

    /// Whether nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.samples.is_empty()
    }
}

/// Camera recorder; like [`ActorRecorder`] but every sample carries the FOV.
#[derive(Debug, Clone, Default)]
pub struct CameraRecorder {
    buffer: SampleBuffer,
}

impl CameraRecorder {
    /// Create an idle camera recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear the buffer and record `view` as tick 0.
    pub fn start(&mut self, view: Option<CameraView>) {
        self.buffer.restart();
        self.capture(view);
        tracing::debug!("Camera recording started");
    }

    /// Record one fixed tick.
    pub fn capture(&mut self, view: Option<CameraView>) {
        self.buffer
            .tick_with(|tick| view.map(|view| FrameSample::from_view(tick, view)));
    }

    /// Freeze the buffer.
    pub fn stop(&mut self) {
        self.buffer.stop();
    }

    /// Copy of everything recorded so far.
    #[must_use]
    pub fn snapshot(&self) -> Vec<FrameSample> {
        self.buffer.samples.clone()
    }

    /// Hand the recording off; the recorder is consumed until the next start.
    pub fn take_track(&mut self) -> Vec<FrameSample> {
        self.buffer.take()
    }

    /// Current recorder state.
    #[must_use]
    pub const fn state(&self) -> RecorderState {
        self.buffer.state
    }

    /// Whether the recorder is sampling.
    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.buffer.state == RecorderState::Recording
    }

    /// Number of recorded samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.samples.len()
    }

    /// Whether nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.samples.is_empty()
    }
}

/// Everything recorded in a round, moved out of the recorders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RecordedRound {
    /// One track per registered actor, in registration order.
    pub actors: Vec<ActorTrack>,
    /// Camera path, if a camera recorder was attached.
    pub camera: Option<Vec<FrameSample>>,
}

/// All recorders of a match: one per player plus an optional camera.
#[derive(Debug, Clone, Default)]
pub struct RecordingRig {
    actors: Vec<ActorRecorder>,
    camera: Option<CameraRecorder>,
}

impl RecordingRig {
    /// Empty rig with no camera.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a recorder for `actor`. Replaces an existing one for the same id.
    pub fn add_actor(&mut self, actor: ActorId, blueprint: Option<StandInBlueprint>) {
        let recorder = ActorRecorder::new(actor, blueprint);
        match self.actors.iter_mut().find(|r| r.actor() == actor) {
            Some(existing) => *existing = recorder,
            None => self.actors.push(recorder),
        }
    }

    /// Attach the camera recorder.
    pub fn attach_camera(&mut self) {
        if self.camera.is_none() {
            self.camera = Some(CameraRecorder::new());
        }
    }

    /// Remove the camera recorder.
    pub fn detach_camera(&mut self) {
        self.camera = None;
    }

    /// Whether a camera recorder is attached.
    #[must_use]
    pub fn has_camera(&self) -> bool {
        self.camera.is_some()
    }

    /// Recorder for `actor`.
    #[must_use]
    pub fn actor(&self, actor: ActorId) -> Option<&ActorRecorder> {
        self.actors.iter().find(|r| r.actor() == actor)
    }

    /// All actor recorders in registration order.
    #[must_use]
    pub fn actors(&self) -> &[ActorRecorder] {
        &self.actors
    }

    /// The camera recorder, if attached.
    #[must_use]
    pub fn camera(&self) -> Option<&CameraRecorder> {
        self.camera.as_ref()
    }

    /// Start (or restart) every recorder from the current world state.
    pub fn start_all<W: PoseSource + ?Sized>(&mut self, world: &W) {
        for recorder in &mut self.actors {
            recorder.start(world.actor_pose(recorder.actor()));
        }
        match self.camera.as_mut() {
            Some(camera) => camera.start(world.camera_view()),
            None => tracing::warn!("No camera recorder attached; recording without camera"),
        }
    }

    /// Sample every active recorder for one fixed tick.
    pub fn capture_all<W: PoseSource + ?Sized>(&mut self, world: &W) {
        for recorder in &mut self.actors {
            if recorder.is_recording() {
                recorder.capture(world.actor_pose(recorder.actor()));
            }
        }
        if let Some(camera) = self.camera.as_mut() {
            if camera.is_recording() {
                camera.capture(world.camera_view());
            }
        }
    }

    /// Freeze every recorder.
    pub fn stop_all(&mut self) {
        for recorder in &mut self.actors {
            recorder.stop();
        }
        if let Some(camera) = self.camera.as_mut() {
            camera.stop();
        }
    }

    /// Whether any recorder is sampling.
    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.actors.iter().any(ActorRecorder::is_recording)
            || self.camera.as_ref().is_some_and(CameraRecorder::is_recording)
    }

    /// Stop everything and move all buffers out.
    pub fn hand_off(&mut self) -> RecordedRound {
        self.stop_all();
        RecordedRound {
            actors: self.actors.iter_mut().map(ActorRecorder::take_track).collect(),
            camera: self.camera.as_mut().map(CameraRecorder::take_track),
        }
    }
}
