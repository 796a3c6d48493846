//! The match: one owner for every piece of round state.
//!
//! [`Match`] replaces scene-wide singletons. The host creates one, registers
//! its players, and drives it from two loops:
//!
//! - [`Match::update`] once per rendered frame with the frame's elapsed time
//!   (phase timers).
//! - [`Match::fixed_update`] once per fixed tick (recording, then replay).
//!
//! Both take the host world explicitly; the match never holds on to it.

use std::time::Duration;

use crate::config::MatchConfig;
use crate::error::{MatchError, Result};
use crate::events::{PhaseEvent, PhaseEventBus};
use crate::frame::{PlayerId, Pose, StandInBlueprint};
use crate::players::PlayerLifecycleTracker;
use crate::recording::RecordingRig;
use crate::replay::{ReplayDirector, ReplayStep};
use crate::round::{RoundContext, RoundOrchestrator, RoundPhase};
use crate::world::ArenaWorld;

/// What one fixed tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixedStep {
    /// Nothing to record or replay.
    Idle,
    /// Recorders sampled the world.
    Recorded,
    /// Replay advanced.
    Replay(ReplayStep),
}

/// A running (or not yet started) match.
#[derive(Debug)]
pub struct Match {
    orchestrator: RoundOrchestrator,
    players: PlayerLifecycleTracker,
    recording: RecordingRig,
    replay: ReplayDirector,
    events: PhaseEventBus,
    fixed_ticks: u64,
}

impl Match {
    /// Idle match with an event queue.
    #[must_use]
    pub fn new(config: MatchConfig) -> Self {
        Self::with_events(config, PhaseEventBus::new())
    }

    /// Idle match publishing to `events`.
    #[must_use]
    pub fn with_events(config: MatchConfig, events: PhaseEventBus) -> Self {
        let replay = ReplayDirector::new(config.replay_restart_ticks());
        Self {
            orchestrator: RoundOrchestrator::new(config),
            players: PlayerLifecycleTracker::new(),
            recording: RecordingRig::new(),
            replay,
            events,
            fixed_ticks: 0,
        }
    }

    /// Register a player with its spawn pose and replay stand-in.
    ///
    /// A player without a blueprint is recorded but never replayed.
    pub fn register_player(
        &mut self,
        id: PlayerId,
        spawn: Pose,
        blueprint: Option<StandInBlueprint>,
    ) -> Result<()> {
        if !self.players.register(id, spawn) {
            return Err(MatchError::DuplicatePlayer(id));
        }
        self.recording.add_actor(id, blueprint);
        tracing::info!(player = %id, "Player registered");
        Ok(())
    }

    /// Record the gameplay camera; its track times the replay.
    pub fn attach_camera(&mut self) {
        self.recording.attach_camera();
    }

    /// Start round 1, or cancel the current phase and start the next round.
    pub fn start<W: ArenaWorld + ?Sized>(&mut self, world: &mut W) -> Result<()> {
        let mut ctx = RoundContext {
            players: &mut self.players,
            recording: &mut self.recording,
            events: &mut self.events,
            world,
        };
        self.orchestrator.start(&mut ctx)
    }

    /// Advance phase timers by one frame's elapsed time.
    ///
    /// Enters replay when the phase machine finishes the match on its own
    /// (goal reached with `goal_ends_match`).
    pub fn update<W: ArenaWorld + ?Sized>(&mut self, dt: Duration, world: &mut W) -> RoundPhase {
        let before = self.orchestrator.phase();
        let mut ctx = RoundContext {
            players: &mut self.players,
            recording: &mut self.recording,
            events: &mut self.events,
            world: &mut *world,
        };
        let phase = self.orchestrator.advance(dt, &mut ctx);
        if phase == RoundPhase::Finished && before != RoundPhase::Finished {
            if let Err(err) = self.enter_replay(world) {
                tracing::error!(%err, "Replay not started");
            }
        }
        phase
    }

    /// One fixed tick: sample recorders while a round records, step the
    /// replay once the match has finished.
    pub fn fixed_update<W: ArenaWorld + ?Sized>(&mut self, world: &mut W) -> FixedStep {
        self.fixed_ticks += 1;
        if self.recording.is_recording() {
            self.recording.capture_all(&*world);
            return FixedStep::Recorded;
        }
        if self.replay.is_playing() {
            return FixedStep::Replay(self.replay.step(world));
        }
        FixedStep::Idle
    }

    /// Report a death from a hazard. Repeats are no-ops.
    pub fn notify_death(&mut self, id: PlayerId) -> Result<bool> {
        if self.players.player(id).is_none() {
            return Err(MatchError::UnknownPlayer(id));
        }
        Ok(self.players.notify_death(id))
    }

    /// Report a goal. Repeats are no-ops.
    pub fn notify_goal(&mut self, id: PlayerId) -> Result<bool> {
        if self.players.player(id).is_none() {
            return Err(MatchError::UnknownPlayer(id));
        }
        Ok(self.players.notify_goal(id))
    }

    /// End the match and start the replay. Returns frames per loop.
    pub fn trigger_terminal<W: ArenaWorld + ?Sized>(&mut self, world: &mut W) -> Result<usize> {
        match self.orchestrator.phase() {
            RoundPhase::Idle => return Err(MatchError::NotStarted),
            RoundPhase::Finished => return Err(MatchError::AlreadyFinished),
            _ => {}
        }
        self.orchestrator
            .trigger_terminal(&mut self.recording, &mut self.events);
        self.enter_replay(world)
    }

    /// Hand recorded tracks to the replay director.
    fn enter_replay<W: ArenaWorld + ?Sized>(&mut self, world: &mut W) -> Result<usize> {
        let recorded = self.recording.hand_off();
        let frames = match recorded.camera {
            Some(camera) => self.replay.begin(recorded.actors, camera, world),
            None => self.replay.begin_with_static_camera(recorded.actors, world),
        }?;
        self.events
            .publish(self.orchestrator.clock(), PhaseEvent::ReplayStarted { frames });
        Ok(frames)
    }

    /// Tear down replay and return to `Idle`, keeping registered players.
    pub fn reset<W: ArenaWorld + ?Sized>(&mut self, world: &mut W) {
        self.replay.end(world);
        // Drop whatever the last round captured.
        let _ = self.recording.hand_off();
        self.orchestrator.reset();
        self.fixed_ticks = 0;
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> RoundPhase {
        self.orchestrator.phase()
    }

    /// Current round number.
    #[must_use]
    pub fn round(&self) -> u32 {
        self.orchestrator.round()
    }

    /// Match clock.
    #[must_use]
    pub fn clock(&self) -> Duration {
        self.orchestrator.clock()
    }

    /// Fixed ticks seen since creation or the last reset.
    #[must_use]
    pub const fn fixed_ticks(&self) -> u64 {
        self.fixed_ticks
    }

    /// Timing configuration.
    #[must_use]
    pub fn config(&self) -> &MatchConfig {
        self.orchestrator.config()
    }

    /// Player bookkeeping.
    #[must_use]
    pub const fn players(&self) -> &PlayerLifecycleTracker {
        &self.players
    }

    /// Recorders.
    #[must_use]
    pub const fn recording(&self) -> &RecordingRig {
        &self.recording
    }

    /// Replay director.
    #[must_use]
    pub const fn replay(&self) -> &ReplayDirector {
        &self.replay
    }

    /// Event bus, for subscribing.
    pub fn events_mut(&mut self) -> &mut PhaseEventBus {
        &mut self.events
    }

    /// Whether the replay is running.
    #[must_use]
    pub fn is_replaying(&self) -> bool {
        self.replay.is_playing()
    }
}
