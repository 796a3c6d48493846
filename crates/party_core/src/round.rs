//! Round phase state machine.
//!
//! A round runs Placement → (Cooldown → Placement)* → Survival → Ending →
//! Intermission, then loops into the next round. The machine is advanced by
//! [`RoundOrchestrator::advance`] once per rendered frame with the frame's
//! elapsed time; it never sleeps or spawns tasks.
//!
//! # Timing
//!
//! Elapsed time that crosses a phase boundary is carried into the next
//! phase, so transitions land on exact match-clock times regardless of frame
//! length. A new round always starts on a frame boundary: time left over
//! when an intermission expires is dropped, so at most one round starts per
//! `advance` call.
//!
//! Deaths are checked after each slice of time is spent, in every phase. A
//! wipe during placement goes straight to Ending; survival is never entered.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use party_core::config::MatchConfig;
//! use party_core::round::{RoundOrchestrator, RoundPhase};
//!
//! let orchestrator = RoundOrchestrator::new(MatchConfig::default());
//! assert_eq!(orchestrator.phase(), RoundPhase::Idle);
//! assert_eq!(orchestrator.round(), 0);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::MatchConfig;
use crate::error::{MatchError, Result};
use crate::events::{PhaseEvent, PhaseEventBus, PhaseKind};
use crate::players::PlayerLifecycleTracker;
use crate::recording::RecordingRig;
use crate::world::{PlayerRoster, PoseSource};

/// The active phase and its timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RoundPhase {
    /// No match running yet.
    #[default]
    Idle,
    /// Players may place objects.
    Placement {
        /// Time left in the window.
        remaining: Duration,
    },
    /// Pause between placement passes.
    Cooldown {
        /// Time left in the pause.
        remaining: Duration,
    },
    /// Players must survive.
    Survival {
        /// Time left, or `None` when unbounded.
        remaining: Option<Duration>,
    },
    /// Round is wrapping up; never observed between `advance` calls.
    Ending,
    /// Pause before the next round.
    Intermission {
        /// Time left before the next round starts.
        remaining: Duration,
    },
    /// Terminal trigger fired; no further rounds.
    Finished,
}

impl RoundPhase {
    /// Phase without its timer.
    #[must_use]
    pub const fn kind(&self) -> PhaseKind {
        match self {
            Self::Idle => PhaseKind::Idle,
            Self::Placement { .. } => PhaseKind::Placement,
            Self::Cooldown { .. } => PhaseKind::Cooldown,
            Self::Survival { .. } => PhaseKind::Survival,
            Self::Ending => PhaseKind::Ending,
            Self::Intermission { .. } => PhaseKind::Intermission,
            Self::Finished => PhaseKind::Finished,
        }
    }

    /// Time left on the phase timer, if it has one.
    #[must_use]
    pub const fn remaining(&self) -> Option<Duration> {
        match self {
            Self::Placement { remaining }
            | Self::Cooldown { remaining }
            | Self::Intermission { remaining } => Some(*remaining),
            Self::Survival { remaining } => *remaining,
            Self::Idle | Self::Ending | Self::Finished => None,
        }
    }

    /// Whether the machine is inside a round cycle.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        !matches!(self, Self::Idle | Self::Finished)
    }
}

/// Borrowed collaborators the orchestrator drives during a call.
pub struct RoundContext<'a, W: ?Sized> {
    /// Alive/dead bookkeeping.
    pub players: &'a mut PlayerLifecycleTracker,
    /// Recorders started and stopped with each round.
    pub recording: &'a mut RecordingRig,
    /// Where phase notifications go.
    pub events: &'a mut PhaseEventBus,
    /// Host scene.
    pub world: &'a mut W,
}

/// Result of spending time against a phase timer.
enum Timer {
    /// Timer still running with this much left.
    Running(Duration),
    /// Timer ran out; leftover time stays in the budget.
    Expired,
}

/// The round phase state machine.
#[derive(Debug, Clone)]
pub struct RoundOrchestrator {
    config: MatchConfig,
    phase: RoundPhase,
    round: u32,
    passes_done: u32,
    clock: Duration,
}

impl RoundOrchestrator {
    /// Idle orchestrator.
    #[must_use]
    pub fn new(config: MatchConfig) -> Self {
        Self {
            config,
            phase: RoundPhase::Idle,
            round: 0,
            passes_done: 0,
            clock: Duration::ZERO,
        }
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> RoundPhase {
        self.phase
    }

    /// Current round number (0 before the first round).
    #[must_use]
    pub const fn round(&self) -> u32 {
        self.round
    }

    /// Match clock: total time spent by `advance`.
    #[must_use]
    pub const fn clock(&self) -> Duration {
        self.clock
    }

    /// Timing configuration.
    #[must_use]
    pub const fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Start the match at round 1.
    ///
    /// Called on a running match it cancels the in-flight phase and starts
    /// the next round immediately.
    pub fn start<W>(&mut self, ctx: &mut RoundContext<'_, W>) -> Result<()>
    where
        W: PlayerRoster + PoseSource + ?Sized,
    {
        if self.phase == RoundPhase::Finished {
            tracing::error!("Match already finished; ignoring start");
            return Err(MatchError::AlreadyFinished);
        }
        if ctx.players.is_empty() {
            tracing::error!("No players registered; match not started");
            return Err(MatchError::NoPlayers);
        }
        if self.phase.is_running() {
            tracing::info!(round = self.round, phase = %self.phase.kind(), "Cancelling phase for a new round");
            self.close_phase(ctx.events);
        }
        self.begin_round(ctx);
        Ok(())
    }

    /// Spend `dt` of wall time and return the (possibly new) phase.
    pub fn advance<W>(&mut self, dt: Duration, ctx: &mut RoundContext<'_, W>) -> RoundPhase
    where
        W: PlayerRoster + PoseSource + ?Sized,
    {
        if !self.phase.is_running() {
            return self.phase;
        }
        ctx.players.sync_with(&*ctx.world);

        let mut budget = dt;

        loop {
            match self.phase {
                RoundPhase::Idle | RoundPhase::Finished => break,

                RoundPhase::Placement { remaining } => {
                    match self.spend(remaining, &mut budget, ctx.events) {
                        Timer::Running(left) => {
                            self.phase = RoundPhase::Placement { remaining: left };
                            if !ctx.players.all_dead() {
                                break;
                            }
                            tracing::info!(round = self.round, "All players dead during placement");
                            self.close_placement(ctx.events);
                            self.transition(RoundPhase::Ending, ctx.events);
                        }
                        Timer::Expired => {
                            self.close_placement(ctx.events);
                            if ctx.players.all_dead() {
                                tracing::info!(round = self.round, "All players dead during placement");
                                self.transition(RoundPhase::Ending, ctx.events);
                            } else if ctx.players.len() == 1 {
                                self.enter_survival(ctx.events);
                            } else {
                                self.enter_cooldown(ctx.events);
                            }
                        }
                    }
                }

                RoundPhase::Cooldown { remaining } => {
                    match self.spend(remaining, &mut budget, ctx.events) {
                        Timer::Running(left) => {
                            self.phase = RoundPhase::Cooldown { remaining: left };
                            if !ctx.players.all_dead() {
                                break;
                            }
                            self.publish(ctx.events, countdown(Duration::ZERO));
                            self.transition(RoundPhase::Ending, ctx.events);
                        }
                        Timer::Expired => {
                            self.publish(ctx.events, countdown(Duration::ZERO));
                            if ctx.players.all_dead() {
                                self.transition(RoundPhase::Ending, ctx.events);
                            } else if self.passes_done < self.config.placement_passes {
                                self.enter_placement(ctx.events);
                            } else {
                                self.enter_survival(ctx.events);
                            }
                        }
                    }
                }

                RoundPhase::Survival { remaining } => {
                    let expired = match remaining {
                        None => {
                            self.clock += budget;
                            budget = Duration::ZERO;
                            false
                        }
                        Some(remaining) => match self.spend(remaining, &mut budget, ctx.events) {
                            Timer::Running(left) => {
                                self.phase = RoundPhase::Survival {
                                    remaining: Some(left),
                                };
                                false
                            }
                            Timer::Expired => true,
                        },
                    };

                    if ctx.players.any_reached_goal() && self.config.goal_ends_match {
                        tracing::info!(round = self.round, "Goal reached; ending match");
                        self.finish(ctx.recording, ctx.events);
                        break;
                    }
                    if expired || ctx.players.all_dead() || ctx.players.any_reached_goal() {
                        tracing::info!(
                            round = self.round,
                            expired,
                            alive = ctx.players.alive_count(),
                            "Survival over"
                        );
                        if remaining.is_some() {
                            self.publish(ctx.events, countdown(Duration::ZERO));
                        }
                        self.transition(RoundPhase::Ending, ctx.events);
                    } else {
                        break;
                    }
                }

                RoundPhase::Ending => {
                    self.publish(ctx.events, PhaseEvent::RoundEnd { round: self.round });
                    ctx.recording.stop_all();
                    tracing::info!(round = self.round, "Round ended");
                    let delay = self.config.intermission_delay;
                    self.transition(RoundPhase::Intermission { remaining: delay }, ctx.events);
                    self.publish(ctx.events, countdown(delay));
                }

                RoundPhase::Intermission { remaining } => {
                    match self.spend(remaining, &mut budget, ctx.events) {
                        Timer::Running(left) => {
                            self.phase = RoundPhase::Intermission { remaining: left };
                            break;
                        }
                        Timer::Expired => {
                            self.publish(ctx.events, countdown(Duration::ZERO));
                            // Leftover time is dropped so recording starts on a frame boundary.
                            self.begin_round(ctx);
                            break;
                        }
                    }
                }
            }
        }

        self.phase
    }

    /// Fire the terminal trigger: stop recording and end the match for good.
    ///
    /// Returns `false` if the match was not running.
    pub fn trigger_terminal(
        &mut self,
        recording: &mut RecordingRig,
        events: &mut PhaseEventBus,
    ) -> bool {
        if !self.phase.is_running() {
            tracing::warn!(phase = %self.phase.kind(), "Terminal trigger outside a running match");
            return false;
        }
        self.finish(recording, events);
        true
    }

    /// Return to `Idle` with the round counter and clock cleared.
    pub fn reset(&mut self) {
        self.phase = RoundPhase::Idle;
        self.round = 0;
        self.passes_done = 0;
        self.clock = Duration::ZERO;
        tracing::info!("Orchestrator reset");
    }

    fn begin_round<W>(&mut self, ctx: &mut RoundContext<'_, W>)
    where
        W: PlayerRoster + PoseSource + ?Sized,
    {
        self.round += 1;
        self.passes_done = 0;
        ctx.players.revive_all(&mut *ctx.world);
        ctx.recording.start_all(&*ctx.world);
        tracing::info!(round = self.round, players = ctx.players.len(), "Round started");
        self.publish(ctx.events, PhaseEvent::RoundStart { round: self.round });
        self.enter_placement(ctx.events);
    }

    fn enter_placement(&mut self, events: &mut PhaseEventBus) {
        self.passes_done += 1;
        let duration = self.config.placement_time;
        self.transition(RoundPhase::Placement { remaining: duration }, events);
        self.publish(events, PhaseEvent::PlacementStart { duration });
        self.publish(events, PhaseEvent::PlacementAllowedChange { allowed: true });
        self.publish(events, countdown(duration));
    }

    fn close_placement(&mut self, events: &mut PhaseEventBus) {
        self.publish(events, countdown(Duration::ZERO));
        self.publish(events, PhaseEvent::PlacementAllowedChange { allowed: false });
        self.publish(events, PhaseEvent::PlacementEnd);
    }

    fn enter_cooldown(&mut self, events: &mut PhaseEventBus) {
        let remaining = self.config.inter_placement_delay;
        self.transition(RoundPhase::Cooldown { remaining }, events);
        self.publish(events, countdown(remaining));
    }

    fn enter_survival(&mut self, events: &mut PhaseEventBus) {
        let remaining = self.config.survival_limit();
        self.transition(RoundPhase::Survival { remaining }, events);
        if let Some(remaining) = remaining {
            self.publish(events, countdown(remaining));
        }
    }

    /// Emit the exit notifications of the current phase without transitioning.
    fn close_phase(&mut self, events: &mut PhaseEventBus) {
        match self.phase {
            RoundPhase::Placement { .. } => self.close_placement(events),
            phase if phase.remaining().is_some() => self.publish(events, countdown(Duration::ZERO)),
            _ => {}
        }
    }

    fn finish(&mut self, recording: &mut RecordingRig, events: &mut PhaseEventBus) {
        self.close_phase(events);
        recording.stop_all();
        self.transition(RoundPhase::Finished, events);
        self.publish(events, PhaseEvent::MatchFinished { round: self.round });
        tracing::info!(round = self.round, clock = ?self.clock, "Match finished");
    }

    /// Spend up to `remaining` of `budget` on the current timer.
    fn spend(&mut self, remaining: Duration, budget: &mut Duration, events: &mut PhaseEventBus) -> Timer {
        if *budget >= remaining {
            *budget -= remaining;
            self.clock += remaining;
            return Timer::Expired;
        }
        let left = remaining - *budget;
        if !budget.is_zero() {
            self.clock += *budget;
            *budget = Duration::ZERO;
            self.publish(events, countdown(left));
        }
        Timer::Running(left)
    }

    fn transition(&mut self, to: RoundPhase, events: &mut PhaseEventBus) {
        let from = self.phase.kind();
        self.phase = to;
        tracing::debug!(%from, to = %to.kind(), clock = ?self.clock, "Phase transition");
        self.publish(events, PhaseEvent::PhaseChanged { from, to: to.kind() });
    }

    fn publish(&self, events: &mut PhaseEventBus, event: PhaseEvent) {
        events.publish(self.clock, event);
    }
}

fn countdown(remaining: Duration) -> PhaseEvent {
    PhaseEvent::CountdownTick { remaining }
}
