//! Headless match runner implementation.
//!
//! Drives a [`Match`] against a [`SimWorld`] at the configured fixed tick,
//! fires the scenario timeline and streams every phase event as a JSON line.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::io::{self, Write};
use std::time::Duration;

use party_core::error::MatchError;
use party_core::events::PhaseEventBus;
use party_core::frame::ActorId;
use party_core::game::{FixedStep, Match};
use party_core::replay::ReplayStep;
use thiserror::Error;

use crate::protocol::{Output, RunSummary};
use crate::scenario::{Action, RunLimits, Scenario, ScenarioError, TimelineEvent};
use crate::sim_world::SimWorld;

/// Error type for headless runs.
#[derive(Error, Debug)]
pub enum RunError {
    /// The scenario failed validation.
    #[error(transparent)]
    Scenario(#[from] ScenarioError),
    /// The match rejected setup.
    #[error("Match setup failed: {0}")]
    Match(#[from] MatchError),
    /// Output could not be written.
    #[error("Failed to write output: {0}")]
    Io(#[from] io::Error),
}

/// Headless runner for scripted matches.
#[derive(Debug, Clone)]
pub struct HeadlessRunner {
    scenario: Scenario,
    limits: RunLimits,
}

impl HeadlessRunner {
    /// Create a runner using the scenario's own limits.
    pub fn new(scenario: Scenario) -> Self {
        let limits = scenario.limits;
        Self { scenario, limits }
    }

    /// Override the run limits.
    pub fn with_limits(mut self, limits: RunLimits) -> Self {
        self.limits = limits;
        self
    }

    /// The scenario being run.
    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    /// Build a match with every scenario player registered.
    fn build_match(&self) -> Result<Match, MatchError> {
        let mut game = Match::with_events(self.scenario.config.clone(), PhaseEventBus::new());
        for player in &self.scenario.players {
            game.register_player(player.actor(), player.spawn_pose(), player.blueprint())?;
        }
        if self.scenario.camera.is_some() {
            game.attach_camera();
        }
        Ok(game)
    }

    /// Run the scenario, writing JSON lines to `out`.
    ///
    /// Stops at the wall-time limit or once the replay has looped the
    /// requested number of times, whichever comes first.
    pub fn run<W: Write>(&self, out: &mut W) -> Result<RunSummary, RunError> {
        self.scenario.validate()?;
        let mut game = self.build_match()?;
        let mut world = SimWorld::from_scenario(&self.scenario);
        let dt = game.config().tick_duration();
        let limit = Duration::try_from_secs_f64(self.limits.max_seconds).unwrap_or(Duration::ZERO);
        let timeline = self.scenario.sorted_timeline();

        tracing::info!(
            scenario = %self.scenario.name,
            players = self.scenario.players.len(),
            tick = ?dt,
            "Starting headless run"
        );
        out.write_all(Output::ready(&self.scenario.name, self.scenario.players.len()).to_json_line().as_bytes())?;

        game.start(&mut world)?;

        let mut events = DefaultHasher::new();
        let mut poses = DefaultHasher::new();
        let mut elapsed = Duration::ZERO;
        let mut next_action = 0;
        let mut ticks = 0u64;

        flush_events(&mut game, &mut events, out)?;

        while elapsed < limit {
            while let Some(entry) = timeline.get(next_action).filter(|e| e.at <= elapsed) {
                next_action += 1;
                apply_action(entry, &mut game, &mut world);
                out.write_all(
                    Output::Action {
                        at: elapsed.as_secs_f64(),
                        action: entry.action,
                    }
                    .to_json_line()
                    .as_bytes(),
                )?;
            }

            world.step();
            let step = game.fixed_update(&mut world);
            if let FixedStep::Replay(ReplayStep::Frame { index }) = step {
                index.hash(&mut poses);
                for stand_in in game.replay().stand_ins() {
                    stand_in.actor.hash(&mut poses);
                    stand_in.pose.hash(&mut poses);
                }
            }
            game.update(dt, &mut world);

            ticks += 1;
            elapsed += dt;
            flush_events(&mut game, &mut events, out)?;

            if game.is_replaying() && game.replay().loops_completed() >= self.limits.replay_loops {
                tracing::debug!(loops = game.replay().loops_completed(), "Replay loop limit reached");
                break;
            }
        }

        let summary = RunSummary {
            rounds: game.round(),
            final_phase: game.phase().kind().to_string(),
            ticks,
            replay_frames: game.replay().frames_per_loop(),
            replay_loops: game.replay().loops_completed(),
            event_hash: events.finish(),
            pose_hash: poses.finish(),
        };
        tracing::info!(
            rounds = summary.rounds,
            phase = %summary.final_phase,
            ticks,
            "Headless run complete"
        );
        out.write_all(Output::Summary(summary.clone()).to_json_line().as_bytes())?;
        out.flush()?;
        Ok(summary)
    }
}

/// Write queued phase events and fold them into the event hash.
fn flush_events<W: Write>(game: &mut Match, hasher: &mut DefaultHasher, out: &mut W) -> io::Result<()> {
    for bus_event in game.events_mut().drain() {
        let line = Output::event(&bus_event).to_json_line();
        line.hash(hasher);
        out.write_all(line.as_bytes())?;
    }
    Ok(())
}

/// Fire one timeline entry. Rejected actions are logged, never fatal.
fn apply_action(entry: &TimelineEvent, game: &mut Match, world: &mut SimWorld) {
    let result = match entry.action {
        Action::Kill(id) => {
            let actor = ActorId(id);
            if !world.kill(actor) {
                tracing::warn!(%actor, "Kill targets a missing character");
            }
            Ok(())
        }
        Action::Hazard(id) => game.notify_death(ActorId(id)).map(drop),
        Action::Goal(id) => game.notify_goal(ActorId(id)).map(drop),
        Action::Terminal => game.trigger_terminal(world).map(drop),
        Action::Restart => game.start(world),
    };
    match result {
        Ok(()) => tracing::debug!(at = ?entry.at, action = ?entry.action, "Timeline action"),
        Err(e) => tracing::warn!(at = ?entry.at, action = ?entry.action, error = %e, "Timeline action rejected"),
    }
}

/// Result of running a scenario several times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyReport {
    /// Whether every run produced the same summary.
    pub is_deterministic: bool,
    /// Summary of each run, in order.
    pub summaries: Vec<RunSummary>,
}

impl VerifyReport {
    /// Index of the first run that differs from the first one.
    pub fn first_mismatch(&self) -> Option<usize> {
        let first = self.summaries.first()?;
        self.summaries.iter().position(|s| s != first)
    }
}

/// Run `scenario` `runs` times with output discarded and compare summaries.
pub fn verify(scenario: &Scenario, runs: usize) -> Result<VerifyReport, RunError> {
    let runner = HeadlessRunner::new(scenario.clone());
    let summaries = (0..runs.max(2))
        .map(|_| runner.run(&mut io::sink()))
        .collect::<Result<Vec<_>, _>>()?;
    let is_deterministic = summaries.windows(2).all(|w| w[0] == w[1]);
    Ok(VerifyReport {
        is_deterministic,
        summaries,
    })
}
