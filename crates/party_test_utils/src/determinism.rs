//! Determinism testing utilities.
//!
//! Provides a harness for verifying that recording and replay produce
//! identical results given identical inputs.
//!
//! # Testing Strategy
//!
//! A replay must reproduce the recorded round bit-for-bit, on any machine
//! and at any render frame rate. Sources of non-determinism include:
//!
//! - **Floating-point math**: Different CPUs can produce different results.
//!   We use fixed-point arithmetic via [`party_core::math::Fixed`] for every
//!   recorded pose.
//!
//! - **Frame pacing**: Render frames vary in length. Recording and playback
//!   only run on the fixed tick; phase timers carry leftover time across
//!   boundaries instead of rounding it away.
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   Tracks and stand-ins are kept in registration order.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: Recorder and director determinism
//! 2. **Property tests**: Random poses and frame schedules stay reproducible
//! 3. **Integration tests**: Full match scenarios are reproducible
//! 4. **Parallel tests**: Running N matches on N threads all match

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;
use std::time::Duration;

use party_core::game::{FixedStep, Match};
use party_core::round::RoundPhase;

use crate::scripted::ScriptedWorld;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic run).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that every run matched, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Match is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a state machine multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run
/// * `ticks` - Number of steps per run
/// * `setup` - Function to create the initial state
/// * `step` - Function to advance the state by one step
/// * `hash` - Function to compute the state hash
///
/// # Example
///
/// ```
/// use party_test_utils::determinism::{verify_determinism, MatchRun};
/// use party_test_utils::fixtures::reference_config;
///
/// let result = verify_determinism(
///     3,
///     200,
///     || MatchRun::two_runners(reference_config()),
///     MatchRun::tick_default,
///     MatchRun::state_hash,
/// );
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);
    if !is_deterministic {
        tracing::warn!(runs, ticks, ?hashes, "Determinism check failed");
    }

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Run N copies on scoped threads and verify they agree.
///
/// Each thread builds its own state, so `S` need not be `Send`.
pub fn verify_determinism_parallel<S, Setup, Step, HashFn>(
    threads: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S + Sync,
    Step: Fn(&mut S) + Sync,
    HashFn: Fn(&S) -> u64 + Sync,
{
    let hashes: Vec<u64> = thread::scope(|s| {
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                s.spawn(|| {
                    let mut state = setup();
                    for _ in 0..ticks {
                        step(&mut state);
                    }
                    hash(&state)
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|_| panic!("determinism worker panicked")))
            .collect()
    });

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Step two copies side by side and find the first step where they differ.
///
/// # Returns
///
/// `None` if the runs agree, `Some(step)` if they diverge at that step
/// (0 means the initial states already differ).
pub fn find_first_divergence<S, Setup, Step, HashFn>(
    setup: Setup,
    ticks: u64,
    step: Step,
    hash: HashFn,
) -> Option<u64>
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut first = setup();
    let mut second = setup();

    if hash(&first) != hash(&second) {
        return Some(0);
    }

    for tick in 1..=ticks {
        step(&mut first);
        step(&mut second);

        if hash(&first) != hash(&second) {
            tracing::warn!(tick, "Runs diverged");
            return Some(tick);
        }
    }

    None
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// A match wired to a scripted world, stepped like a host game loop.
#[derive(Debug)]
pub struct MatchRun {
    /// The match under test.
    pub game: Match,
    /// The scripted scene.
    pub world: ScriptedWorld,
}

impl MatchRun {
    /// Start `game` in `world`.
    ///
    /// # Panics
    ///
    /// Panics if the match refuses to start.
    #[must_use]
    pub fn started(mut game: Match, mut world: ScriptedWorld) -> Self {
        game.start(&mut world)
            .unwrap_or_else(|e| panic!("match did not start: {e}"));
        Self { game, world }
    }

    /// Two players running in opposite directions under a moving camera.
    #[must_use]
    pub fn two_runners(config: party_core::config::MatchConfig) -> Self {
        use crate::fixtures::{camera_at, fixed, match_with_players, pose_at};
        use party_core::frame::ActorId;
        use party_core::math::Vec3Fixed;

        let mut game = match_with_players(config, 2);
        game.attach_camera();
        let world = ScriptedWorld::new()
            .with_actor(ActorId(0), pose_at(0, 0, 0), Vec3Fixed::new(fixed(1), fixed(0), fixed(0)))
            .with_actor(ActorId(1), pose_at(1, 0, 0), Vec3Fixed::new(fixed(-1), fixed(0), fixed(0)))
            .with_camera(camera_at(0, 10, -10), Vec3Fixed::new(fixed(0), fixed(0), fixed(1)));
        Self::started(game, world)
    }

    /// One host frame that is exactly one fixed tick long: move the scene,
    /// run the fixed tick, then the variable tick.
    pub fn tick(&mut self, dt: Duration) -> FixedStep {
        self.world.step();
        let step = self.game.fixed_update(&mut self.world);
        self.game.update(dt, &mut self.world);
        step
    }

    /// [`tick`](Self::tick) with the configured fixed tick length.
    pub fn tick_default(&mut self) {
        let dt = self.game.config().tick_duration();
        self.tick(dt);
    }

    /// Tick until the phase satisfies `done`, at most `limit` ticks.
    ///
    /// Returns the number of ticks run.
    pub fn run_until(&mut self, limit: u64, done: impl Fn(RoundPhase) -> bool) -> u64 {
        let mut ran = 0;
        while ran < limit && !done(self.game.phase()) {
            self.tick_default();
            ran += 1;
        }
        ran
    }

    /// Hash of everything a replay depends on: phase, recordings, stand-ins
    /// and the replay camera.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        let phase = self.game.phase();
        phase.kind().hash(&mut hasher);
        phase.remaining().hash(&mut hasher);
        self.game.round().hash(&mut hasher);
        self.game.clock().hash(&mut hasher);
        for recorder in self.game.recording().actors() {
            recorder.actor().hash(&mut hasher);
            recorder.snapshot().hash(&mut hasher);
        }
        if let Some(camera) = self.game.recording().camera() {
            camera.snapshot().hash(&mut hasher);
        }
        for stand_in in self.game.replay().stand_ins() {
            stand_in.actor.hash(&mut hasher);
            stand_in.pose.hash(&mut hasher);
        }
        self.game.replay().cursor().hash(&mut hasher);
        self.world.replay_camera().hash(&mut hasher);
        hasher.finish()
    }
}

/// Proptest strategies for determinism testing.
///
/// These strategies generate random but reproducible inputs for
/// property-based testing of recording and phase timing.
pub mod strategies {
    use std::time::Duration;

    use party_core::config::MatchConfig;
    use party_core::frame::Pose;
    use party_core::math::{Fixed, Vec3Fixed};
    use proptest::prelude::*;

    /// Generate a fixed-point coordinate in a reasonable arena range.
    ///
    /// Range: -1000 to 1000
    pub fn arb_fixed_position() -> impl Strategy<Value = Fixed> {
        (-1000i32..1000i32).prop_map(Fixed::from_num)
    }

    /// Generate a fixed-point 3D position.
    pub fn arb_vec3_position() -> impl Strategy<Value = Vec3Fixed> {
        (arb_fixed_position(), arb_fixed_position(), arb_fixed_position())
            .prop_map(|(x, y, z)| Vec3Fixed::new(x, y, z))
    }

    /// Generate a per-tick velocity with fractional components.
    ///
    /// Range: -2 to 2 units per tick, in steps of 1/1024
    pub fn arb_velocity() -> impl Strategy<Value = Vec3Fixed> {
        let component = (-2048i64..2048i64).prop_map(|n| Fixed::from_bits(n << 22));
        (component.clone(), component.clone(), component).prop_map(|(x, y, z)| Vec3Fixed::new(x, y, z))
    }

    /// Generate a pose with identity rotation.
    pub fn arb_pose() -> impl Strategy<Value = Pose> {
        arb_vec3_position().prop_map(Pose::at)
    }

    /// Generate one render frame length.
    ///
    /// Range: 1 ms to 100 ms
    pub fn arb_frame_dt() -> impl Strategy<Value = Duration> {
        (1u64..=100u64).prop_map(Duration::from_millis)
    }

    /// Generate a sequence of render frame lengths.
    pub fn arb_frame_schedule(max_len: usize) -> impl Strategy<Value = Vec<Duration>> {
        proptest::collection::vec(arb_frame_dt(), 1..max_len)
    }

    /// Generate phase timings in whole 100 ms steps.
    pub fn arb_config() -> impl Strategy<Value = MatchConfig> {
        let step = |max: u64| (0..=max).prop_map(|n| Duration::from_millis(n * 100));
        (step(50), step(20), step(80), step(30), 1u32..3, any::<bool>()).prop_map(
            |(placement, cooldown, survival, intermission, passes, goal_ends_match)| MatchConfig {
                placement_time: placement,
                inter_placement_delay: cooldown,
                survival_time: survival,
                intermission_delay: intermission,
                placement_passes: passes,
                goal_ends_match,
                ..MatchConfig::default()
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::reference_config;
    use party_core::config::MatchConfig;
    use proptest::prelude::*;

    #[test]
    fn test_identical_runs_hash_equal() {
        let result = verify_determinism(
            4,
            300,
            || MatchRun::two_runners(reference_config()),
            MatchRun::tick_default,
            MatchRun::state_hash,
        );
        result.assert_deterministic();
        assert_eq!(result.unique_hashes().len(), 1);
    }

    #[test]
    fn test_different_inputs_hash_differently() {
        let mut a = MatchRun::two_runners(reference_config());
        let mut b = MatchRun::two_runners(reference_config());
        a.tick_default();
        b.tick_default();
        b.tick_default();
        assert_ne!(a.state_hash(), b.state_hash());
    }

    #[test]
    fn test_no_divergence_across_replay() {
        let setup = || {
            let mut run = MatchRun::two_runners(reference_config());
            for _ in 0..100 {
                run.tick_default();
            }
            run.game
                .trigger_terminal(&mut run.world)
                .unwrap_or_else(|e| panic!("{e}"));
            run
        };
        assert_eq!(find_first_divergence(setup, 400, MatchRun::tick_default, MatchRun::state_hash), None);
    }

    #[test]
    fn test_parallel_runs_agree() {
        let result = verify_determinism_parallel(
            4,
            500,
            || MatchRun::two_runners(reference_config()),
            MatchRun::tick_default,
            MatchRun::state_hash,
        );
        result.assert_deterministic();
    }

    #[test]
    fn test_failure_message_lists_hashes() {
        let result = DeterminismResult {
            is_deterministic: false,
            hashes: vec![1, 2, 1],
            ticks: 10,
        };
        assert_eq!(result.unique_hashes(), vec![1, 2]);
        let panic = std::panic::catch_unwind(|| result.assert_deterministic());
        assert!(panic.is_err());
    }

    proptest! {
        /// Random frame pacing still yields a reproducible match.
        #[test]
        fn prop_frame_schedules_are_deterministic(
            schedule in strategies::arb_frame_schedule(200),
        ) {
            let run = |schedule: &[Duration]| {
                let mut run = MatchRun::two_runners(MatchConfig::default());
                for dt in schedule {
                    run.tick(*dt);
                }
                run.state_hash()
            };
            prop_assert_eq!(run(&schedule), run(&schedule));
        }
    }
}
