//! Recording and replay benchmarks for party_core.
//!
//! Run with: `cargo bench -p party_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use party_core::frame::{ActorId, ActorTrack, CameraView, FrameSample};
use party_core::replay::ReplayDirector;
use party_core::world::ReplayStage;
use party_test_utils::determinism::MatchRun;
use party_test_utils::fixtures::{camera_at, ghost, pose_at, reference_config};

/// One full round of recording: 33 s at 50 Hz.
pub fn record_round_benchmark(c: &mut Criterion) {
    c.bench_function("record_round_two_players", |b| {
        b.iter(|| {
            let mut run = MatchRun::two_runners(reference_config());
            for _ in 0..1_650 {
                run.tick(Duration::from_millis(20));
            }
            black_box(run.state_hash())
        });
    });
}

struct NullStage;

impl ReplayStage for NullStage {
    fn set_actor_visible(&mut self, _actor: ActorId, _visible: bool) {}
    fn set_replay_view(&mut self, _active: bool) {}
    fn apply_replay_camera(&mut self, view: CameraView) {
        black_box(view);
    }
}

fn track(actor: u32, ticks: u64) -> ActorTrack {
    ActorTrack {
        actor: ActorId(actor),
        samples: (0..ticks)
            .map(|t| FrameSample::from_pose(t, pose_at(i32::try_from(t).unwrap_or(0), 0, 0)))
            .collect(),
        blueprint: Some(ghost()),
    }
}

/// Stepping a running replay of eight stand-ins.
pub fn replay_step_benchmark(c: &mut Criterion) {
    let ticks = 1_000;
    let camera = (0..ticks)
        .map(|t| FrameSample::from_view(t, camera_at(0, 10, -10)))
        .collect();
    let mut stage = NullStage;
    let mut director = ReplayDirector::new(0);
    if let Err(err) = director.begin((0..8).map(|a| track(a, ticks)).collect(), camera, &mut stage) {
        panic!("replay did not start: {err}");
    }

    c.bench_function("replay_step_eight_stand_ins", |b| {
        b.iter(|| black_box(director.step(&mut stage)));
    });
}

criterion_group!(benches, record_round_benchmark, replay_step_benchmark);
criterion_main!(benches);
