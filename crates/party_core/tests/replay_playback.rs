//! Recording hand-off and looping playback.

use std::time::Duration;

use party_core::prelude::*;
use party_test_utils::determinism::MatchRun;
use party_test_utils::fixtures::{camera_at, fixed, ghost, match_with_players, pose_at, reference_config};
use party_test_utils::scripted::ScriptedWorld;

fn recorded_run(ticks: u32) -> MatchRun {
    let mut run = MatchRun::two_runners(reference_config());
    for _ in 0..ticks {
        run.tick_default();
    }
    run
}

fn step(run: &mut MatchRun) -> FixedStep {
    let dt = run.game.config().tick_duration();
    run.tick(dt)
}

fn track(actor: u32, len: u64) -> ActorTrack {
    ActorTrack {
        actor: ActorId(actor),
        samples: (0..len)
            .map(|t| {
                let x = i32::try_from(t).unwrap();
                let y = i32::try_from(actor).unwrap();
                FrameSample::from_pose(t, pose_at(x, y, 0))
            })
            .collect(),
        blueprint: Some(ghost()),
    }
}

#[test]
fn replay_reproduces_recorded_poses_exactly() {
    let mut run = recorded_run(40);
    let expected = run.game.recording().actor(ActorId(0)).unwrap().snapshot();
    let camera = run.game.recording().camera().unwrap().snapshot();
    assert_eq!(expected.len(), 41);

    let frames = run.game.trigger_terminal(&mut run.world).unwrap();
    assert_eq!(frames, 41);

    for (i, sample) in expected.iter().enumerate() {
        let applied = run.game.fixed_update(&mut run.world);
        assert_eq!(applied, FixedStep::Replay(ReplayStep::Frame { index: i }));
        let stand_in = run
            .game
            .replay()
            .stand_ins()
            .iter()
            .find(|s| s.actor == ActorId(0))
            .unwrap();
        assert_eq!(stand_in.pose, sample.pose());
        assert_eq!(run.world.replay_camera().last().copied(), camera[i].view());
    }
}

#[test]
fn replay_hides_live_players_and_strips_collision() {
    let mut run = recorded_run(10);
    run.game.trigger_terminal(&mut run.world).unwrap();

    assert!(run.world.replay_view());
    assert_eq!(run.world.hidden().len(), 2);
    assert_eq!(run.game.replay().stand_ins().len(), 2);
    assert!(run.game.replay().stand_ins().iter().all(|s| !s.blueprint.collidable));
    assert!(run.game.replay().has_camera_path());
}

#[test]
fn replay_loops_after_restart_delay() {
    let config = MatchConfig {
        replay_restart_delay: Duration::from_millis(100),
        ..reference_config()
    };
    let mut run = MatchRun::two_runners(config);
    for _ in 0..4 {
        run.tick_default();
    }
    assert_eq!(run.game.trigger_terminal(&mut run.world).unwrap(), 5);

    let steps: Vec<FixedStep> = (0..12).map(|_| run.game.fixed_update(&mut run.world)).collect();

    let frame = |index| FixedStep::Replay(ReplayStep::Frame { index });
    let paused = |remaining| FixedStep::Replay(ReplayStep::Paused { remaining });
    assert_eq!(
        steps,
        vec![
            frame(0),
            frame(1),
            frame(2),
            frame(3),
            frame(4),
            paused(4),
            paused(3),
            paused(2),
            paused(1),
            paused(0),
            frame(0),
            frame(1),
        ]
    );
    assert_eq!(run.game.replay().loops_completed(), 1);
}

#[test]
fn camera_track_sets_the_loop_length() {
    let mut world = ScriptedWorld::new();
    let camera: Vec<FrameSample> = (0..5)
        .map(|t| FrameSample::from_view(t, camera_at(0, 0, i32::try_from(t).unwrap())))
        .collect();
    let mut director = ReplayDirector::new(0);

    let frames = director
        .begin(vec![track(0, 10), track(1, 5), track(2, 3)], camera, &mut world)
        .unwrap();
    assert_eq!(frames, 5);

    for _ in 0..5 {
        director.step(&mut world);
    }
    assert_eq!(director.loops_completed(), 1);
    assert_eq!(world.replay_camera().len(), 5);
    let poses: Vec<Pose> = director.stand_ins().iter().map(|s| s.pose).collect();
    // Long track truncated to the camera, short track held on its last sample.
    assert_eq!(poses, vec![pose_at(4, 0, 0), pose_at(4, 1, 0), pose_at(2, 2, 0)]);
}

#[test]
fn player_without_blueprint_stays_visible() {
    let mut game = match_with_players(reference_config(), 1);
    game.register_player(ActorId(9), pose_at(9, 0, 0), None).unwrap();
    let mut world = ScriptedWorld::new()
        .with_actor(ActorId(0), pose_at(0, 0, 0), Vec3Fixed::ZERO)
        .with_actor(ActorId(9), pose_at(9, 0, 0), Vec3Fixed::ZERO);
    game.start(&mut world).unwrap();
    game.fixed_update(&mut world);

    let frames = game.trigger_terminal(&mut world).unwrap();

    assert_eq!(frames, 2);
    assert_eq!(game.replay().stand_ins().len(), 1);
    assert!(!world.hidden().contains(&ActorId(9)));
    assert!(!game.replay().has_camera_path());
}

#[test]
fn inactive_ticks_leave_gaps_but_keep_tick_numbers() {
    let mut game = match_with_players(reference_config(), 1);
    let mut world = ScriptedWorld::new().with_actor(
        ActorId(0),
        pose_at(0, 0, 0),
        Vec3Fixed::new(fixed(1), fixed(0), fixed(0)),
    );
    game.start(&mut world).unwrap();
    for tick in 1..=4 {
        world.step();
        world.set_active(ActorId(0), tick != 2);
        game.fixed_update(&mut world);
    }

    let ticks: Vec<u64> = game
        .recording()
        .actor(ActorId(0))
        .unwrap()
        .snapshot()
        .iter()
        .map(|s| s.tick)
        .collect();
    assert_eq!(ticks, vec![0, 1, 3, 4]);
}

#[test]
fn reset_tears_down_replay_and_allows_a_new_match() {
    let mut run = recorded_run(20);
    run.game.trigger_terminal(&mut run.world).unwrap();
    run.game.fixed_update(&mut run.world);

    run.game.reset(&mut run.world);

    assert!(!run.world.replay_view());
    assert!(run.world.hidden().is_empty());
    assert!(run.game.replay().stand_ins().is_empty());
    assert_eq!(run.game.phase(), RoundPhase::Idle);
    run.game.start(&mut run.world).unwrap();
    assert_eq!(run.game.round(), 1);
    assert_eq!(step(&mut run), FixedStep::Recorded);
}

#[test]
fn recording_stops_at_round_end_and_resumes_next_round() {
    let mut run = MatchRun::two_runners(reference_config());
    // 30 s of play at 50 Hz ends round 1.
    for _ in 0..1_500 {
        run.tick_default();
    }
    assert!(matches!(run.game.phase(), RoundPhase::Intermission { .. }));
    let frozen = run.game.recording().actor(ActorId(0)).unwrap().len();
    assert_eq!(step(&mut run), FixedStep::Idle);
    assert_eq!(run.game.recording().actor(ActorId(0)).unwrap().len(), frozen);

    // Intermission is 3 s.
    for _ in 0..150 {
        run.tick_default();
    }
    assert_eq!(run.game.round(), 2);
    assert_eq!(step(&mut run), FixedStep::Recorded);
    assert!(run.game.recording().actor(ActorId(0)).unwrap().len() < frozen);
}
