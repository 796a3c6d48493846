//! End-to-end phase timing through the public `Match` surface.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use party_core::prelude::*;
use party_test_utils::event_log::EventLog;
use party_test_utils::fixtures::{match_with_players, pose_at, reference_config};
use party_test_utils::scripted::ScriptedWorld;

const FRAME: Duration = Duration::from_millis(100);

fn arena(players: u32) -> ScriptedWorld {
    (0..players).fold(ScriptedWorld::new(), |world, i| {
        world.with_actor(ActorId(i), pose_at(i32::try_from(i).unwrap(), 0, 0), Vec3Fixed::ZERO)
    })
}

fn started(config: MatchConfig, players: u32) -> (Match, ScriptedWorld, EventLog) {
    let mut game = match_with_players(config, players);
    let log = EventLog::new();
    log.attach(game.events_mut());
    let mut world = arena(players);
    game.start(&mut world).unwrap();
    (game, world, log)
}

fn frames(game: &mut Match, world: &mut ScriptedWorld, n: u32) {
    for _ in 0..n {
        game.update(FRAME, world);
    }
}

#[test]
fn two_player_round_follows_reference_timeline() {
    let (mut game, mut world, log) = started(reference_config(), 2);

    frames(&mut game, &mut world, 330);

    assert_eq!(log.time_of(PhaseEvent::RoundStart { round: 1 }), Some(Duration::ZERO), "{}", log.dump());
    assert_eq!(log.time_of(PhaseEvent::PlacementEnd), Some(Duration::from_secs(10)));
    assert_eq!(log.time_of(PhaseEvent::RoundEnd { round: 1 }), Some(Duration::from_secs(30)));
    assert_eq!(log.time_of(PhaseEvent::RoundStart { round: 2 }), Some(Duration::from_secs(33)));
    assert_eq!(game.round(), 2);
}

#[test]
fn placement_wipe_skips_survival() {
    let (mut game, mut world, log) = started(reference_config(), 2);

    frames(&mut game, &mut world, 99);
    world.kill(ActorId(0));
    world.kill(ActorId(1));
    frames(&mut game, &mut world, 1);

    assert_eq!(log.time_of(PhaseEvent::RoundEnd { round: 1 }), Some(Duration::from_secs(10)));
    assert!(!log.phases().contains(&PhaseKind::Survival), "{}", log.dump());
    assert!(matches!(game.phase(), RoundPhase::Intermission { .. }));
}

#[test]
fn hazard_notifications_end_the_round_early() {
    let (mut game, mut world, log) = started(reference_config(), 2);

    frames(&mut game, &mut world, 150);
    game.notify_death(ActorId(0)).unwrap();
    frames(&mut game, &mut world, 1);
    assert!(matches!(game.phase(), RoundPhase::Survival { .. }));

    game.notify_death(ActorId(1)).unwrap();
    game.notify_death(ActorId(1)).unwrap();
    frames(&mut game, &mut world, 1);

    assert_eq!(log.count(PhaseEvent::RoundEnd { round: 1 }), 1);
    assert_eq!(
        log.time_of(PhaseEvent::RoundEnd { round: 1 }),
        Some(Duration::from_millis(15_200))
    );
}

#[test]
fn one_death_of_two_waits_for_the_timer() {
    let (mut game, mut world, log) = started(reference_config(), 2);

    frames(&mut game, &mut world, 120);
    world.kill(ActorId(1));
    frames(&mut game, &mut world, 179);
    assert!(matches!(game.phase(), RoundPhase::Survival { .. }));
    frames(&mut game, &mut world, 1);

    assert_eq!(log.time_of(PhaseEvent::RoundEnd { round: 1 }), Some(Duration::from_secs(30)));
}

#[test]
fn single_player_never_enters_cooldown() {
    let config = MatchConfig {
        inter_placement_delay: Duration::from_secs(1),
        placement_passes: 3,
        ..reference_config()
    };
    let (mut game, mut world, log) = started(config, 1);

    frames(&mut game, &mut world, 700);

    assert!(!log.phases().contains(&PhaseKind::Cooldown));
    assert!(log.count(PhaseEvent::RoundStart { round: 2 }) == 1);
}

#[test]
fn every_round_revives_and_respawns() {
    let (mut game, mut world, _log) = started(reference_config(), 2);

    frames(&mut game, &mut world, 200);
    world.kill(ActorId(0));
    world.kill(ActorId(1));
    frames(&mut game, &mut world, 1);
    assert!(game.players().all_dead());

    frames(&mut game, &mut world, 30);

    assert_eq!(game.round(), 2);
    assert_eq!(game.players().alive_count(), 2);
    let actor = world.actor_entry(ActorId(1)).unwrap();
    assert!(actor.alive);
    assert!(actor.collision);
    assert_eq!(actor.respawns, 2);
    assert_eq!(actor.pose, pose_at(1, 0, 0));
}

#[test]
fn countdown_reaches_zero_before_placement_ends() {
    let (mut game, mut world, log) = started(reference_config(), 2);

    frames(&mut game, &mut world, 101);

    let events = log.events();
    let end = events
        .iter()
        .position(|e| e.event == PhaseEvent::PlacementEnd)
        .unwrap();
    assert_eq!(
        events[end - 2].event,
        PhaseEvent::CountdownTick {
            remaining: Duration::ZERO
        }
    );
    assert_eq!(
        events[end - 1].event,
        PhaseEvent::PlacementAllowedChange { allowed: false }
    );
    let countdowns = log.countdowns();
    assert!(countdowns.windows(2).take(100).all(|w| w[1] <= w[0]));
    assert_eq!(
        countdowns.iter().filter_map(|d| {
            PhaseEvent::CountdownTick { remaining: *d }.display_seconds()
        }).max(),
        Some(20)
    );
}

#[derive(Default)]
struct PlacementTool {
    history: Vec<bool>,
}

impl PlacementControl for PlacementTool {
    fn set_placement_mode(&mut self, allowed: bool) {
        self.history.push(allowed);
    }
}

#[test]
fn placement_tool_follows_the_window() {
    let mut game = match_with_players(
        MatchConfig {
            placement_passes: 2,
            inter_placement_delay: Duration::from_secs(1),
            ..reference_config()
        },
        2,
    );
    let tool = Rc::new(RefCell::new(PlacementTool::default()));
    game.events_mut().attach_placement(Rc::clone(&tool));
    let mut world = arena(2);
    game.start(&mut world).unwrap();

    frames(&mut game, &mut world, 220);

    assert_eq!(tool.borrow().history, vec![true, false, true, false]);
}

#[test]
fn restarting_mid_round_cancels_the_timer() {
    let (mut game, mut world, log) = started(reference_config(), 2);

    frames(&mut game, &mut world, 40);
    game.start(&mut world).unwrap();
    frames(&mut game, &mut world, 99);

    assert_eq!(game.round(), 2);
    assert!(matches!(game.phase(), RoundPhase::Placement { .. }));
    assert_eq!(log.count(PhaseEvent::PlacementEnd), 1);
    assert_eq!(log.time_of(PhaseEvent::RoundStart { round: 2 }), Some(Duration::from_secs(4)));
}

#[test]
fn start_without_players_stays_idle() {
    let mut game = Match::new(reference_config());
    let mut world = ScriptedWorld::new();
    assert!(matches!(game.start(&mut world), Err(MatchError::NoPlayers)));
    assert_eq!(game.update(FRAME, &mut world), RoundPhase::Idle);
}
