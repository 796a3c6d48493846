//! Bundled scenario files, run end to end.

use std::path::PathBuf;

use party_headless::protocol::Output;
use party_headless::{HeadlessRunner, RunLimits, Scenario, ScenarioError};

fn scenario_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("scenarios")
        .join(name)
}

fn run(scenario: Scenario) -> Vec<Output> {
    let mut buffer = Vec::new();
    HeadlessRunner::new(scenario).run(&mut buffer).unwrap();
    String::from_utf8(buffer)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

fn millis(at: f64) -> u64 {
    (at * 1000.0).round() as u64
}

#[test]
fn bundled_gauntlet_matches_builtin() {
    let loaded = Scenario::load(scenario_path("gauntlet_duo.ron")).unwrap();
    assert_eq!(loaded, Scenario::gauntlet_duo());
}

#[test]
fn endless_solo_finishes_on_goal() {
    let scenario = Scenario::load(scenario_path("endless_solo.ron")).unwrap();
    assert!(scenario.camera.is_none());
    assert_eq!(scenario.config.survival_limit(), None);

    let output = run(scenario);

    let Some(Output::Summary(summary)) = output.last() else {
        panic!("run must end with a summary");
    };
    assert_eq!(summary.rounds, 2);
    assert_eq!(summary.final_phase, "finished");
    assert_eq!(summary.replay_loops, 2);
    assert!(summary.replay_frames > 0);

    let milestones: Vec<(String, u64)> = output
        .iter()
        .filter_map(|o| match o {
            Output::Event { at, event } => {
                let name = serde_json::to_value(event).unwrap()["event"]
                    .as_str()
                    .unwrap()
                    .to_string();
                matches!(name.as_str(), "round_start" | "round_end" | "match_finished")
                    .then(|| (name, millis(*at)))
            }
            _ => None,
        })
        .collect();
    assert_eq!(
        milestones,
        vec![
            ("round_start".to_string(), 0),
            ("round_end".to_string(), 12_020),
            ("round_start".to_string(), 14_020),
            ("match_finished".to_string(), 20_020),
        ]
    );
}

#[test]
fn no_survival_countdown_when_unbounded() {
    let scenario = Scenario::load(scenario_path("endless_solo.ron")).unwrap();
    let output = run(scenario);
    // Placement counts down from 5 s; survival never announces a timer.
    let countdowns: Vec<u64> = output
        .iter()
        .filter_map(|o| match o {
            Output::Event { event, .. } => event.display_seconds(),
            _ => None,
        })
        .collect();
    assert!(countdowns.iter().all(|s| *s <= 5));
}

#[test]
fn limits_override_scenario() {
    let runner = HeadlessRunner::new(Scenario::gauntlet_duo()).with_limits(RunLimits {
        max_seconds: 1.0,
        replay_loops: 1,
    });
    let summary = runner.run(&mut std::io::sink()).unwrap();
    assert_eq!(summary.ticks, 50);
    assert_eq!(summary.rounds, 1);
}

#[test]
fn scenario_written_to_disk_loads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("custom.ron");
    let mut scenario = Scenario::gauntlet_duo();
    scenario.name = "Custom".to_string();
    std::fs::write(&path, ron::ser::to_string_pretty(&scenario, Default::default()).unwrap()).unwrap();

    assert_eq!(Scenario::load(&path).unwrap(), scenario);
}

#[test]
fn broken_scenario_reports_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.ron");
    std::fs::write(&path, "(name: \"x\", players: [").unwrap();
    assert!(matches!(Scenario::load(&path), Err(ScenarioError::ParseError(_))));
}
