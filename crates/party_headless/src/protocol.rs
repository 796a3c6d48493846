//! JSON output protocol for headless runs.
//!
//! The runner writes JSON lines (one JSON object per line) to stdout:
//!
//! 1. `{"type":"ready",...}` with the scenario name and player count
//! 2. One `{"type":"event",...}` per phase event, stamped with match time
//! 3. `{"type":"action",...}` whenever the script fires a timeline action
//! 4. A closing `{"type":"summary",...}`
//!
//! # Example Session
//!
//! ```text
//! <- {"type":"ready","version":"1.0","scenario":"Gauntlet Duo","players":2}
//! <- {"type":"event","at":0.0,"event":"round_start","round":1}
//! <- {"type":"event","at":10.0,"event":"placement_end"}
//! <- {"type":"action","at":15.0,"action":{"Kill":0}}
//! <- {"type":"summary","rounds":3,"replay_frames":126,...}
//! ```

use party_core::events::{BusEvent, PhaseEvent};
use serde::{Deserialize, Serialize};

use crate::scenario::Action;

/// Protocol version reported in `ready`.
pub const PROTOCOL_VERSION: &str = "1.0";

/// Outcome of a headless run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Rounds started.
    pub rounds: u32,
    /// Final phase, snake_case.
    pub final_phase: String,
    /// Fixed ticks executed.
    pub ticks: u64,
    /// Frames per replay loop (0 if no replay ran).
    pub replay_frames: usize,
    /// Full replay loops played.
    pub replay_loops: u64,
    /// Hash of the event stream.
    pub event_hash: u64,
    /// Hash of every stand-in pose applied during replay.
    pub pose_hash: u64,
}

/// Records written by the headless runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Output {
    /// Run is starting.
    Ready {
        /// Protocol version.
        version: String,
        /// Scenario name.
        scenario: String,
        /// Registered players.
        players: usize,
    },

    /// A phase event.
    Event {
        /// Match time in seconds.
        at: f64,
        /// The event, flattened into this record.
        #[serde(flatten)]
        event: PhaseEvent,
    },

    /// The script fired an action.
    Action {
        /// Wall time in seconds.
        at: f64,
        /// What happened.
        action: Action,
    },

    /// The run could not continue.
    Error {
        /// Human-readable reason.
        message: String,
    },

    /// Run finished.
    Summary(RunSummary),
}

impl Output {
    /// Create a ready record.
    pub fn ready(scenario: &str, players: usize) -> Self {
        Self::Ready {
            version: PROTOCOL_VERSION.to_string(),
            scenario: scenario.to_string(),
            players,
        }
    }

    /// Create an event record from a bus event.
    pub fn event(bus_event: &BusEvent) -> Self {
        Self::Event {
            at: bus_event.at.as_secs_f64(),
            event: bus_event.event,
        }
    }

    /// Create an error record.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Serialize to JSON line (with newline).
    pub fn to_json_line(&self) -> String {
        let mut json = serde_json::to_string(self).unwrap_or_else(|e| {
            format!(
                r#"{{"type":"error","message":"Serialization failed: {}"}}"#,
                e
            )
        });
        json.push('\n');
        json
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_event_is_flattened() {
        let record = Output::event(&BusEvent {
            at: Duration::from_millis(10_500),
            event: PhaseEvent::RoundEnd { round: 2 },
        });
        let json = record.to_json_line();
        assert!(json.ends_with('\n'));
        assert!(json.contains(r#""type":"event""#));
        assert!(json.contains(r#""event":"round_end""#));
        assert!(json.contains(r#""round":2"#));
        assert!(json.contains(r#""at":10.5"#));
    }

    #[test]
    fn test_ready_reports_version() {
        let json = Output::ready("Sample", 3).to_json_line();
        assert!(json.contains(r#""version":"1.0""#));
        assert!(json.contains(r#""players":3"#));
    }

    #[test]
    fn test_summary_round_trips() {
        let summary = Output::Summary(RunSummary {
            rounds: 2,
            final_phase: "finished".to_string(),
            ticks: 1_000,
            replay_frames: 50,
            replay_loops: 1,
            event_hash: 7,
            pose_hash: 9,
        });
        let json = summary.to_json_line();
        let parsed: Output = serde_json::from_str(json.trim_end()).unwrap();
        assert_eq!(parsed, summary);
    }
}
