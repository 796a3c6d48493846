//! Headless match runner for scenario scripting and CI verification.
//!
//! This crate plays a scripted party match without graphics. A scenario
//! (RON) describes the timing config, players, camera and a timeline of
//! deaths, goals and terminal triggers; the runner steps the match at its
//! fixed tick and writes every phase event to stdout. This enables:
//!
//! - **Timing checks**: Assert when rounds start and end in CI
//! - **Determinism verification**: Repeated runs must hash identically
//! - **Replay inspection**: Stand-in poses are hashed while the replay loops
//!
//! # Output
//!
//! - **stdout**: JSON lines (see [`protocol`])
//! - **stderr**: Debug logs (human-readable)
//!
//! # Example
//!
//! ```bash
//! cargo run -p party_headless -- run --scenario scenarios/gauntlet_duo.ron
//! ```

pub mod protocol;
pub mod runner;
pub mod scenario;
pub mod sim_world;

pub use protocol::{Output, RunSummary};
pub use runner::{verify, HeadlessRunner, RunError, VerifyReport};
pub use scenario::{Action, RunLimits, Scenario, ScenarioError};
pub use sim_world::SimWorld;
