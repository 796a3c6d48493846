//! # Party Core
//!
//! Round engine for a party platformer: phase timers, player lifecycle,
//! deterministic recording and looping replay.
//!
//! This crate contains **only** game-rule logic:
//! - No rendering
//! - No input or physics
//! - No floating-point poses (uses fixed-point)
//!
//! The host scene plugs in through the traits in [`world`]. This keeps the
//! engine runnable headless and makes replays bit-exact.
//!
//! ## Crate Structure
//!
//! - [`round`] - Phase state machine
//! - [`players`] - Alive/dead and goal bookkeeping
//! - [`recording`] - Fixed-tick pose recorders
//! - [`replay`] - Stand-in playback director
//! - [`events`] - Phase notification bus
//! - [`game`] - The [`Match`](game::Match) that owns all of the above
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod config;
pub mod error;
pub mod events;
pub mod frame;
pub mod game;
pub mod math;
pub mod players;
pub mod recording;
pub mod replay;
pub mod round;
pub mod world;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::MatchConfig;
    pub use crate::error::{ConfigError, MatchError, ReplayError, Result};
    pub use crate::events::{BusEvent, PhaseEvent, PhaseEventBus, PhaseKind, PlacementControl};
    pub use crate::frame::{
        ActorId, ActorTrack, CameraView, FrameSample, PlayerId, Pose, StandInBlueprint,
    };
    pub use crate::game::{FixedStep, Match};
    pub use crate::math::{Fixed, QuatFixed, Vec3Fixed};
    pub use crate::players::{PlayerLifecycleTracker, PlayerState};
    pub use crate::recording::{ActorRecorder, CameraRecorder, RecordedRound, RecordingRig};
    pub use crate::replay::{ReplayDirector, ReplayStep, StandIn};
    pub use crate::round::{RoundContext, RoundOrchestrator, RoundPhase};
    pub use crate::world::{ArenaWorld, PlayerActor, PlayerRoster, PoseSource, ReplayStage};
}
