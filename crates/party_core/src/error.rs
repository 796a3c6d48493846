//! Error types for the round engine.
//!
//! None of these cross the state machine boundary as panics: callers log
//! them and the orchestrator keeps a well-defined phase.

use thiserror::Error;

use crate::frame::ActorId;

/// Result type alias using [`MatchError`].
pub type Result<T> = std::result::Result<T, MatchError>;

/// Top-level error type for match orchestration.
#[derive(Debug, Error)]
pub enum MatchError {
    /// A match cannot start without at least one registered player.
    #[error("No players registered; match not started")]
    NoPlayers,

    /// A collaborator referenced a player that was never registered.
    #[error("Unknown player: {0}")]
    UnknownPlayer(ActorId),

    /// A player id was registered twice.
    #[error("Player {0} is already registered")]
    DuplicatePlayer(ActorId),

    /// The operation needs a running match.
    #[error("Match has not started")]
    NotStarted,

    /// The match already hit its terminal trigger.
    #[error("Match already finished; reset before starting again")]
    AlreadyFinished,

    /// Replay could not be entered.
    #[error(transparent)]
    Replay(#[from] ReplayError),
}

/// Errors raised when entering replay playback.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReplayError {
    /// The camera track that drives the shared cursor has no samples.
    #[error("Replay camera track is empty")]
    EmptyReplay,

    /// Neither a camera track nor any actor track has samples.
    #[error("No recorded tracks to replay")]
    NoTracks,
}

/// Errors raised while loading a [`MatchConfig`](crate::config::MatchConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the config file.
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse RON.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Parsed, but a value is out of range.
    #[error("Invalid config value for '{field}': {message}")]
    Invalid {
        /// Name of the offending field.
        field: &'static str,
        /// What is wrong with it.
        message: String,
    },
}
