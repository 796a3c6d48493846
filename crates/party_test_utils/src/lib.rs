//! # Party Test Utilities
//!
//! Shared testing utilities for all crates:
//! - Scripted host world implementing the engine's collaborator traits
//! - Event recorder for the phase bus
//! - Determinism test harness
//! - Fixture helpers
//! - Property-based testing strategies

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod determinism;
pub mod event_log;
pub mod fixtures;
pub mod scripted;

/// Re-export proptest for convenience.
pub use proptest;
