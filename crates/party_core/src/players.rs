//! Player alive/dead and goal bookkeeping.
//!
//! The tracker is the only writer of [`PlayerState`]. Collision collaborators
//! report deaths and goals synchronously; several detectors may fire for the
//! same player in one tick, so every notification is idempotent.

use serde::{Deserialize, Serialize};

use crate::frame::{PlayerId, Pose};
use crate::world::PlayerRoster;

/// Per-player round state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerState {
    /// Player handle.
    pub id: PlayerId,
    /// Alive this round. Once false, only `revive_all` sets it back.
    pub alive: bool,
    /// Reached the goal this round.
    pub reached_goal: bool,
    /// Where the player respawns at round start.
    pub spawn_pose: Pose,
}

impl PlayerState {
    /// A freshly registered, living player.
    #[must_use]
    pub const fn new(id: PlayerId, spawn_pose: Pose) -> Self {
        Self {
            id,
            alive: true,
            reached_goal: false,
            spawn_pose,
        }
    }
}

/// Aggregates alive/dead status and goal events across all players.
#[derive(Debug, Clone, Default)]
pub struct PlayerLifecycleTracker {
    players: Vec<PlayerState>,
}

impl PlayerLifecycleTracker {
    /// Empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a player, or update the spawn pose of a known one.
    ///
    /// Returns `false` if the player was already registered.
    pub fn register(&mut self, id: PlayerId, spawn_pose: Pose) -> bool {
        if let Some(state) = self.state_mut(id) {
            state.spawn_pose = spawn_pose;
            return false;
        }
        self.players.push(PlayerState::new(id, spawn_pose));
        true
    }

    /// Revive every player: alive again, goal cleared, teleported to spawn,
    /// collision re-enabled.
    pub fn revive_all<R: PlayerRoster + ?Sized>(&mut self, roster: &mut R) {
        for state in &mut self.players {
            state.alive = true;
            state.reached_goal = false;
            match roster.actor_mut(state.id) {
                Some(actor) => {
                    actor.respawn_at(state.spawn_pose);
                    actor.set_collision_enabled(true);
                }
                None => tracing::warn!(player = %state.id, "No character in scene to respawn"),
            }
        }
        tracing::debug!(players = self.players.len(), "All players revived");
    }

    /// Mark a player dead. No-op if already dead or unknown.
    ///
    /// Returns `true` only when this call changed the player's state.
    pub fn notify_death(&mut self, id: PlayerId) -> bool {
        let Some(state) = self.state_mut(id) else {
            tracing::warn!(player = %id, "Death reported for unknown player");
            return false;
        };
        if !state.alive {
            return false;
        }
        state.alive = false;
        tracing::info!(player = %id, alive = self.alive_count(), "Player died");
        true
    }

    /// Mark a player as having reached the goal. No-op if repeated or unknown.
    ///
    /// Returns `true` only when this call changed the player's state.
    pub fn notify_goal(&mut self, id: PlayerId) -> bool {
        let Some(state) = self.state_mut(id) else {
            tracing::warn!(player = %id, "Goal reported for unknown player");
            return false;
        };
        if state.reached_goal {
            return false;
        }
        state.reached_goal = true;
        tracing::info!(player = %id, "Player reached the goal");
        true
    }

    /// Pull alive status from the characters and record new deaths.
    ///
    /// A character reporting itself alive never revives a dead player.
    pub fn sync_with<R: PlayerRoster + ?Sized>(&mut self, roster: &R) {
        let newly_dead: Vec<PlayerId> = self
            .players
            .iter()
            .filter(|s| s.alive)
            .filter(|s| roster.actor(s.id).is_some_and(|actor| !actor.is_alive()))
            .map(|s| s.id)
            .collect();
        for id in newly_dead {
            self.notify_death(id);
        }
    }

    /// Whether every registered player is dead. False with no players.
    #[must_use]
    pub fn all_dead(&self) -> bool {
        !self.players.is_empty() && self.players.iter().all(|s| !s.alive)
    }

    /// Number of living players.
    #[must_use]
    pub fn alive_count(&self) -> usize {
        self.players.iter().filter(|s| s.alive).count()
    }

    /// Whether any player reached the goal this round.
    #[must_use]
    pub fn any_reached_goal(&self) -> bool {
        self.players.iter().any(|s| s.reached_goal)
    }

    /// State of one player.
    #[must_use]
    pub fn player(&self, id: PlayerId) -> Option<&PlayerState> {
        self.players.iter().find(|s| s.id == id)
    }

    /// All players in registration order.
    #[must_use]
    pub fn players(&self) -> &[PlayerState] {
        &self.players
    }

    /// Number of registered players.
    #[must_use]
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// Whether no players are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    fn state_mut(&mut self, id: PlayerId) -> Option<&mut PlayerState> {
        self.players.iter_mut().find(|s| s.id == id)
    }
}
