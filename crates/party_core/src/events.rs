//! Phase notifications published by the round orchestrator.
//!
//! The bus supports any number of push subscribers (UI, placement) and also
//! keeps a pending queue for pull consumers such as the headless runner.
//! Publishing is fire-and-forget: handlers return nothing and cannot veto a
//! transition.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Discriminant of a [`RoundPhase`](crate::round::RoundPhase), without timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseKind {
    /// Match not started.
    Idle,
    /// Players place objects.
    Placement,
    /// Pause between placement passes.
    Cooldown,
    /// Players must survive.
    Survival,
    /// Round is wrapping up.
    Ending,
    /// Pause before the next round.
    Intermission,
    /// Terminal trigger fired; replay owns the scene.
    Finished,
}

impl fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Placement => "placement",
            Self::Cooldown => "cooldown",
            Self::Survival => "survival",
            Self::Ending => "ending",
            Self::Intermission => "intermission",
            Self::Finished => "finished",
        };
        f.write_str(name)
    }
}

/// Notification published on the [`PhaseEventBus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PhaseEvent {
    /// A round began (Intermission → Placement).
    RoundStart {
        /// 1-based round number.
        round: u32,
    },
    /// A placement window opened.
    PlacementStart {
        /// Length of the window.
        duration: Duration,
    },
    /// The placement window closed.
    PlacementEnd,
    /// Remaining time of the active timed phase; zero when a phase exits.
    CountdownTick {
        /// Time left, never negative.
        remaining: Duration,
    },
    /// Whether players may place objects right now.
    PlacementAllowedChange {
        /// New placement permission.
        allowed: bool,
    },
    /// A round ended (Ending → Intermission).
    RoundEnd {
        /// Round that ended.
        round: u32,
    },
    /// Any phase transition.
    PhaseChanged {
        /// Previous phase.
        from: PhaseKind,
        /// New phase.
        to: PhaseKind,
    },
    /// The terminal trigger ended the match.
    MatchFinished {
        /// Round in progress when the match ended.
        round: u32,
    },
    /// Replay playback began.
    ReplayStarted {
        /// Frames per loop.
        frames: usize,
    },
}

impl PhaseEvent {
    /// Countdown value rounded up to whole seconds, as a HUD shows it.
    ///
    /// `None` for non-countdown events; `Some(0)` clears the display.
    #[must_use]
    pub fn display_seconds(&self) -> Option<u64> {
        match self {
            Self::CountdownTick { remaining } => {
                let whole = remaining.as_secs();
                Some(if remaining.subsec_nanos() > 0 { whole + 1 } else { whole })
            }
            _ => None,
        }
    }
}

/// An event stamped with match time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusEvent {
    /// Match clock when the event fired.
    pub at: Duration,
    /// The event.
    pub event: PhaseEvent,
}

/// Handle returned by [`PhaseEventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Box<dyn FnMut(&BusEvent)>;

/// Typed publish/subscribe surface for phase notifications.
#[derive(Default)]
pub struct PhaseEventBus {
    subscribers: Vec<(SubscriptionId, Handler)>,
    next_id: u64,
    pending: Vec<BusEvent>,
    queue_enabled: bool,
}

impl fmt::Debug for PhaseEventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhaseEventBus")
            .field("subscribers", &self.subscribers.len())
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl PhaseEventBus {
    /// Bus with the pull queue enabled.
    #[must_use]
    pub fn new() -> Self {
        Self {
            queue_enabled: true,
            ..Default::default()
        }
    }

    /// Bus that only notifies subscribers and never queues.
    #[must_use]
    pub fn push_only() -> Self {
        Self::default()
    }

    /// Register a handler; it sees every event published from now on.
    pub fn subscribe(&mut self, handler: impl FnMut(&BusEvent) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, Box::new(handler)));
        id
    }

    /// Remove a handler. Returns whether it was registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    /// Wire a placement collaborator to `PlacementAllowedChange`.
    pub fn attach_placement<P>(&mut self, placement: Rc<RefCell<P>>) -> SubscriptionId
    where
        P: PlacementControl + 'static,
    {
        self.subscribe(move |bus_event| {
            if let PhaseEvent::PlacementAllowedChange { allowed } = bus_event.event {
                placement.borrow_mut().set_placement_mode(allowed);
            }
        })
    }

    /// Deliver an event to every subscriber and the pending queue.
    pub fn publish(&mut self, at: Duration, event: PhaseEvent) {
        let stamped = BusEvent { at, event };
        tracing::trace!(?at, ?event, "Phase event");
        for (_, handler) in &mut self.subscribers {
            handler(&stamped);
        }
        if self.queue_enabled {
            self.pending.push(stamped);
        }
    }

    /// Take every queued event, oldest first.
    pub fn drain(&mut self) -> Vec<BusEvent> {
        std::mem::take(&mut self.pending)
    }

    /// Number of queued events.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

/// Placement subsystem hook, toggled on `PlacementAllowedChange`.
pub trait PlacementControl {
    /// Enable or disable object placement.
    fn set_placement_mode(&mut self, allowed: bool);
}
