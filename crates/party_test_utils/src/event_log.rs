//! Recorder for the phase event bus.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use party_core::events::{BusEvent, PhaseEvent, PhaseEventBus, PhaseKind, SubscriptionId};

/// Shared log of every event a bus publishes.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Rc<RefCell<Vec<BusEvent>>>,
}

impl EventLog {
    /// Empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe this log to `bus`.
    pub fn attach(&self, bus: &mut PhaseEventBus) -> SubscriptionId {
        let sink = Rc::clone(&self.events);
        bus.subscribe(move |event| sink.borrow_mut().push(*event))
    }

    /// Copy of everything logged so far.
    #[must_use]
    pub fn events(&self) -> Vec<BusEvent> {
        self.events.borrow().clone()
    }

    /// Events without countdown ticks, which are noisy in assertions.
    #[must_use]
    pub fn milestones(&self) -> Vec<BusEvent> {
        self.events
            .borrow()
            .iter()
            .filter(|e| !matches!(e.event, PhaseEvent::CountdownTick { .. }))
            .copied()
            .collect()
    }

    /// Match time of the first event equal to `event`.
    #[must_use]
    pub fn time_of(&self, event: PhaseEvent) -> Option<Duration> {
        self.events
            .borrow()
            .iter()
            .find(|e| e.event == event)
            .map(|e| e.at)
    }

    /// Number of logged events equal to `event`.
    #[must_use]
    pub fn count(&self, event: PhaseEvent) -> usize {
        self.events.borrow().iter().filter(|e| e.event == event).count()
    }

    /// Every phase entered, in order.
    #[must_use]
    pub fn phases(&self) -> Vec<PhaseKind> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e.event {
                PhaseEvent::PhaseChanged { to, .. } => Some(to),
                _ => None,
            })
            .collect()
    }

    /// Every countdown value published, in order.
    #[must_use]
    pub fn countdowns(&self) -> Vec<Duration> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e.event {
                PhaseEvent::CountdownTick { remaining } => Some(remaining),
                _ => None,
            })
            .collect()
    }

    /// Milestones as RON, one event per line, for failure messages.
    #[must_use]
    pub fn dump(&self) -> String {
        self.milestones()
            .iter()
            .map(|e| ron::to_string(e).unwrap_or_else(|err| format!("<{err}>")))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Forget everything logged so far.
    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_sees_published_events() {
        let mut bus = PhaseEventBus::push_only();
        let log = EventLog::new();
        log.attach(&mut bus);

        bus.publish(Duration::ZERO, PhaseEvent::RoundStart { round: 1 });
        bus.publish(
            Duration::from_secs(1),
            PhaseEvent::CountdownTick {
                remaining: Duration::from_secs(9),
            },
        );
        bus.publish(Duration::from_secs(10), PhaseEvent::PlacementEnd);

        assert_eq!(log.events().len(), 3);
        assert_eq!(log.milestones().len(), 2);
        assert_eq!(log.time_of(PhaseEvent::PlacementEnd), Some(Duration::from_secs(10)));
        assert_eq!(log.count(PhaseEvent::RoundStart { round: 1 }), 1);
        assert_eq!(log.countdowns(), vec![Duration::from_secs(9)]);
        assert!(log.dump().contains("placement_end"));

        log.clear();
        assert!(log.events().is_empty());
    }
}
