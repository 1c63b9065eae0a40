//! In-process broadcast of user actions.
//!
//! Publishers and subscribers share one explicitly constructed [`ActionBus`]
//! handle. Delivery is synchronous and ordered. A publish issued from inside
//! a handler is queued and delivered after the current event has reached
//! every subscriber, so each subscriber still sees events in publish order.

use bevy::prelude::*;
use parking_lot::ReentrantMutex;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::{Arc, Weak};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionEvent {
    PlaceLunarRover,
    RemoveAllAnchors,
    PlaceLunarLander,
    PlaceIss,
    PlaceEarth,
    PlaceSaturnV,
    PlaceJwst,
    PlaceIceSat,
}

impl ActionEvent {
    /// Every action in button-bar order.
    pub const ALL: [ActionEvent; 8] = [
        ActionEvent::RemoveAllAnchors,
        ActionEvent::PlaceLunarRover,
        ActionEvent::PlaceLunarLander,
        ActionEvent::PlaceIss,
        ActionEvent::PlaceEarth,
        ActionEvent::PlaceSaturnV,
        ActionEvent::PlaceJwst,
        ActionEvent::PlaceIceSat,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ActionEvent::PlaceLunarRover => "Rover",
            ActionEvent::RemoveAllAnchors => "Clear",
            ActionEvent::PlaceLunarLander => "Lander",
            ActionEvent::PlaceIss => "ISS Live",
            ActionEvent::PlaceEarth => "Station",
            ActionEvent::PlaceSaturnV => "Saturn V",
            ActionEvent::PlaceJwst => "JWST",
            ActionEvent::PlaceIceSat => "ICESat-2",
        }
    }
}

type Handler = Arc<dyn Fn(&ActionEvent) + Send + Sync>;

#[derive(Default)]
struct BusState {
    subscribers: Vec<(u64, Handler)>,
    pending: VecDeque<ActionEvent>,
    dispatching: bool,
    next_id: u64,
}

type Shared = ReentrantMutex<RefCell<BusState>>;

#[derive(Resource, Clone, Default)]
pub struct ActionBus {
    inner: Arc<Shared>,
}

impl ActionBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `event` to every current subscriber.
    pub fn publish(&self, event: ActionEvent) {
        let guard = self.inner.lock();

        {
            let mut state = guard.borrow_mut();
            state.pending.push_back(event);
            if state.dispatching {
                // Re-entrant publish; the outer loop picks it up.
                return;
            }
            state.dispatching = true;
        }

        loop {
            let (event, handlers) = {
                let mut state = guard.borrow_mut();
                let Some(event) = state.pending.pop_front() else {
                    state.dispatching = false;
                    break;
                };
                let handlers: Vec<(u64, Handler)> = state.subscribers.clone();
                (event, handlers)
            };

            for (id, handler) in handlers {
                // A handler may have disposed a later subscriber.
                let still_subscribed = guard.borrow().subscribers.iter().any(|(s, _)| *s == id);
                if still_subscribed {
                    handler(&event);
                }
            }
        }
    }

    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&ActionEvent) + Send + Sync + 'static,
    {
        let guard = self.inner.lock();
        let mut state = guard.borrow_mut();
        let id = state.next_id;
        state.next_id += 1;
        state.subscribers.push((id, Arc::new(handler)));

        Subscription {
            bus: Arc::downgrade(&self.inner),
            id: Some(id),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().borrow().subscribers.len()
    }
}

/// Keeps a handler registered. Dropping it unsubscribes.
pub struct Subscription {
    bus: Weak<Shared>,
    id: Option<u64>,
}

impl Subscription {
    /// Unsubscribe. No delivery reaches the handler after this returns.
    pub fn dispose(&mut self) {
        let Some(id) = self.id.take() else {
            return;
        };
        if let Some(bus) = self.bus.upgrade() {
            let guard = bus.lock();
            guard.borrow_mut().subscribers.retain(|(s, _)| *s != id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn recorder() -> (Arc<Mutex<Vec<ActionEvent>>>, impl Fn(&ActionEvent) + Send + Sync) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        (seen, move |e: &ActionEvent| sink.lock().push(*e))
    }

    #[test]
    fn test_delivers_in_publish_order() {
        let bus = ActionBus::new();
        let (a_seen, a) = recorder();
        let (b_seen, b) = recorder();
        let _a = bus.subscribe(a);
        let _b = bus.subscribe(b);

        bus.publish(ActionEvent::PlaceJwst);
        bus.publish(ActionEvent::RemoveAllAnchors);

        let expected = vec![ActionEvent::PlaceJwst, ActionEvent::RemoveAllAnchors];
        assert_eq!(*a_seen.lock(), expected);
        assert_eq!(*b_seen.lock(), expected);
    }

    #[test]
    fn test_late_subscriber_misses_earlier_events() {
        let bus = ActionBus::new();
        bus.publish(ActionEvent::PlaceIss);

        let (seen, handler) = recorder();
        let _sub = bus.subscribe(handler);
        assert!(seen.lock().is_empty());

        bus.publish(ActionEvent::PlaceEarth);
        assert_eq!(*seen.lock(), vec![ActionEvent::PlaceEarth]);
    }

    #[test]
    fn test_dispose_stops_delivery() {
        let bus = ActionBus::new();
        let (seen, handler) = recorder();
        let mut sub = bus.subscribe(handler);

        bus.publish(ActionEvent::PlaceSaturnV);
        sub.dispose();
        bus.publish(ActionEvent::PlaceIceSat);

        assert_eq!(*seen.lock(), vec![ActionEvent::PlaceSaturnV]);
        assert_eq!(bus.subscriber_count(), 0);

        // Second dispose and the eventual drop are no-ops.
        sub.dispose();
    }

    #[test]
    fn test_drop_unsubscribes() {
        let bus = ActionBus::new();
        {
            let _sub = bus.subscribe(|_| {});
            assert_eq!(bus.subscriber_count(), 1);
        }
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_reentrant_publish_keeps_order() {
        let bus = ActionBus::new();

        let republisher = bus.clone();
        let _first = bus.subscribe(move |e| {
            if *e == ActionEvent::PlaceIss {
                republisher.publish(ActionEvent::PlaceEarth);
            }
        });
        let (seen, handler) = recorder();
        let _second = bus.subscribe(handler);

        bus.publish(ActionEvent::PlaceIss);
        bus.publish(ActionEvent::PlaceJwst);

        assert_eq!(
            *seen.lock(),
            vec![
                ActionEvent::PlaceIss,
                ActionEvent::PlaceEarth,
                ActionEvent::PlaceJwst
            ]
        );
    }

    #[test]
    fn test_dispose_from_handler_skips_later_subscriber() {
        let bus = ActionBus::new();
        let victim: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        let slot = victim.clone();
        let _killer = bus.subscribe(move |_| {
            if let Some(mut sub) = slot.lock().take() {
                sub.dispose();
            }
        });
        let (seen, handler) = recorder();
        *victim.lock() = Some(bus.subscribe(handler));

        bus.publish(ActionEvent::PlaceLunarRover);
        assert!(seen.lock().is_empty());
    }
}
