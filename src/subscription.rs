//! Per-client event-type filters and event fan-out.
//!
//! A `DashMap` from client id to an outbound channel backs the registry, with
//! delivery failure treated as the removal signal rather than tracked
//! separately — there's no separate liveness check, a dead receiver is
//! discovered by trying to send to it. The registry never takes a lock
//! shared across clients: `DashMap` stripes its locking internally, so
//! fan-out to client A can never block a concurrent `Subscribe` from
//! client B.

use crate::protocol::{CacheEvent, EventType};
use dashmap::DashMap;
use std::collections::HashSet;
use tokio::sync::mpsc;
use uuid::Uuid;

/// A connected client's current event-type filter and the channel its
/// session drains to deliver notifications.
#[derive(Debug)]
struct ClientSubscription {
    subscribed_events: HashSet<EventType>,
    sender: mpsc::UnboundedSender<CacheEvent>,
}

/// The fan-out registry: `client_id -> ClientSubscription`.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    clients: DashMap<Uuid, ClientSubscription>,
}

impl SubscriptionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            clients: DashMap::new(),
        }
    }

    /// Registers a new client with an empty filter (subscribed to nothing)
    /// and the channel its session will drain for notifications.
    pub fn add_client(&self, id: Uuid, sender: mpsc::UnboundedSender<CacheEvent>) {
        self.clients.insert(
            id,
            ClientSubscription {
                subscribed_events: HashSet::new(),
                sender,
            },
        );
    }

    /// `Subscribe(id, events)`: **replaces** the filter with `events`. An
    /// empty or omitted list means "subscribe to every event type."
    pub fn subscribe(&self, id: Uuid, events: Option<Vec<EventType>>) {
        let Some(mut client) = self.clients.get_mut(&id) else {
            return;
        };
        client.subscribed_events = match events {
            Some(events) if !events.is_empty() => events.into_iter().collect(),
            _ => EventType::ALL.into_iter().collect(),
        };
    }

    /// `Unsubscribe(id)` clears the filter entirely; `Unsubscribe(id, events)`
    /// subtracts `events` from it.
    pub fn unsubscribe(&self, id: Uuid, events: Option<Vec<EventType>>) {
        let Some(mut client) = self.clients.get_mut(&id) else {
            return;
        };
        match events {
            None => client.subscribed_events.clear(),
            Some(events) => {
                for event in events {
                    client.subscribed_events.remove(&event);
                }
            }
        }
    }

    /// Drops a client's registration entirely, e.g. when its session ends.
    pub fn remove_client(&self, id: Uuid) {
        self.clients.remove(&id);
    }

    /// Delivers `event` to every registered client whose filter contains its
    /// type. A write failure (the session's receiver was dropped) evicts that
    /// client; other deliveries are unaffected.
    pub fn dispatch(&self, event: &CacheEvent) {
        let mut dead = Vec::new();
        for entry in self.clients.iter() {
            let client = entry.value();
            if client.subscribed_events.contains(&event.event_type)
                && client.sender.send(event.clone()).is_err()
            {
                dead.push(*entry.key());
            }
        }
        for id in dead {
            self.clients.remove(&id);
        }
    }

    /// Runs the fan-out loop: drains `events` and calls [`Self::dispatch`]
    /// for each. Intended to run on its own task for the lifetime of the
    /// process; returns once the `EventSink`'s sending half has been dropped.
    pub async fn run(&self, mut events: mpsc::UnboundedReceiver<CacheEvent>) {
        while let Some(event) = events.recv().await {
            self.dispatch(&event);
        }
    }

    /// Number of currently registered clients. Used by tests and by startup
    /// logging, not part of the wire protocol.
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn event(event_type: EventType, key: &str) -> CacheEvent {
        CacheEvent {
            event_type,
            key: key.to_string(),
            value: None,
            timestamp: Utc::now(),
            reason: None,
        }
    }

    #[test]
    fn empty_filter_receives_nothing() {
        let registry = SubscriptionRegistry::new();
        let id = Uuid::new_v4();
        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.add_client(id, tx);

        registry.dispatch(&event(EventType::ItemAdded, "x"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn subscribe_replaces_not_unions() {
        let registry = SubscriptionRegistry::new();
        let id = Uuid::new_v4();
        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.add_client(id, tx);

        registry.subscribe(id, Some(vec![EventType::ItemAdded]));
        registry.subscribe(id, Some(vec![EventType::ItemRemoved]));

        registry.dispatch(&event(EventType::ItemAdded, "x"));
        assert!(rx.try_recv().is_err());

        registry.dispatch(&event(EventType::ItemRemoved, "x"));
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn subscribe_with_no_events_means_everything() {
        let registry = SubscriptionRegistry::new();
        let id = Uuid::new_v4();
        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.add_client(id, tx);

        registry.subscribe(id, None);
        registry.dispatch(&event(EventType::ItemEvicted, "x"));
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn unsubscribe_with_no_args_clears_everything() {
        let registry = SubscriptionRegistry::new();
        let id = Uuid::new_v4();
        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.add_client(id, tx);

        registry.subscribe(id, None);
        registry.unsubscribe(id, None);
        registry.dispatch(&event(EventType::ItemAdded, "x"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn unsubscribe_with_events_subtracts() {
        let registry = SubscriptionRegistry::new();
        let id = Uuid::new_v4();
        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.add_client(id, tx);

        registry.subscribe(id, Some(vec![EventType::ItemAdded, EventType::ItemRemoved]));
        registry.unsubscribe(id, Some(vec![EventType::ItemAdded]));

        registry.dispatch(&event(EventType::ItemAdded, "x"));
        assert!(rx.try_recv().is_err());
        registry.dispatch(&event(EventType::ItemRemoved, "x"));
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn broken_client_is_evicted_on_send_failure() {
        let registry = SubscriptionRegistry::new();
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        registry.add_client(id, tx);
        registry.subscribe(id, None);
        drop(rx);

        registry.dispatch(&event(EventType::ItemAdded, "x"));
        assert_eq!(registry.client_count(), 0);
    }

    #[test]
    fn other_clients_unaffected_by_one_broken_client() {
        let registry = SubscriptionRegistry::new();
        let dead_id = Uuid::new_v4();
        let (dead_tx, dead_rx) = mpsc::unbounded_channel();
        registry.add_client(dead_id, dead_tx);
        registry.subscribe(dead_id, None);
        drop(dead_rx);

        let alive_id = Uuid::new_v4();
        let (alive_tx, mut alive_rx) = mpsc::unbounded_channel();
        registry.add_client(alive_id, alive_tx);
        registry.subscribe(alive_id, None);

        registry.dispatch(&event(EventType::ItemAdded, "x"));
        assert!(alive_rx.try_recv().is_ok());
        assert_eq!(registry.client_count(), 1);
    }
}
