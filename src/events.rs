//! The event source every engine mutation reports to.
//!
//! `EventSink::emit` is called from inside the engine's mutex (see
//! `engine.rs`), so it must never block on anything a slow subscriber could
//! stall — it only pushes onto an unbounded channel the
//! [`crate::subscription::SubscriptionRegistry`] drains on its own task.

use crate::protocol::CacheEvent;
use tokio::sync::mpsc;

/// Handle the engine holds to report committed mutations.
///
/// Cloning is cheap (it's a channel sender); every session and the engine
/// itself share one underlying channel, fed into one registry dispatch loop.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<CacheEvent>,
}

impl EventSink {
    /// Creates a sink/source pair. The source end is handed to whatever task
    /// fans events out to subscribers (see
    /// [`crate::subscription::SubscriptionRegistry::run`]).
    pub fn channel() -> (EventSink, mpsc::UnboundedReceiver<CacheEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (EventSink { tx }, rx)
    }

    /// Reports a committed mutation. Never blocks; if the receiving end has
    /// been dropped (which only happens during shutdown) the event is
    /// silently discarded — the engine's state is already committed and
    /// doesn't roll back because nobody was listening.
    pub fn emit(&self, event: CacheEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("event dropped: no active fan-out receiver");
        }
    }
}
