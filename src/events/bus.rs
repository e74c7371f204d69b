//! # Broadcast bus for watcher events.
//!
//! [`Bus`] wraps [`tokio::sync::broadcast`]. Every watcher, the watchtower and
//! the subscriber workers publish into one shared ring buffer; any number of
//! receivers observe it.
//!
//! ```text
//!   ReliableWatcher ──┐
//!   NaiveWatcher    ──┼──► Bus ──► Watchtower listener ──► SubscriberSet
//!   Watchtower      ──┘        └─► Bus::subscribe() (tests, custom probes)
//! ```
//!
//! Publishing never waits. A receiver that falls more than `capacity` events
//! behind gets `RecvError::Lagged(n)`; events sent while nobody listens are gone.

use tokio::sync::broadcast;

use super::event::Event;

/// Cloneable event publisher.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a bus holding up to `capacity` undelivered events (at least 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Sends `ev` to every current receiver; dropped when there are none.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Receiver for events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Number of live receivers.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new(1024)
    }
}
