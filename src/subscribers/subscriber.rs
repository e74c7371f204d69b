//! # Subscribe: plug custom handlers into a watchtower's event stream.
//!
//! Register implementations with
//! [`WatchtowerBuilder::with_subscriber`](crate::WatchtowerBuilder::with_subscriber).
//! Every subscriber is driven by its own worker from its own bounded queue, so a
//! slow or panicking one never holds back watchers or other subscribers.
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use watchvisor::{Event, EventKind, Subscribe};
//!
//! struct Pager;
//!
//! #[async_trait]
//! impl Subscribe for Pager {
//!     async fn on_event(&self, ev: &Event) {
//!         if ev.kind == EventKind::TerminationObserved {
//!             // page the on-call
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "pager" }
//!     fn queue_capacity(&self) -> usize { 64 }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Handler for watcher events.
///
/// Implementations should not block the executor and should not panic; a
/// panic is caught, reported as `SubscriberPanicked`, and the next event is
/// delivered as usual.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handles one event. Events arrive in publish order.
    async fn on_event(&self, event: &Event);

    /// Name reported in `SubscriberOverflow` / `SubscriberPanicked` events.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Queue size for this subscriber (at least 1, default 1024).
    ///
    /// When full, new events are dropped for this subscriber only.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
