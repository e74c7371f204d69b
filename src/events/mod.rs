//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to events emitted by watchers and the watchtower.
//!
//! ## Contents
//! - [`EventKind`], [`Event`], [`RetryReason`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `ReliableWatcher`, `NaiveWatcher`, `Watchtower`,
//!   `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the watchtower's subscriber listener (fans out to
//!   `SubscriberSet`), and anyone holding [`Bus::subscribe`].

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind, RetryReason};
