//! # Watchers: keep track of whether a named target is alive.
//!
//! Two flavors share the same inputs ([`WatchSpec`], a substrate, the event bus)
//! and the same output ([`WatcherHandle`]):
//!
//! - [`ReliableWatcher`]: resolve → confirm → watch, re-resolving forever with backoff.
//! - [`NaiveWatcher`]: resolve once, watch once, halt on the first failure or termination.
//!
//! ```text
//! Watchtower ──spawn──► ReliableWatcher / NaiveWatcher (tokio task)
//!      │                    │  resolve / ask / watch
//!      │                    ▼
//!      │                Substrate
//!      └──── WatcherHandle (phase, cancel, join)
//! ```

mod handle;
mod naive;
mod phase;
mod reliable;
mod spec;

pub use handle::WatcherHandle;
pub use naive::NaiveWatcher;
pub use phase::{Phase, WatcherKind};
pub use reliable::ReliableWatcher;
pub use spec::WatchSpec;
