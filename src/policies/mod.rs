//! Retry policies.
//!
//! ## Contents
//! - [`BackoffPolicy`] how long a watcher waits before re-resolving (first / factor / max + jitter)
//! - [`JitterPolicy`]  randomization strategy for watchers that fail together
//!
//! ## Quick wiring
//! ```text
//! WatchSpec { backoff: BackoffPolicy, resolve_timeout, confirm_timeout }
//!      └─► ReliableWatcher uses backoff.next(consecutive_failures - 1)
//!          each time it enters RetryScheduled
//! ```
//!
//! ## Defaults
//! - `BackoffPolicy::default()` → constant 1s, max=30s, jitter=None.
//! - `JitterPolicy::None` by default; consider `Equal` when many watchers
//!   point at the same target.

mod backoff;
mod jitter;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
