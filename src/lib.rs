//! # watchvisor
//!
//! **Watchvisor** keeps track of whether a named, remotely addressable target
//! is alive, and keeps tracking it across the target's restarts and across
//! transient network failures.
//!
//! A watcher starts from a [`Locator`] (`name@address`), resolves it to the
//! [`TargetRef`] of the instance currently running there, confirms that
//! instance with a [`Ping`] / [`Pong`] exchange, and subscribes to its
//! termination. When anything fails, the resilient watcher schedules a
//! retry with backoff and starts over. It never gives up on its own.
//!
//! ## Architecture
//! ```text
//!     ┌──────────────────┐     ┌──────────────────┐
//!     │  reliable_watch  │     │      watch       │
//!     │  (WatchSpec #1)  │     │  (WatchSpec #2)  │
//!     └────────┬─────────┘     └────────┬─────────┘
//!              ▼                        ▼
//! ┌────────────────────────────────────────────────────────┐
//! │  Watchtower                                            │
//! │  - Registry (one WatcherHandle per locator)            │
//! │  - Bus (broadcast events)                              │
//! │  - SubscriberSet (fans out to user subscribers)        │
//! └────────┬────────────────────────┬──────────────────────┘
//!          ▼                        ▼
//!   ┌──────────────────┐     ┌──────────────────┐
//!   │ ReliableWatcher  │     │   NaiveWatcher   │
//!   │ (actor + inbox)  │     │   (one shot)     │
//!   └────────┬─────────┘     └────────┬─────────┘
//!            │  resolve / ask / watch / unwatch
//!            ▼                        ▼
//! ┌────────────────────────────────────────────────────────┐
//! │  Substrate (LocalSubstrate, or your own transport)     │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! ### Resilient watcher lifecycle
//! ```text
//! Unresolved ──resolve ok──► AwaitingConfirmation(r) ──pong from r'──► Watching(r')
//!     ▲                             │ timeout / unreachable / mismatch     │ Terminated(r')
//!     │ timer fired                 ▼                                      ▼
//!     └──────────────────────── RetryScheduled ◄────────────────────────────┘
//!                                   ▲
//!                  resolve failed ──┘
//! ```
//!
//! ## Features
//! | Area              | Description                                                            | Key types                            |
//! |-------------------|------------------------------------------------------------------------|--------------------------------------|
//! | **Watchers**      | Self-healing and one-shot liveness watches.                            | [`ReliableWatcher`], [`NaiveWatcher`] |
//! | **Registry**      | Watch / unwatch / ping / status by locator, graceful shutdown.         | [`Watchtower`], [`WatchStatus`]      |
//! | **Policies**      | Backoff between failed cycles, with optional jitter.                   | [`BackoffPolicy`], [`JitterPolicy`]  |
//! | **Substrate**     | Resolution, request/reply and termination watches.                     | [`Substrate`], [`LocalSubstrate`]    |
//! | **Pipe**          | Deliver an async outcome into an inbox as exactly one message.         | [`Pipe`], [`Status`]                 |
//! | **Observability** | Structured events on a broadcast bus, pluggable subscribers.           | [`Event`], [`Bus`], [`Subscribe`]    |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use watchvisor::{BackoffPolicy, Config, LocalSubstrate, Locator, Phase, Watchtower};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let substrate = LocalSubstrate::new();
//! let cfg = Config {
//!     backoff: BackoffPolicy::constant(Duration::from_millis(100)),
//!     ..Config::default()
//! };
//! let tower = Watchtower::builder(cfg, Arc::new(substrate.clone())).build();
//!
//! // The watcher may start before its target does.
//! let target = Locator::new("ping", "node-1");
//! tower.reliable_watch(target.clone()).await?;
//! let live = substrate.spawn(target.clone());
//!
//! loop {
//!     let status = tower.status().await;
//!     if status[0].phase == Phase::Watching(live.clone()) {
//!         break;
//!     }
//!     tokio::time::sleep(Duration::from_millis(10)).await;
//! }
//!
//! tower.shutdown().await?;
//! # Ok(())
//! # }
//! ```

mod core;
mod error;
mod events;
mod pipe;
mod policies;
mod subscribers;
mod substrate;
mod target;
mod watcher;

// ---- Public re-exports ----

pub use crate::core::{
    Config, MIN_BOUND, WatchStatus, Watchtower, WatchtowerBuilder, wait_for_shutdown_signal,
};
pub use error::{PipeError, RuntimeError, WatchError};
pub use events::{Bus, Event, EventKind, RetryReason};
pub use pipe::{Pipe, Status, pipe_to};
pub use policies::{BackoffPolicy, JitterPolicy};
pub use subscribers::{Subscribe, SubscriberSet};
pub use substrate::{LocalSubstrate, Subscription, SubscriptionId, Substrate, SubstrateRef};
pub use target::{LOCAL_ADDRESS, Locator, LocatorParseError, Ping, Pong, TargetRef};
pub use watcher::{NaiveWatcher, Phase, ReliableWatcher, WatchSpec, WatcherHandle, WatcherKind};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
