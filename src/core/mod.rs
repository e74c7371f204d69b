//! Runtime core: configuration, the watcher registry and graceful shutdown.
//!
//! The only public entry point from this module is [`Watchtower`], which owns
//! every watcher and the event fan-out.
//!
//! Internal modules:
//! - [`registry`]: one watcher handle per locator;
//! - [`watchtower`]: watch / unwatch / ping / status / shutdown;
//! - [`builder`]: assembles a watchtower with subscribers;
//! - [`shutdown`]: OS termination signals.

mod builder;
mod config;
mod registry;
mod shutdown;
mod watchtower;

pub use builder::WatchtowerBuilder;
pub use config::{Config, MIN_BOUND};
pub use registry::WatchStatus;
pub use shutdown::wait_for_shutdown_signal;
pub use watchtower::Watchtower;
