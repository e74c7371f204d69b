//! # Global runtime configuration.
//!
//! Provides [`Config`] centralized settings for a [`Watchtower`](crate::Watchtower).
//!
//! Config is used in two ways:
//! 1. **Watchtower creation**: `Watchtower::builder(config, substrate)`
//! 2. **WatchSpec defaults**: `WatchSpec::with_defaults(locator, &config)`
//!
//! ## Sentinel values
//! - `grace = 0s` → do not wait for watchers on shutdown
//! - `resolve_timeout` / `confirm_timeout` of `0s` are raised to
//!   [`MIN_BOUND`]: every wait a watcher performs is bounded and non-zero.

use std::time::Duration;

use crate::policies::BackoffPolicy;

/// Smallest resolution/confirmation bound a watcher will use.
pub const MIN_BOUND: Duration = Duration::from_millis(1);

/// Global configuration for the watchtower runtime.
///
/// ## Field semantics
/// - `resolve_timeout`: bounded wait for one resolution attempt
/// - `confirm_timeout`: bounded wait for one liveness reply
/// - `backoff`: delay policy between failed cycles
/// - `bus_capacity`: Event bus ring buffer size (min 1; clamped by Bus)
/// - `grace`: Maximum wait for watchers to stop on shutdown
#[derive(Clone, Debug)]
pub struct Config {
    /// Default resolution bound per attempt.
    pub resolve_timeout: Duration,

    /// Default confirmation bound per attempt.
    pub confirm_timeout: Duration,

    /// Default retry policy for resilient watchers.
    pub backoff: BackoffPolicy,

    /// Capacity of the event bus broadcast channel ring buffer.
    pub bus_capacity: usize,

    /// Maximum time to wait for watchers to stop during shutdown.
    pub grace: Duration,
}

impl Config {
    /// Resolution bound, raised to [`MIN_BOUND`].
    #[inline]
    pub fn resolve_bound(&self) -> Duration {
        self.resolve_timeout.max(MIN_BOUND)
    }

    /// Confirmation bound, raised to [`MIN_BOUND`].
    #[inline]
    pub fn confirm_bound(&self) -> Duration {
        self.confirm_timeout.max(MIN_BOUND)
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `resolve_timeout = 3s`
    /// - `confirm_timeout = 3s`
    /// - `backoff = BackoffPolicy::default()` (constant 1s)
    /// - `bus_capacity = 1024`
    /// - `grace = 5s`
    fn default() -> Self {
        Self {
            resolve_timeout: Duration::from_secs(3),
            confirm_timeout: Duration::from_secs(3),
            backoff: BackoffPolicy::default(),
            bus_capacity: 1024,
            grace: Duration::from_secs(5),
        }
    }
}
