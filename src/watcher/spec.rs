//! # Watch specification.
//!
//! Defines [`WatchSpec`] the per-watcher configuration bundle: which locator
//! to watch and how patiently.
//!
//! A spec can be created:
//! - **Explicitly** with [`WatchSpec::new`] and the `with_*` setters
//! - **From config** with [`WatchSpec::with_defaults`] (inherit defaults)

use std::time::Duration;

use crate::{core::Config, core::MIN_BOUND, policies::BackoffPolicy, target::Locator};

/// Specification for one watcher.
///
/// ## Example
/// ```rust
/// use std::time::Duration;
/// use watchvisor::{BackoffPolicy, Config, WatchSpec};
///
/// let spec = WatchSpec::with_defaults("ping@node-1".parse().unwrap(), &Config::default())
///     .with_backoff(BackoffPolicy::constant(Duration::from_millis(250)));
/// assert_eq!(spec.resolve_timeout(), Duration::from_secs(3));
/// ```
#[derive(Clone, Debug)]
pub struct WatchSpec {
    locator: Locator,
    backoff: BackoffPolicy,
    resolve_timeout: Duration,
    confirm_timeout: Duration,
}

impl WatchSpec {
    /// Creates a spec with [`Config::default`] settings.
    pub fn new(locator: Locator) -> Self {
        Self::with_defaults(locator, &Config::default())
    }

    /// Creates a spec inheriting bounds and backoff from `cfg`.
    pub fn with_defaults(locator: Locator, cfg: &Config) -> Self {
        Self {
            locator,
            backoff: cfg.backoff,
            resolve_timeout: cfg.resolve_bound(),
            confirm_timeout: cfg.confirm_bound(),
        }
    }

    /// Overrides the retry policy.
    #[must_use]
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Overrides the resolution bound (raised to at least 1ms).
    #[must_use]
    pub fn with_resolve_timeout(mut self, timeout: Duration) -> Self {
        self.resolve_timeout = timeout.max(MIN_BOUND);
        self
    }

    /// Overrides the confirmation bound (raised to at least 1ms).
    #[must_use]
    pub fn with_confirm_timeout(mut self, timeout: Duration) -> Self {
        self.confirm_timeout = timeout.max(MIN_BOUND);
        self
    }

    /// Locator to watch.
    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    /// Retry policy.
    pub fn backoff(&self) -> BackoffPolicy {
        self.backoff
    }

    /// Resolution bound.
    pub fn resolve_timeout(&self) -> Duration {
        self.resolve_timeout
    }

    /// Confirmation bound.
    pub fn confirm_timeout(&self) -> Duration {
        self.confirm_timeout
    }
}
