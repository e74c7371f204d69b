//! # Runtime events emitted by watchers and the watchtower.
//!
//! [`EventKind`] falls into three groups:
//! - **Watch cycle events**: one per phase transition of a watcher
//!   (resolve, confirm, watch, termination, retry)
//! - **Management events**: watchers added to / removed from a watchtower
//! - **Runtime events**: shutdown progress and subscriber health
//!
//! An [`Event`] adds a timestamp, the watcher's locator, the target reference
//! involved and kind-specific details (attempt, bounds, delay, reason).
//!
//! `seq` is process-wide and strictly increasing; sort by it when events from
//! several receivers need to be merged.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use watchvisor::{Event, EventKind, RetryReason};
//!
//! let ev = Event::new(EventKind::RetryScheduled)
//!     .with_watcher("ping@node-1")
//!     .with_retry(RetryReason::Resolution)
//!     .with_attempt(3)
//!     .with_delay(Duration::from_secs(1));
//!
//! assert_eq!(ev.kind, EventKind::RetryScheduled);
//! assert_eq!(ev.watcher.as_deref(), Some("ping@node-1"));
//! assert_eq!(ev.delay_ms, Some(1000));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::target::TargetRef;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `watcher`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `watcher`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,

    // === Shutdown events ===
    /// Watchtower shutdown requested.
    ShutdownRequested,

    /// All watchers stopped within the configured grace period.
    AllStoppedWithin,

    /// Grace period exceeded; some watchers did not stop in time.
    GraceExceeded,

    // === Watch cycle events ===
    /// Watcher actor started.
    ///
    /// Sets:
    /// - `watcher`: locator
    /// - `reason`: `"reliable"` or `"naive"`
    WatcherStarted,

    /// A resolution attempt was issued.
    ///
    /// Sets:
    /// - `watcher`: locator
    /// - `attempt`: resolve attempt number (1-based, per watcher, never resets)
    /// - `timeout_ms`: resolution bound
    ResolveAttempt,

    /// Resolution timed out or found nothing.
    ///
    /// Sets:
    /// - `watcher`, `attempt`
    /// - `reason`: error message
    ResolveFailed,

    /// A liveness request was sent to a resolved reference.
    ///
    /// Sets:
    /// - `watcher`
    /// - `target`: resolved reference
    /// - `timeout_ms`: confirmation bound
    ConfirmAttempt,

    /// Liveness request timed out, was refused, or the reply did not match.
    ///
    /// Sets:
    /// - `watcher`, `target`
    /// - `reason`: error message
    ConfirmFailed,

    /// Termination subscription registered.
    ///
    /// Sets:
    /// - `watcher`
    /// - `target`: the reference taken from the confirmation reply
    WatchEstablished,

    /// The watched instance terminated.
    ///
    /// Sets:
    /// - `watcher`, `target`
    TerminationObserved,

    /// A termination notification for a reference that is no longer current was discarded.
    ///
    /// Sets:
    /// - `watcher`, `target` (the stale reference)
    StaleNotification,

    /// Next resolve attempt scheduled after a recoverable failure.
    ///
    /// Sets:
    /// - `watcher`
    /// - `attempt`: consecutive failures so far (1-based; resets on watch established)
    /// - `delay_ms`: delay before the next attempt
    /// - `retry`: what failed
    /// - `reason`: failure message
    RetryScheduled,

    /// Retry timer fired; a new cycle begins.
    ///
    /// Sets:
    /// - `watcher`
    RetryFired,

    /// Naive watcher gave up (after termination or failed resolution).
    ///
    /// Sets:
    /// - `watcher`
    /// - `reason`: why it halted
    WatcherHalted,

    /// Watcher stopped by an operator.
    ///
    /// Sets:
    /// - `watcher`
    WatcherStopped,

    // === Management events ===
    /// Watcher registered in a watchtower.
    WatcherAdded,

    /// Watcher removed from a watchtower (after join).
    WatcherRemoved,
}

/// What sent a watcher into `RetryScheduled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RetryReason {
    /// Resolution timed out or found nothing.
    Resolution,
    /// Confirmation exchange failed.
    Confirmation,
    /// The watched instance terminated.
    Termination,
}

impl RetryReason {
    /// Short stable label.
    pub fn as_label(&self) -> &'static str {
        match self {
            RetryReason::Resolution => "resolution",
            RetryReason::Confirmation => "confirmation",
            RetryReason::Termination => "termination",
        }
    }
}

/// One observation published on the [`Bus`](crate::Bus).
///
/// Only `seq`, `at` and `kind` are always set; which optional fields are
/// filled depends on the kind.
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Locator of the watcher (or subscriber name for subscriber events).
    pub watcher: Option<Arc<str>>,
    /// Target reference involved, if any.
    pub target: Option<TargetRef>,
    /// Attempt counter (meaning depends on the kind).
    pub attempt: Option<u32>,
    /// Bounded wait in milliseconds (compact).
    pub timeout_ms: Option<u32>,
    /// Retry delay in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Cause of a scheduled retry.
    pub retry: Option<RetryReason>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Stamps a new event of `kind` with the next `seq` and the current time.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            watcher: None,
            target: None,
            attempt: None,
            timeout_ms: None,
            delay_ms: None,
            retry: None,
            reason: None,
        }
    }

    /// Attaches a watcher name (locator text).
    #[inline]
    pub fn with_watcher(mut self, watcher: impl Into<Arc<str>>) -> Self {
        self.watcher = Some(watcher.into());
        self
    }

    /// Attaches a target reference.
    #[inline]
    pub fn with_target(mut self, target: TargetRef) -> Self {
        self.target = Some(target);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches an attempt count.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a bounded wait (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        self.timeout_ms = Some(compact_ms(d));
        self
    }

    /// Attaches a retry delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        self.delay_ms = Some(compact_ms(d));
        self
    }

    /// Attaches the cause of a scheduled retry.
    #[inline]
    pub fn with_retry(mut self, reason: RetryReason) -> Self {
        self.retry = Some(reason);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_watcher(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_watcher(subscriber)
            .with_reason(info)
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }

    #[inline]
    pub fn is_subscriber_panic(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberPanicked)
    }
}

fn compact_ms(d: Duration) -> u32 {
    d.as_millis().min(u128::from(u32::MAX)) as u32
}
