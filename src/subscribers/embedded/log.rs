//! # LogWriter: events as `tracing` records
//!
//! A subscriber that turns every [`Event`] into one structured `tracing`
//! record. Install any `tracing` subscriber to see the output.
//!
//! ## Example output (`tracing_subscriber::fmt`)
//! ```text
//! INFO resolve attempt watcher="ping@node-1" attempt=1 timeout_ms=3000
//! WARN resolve failed watcher="ping@node-1" attempt=1 reason="resolving ping@node-1 timed out after 3s"
//! INFO retry scheduled watcher="ping@node-1" retry="resolution" delay_ms=1000 attempt=1
//! INFO watch established watcher="ping@node-1" target_ref="ping@node-1#7"
//! WARN termination observed watcher="ping@node-1" target_ref="ping@node-1#7"
//! ```

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let watcher = e.watcher.as_deref().unwrap_or("-");
        let target_ref = e.target.as_ref().map(ToString::to_string);
        let target_ref = target_ref.as_deref();
        let reason = e.reason.as_deref().unwrap_or("");

        match e.kind {
            EventKind::WatcherStarted => {
                info!(watcher, kind = reason, "watcher started");
            }
            EventKind::ResolveAttempt => {
                info!(watcher, attempt = e.attempt, timeout_ms = e.timeout_ms, "resolve attempt");
            }
            EventKind::ResolveFailed => {
                warn!(watcher, attempt = e.attempt, reason, "resolve failed");
            }
            EventKind::ConfirmAttempt => {
                info!(watcher, target_ref, timeout_ms = e.timeout_ms, "confirmation attempt");
            }
            EventKind::ConfirmFailed => {
                warn!(watcher, target_ref, reason, "confirmation failed");
            }
            EventKind::WatchEstablished => {
                info!(watcher, target_ref, "watch established");
            }
            EventKind::TerminationObserved => {
                warn!(watcher, target_ref, "termination observed");
            }
            EventKind::StaleNotification => {
                debug!(watcher, target_ref, "stale notification discarded");
            }
            EventKind::RetryScheduled => {
                info!(
                    watcher,
                    retry = e.retry.map(|r| r.as_label()),
                    delay_ms = e.delay_ms,
                    attempt = e.attempt,
                    "retry scheduled"
                );
            }
            EventKind::RetryFired => {
                debug!(watcher, "retry timer fired");
            }
            EventKind::WatcherHalted => {
                warn!(watcher, reason, "watcher halted");
            }
            EventKind::WatcherStopped => {
                info!(watcher, "watcher stopped");
            }
            EventKind::WatcherAdded => {
                debug!(watcher, "watcher added");
            }
            EventKind::WatcherRemoved => {
                debug!(watcher, "watcher removed");
            }
            EventKind::ShutdownRequested => {
                info!("shutdown requested");
            }
            EventKind::AllStoppedWithin => {
                info!("all watchers stopped within grace");
            }
            EventKind::GraceExceeded => {
                error!(reason, "grace exceeded");
            }
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked => {
                error!(subscriber = watcher, reason, "subscriber fault");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
