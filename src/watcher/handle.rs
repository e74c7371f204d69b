//! # Watcher handle.
//!
//! [`WatcherHandle`] is what spawning a watcher returns: a way to observe its
//! [`Phase`] and to stop it.
//!
//! ## Stop semantics
//! `stop()` cancels the watcher's token and joins its task. The watcher
//! releases its subscription, drops any pending retry timer or in-flight
//! request, publishes `WatcherStopped`, and produces nothing afterwards.

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{Phase, WatcherKind};
use crate::target::Locator;

/// Handle to a running watcher.
pub struct WatcherHandle {
    locator: Locator,
    kind: WatcherKind,
    phase: watch::Receiver<Phase>,
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

impl WatcherHandle {
    pub(crate) fn new(
        locator: Locator,
        kind: WatcherKind,
        phase: watch::Receiver<Phase>,
        cancel: CancellationToken,
        join: JoinHandle<()>,
    ) -> Self {
        Self {
            locator,
            kind,
            phase,
            cancel,
            join,
        }
    }

    /// Locator being watched.
    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    /// Watcher flavor.
    pub fn kind(&self) -> WatcherKind {
        self.kind
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase.borrow().clone()
    }

    /// Receiver observing every phase change.
    pub fn phases(&self) -> watch::Receiver<Phase> {
        self.phase.clone()
    }

    /// True once the watcher task has exited.
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Requests a stop without waiting for it.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Waits for the watcher task to exit.
    pub async fn join(&mut self) {
        let _ = (&mut self.join).await;
    }

    /// Stops the watcher and waits for it to exit.
    pub async fn stop(mut self) {
        self.cancel();
        self.join().await;
    }
}
