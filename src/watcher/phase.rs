//! Observable watcher state.

use std::fmt;

use tokio::time::Instant;

use crate::events::RetryReason;
use crate::target::TargetRef;

/// Which watcher flavor is running.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WatcherKind {
    /// Resolve once, watch once, halt on termination.
    Naive,
    /// Self-healing resolve → confirm → watch loop.
    Reliable,
}

impl WatcherKind {
    /// Short stable label.
    pub fn as_label(&self) -> &'static str {
        match self {
            WatcherKind::Naive => "naive",
            WatcherKind::Reliable => "reliable",
        }
    }
}

/// Snapshot of a watcher's session state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Phase {
    /// No reference held; resolution pending or about to be issued.
    Unresolved,
    /// Reference resolved, liveness not yet confirmed.
    AwaitingConfirmation(TargetRef),
    /// Subscribed to termination of the confirmed reference.
    Watching(TargetRef),
    /// Waiting for the retry timer.
    RetryScheduled {
        /// What failed.
        reason: RetryReason,
        /// When the timer fires.
        deadline: Instant,
    },
    /// Naive watcher gave up.
    Halted,
    /// Stopped by an operator.
    Stopped,
}

impl Phase {
    /// Reference currently watched, if any.
    pub fn watching(&self) -> Option<&TargetRef> {
        match self {
            Phase::Watching(t) => Some(t),
            _ => None,
        }
    }

    /// True once the watcher can no longer change state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Halted | Phase::Stopped)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Unresolved => write!(f, "unresolved"),
            Phase::AwaitingConfirmation(t) => write!(f, "awaiting-confirmation {t}"),
            Phase::Watching(t) => write!(f, "watching {t}"),
            Phase::RetryScheduled { reason, deadline } => {
                let left = deadline.saturating_duration_since(Instant::now());
                write!(f, "retry-scheduled ({}) in {left:?}", reason.as_label())
            }
            Phase::Halted => write!(f, "halted"),
            Phase::Stopped => write!(f, "stopped"),
        }
    }
}
