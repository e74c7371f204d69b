//! Error types used by watchers, the substrate and the watchtower.
//!
//! This module defines three error enums:
//!
//! - [`WatchError`]: failures of one resolve/confirm step; always recoverable
//!   inside a resilient watcher.
//! - [`PipeError`]: the failure side of the async-result bridge ([`crate::pipe`]).
//! - [`RuntimeError`]: errors raised by the [`Watchtower`](crate::Watchtower) itself.
//!
//! All of them provide `as_label` for logs and events.

use std::time::Duration;
use thiserror::Error;

use crate::target::{Locator, TargetRef};

/// # Errors produced while resolving or confirming a target.
///
/// None of these are fatal for a resilient watcher: each one funnels into a
/// scheduled retry. The naive watcher halts on the first one it sees.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WatchError {
    /// No live target answered to the locator within the resolution window.
    #[error("resolving {locator} timed out after {timeout:?}")]
    ResolveTimeout {
        /// Locator that was being resolved.
        locator: Locator,
        /// The bounded wait that elapsed.
        timeout: Duration,
    },

    /// The substrate knows nothing about the locator's address.
    #[error("no route to {locator}")]
    NotFound {
        /// Locator that could not be routed.
        locator: Locator,
    },

    /// Liveness request was not answered within the confirmation window.
    #[error("confirmation of {target} timed out after {timeout:?}")]
    ConfirmTimeout {
        /// Reference the request was sent to.
        target: TargetRef,
        /// The bounded wait that elapsed.
        timeout: Duration,
    },

    /// The referenced instance no longer exists (or refused the request).
    #[error("target {target} is unreachable")]
    Unreachable {
        /// Reference the request was sent to.
        target: TargetRef,
    },

    /// A reply arrived from an instance registered under a different locator.
    #[error("reply from {replied} does not match requested {requested}")]
    Mismatched {
        /// Reference the request was sent to.
        requested: TargetRef,
        /// Reference the reply carried.
        replied: TargetRef,
    },

    /// The substrate has been shut down.
    #[error("substrate closed")]
    Closed,

    /// The request never produced an answer (it panicked or was abandoned).
    #[error("request aborted: {reason}")]
    Aborted {
        /// What happened to the request.
        reason: String,
    },
}

impl WatchError {
    /// Returns a short stable label (snake_case) for use in logs/events.
    ///
    /// # Example
    /// ```
    /// use std::time::Duration;
    /// use watchvisor::{Locator, WatchError};
    ///
    /// let err = WatchError::ResolveTimeout {
    ///     locator: "ping@node-1".parse().unwrap(),
    ///     timeout: Duration::from_secs(3),
    /// };
    /// assert_eq!(err.as_label(), "resolve_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            WatchError::ResolveTimeout { .. } => "resolve_timeout",
            WatchError::NotFound { .. } => "not_found",
            WatchError::ConfirmTimeout { .. } => "confirm_timeout",
            WatchError::Unreachable { .. } => "unreachable",
            WatchError::Mismatched { .. } => "mismatched_reply",
            WatchError::Closed => "substrate_closed",
            WatchError::Aborted { .. } => "aborted",
        }
    }

    /// True for failures of the resolution step.
    pub fn is_resolution(&self) -> bool {
        matches!(
            self,
            WatchError::ResolveTimeout { .. } | WatchError::NotFound { .. }
        )
    }

    /// Indicates whether waiting and trying again can change the outcome.
    ///
    /// Only [`WatchError::Closed`] is permanent.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, WatchError::Closed)
    }
}

impl From<PipeError<WatchError>> for WatchError {
    fn from(e: PipeError<WatchError>) -> Self {
        match e {
            PipeError::Failed(inner) => inner,
            other => WatchError::Aborted {
                reason: other.to_string(),
            },
        }
    }
}

/// # Failure side of a piped operation.
///
/// Delivered by [`crate::pipe`] when the operation did not produce a value.
#[derive(Error, Debug)]
pub enum PipeError<E> {
    /// The operation completed with an error.
    #[error("operation failed: {0}")]
    Failed(E),

    /// The operation panicked; the payload is rendered as text.
    #[error("operation panicked: {0}")]
    Panicked(String),

    /// The operation was cancelled before it completed.
    #[error("operation cancelled")]
    Cancelled,
}

impl<E> PipeError<E> {
    /// Returns a short stable label (snake_case) for use in logs/events.
    pub fn as_label(&self) -> &'static str {
        match self {
            PipeError::Failed(_) => "pipe_failed",
            PipeError::Panicked(_) => "pipe_panicked",
            PipeError::Cancelled => "pipe_cancelled",
        }
    }

    /// Returns the inner error if the operation itself failed.
    pub fn into_failed(self) -> Option<E> {
        match self {
            PipeError::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// # Errors produced by the watchtower.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// A watcher for this locator is already registered.
    #[error("already watching {locator}")]
    AlreadyWatching {
        /// The duplicate locator.
        locator: Locator,
    },

    /// No watcher is registered for this locator.
    #[error("not watching {locator}")]
    NotWatching {
        /// The unknown locator.
        locator: Locator,
    },

    /// Shutdown grace period was exceeded; some watchers did not stop in time.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Locators of watchers that did not stop in time.
        stuck: Vec<String>,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/events.
    ///
    /// # Example
    /// ```
    /// use watchvisor::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), stuck: vec![] };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::AlreadyWatching { .. } => "runtime_already_watching",
            RuntimeError::NotWatching { .. } => "runtime_not_watching",
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
        }
    }
}
