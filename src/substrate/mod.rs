//! # Message-passing substrate.
//!
//! A [`Substrate`] is everything a watcher needs from the outside world:
//!
//! | Primitive              | Method                        | Bounded by                  |
//! |------------------------|-------------------------------|-----------------------------|
//! | one-shot resolution    | [`Substrate::resolve`]        | `timeout` argument          |
//! | liveness request/reply | [`Substrate::ask`]            | `timeout` argument          |
//! | termination watch      | [`Substrate::watch`]          | fires once, or never        |
//! | release a watch        | [`Substrate::unwatch`]        | n/a                         |
//!
//! Watchers additionally wrap `resolve` and `ask` in their own
//! `tokio::time::timeout`, so an implementation that ignores the bound
//! cannot freeze a watcher.
//!
//! [`LocalSubstrate`] is an in-process implementation hosting ping targets.

mod local;
#[cfg(test)]
pub(crate) mod scripted;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::error::WatchError;
use crate::target::{Locator, Ping, Pong, TargetRef};

pub use local::LocalSubstrate;

/// Shared handle to a substrate.
pub type SubstrateRef = Arc<dyn Substrate>;

/// Identifier of one termination subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

/// A standing request to be told when one specific instance terminates.
///
/// `terminated` resolves exactly once with the watched reference when that
/// instance ends. If the subscription is released first the sender side is
/// dropped and the receiver yields an error instead.
#[derive(Debug)]
pub struct Subscription {
    /// Handle for [`Substrate::unwatch`].
    pub id: SubscriptionId,
    /// Reference being watched.
    pub target: TargetRef,
    /// Fires with the terminated reference.
    pub terminated: oneshot::Receiver<TargetRef>,
}

/// Resolution, liveness exchange and termination watches.
#[async_trait]
pub trait Substrate: Send + Sync + 'static {
    /// Resolves `locator` to the reference of a live instance.
    ///
    /// Waits at most `timeout` for such an instance to exist.
    async fn resolve(&self, locator: &Locator, timeout: Duration) -> Result<TargetRef, WatchError>;

    /// Sends `ping` to `target` and waits at most `timeout` for the reply.
    async fn ask(&self, target: &TargetRef, ping: Ping, timeout: Duration)
    -> Result<Pong, WatchError>;

    /// Subscribes to termination of `target`.
    ///
    /// Watching an instance that is already gone fires immediately.
    fn watch(&self, target: &TargetRef) -> Subscription;

    /// Releases a subscription. Unknown or already-fired ids are ignored.
    fn unwatch(&self, id: SubscriptionId);
}
