//! # In-process substrate.
//!
//! [`LocalSubstrate`] hosts ping targets keyed by [`Locator`]. Each hosted
//! target is a small tokio task answering [`Ping`] with [`Pong`].
//!
//! ## Behavior
//! ```text
//! spawn(loc)      → new incarnation; an existing one at `loc` is retired first
//! kill(loc)       → retire: stop the ping task, fire its termination watches
//! resolve(loc, t) → waits up to `t` for a live, reachable target at `loc`
//! ask(ref, t)     → Unreachable if `ref` is not the current incarnation
//! partition(addr) → targets at `addr` stop resolving and stop answering
//! heal(addr)      → undo partition
//! ```
//!
//! Termination watches fire only for the exact incarnation they were
//! registered on: restarting a target under the same locator notifies the old
//! incarnation's watchers and nobody else.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Notify, mpsc, oneshot};
use tokio::time;
use tokio_util::sync::CancellationToken;

use super::{Substrate, Subscription, SubscriptionId};
use crate::error::WatchError;
use crate::target::{Locator, Ping, Pong, TargetRef};

const MAILBOX_CAPACITY: usize = 64;

struct PingRequest {
    reply: oneshot::Sender<Pong>,
}

struct Hosted {
    target: TargetRef,
    mailbox: mpsc::Sender<PingRequest>,
    stop: CancellationToken,
}

struct Watch {
    target: TargetRef,
    notify: oneshot::Sender<TargetRef>,
}

#[derive(Default)]
struct State {
    targets: HashMap<Locator, Hosted>,
    watches: HashMap<SubscriptionId, Watch>,
    partitioned: HashSet<String>,
    closed: bool,
}

impl State {
    fn reachable(&self, locator: &Locator) -> bool {
        !self.partitioned.contains(locator.address())
    }

    fn is_current(&self, target: &TargetRef) -> bool {
        self.targets
            .get(target.locator())
            .is_some_and(|h| h.target == *target)
    }
}

struct Inner {
    state: Mutex<State>,
    changed: Notify,
    incarnations: AtomicU64,
    subscriptions: AtomicU64,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// In-process substrate hosting ping targets.
///
/// Cheap to clone; clones share the same hosted targets.
#[derive(Clone)]
pub struct LocalSubstrate {
    inner: Arc<Inner>,
}

impl Default for LocalSubstrate {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalSubstrate {
    /// Creates an empty substrate.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State::default()),
                changed: Notify::new(),
                incarnations: AtomicU64::new(0),
                subscriptions: AtomicU64::new(0),
            }),
        }
    }

    /// Starts a new ping target at `locator` and returns its reference.
    ///
    /// A target already running at `locator` is retired first, so the
    /// returned reference is always a fresh incarnation.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(&self, locator: Locator) -> TargetRef {
        let incarnation = self.inner.incarnations.fetch_add(1, Ordering::Relaxed) + 1;
        let target = TargetRef::new(locator.clone(), incarnation);
        let (tx, rx) = mpsc::channel(MAILBOX_CAPACITY);
        let stop = CancellationToken::new();
        tokio::spawn(serve_pings(target.clone(), rx, stop.clone()));

        let replaced = self.inner.lock().targets.insert(
            locator,
            Hosted {
                target: target.clone(),
                mailbox: tx,
                stop,
            },
        );
        if let Some(old) = replaced {
            self.retire(old);
        }
        self.inner.changed.notify_waiters();
        target
    }

    /// Terminates the target at `locator`, returning the retired reference.
    pub fn kill(&self, locator: &Locator) -> Option<TargetRef> {
        let hosted = self.inner.lock().targets.remove(locator)?;
        let target = hosted.target.clone();
        self.retire(hosted);
        Some(target)
    }

    /// Makes every target at `address` unresolvable and unresponsive.
    pub fn partition(&self, address: &str) {
        self.inner.lock().partitioned.insert(address.to_string());
    }

    /// Reverses [`partition`](Self::partition).
    pub fn heal(&self, address: &str) {
        self.inner.lock().partitioned.remove(address);
        self.inner.changed.notify_waiters();
    }

    /// References of all hosted targets, sorted by locator.
    pub fn live(&self) -> Vec<TargetRef> {
        let mut live: Vec<TargetRef> = self
            .inner
            .lock()
            .targets
            .values()
            .map(|h| h.target.clone())
            .collect();
        live.sort_by(|a, b| a.locator().cmp(b.locator()));
        live
    }

    /// Number of registered termination watches.
    pub fn watch_count(&self) -> usize {
        self.inner.lock().watches.len()
    }

    /// Retires every target and rejects further requests with [`WatchError::Closed`].
    pub fn shutdown(&self) {
        let hosted: Vec<Hosted> = {
            let mut state = self.inner.lock();
            state.closed = true;
            state.targets.drain().map(|(_, h)| h).collect()
        };
        for h in hosted {
            self.retire(h);
        }
        self.inner.changed.notify_waiters();
    }

    fn retire(&self, hosted: Hosted) {
        hosted.stop.cancel();
        let fired: Vec<Watch> = {
            let mut state = self.inner.lock();
            let ids: Vec<SubscriptionId> = state
                .watches
                .iter()
                .filter(|(_, w)| w.target == hosted.target)
                .map(|(id, _)| *id)
                .collect();
            ids.iter()
                .filter_map(|id| state.watches.remove(id))
                .collect()
        };
        for w in fired {
            let _ = w.notify.send(w.target);
        }
    }
}

#[async_trait]
impl Substrate for LocalSubstrate {
    async fn resolve(&self, locator: &Locator, timeout: Duration) -> Result<TargetRef, WatchError> {
        let wait = async {
            loop {
                let notified = self.inner.changed.notified();
                {
                    let state = self.inner.lock();
                    if state.closed {
                        return Err(WatchError::Closed);
                    }
                    if state.reachable(locator) {
                        if let Some(h) = state.targets.get(locator) {
                            return Ok(h.target.clone());
                        }
                    }
                }
                notified.await;
            }
        };

        time::timeout(timeout, wait).await.unwrap_or_else(|_| {
            Err(WatchError::ResolveTimeout {
                locator: locator.clone(),
                timeout,
            })
        })
    }

    async fn ask(
        &self,
        target: &TargetRef,
        _ping: Ping,
        timeout: Duration,
    ) -> Result<Pong, WatchError> {
        let mailbox = {
            let state = self.inner.lock();
            if state.closed {
                return Err(WatchError::Closed);
            }
            if !state.is_current(target) {
                return Err(WatchError::Unreachable {
                    target: target.clone(),
                });
            }
            if state.reachable(target.locator()) {
                state
                    .targets
                    .get(target.locator())
                    .map(|h| h.mailbox.clone())
            } else {
                None
            }
        };

        let confirm_timeout = || WatchError::ConfirmTimeout {
            target: target.clone(),
            timeout,
        };
        let Some(mailbox) = mailbox else {
            time::sleep(timeout).await;
            return Err(confirm_timeout());
        };

        let exchange = async {
            let (tx, rx) = oneshot::channel();
            let unreachable = || WatchError::Unreachable {
                target: target.clone(),
            };
            mailbox
                .send(PingRequest { reply: tx })
                .await
                .map_err(|_| unreachable())?;
            rx.await.map_err(|_| unreachable())
        };

        match time::timeout(timeout, exchange).await {
            Ok(res) => res,
            Err(_) => Err(confirm_timeout()),
        }
    }

    fn watch(&self, target: &TargetRef) -> Subscription {
        let id = SubscriptionId(self.inner.subscriptions.fetch_add(1, Ordering::Relaxed) + 1);
        let (tx, rx) = oneshot::channel();
        {
            let mut state = self.inner.lock();
            if state.is_current(target) {
                state.watches.insert(
                    id,
                    Watch {
                        target: target.clone(),
                        notify: tx,
                    },
                );
            } else {
                drop(state);
                let _ = tx.send(target.clone());
            }
        }
        Subscription {
            id,
            target: target.clone(),
            terminated: rx,
        }
    }

    fn unwatch(&self, id: SubscriptionId) {
        self.inner.lock().watches.remove(&id);
    }
}

async fn serve_pings(
    target: TargetRef,
    mut mailbox: mpsc::Receiver<PingRequest>,
    stop: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = stop.cancelled() => break,
            req = mailbox.recv() => match req {
                Some(req) => {
                    let _ = req.reply.send(Pong::from_target(target.clone()));
                }
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: Duration = Duration::from_secs(3);

    fn loc(name: &str) -> Locator {
        Locator::new(name, "node-1")
    }

    #[tokio::test]
    async fn test_resolve_and_ask_live_target() {
        let sub = LocalSubstrate::new();
        let spawned = sub.spawn(loc("ping"));

        let resolved = sub.resolve(&loc("ping"), T).await.unwrap();
        assert_eq!(resolved, spawned);

        let pong = sub.ask(&resolved, Ping, T).await.unwrap();
        assert_eq!(pong.from, spawned);
        assert_eq!(pong.text, format!("pong from {spawned}"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_times_out_without_target() {
        let sub = LocalSubstrate::new();
        let err = sub.resolve(&loc("ping"), T).await.unwrap_err();
        assert!(matches!(err, WatchError::ResolveTimeout { timeout, .. } if timeout == T));
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_waits_for_late_spawn() {
        let sub = LocalSubstrate::new();
        let waiter = {
            let sub = sub.clone();
            tokio::spawn(async move { sub.resolve(&loc("ping"), T).await })
        };
        time::sleep(Duration::from_secs(1)).await;
        let spawned = sub.spawn(loc("ping"));
        assert_eq!(waiter.await.unwrap().unwrap(), spawned);
    }

    #[tokio::test]
    async fn test_watch_fires_once_for_exact_incarnation() {
        let sub = LocalSubstrate::new();
        let first = sub.spawn(loc("ping"));
        let old_watch = sub.watch(&first);

        let second = sub.spawn(loc("ping"));
        assert_ne!(first, second);
        assert_eq!(old_watch.terminated.await.unwrap(), first);

        let new_watch = sub.watch(&second);
        assert_eq!(sub.watch_count(), 1);
        assert_eq!(sub.kill(&loc("ping")), Some(second.clone()));
        assert_eq!(new_watch.terminated.await.unwrap(), second);
        assert_eq!(sub.watch_count(), 0);
    }

    #[tokio::test]
    async fn test_watch_on_dead_reference_fires_immediately() {
        let sub = LocalSubstrate::new();
        let gone = sub.spawn(loc("ping"));
        sub.kill(&loc("ping"));
        let w = sub.watch(&gone);
        assert_eq!(w.terminated.await.unwrap(), gone);
    }

    #[tokio::test]
    async fn test_unwatch_releases_without_notification() {
        let sub = LocalSubstrate::new();
        let t = sub.spawn(loc("ping"));
        let w = sub.watch(&t);
        sub.unwatch(w.id);
        sub.kill(&loc("ping"));
        assert!(w.terminated.await.is_err());
    }

    #[tokio::test]
    async fn test_ask_stale_reference_is_unreachable() {
        let sub = LocalSubstrate::new();
        let old = sub.spawn(loc("ping"));
        sub.spawn(loc("ping"));
        let err = sub.ask(&old, Ping, T).await.unwrap_err();
        assert_eq!(err, WatchError::Unreachable { target: old });
    }

    #[tokio::test(start_paused = true)]
    async fn test_partition_blocks_until_healed() {
        let sub = LocalSubstrate::new();
        let t = sub.spawn(loc("ping"));
        sub.partition("node-1");

        assert!(matches!(
            sub.resolve(&loc("ping"), T).await,
            Err(WatchError::ResolveTimeout { .. })
        ));
        assert!(matches!(
            sub.ask(&t, Ping, T).await,
            Err(WatchError::ConfirmTimeout { .. })
        ));

        sub.heal("node-1");
        assert_eq!(sub.resolve(&loc("ping"), T).await.unwrap(), t);
    }

    #[tokio::test]
    async fn test_shutdown_closes_and_notifies() {
        let sub = LocalSubstrate::new();
        let t = sub.spawn(loc("ping"));
        let w = sub.watch(&t);
        sub.shutdown();
        assert_eq!(w.terminated.await.unwrap(), t);
        assert_eq!(sub.resolve(&loc("ping"), T).await, Err(WatchError::Closed));
        assert!(sub.live().is_empty());
    }
}
