//! Scripted substrate for deterministic watcher tests.
//!
//! Each `resolve` / `ask` call pops the next [`Step`] from its queue; an empty
//! queue hangs forever, leaving the watcher's own timeout to fire. Every call
//! is appended to an operation log with the (virtual) instant it happened.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::oneshot;
use tokio::time::Instant;

use super::{Substrate, Subscription, SubscriptionId};
use crate::error::WatchError;
use crate::target::{Locator, Ping, Pong, TargetRef};

pub(crate) enum Step<T> {
    Ok(T),
    Fail(WatchError),
    /// Never completes.
    Hang,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Op {
    Resolve(Locator),
    Ask(TargetRef),
    Watch(TargetRef),
    Unwatch(SubscriptionId),
}

#[derive(Default)]
pub(crate) struct ScriptedSubstrate {
    resolves: Mutex<VecDeque<Step<TargetRef>>>,
    asks: Mutex<VecDeque<Step<Pong>>>,
    watches: Mutex<HashMap<SubscriptionId, (TargetRef, oneshot::Sender<TargetRef>)>>,
    log: Mutex<Vec<(Instant, Op)>>,
    ids: AtomicU64,
}

impl ScriptedSubstrate {
    pub(crate) fn push_resolve(&self, step: Step<TargetRef>) {
        self.resolves.lock().unwrap().push_back(step);
    }

    pub(crate) fn push_ask(&self, step: Step<Pong>) {
        self.asks.lock().unwrap().push_back(step);
    }

    /// Fires every live watch on `target`, delivering `target`.
    pub(crate) fn terminate(&self, target: &TargetRef) {
        self.deliver(target, target.clone());
    }

    /// Fires every live watch on `watched`, delivering `payload` instead.
    pub(crate) fn deliver(&self, watched: &TargetRef, payload: TargetRef) {
        let mut watches = self.watches.lock().unwrap();
        let ids: Vec<SubscriptionId> = watches
            .iter()
            .filter(|(_, (t, _))| t == watched)
            .map(|(id, _)| *id)
            .collect();
        for id in ids {
            if let Some((_, tx)) = watches.remove(&id) {
                let _ = tx.send(payload.clone());
            }
        }
    }

    pub(crate) fn ops(&self) -> Vec<Op> {
        self.log.lock().unwrap().iter().map(|(_, op)| op.clone()).collect()
    }

    pub(crate) fn resolve_instants(&self) -> Vec<Instant> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, op)| matches!(op, Op::Resolve(_)))
            .map(|(at, _)| *at)
            .collect()
    }

    pub(crate) fn live_watches(&self) -> usize {
        self.watches.lock().unwrap().len()
    }

    fn record(&self, op: Op) {
        self.log.lock().unwrap().push((Instant::now(), op));
    }
}

async fn play<T>(step: Option<Step<T>>) -> Result<T, WatchError> {
    match step.unwrap_or(Step::Hang) {
        Step::Ok(v) => Ok(v),
        Step::Fail(e) => Err(e),
        Step::Hang => std::future::pending().await,
    }
}

#[async_trait]
impl Substrate for ScriptedSubstrate {
    async fn resolve(&self, locator: &Locator, _timeout: Duration) -> Result<TargetRef, WatchError> {
        self.record(Op::Resolve(locator.clone()));
        let step = self.resolves.lock().unwrap().pop_front();
        play(step).await
    }

    async fn ask(&self, target: &TargetRef, _ping: Ping, _timeout: Duration) -> Result<Pong, WatchError> {
        self.record(Op::Ask(target.clone()));
        let step = self.asks.lock().unwrap().pop_front();
        play(step).await
    }

    fn watch(&self, target: &TargetRef) -> Subscription {
        self.record(Op::Watch(target.clone()));
        let id = SubscriptionId(self.ids.fetch_add(1, Ordering::Relaxed) + 1);
        let (tx, rx) = oneshot::channel();
        self.watches
            .lock()
            .unwrap()
            .insert(id, (target.clone(), tx));
        Subscription {
            id,
            target: target.clone(),
            terminated: rx,
        }
    }

    fn unwatch(&self, id: SubscriptionId) {
        self.record(Op::Unwatch(id));
        self.watches.lock().unwrap().remove(&id);
    }
}
