//! # Watcher registry.
//!
//! Owns the [`WatcherHandle`] of every running watcher, keyed by locator.
//!
//! ## Rules
//! - At most one watcher per locator.
//! - Removing a watcher stops it (cancel → join) and publishes `WatcherRemoved`.
//! - The lock is never held across a join.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventKind};
use crate::target::Locator;
use crate::watcher::{Phase, WatcherHandle, WatcherKind};

/// Point-in-time view of one registered watcher.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WatchStatus {
    /// Watched locator.
    pub locator: Locator,
    /// Watcher flavor.
    pub kind: WatcherKind,
    /// Current phase.
    pub phase: Phase,
}

pub(crate) struct Registry {
    watchers: RwLock<HashMap<Locator, WatcherHandle>>,
    bus: Bus,
}

impl Registry {
    pub(crate) fn new(bus: Bus) -> Self {
        Self {
            watchers: RwLock::new(HashMap::new()),
            bus,
        }
    }

    /// Registers a watcher unless one already exists for the same locator.
    ///
    /// `spawn` runs under the write lock, so a duplicate is never started.
    pub(crate) async fn insert_with<F>(&self, locator: &Locator, spawn: F) -> Result<(), RuntimeError>
    where
        F: FnOnce() -> WatcherHandle,
    {
        let mut watchers = self.watchers.write().await;
        if watchers.contains_key(locator) {
            return Err(RuntimeError::AlreadyWatching {
                locator: locator.clone(),
            });
        }
        let handle = spawn();
        let kind = handle.kind();
        watchers.insert(locator.clone(), handle);
        drop(watchers);

        self.bus.publish(
            Event::new(EventKind::WatcherAdded)
                .with_watcher(locator.to_string())
                .with_reason(kind.as_label()),
        );
        Ok(())
    }

    /// Stops and removes the watcher for `locator`.
    pub(crate) async fn remove(&self, locator: &Locator) -> Result<(), RuntimeError> {
        let handle = self.watchers.write().await.remove(locator);
        match handle {
            Some(handle) => {
                handle.stop().await;
                self.bus
                    .publish(Event::new(EventKind::WatcherRemoved).with_watcher(locator.to_string()));
                Ok(())
            }
            None => Err(RuntimeError::NotWatching {
                locator: locator.clone(),
            }),
        }
    }

    /// Status of every registered watcher, sorted by locator.
    pub(crate) async fn snapshot(&self) -> Vec<WatchStatus> {
        let watchers = self.watchers.read().await;
        let mut out: Vec<WatchStatus> = watchers
            .values()
            .map(|h| WatchStatus {
                locator: h.locator().clone(),
                kind: h.kind(),
                phase: h.phase(),
            })
            .collect();
        drop(watchers);
        out.sort_by(|a, b| a.locator.cmp(&b.locator));
        out
    }

    /// Removes every handle, leaving the registry empty.
    pub(crate) async fn drain(&self) -> Vec<WatcherHandle> {
        self.watchers.write().await.drain().map(|(_, h)| h).collect()
    }

    pub(crate) async fn len(&self) -> usize {
        self.watchers.read().await.len()
    }
}
