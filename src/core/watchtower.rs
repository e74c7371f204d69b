//! # Watchtower: registry of watchers, event fan-out and graceful shutdown.
//!
//! The [`Watchtower`] owns the event bus, the substrate handle and one
//! watcher per locator. It is the surface the console drives.
//!
//! ## Architecture
//! ```text
//! reliable_watch(loc) ──► Registry ──spawn──► ReliableWatcher ─┐
//! watch(loc)          ──► Registry ──spawn──► NaiveWatcher    ─┤ publish(Event)
//!                                                              ▼
//!                                                             Bus ──► listener ──► SubscriberSet::emit
//!
//! shutdown():
//!   publish(ShutdownRequested)
//!   ├─► cancel every watcher
//!   ├─► wait up to cfg.grace:
//!   │      ├─ all joined → publish(AllStoppedWithin)
//!   │      └─ timeout    → publish(GraceExceeded), Err(GraceExceeded{stuck})
//!   └─► stop listener, drain subscriber queues
//! ```
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use watchvisor::{Config, LocalSubstrate, Locator, Watchtower};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let substrate = LocalSubstrate::new();
//! let tower = Watchtower::builder(Config::default(), Arc::new(substrate.clone())).build();
//!
//! let target = Locator::new("ping", "node-1");
//! substrate.spawn(target.clone());
//! tower.reliable_watch(target.clone()).await?;
//!
//! let pong = tower.ping(&target).await?;
//! assert!(pong.text.starts_with("pong from ping@node-1"));
//!
//! tower.shutdown().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use tokio::sync::{Mutex, broadcast::error::RecvError};
use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;

use super::builder::WatchtowerBuilder;
use super::registry::{Registry, WatchStatus};
use crate::core::Config;
use crate::error::{RuntimeError, WatchError};
use crate::events::{Bus, Event, EventKind};
use crate::subscribers::{Subscribe, SubscriberSet};
use crate::substrate::SubstrateRef;
use crate::target::{Locator, Ping, Pong};
use crate::watcher::{NaiveWatcher, ReliableWatcher, WatchSpec, WatcherHandle};

/// Registry of running watchers over one substrate.
pub struct Watchtower {
    cfg: Config,
    bus: Bus,
    substrate: SubstrateRef,
    registry: Registry,
    listener_token: CancellationToken,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl Watchtower {
    /// Starts building a watchtower.
    pub fn builder(cfg: Config, substrate: SubstrateRef) -> WatchtowerBuilder {
        WatchtowerBuilder::new(cfg, substrate)
    }

    pub(crate) fn new_internal(
        cfg: Config,
        substrate: SubstrateRef,
        subscribers: Vec<Arc<dyn Subscribe>>,
    ) -> Self {
        let bus = Bus::new(cfg.bus_capacity_clamped());
        let subs = SubscriberSet::new(subscribers, bus.clone());
        let listener_token = CancellationToken::new();
        let listener = subscriber_listener(&bus, subs, listener_token.clone());

        Self {
            registry: Registry::new(bus.clone()),
            cfg,
            bus,
            substrate,
            listener_token,
            listener: Mutex::new(Some(listener)),
        }
    }

    /// Starts a naive watcher for `locator`.
    pub async fn watch(&self, locator: Locator) -> Result<(), RuntimeError> {
        let spec = WatchSpec::with_defaults(locator, &self.cfg);
        self.register(spec, NaiveWatcher::spawn).await
    }

    /// Starts a resilient watcher for `locator` using the configured defaults.
    pub async fn reliable_watch(&self, locator: Locator) -> Result<(), RuntimeError> {
        let spec = WatchSpec::with_defaults(locator, &self.cfg);
        self.reliable_watch_spec(spec).await
    }

    /// Starts a resilient watcher with explicit settings.
    pub async fn reliable_watch_spec(&self, spec: WatchSpec) -> Result<(), RuntimeError> {
        self.register(spec, ReliableWatcher::spawn).await
    }

    /// Stops the watcher for `locator` and forgets it.
    pub async fn unwatch(&self, locator: &Locator) -> Result<(), RuntimeError> {
        self.registry.remove(locator).await
    }

    /// One resolve-then-ask round trip, independent of any watcher.
    pub async fn ping(&self, locator: &Locator) -> Result<Pong, WatchError> {
        let resolve_bound = self.cfg.resolve_bound();
        let target = time::timeout(resolve_bound, self.substrate.resolve(locator, resolve_bound))
            .await
            .unwrap_or(Err(WatchError::ResolveTimeout {
                locator: locator.clone(),
                timeout: resolve_bound,
            }))?;

        let confirm_bound = self.cfg.confirm_bound();
        time::timeout(confirm_bound, self.substrate.ask(&target, Ping, confirm_bound))
            .await
            .unwrap_or(Err(WatchError::ConfirmTimeout {
                target: target.clone(),
                timeout: confirm_bound,
            }))
    }

    /// Status of every watcher, sorted by locator.
    pub async fn status(&self) -> Vec<WatchStatus> {
        self.registry.snapshot().await
    }

    /// Number of registered watchers.
    pub async fn len(&self) -> usize {
        self.registry.len().await
    }

    /// True when no watcher is registered.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Event bus shared by every watcher.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Runtime configuration.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Stops every watcher, waiting up to [`Config::grace`].
    ///
    /// Subscribers receive every event published before this returns.
    /// Calling it again is a no-op.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        let handles = self.registry.drain().await;
        let res = if handles.is_empty() {
            Ok(())
        } else {
            self.bus.publish(Event::new(EventKind::ShutdownRequested));
            self.stop_all(handles).await
        };

        self.listener_token.cancel();
        if let Some(listener) = self.listener.lock().await.take() {
            let _ = listener.await;
        }
        res
    }

    async fn register<F>(&self, spec: WatchSpec, spawn: F) -> Result<(), RuntimeError>
    where
        F: FnOnce(WatchSpec, SubstrateRef, Bus) -> WatcherHandle,
    {
        let locator = spec.locator().clone();
        let substrate = Arc::clone(&self.substrate);
        let bus = self.bus.clone();
        self.registry
            .insert_with(&locator, move || spawn(spec, substrate, bus))
            .await
    }

    async fn stop_all(&self, mut handles: Vec<WatcherHandle>) -> Result<(), RuntimeError> {
        for h in &handles {
            h.cancel();
        }

        let grace = self.cfg.grace;
        if grace.is_zero() {
            return Ok(());
        }

        let joined = time::timeout(grace, async {
            for h in handles.iter_mut() {
                h.join().await;
            }
        })
        .await;

        match joined {
            Ok(()) => {
                self.bus.publish(Event::new(EventKind::AllStoppedWithin));
                Ok(())
            }
            Err(_) => {
                let stuck: Vec<String> = handles
                    .iter()
                    .filter(|h| !h.is_finished())
                    .map(|h| h.locator().to_string())
                    .collect();
                self.bus.publish(
                    Event::new(EventKind::GraceExceeded).with_reason(stuck.join(", ")),
                );
                Err(RuntimeError::GraceExceeded { grace, stuck })
            }
        }
    }
}

/// Forwards bus events to the subscriber set until `token` is cancelled,
/// then flushes what is already queued and drains the subscriber workers.
fn subscriber_listener(bus: &Bus, subs: SubscriberSet, token: CancellationToken) -> JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                msg = rx.recv() => match msg {
                    Ok(ev) => subs.emit(&ev),
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                },
                _ = token.cancelled() => break,
            }
        }
        while let Ok(ev) = rx.try_recv() {
            subs.emit(&ev);
        }
        subs.shutdown().await;
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::policies::BackoffPolicy;
    use crate::substrate::LocalSubstrate;
    use crate::target::TargetRef;
    use crate::watcher::{Phase, WatcherKind};

    struct Established(Arc<AtomicUsize>);

    #[async_trait]
    impl Subscribe for Established {
        async fn on_event(&self, ev: &Event) {
            if ev.kind == EventKind::WatchEstablished {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
        fn name(&self) -> &'static str {
            "established"
        }
    }

    fn tower(substrate: &LocalSubstrate) -> Watchtower {
        let cfg = Config {
            resolve_timeout: Duration::from_millis(500),
            confirm_timeout: Duration::from_millis(500),
            backoff: BackoffPolicy::constant(Duration::from_millis(200)),
            ..Config::default()
        };
        Watchtower::builder(cfg, Arc::new(substrate.clone())).build()
    }

    async fn wait_watching(tower: &Watchtower, locator: &Locator) -> TargetRef {
        let deadline = time::Instant::now() + Duration::from_secs(30);
        loop {
            let phase = tower
                .status()
                .await
                .into_iter()
                .find(|s| &s.locator == locator)
                .map(|s| s.phase);
            if let Some(Phase::Watching(target)) = phase {
                return target;
            }
            assert!(time::Instant::now() < deadline, "{locator} never reached Watching");
            time::sleep(Duration::from_millis(50)).await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_and_unknown_locators() {
        let substrate = LocalSubstrate::new();
        let tower = tower(&substrate);
        let target = Locator::new("ping", "node-1");

        tower.reliable_watch(target.clone()).await.expect("first watch");
        let dup = tower.watch(target.clone()).await;
        assert!(matches!(dup, Err(RuntimeError::AlreadyWatching { .. })));

        let missing = tower.unwatch(&Locator::new("ping", "nowhere")).await;
        assert!(matches!(missing, Err(RuntimeError::NotWatching { .. })));

        tower.unwatch(&target).await.expect("unwatch");
        assert!(tower.is_empty().await);
        tower.shutdown().await.expect("shutdown");
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_reports_kind_and_phase() {
        let substrate = LocalSubstrate::new();
        let tower = tower(&substrate);
        let a = Locator::new("ping", "a");
        let b = Locator::new("ping", "b");
        substrate.spawn(a.clone());

        tower.reliable_watch(a.clone()).await.expect("watch a");
        tower.watch(b.clone()).await.expect("watch b");
        let live = wait_watching(&tower, &a).await;
        time::sleep(Duration::from_secs(2)).await;

        let status = tower.status().await;
        assert_eq!(status.len(), 2);
        assert_eq!(status[0].locator, a);
        assert_eq!(status[0].kind, WatcherKind::Reliable);
        assert_eq!(status[0].phase, Phase::Watching(live));
        assert_eq!(status[1].kind, WatcherKind::Naive);
        assert_eq!(status[1].phase, Phase::Halted);

        tower.shutdown().await.expect("shutdown");
    }

    #[tokio::test(start_paused = true)]
    async fn test_reliable_watch_follows_restarts() {
        let substrate = LocalSubstrate::new();
        let tower = tower(&substrate);
        let target = Locator::new("ping", "node-1");

        tower.reliable_watch(target.clone()).await.expect("watch");
        time::sleep(Duration::from_secs(2)).await;
        let first = substrate.spawn(target.clone());
        assert_eq!(wait_watching(&tower, &target).await, first);

        substrate.kill(&target);
        time::sleep(Duration::from_secs(3)).await;
        let second = substrate.spawn(target.clone());
        assert_eq!(wait_watching(&tower, &target).await, second);
        assert_eq!(substrate.watch_count(), 1);

        tower.shutdown().await.expect("shutdown");
        assert_eq!(substrate.watch_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ping_round_trip_and_failures() {
        let substrate = LocalSubstrate::new();
        let tower = tower(&substrate);
        let target = Locator::new("ping", "node-1");

        let err = tower.ping(&target).await.expect_err("nothing running");
        assert!(err.is_resolution());

        let live = substrate.spawn(target.clone());
        let pong = tower.ping(&target).await.expect("pong");
        assert_eq!(pong.from, live);
        assert_eq!(pong.text, format!("pong from {live}"));

        substrate.partition("node-1");
        let err = tower.ping(&target).await.expect_err("partitioned");
        assert!(err.is_retryable());
        tower.shutdown().await.expect("shutdown");
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_everything_and_flushes_subscribers() {
        let substrate = LocalSubstrate::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let cfg = Config::default();
        let tower = Watchtower::builder(cfg, Arc::new(substrate.clone()))
            .with_subscribers(vec![Arc::new(Established(seen.clone()))])
            .build();
        let mut events = tower.bus().subscribe();

        for name in ["a", "b", "c"] {
            let loc = Locator::new("ping", name);
            substrate.spawn(loc.clone());
            tower.reliable_watch(loc).await.expect("watch");
        }
        for name in ["a", "b", "c"] {
            wait_watching(&tower, &Locator::new("ping", name)).await;
        }

        tower.shutdown().await.expect("shutdown within grace");
        assert!(tower.is_empty().await);
        assert_eq!(seen.load(Ordering::SeqCst), 3);
        assert_eq!(substrate.watch_count(), 0);

        let mut kinds = Vec::new();
        while let Ok(ev) = events.try_recv() {
            kinds.push(ev.kind);
        }
        assert!(kinds.contains(&EventKind::ShutdownRequested));
        assert_eq!(kinds.last(), Some(&EventKind::AllStoppedWithin));

        tower.shutdown().await.expect("second shutdown is a no-op");
    }
}
