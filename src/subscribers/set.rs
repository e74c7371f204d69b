//! # SubscriberSet: per-subscriber queues and workers.
//!
//! ```text
//! emit(&Event) ──Arc──┬──► [queue: LogWriter] ──► worker ──► on_event
//!                     └──► [queue: custom]    ──► worker ──► on_event
//! ```
//!
//! `emit` never waits. Order is kept per subscriber, not across them. A full
//! or closed queue drops the event for that subscriber and publishes
//! `SubscriberOverflow`; a panic inside `on_event` publishes
//! `SubscriberPanicked` and the worker keeps going.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

use crate::events::{Bus, Event};

use super::Subscribe;

struct Lane {
    name: &'static str,
    queue: mpsc::Sender<Arc<Event>>,
}

/// Fan-out over a fixed list of subscribers.
pub struct SubscriberSet {
    lanes: Vec<Lane>,
    workers: Vec<JoinHandle<()>>,
    bus: Bus,
}

impl SubscriberSet {
    /// Spawns one worker per subscriber. Must be called inside a tokio runtime.
    ///
    /// Health reports go to `bus` and are never fed back into the set.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let (lanes, workers) = subs
            .into_iter()
            .map(|sub| {
                let name = sub.name();
                let (queue, rx) = mpsc::channel(sub.queue_capacity().max(1));
                let worker = spawn_worker(sub, rx, bus.clone());
                (Lane { name, queue }, worker)
            })
            .unzip();

        Self { lanes, workers, bus }
    }

    /// Queues `event` for every subscriber without waiting.
    pub fn emit(&self, event: &Event) {
        if event.is_subscriber_overflow() || event.is_subscriber_panic() {
            return;
        }
        let shared = Arc::new(event.clone());
        for lane in &self.lanes {
            let why = match lane.queue.try_send(Arc::clone(&shared)) {
                Ok(()) => continue,
                Err(TrySendError::Full(_)) => "full",
                Err(TrySendError::Closed(_)) => "closed",
            };
            self.bus.publish(Event::subscriber_overflow(lane.name, why));
        }
    }

    /// Closes every queue and waits until the workers have handled what was queued.
    pub async fn shutdown(self) {
        drop(self.lanes);
        for worker in self.workers {
            let _ = worker.await;
        }
    }

    /// True if there are no subscribers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }

    /// Number of subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lanes.len()
    }
}

fn spawn_worker(
    sub: Arc<dyn Subscribe>,
    mut rx: mpsc::Receiver<Arc<Event>>,
    bus: Bus,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(ev) = rx.recv().await {
            let handled = AssertUnwindSafe(sub.on_event(&ev)).catch_unwind().await;
            if let Err(panic) = handled {
                bus.publish(Event::subscriber_panicked(
                    sub.name(),
                    panic_message(panic.as_ref()),
                ));
            }
        }
    })
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct Counter(Arc<AtomicUsize>);

    #[async_trait]
    impl Subscribe for Counter {
        async fn on_event(&self, _ev: &Event) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
        fn name(&self) -> &'static str {
            "counter"
        }
    }

    struct Exploder;

    #[async_trait]
    impl Subscribe for Exploder {
        async fn on_event(&self, _ev: &Event) {
            panic!("boom");
        }
        fn name(&self) -> &'static str {
            "exploder"
        }
    }

    #[tokio::test]
    async fn test_fan_out_reaches_every_subscriber() {
        let bus = Bus::new(16);
        let a = Arc::new(AtomicUsize::new(0));
        let b = Arc::new(AtomicUsize::new(0));
        let set = SubscriberSet::new(
            vec![Arc::new(Counter(a.clone())), Arc::new(Counter(b.clone()))],
            bus,
        );
        assert_eq!(set.len(), 2);

        set.emit(&Event::new(EventKind::ResolveAttempt));
        set.emit(&Event::new(EventKind::WatchEstablished));
        set.shutdown().await;

        assert_eq!(a.load(Ordering::SeqCst), 2);
        assert_eq!(b.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_panic_is_reported_on_bus() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let set = SubscriberSet::new(vec![Arc::new(Exploder)], bus);

        set.emit(&Event::new(EventKind::ResolveAttempt));

        let ev = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("panic event")
            .expect("bus open");
        assert_eq!(ev.kind, EventKind::SubscriberPanicked);
        assert_eq!(ev.watcher.as_deref(), Some("exploder"));
        assert_eq!(ev.reason.as_deref(), Some("boom"));
    }

    struct Stuck(Arc<tokio::sync::Notify>);

    #[async_trait]
    impl Subscribe for Stuck {
        async fn on_event(&self, _ev: &Event) {
            self.0.notified().await;
        }
        fn name(&self) -> &'static str {
            "stuck"
        }
        fn queue_capacity(&self) -> usize {
            1
        }
    }

    #[tokio::test]
    async fn test_full_queue_reports_overflow_and_drops() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let release = Arc::new(tokio::sync::Notify::new());
        let set = SubscriberSet::new(vec![Arc::new(Stuck(release.clone()))], bus);

        for _ in 0..3 {
            set.emit(&Event::new(EventKind::RetryScheduled));
        }

        let ev = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("overflow event")
            .expect("bus open");
        assert!(ev.is_subscriber_overflow());
        assert_eq!(ev.watcher.as_deref(), Some("stuck"));

        // Overflow reports are not fed back to subscribers.
        set.emit(&ev);
        release.notify_waiters();
    }
}
