//! # NaiveWatcher: resolve once, watch once.
//!
//! Baseline that shows why the resilient watcher exists. It never retries:
//! any failed resolution, and the first termination it observes, ends it in
//! [`Phase::Halted`]. It does not confirm liveness before subscribing.

use tokio::sync::watch;
use tokio::time;
use tokio_util::sync::CancellationToken;

use super::{Phase, WatchSpec, WatcherHandle, WatcherKind};
use crate::error::WatchError;
use crate::events::{Bus, Event, EventKind};
use crate::substrate::SubstrateRef;

/// One-shot watcher. Create with [`NaiveWatcher::spawn`].
pub struct NaiveWatcher {
    spec: WatchSpec,
    name: String,
    substrate: SubstrateRef,
    bus: Bus,
    phase: watch::Sender<Phase>,
    token: CancellationToken,
}

impl NaiveWatcher {
    /// Spawns a watcher that makes exactly one resolution attempt.
    pub fn spawn(spec: WatchSpec, substrate: SubstrateRef, bus: Bus) -> WatcherHandle {
        let (phase, phase_rx) = watch::channel(Phase::Unresolved);
        let token = CancellationToken::new();
        let locator = spec.locator().clone();

        let actor = Self {
            name: locator.to_string(),
            spec,
            substrate,
            bus,
            phase,
            token: token.clone(),
        };
        let join = tokio::spawn(actor.run());
        WatcherHandle::new(locator, WatcherKind::Naive, phase_rx, token, join)
    }

    async fn run(self) {
        self.publish(Event::new(EventKind::WatcherStarted).with_reason(WatcherKind::Naive.as_label()));

        let bound = self.spec.resolve_timeout();
        self.publish(
            Event::new(EventKind::ResolveAttempt)
                .with_attempt(1)
                .with_timeout(bound),
        );

        let locator = self.spec.locator();
        let resolved = tokio::select! {
            _ = self.token.cancelled() => return self.finish(Phase::Stopped),
            res = time::timeout(bound, self.substrate.resolve(locator, bound)) => {
                res.unwrap_or(Err(WatchError::ResolveTimeout { locator: locator.clone(), timeout: bound }))
            }
        };

        let target = match resolved {
            Ok(target) => target,
            Err(e) => {
                self.publish(
                    Event::new(EventKind::ResolveFailed)
                        .with_attempt(1)
                        .with_reason(e.to_string()),
                );
                return self.finish(Phase::Halted);
            }
        };

        let subscription = self.substrate.watch(&target);
        self.publish(Event::new(EventKind::WatchEstablished).with_target(target.clone()));
        self.phase.send_replace(Phase::Watching(target.clone()));

        tokio::select! {
            _ = self.token.cancelled() => {
                self.substrate.unwatch(subscription.id);
                self.finish(Phase::Stopped);
            }
            fired = subscription.terminated => {
                let mut ev = Event::new(EventKind::TerminationObserved).with_target(target);
                if fired.is_err() {
                    ev = ev.with_reason("subscription lost");
                }
                self.publish(ev);
                self.finish(Phase::Halted);
            }
        }
    }

    fn finish(&self, phase: Phase) {
        let kind = match phase {
            Phase::Halted => EventKind::WatcherHalted,
            _ => EventKind::WatcherStopped,
        };
        self.publish(Event::new(kind));
        self.phase.send_replace(phase);
    }

    fn publish(&self, ev: Event) {
        self.bus.publish(ev.with_watcher(self.name.as_str()));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::sync::broadcast;

    use super::*;
    use crate::policies::BackoffPolicy;
    use crate::substrate::scripted::{ScriptedSubstrate, Step};
    use crate::target::{Locator, Pong, TargetRef};
    use crate::watcher::ReliableWatcher;

    fn loc(s: &str) -> Locator {
        s.parse().expect("valid locator")
    }

    fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<EventKind> {
        let mut out = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            out.push(ev.kind);
        }
        out
    }

    async fn settle(handle: &WatcherHandle, f: impl FnMut(&Phase) -> bool) {
        let mut rx = handle.phases();
        time::timeout(Duration::from_secs(60), rx.wait_for(f))
            .await
            .expect("phase not reached")
            .expect("watcher gone");
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_resolution_halts() {
        let target = loc("watcher@X");
        let substrate = Arc::new(ScriptedSubstrate::default());
        let bus = Bus::new(64);
        let mut events = bus.subscribe();
        substrate.push_resolve(Step::Fail(WatchError::NotFound {
            locator: target.clone(),
        }));
        substrate.push_resolve(Step::Ok(TargetRef::new(target.clone(), 1)));

        let mut handle = NaiveWatcher::spawn(WatchSpec::new(target), substrate.clone(), bus);
        handle.join().await;
        time::sleep(Duration::from_secs(30)).await;

        assert_eq!(handle.phase(), Phase::Halted);
        assert_eq!(substrate.resolve_instants().len(), 1);
        let seen = drain(&mut events);
        assert!(seen.contains(&EventKind::ResolveFailed));
        assert_eq!(seen.last(), Some(&EventKind::WatcherHalted));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_resolution_halts_after_bound() {
        let target = loc("ping@node-1");
        let substrate = Arc::new(ScriptedSubstrate::default());
        let spec = WatchSpec::new(target).with_resolve_timeout(Duration::from_secs(2));

        let started = time::Instant::now();
        let mut handle = NaiveWatcher::spawn(spec, substrate, Bus::new(16));
        handle.join().await;

        assert!(started.elapsed() >= Duration::from_secs(2));
        assert_eq!(handle.phase(), Phase::Halted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_skips_confirmation_and_halts_on_termination() {
        let target = loc("ping@node-1");
        let live = TargetRef::new(target.clone(), 1);
        let substrate = Arc::new(ScriptedSubstrate::default());
        substrate.push_resolve(Step::Ok(live.clone()));

        let mut handle = NaiveWatcher::spawn(WatchSpec::new(target), substrate.clone(), Bus::new(16));
        settle(&handle, |p| p.watching().is_some()).await;
        assert_eq!(
            substrate.ops(),
            vec![
                crate::substrate::scripted::Op::Resolve(live.locator().clone()),
                crate::substrate::scripted::Op::Watch(live.clone()),
            ]
        );

        substrate.terminate(&live);
        handle.join().await;
        assert_eq!(handle.phase(), Phase::Halted);
        assert_eq!(substrate.resolve_instants().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_while_watching_unwatches() {
        let target = loc("ping@node-1");
        let live = TargetRef::new(target.clone(), 1);
        let substrate = Arc::new(ScriptedSubstrate::default());
        substrate.push_resolve(Step::Ok(live));

        let handle = NaiveWatcher::spawn(WatchSpec::new(target), substrate.clone(), Bus::new(16));
        settle(&handle, |p| p.watching().is_some()).await;
        let phases = handle.phases();
        handle.stop().await;

        assert_eq!(*phases.borrow(), Phase::Stopped);
        assert_eq!(substrate.live_watches(), 0);
    }

    /// Same script for both flavors: one failed resolution, then a live target.
    #[tokio::test(start_paused = true)]
    async fn test_contrast_with_reliable_watcher() {
        let target = loc("watcher@X");
        let live = TargetRef::new(target.clone(), 1);
        let script = || {
            let substrate = Arc::new(ScriptedSubstrate::default());
            substrate.push_resolve(Step::Fail(WatchError::NotFound {
                locator: target.clone(),
            }));
            substrate.push_resolve(Step::Ok(live.clone()));
            substrate.push_ask(Step::Ok(Pong::from_target(live.clone())));
            substrate
        };
        let spec = WatchSpec::new(target.clone())
            .with_backoff(BackoffPolicy::constant(Duration::from_secs(1)));

        let naive_sub = script();
        let naive = NaiveWatcher::spawn(spec.clone(), naive_sub.clone(), Bus::new(16));
        let reliable_sub = script();
        let reliable = ReliableWatcher::spawn(spec, reliable_sub.clone(), Bus::new(16));

        time::sleep(Duration::from_secs(10)).await;

        assert_eq!(naive.phase(), Phase::Halted);
        assert_eq!(naive_sub.live_watches(), 0);
        assert_eq!(reliable.phase(), Phase::Watching(live));
        assert_eq!(reliable_sub.live_watches(), 1);
        reliable.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_contrast_after_one_termination() {
        let target = loc("ping@node-1");
        let first = TargetRef::new(target.clone(), 1);
        let second = TargetRef::new(target.clone(), 2);
        let script = || {
            let substrate = Arc::new(ScriptedSubstrate::default());
            substrate.push_resolve(Step::Ok(first.clone()));
            substrate.push_ask(Step::Ok(Pong::from_target(first.clone())));
            substrate.push_resolve(Step::Ok(second.clone()));
            substrate.push_ask(Step::Ok(Pong::from_target(second.clone())));
            substrate
        };
        let spec = WatchSpec::new(target.clone());

        let naive_sub = script();
        let mut naive = NaiveWatcher::spawn(spec.clone(), naive_sub.clone(), Bus::new(16));
        let reliable_sub = script();
        let reliable = ReliableWatcher::spawn(spec, reliable_sub.clone(), Bus::new(16));
        settle(&naive, |p| p.watching().is_some()).await;
        settle(&reliable, |p| p.watching().is_some()).await;

        naive_sub.terminate(&first);
        reliable_sub.terminate(&first);
        naive.join().await;
        settle(&reliable, |p| p.watching() == Some(&second)).await;

        assert_eq!(naive.phase(), Phase::Halted);
        assert_eq!(naive_sub.resolve_instants().len(), 1);
        assert_eq!(reliable_sub.resolve_instants().len(), 2);
        reliable.stop().await;
    }
}
