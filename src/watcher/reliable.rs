//! # ReliableWatcher: self-healing liveness watch.
//!
//! Keeps a termination subscription on whatever instance currently answers
//! to a [`Locator`], re-resolving after every failure with backoff, forever.
//!
//! ## Session state machine
//! ```text
//!              TryResolve                    Resolved(Ok r)
//! Unresolved ─────────────► (resolving) ───────────────────► AwaitingConfirmation(r)
//!     ▲                          │ Resolved(Err)                     │ ConfirmAlive
//!     │                          ▼                                   ▼
//!     │  RetryTimerFired   RetryScheduled ◄──── Confirmed(Err) ── (confirming)
//!     └─────────────────── (one timer)   ◄──┐                        │ Confirmed(Ok pong)
//!                                           │                        ▼  EstablishWatch(pong.from)
//!                                           └── Terminated(r') ── Watching(r')
//! ```
//!
//! ## Rules
//! - One tokio task per watcher; messages are handled one at a time, to completion.
//! - Every async step (resolution, confirmation, termination wait, retry timer)
//!   runs outside the loop and reports back with exactly one inbox message.
//! - Each session state owns at most one pending step; replacing the state
//!   drops its [`DropGuard`] and cancels that step.
//! - Results tagged with an old `cycle` are discarded.
//! - The subscription uses the reference **from the confirmation reply**.
//! - `Terminated(r)` is acted on only in `Watching(r)` for that exact `r`.
//! - Failures never end the loop; only cancellation of the watcher's token does.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{self, Instant};
use tokio_util::sync::{CancellationToken, DropGuard};

use super::{Phase, WatchSpec, WatcherHandle, WatcherKind};
use crate::error::{PipeError, WatchError};
use crate::events::{Bus, Event, EventKind, RetryReason};
use crate::pipe::Pipe;
use crate::substrate::{SubscriptionId, SubstrateRef};
use crate::target::{Ping, Pong, TargetRef};

/// Inbox message envelope.
#[derive(Debug)]
enum Msg {
    TryResolve,
    Resolved {
        cycle: u64,
        outcome: Result<TargetRef, WatchError>,
    },
    ConfirmAlive {
        cycle: u64,
        target: TargetRef,
    },
    Confirmed {
        cycle: u64,
        requested: TargetRef,
        outcome: Result<Pong, WatchError>,
    },
    Terminated {
        target: TargetRef,
        lost: bool,
    },
    RetryTimerFired {
        cycle: u64,
    },
    /// A termination forwarder was released; nothing to do.
    Released,
}

/// Internal session state. Each variant owns at most one pending step.
enum Session {
    Unresolved {
        pending: Option<DropGuard>,
    },
    AwaitingConfirmation {
        target: TargetRef,
        pending: Option<DropGuard>,
    },
    Watching {
        target: TargetRef,
        subscription: SubscriptionId,
        _forward: DropGuard,
    },
    RetryScheduled {
        _timer: DropGuard,
    },
    Stopped,
}

/// Resilient watcher actor. Create with [`ReliableWatcher::spawn`].
pub struct ReliableWatcher {
    spec: WatchSpec,
    name: String,
    substrate: SubstrateRef,
    bus: Bus,
    inbox: mpsc::UnboundedSender<Msg>,
    phase: watch::Sender<Phase>,
    token: CancellationToken,
    session: Session,
    cycle: u64,
    resolve_attempts: u32,
    failures: u32,
}

impl ReliableWatcher {
    /// Spawns a watcher for `spec.locator()` and immediately triggers the first resolve.
    ///
    /// Never fails: every problem past this point is retried internally.
    /// Must be called from within a tokio runtime.
    pub fn spawn(spec: WatchSpec, substrate: SubstrateRef, bus: Bus) -> WatcherHandle {
        let (inbox, rx) = mpsc::unbounded_channel();
        let (phase, phase_rx) = watch::channel(Phase::Unresolved);
        let token = CancellationToken::new();
        let locator = spec.locator().clone();

        let actor = Self {
            name: locator.to_string(),
            spec,
            substrate,
            bus,
            inbox,
            phase,
            token: token.clone(),
            session: Session::Unresolved { pending: None },
            cycle: 0,
            resolve_attempts: 0,
            failures: 0,
        };
        let join = tokio::spawn(actor.run(rx));
        WatcherHandle::new(locator, WatcherKind::Reliable, phase_rx, token, join)
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Msg>) {
        self.publish(Event::new(EventKind::WatcherStarted).with_reason(WatcherKind::Reliable.as_label()));
        self.tell(Msg::TryResolve);

        let token = self.token.clone();
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                msg = rx.recv() => match msg {
                    Some(msg) => self.handle(msg),
                    None => break,
                }
            }
        }

        self.stop();
    }

    fn handle(&mut self, msg: Msg) {
        match msg {
            Msg::TryResolve => self.try_resolve(),
            Msg::Resolved { cycle, outcome } if cycle == self.cycle => self.on_resolved(outcome),
            Msg::ConfirmAlive { cycle, target } if cycle == self.cycle => self.confirm_alive(target),
            Msg::Confirmed {
                cycle,
                requested,
                outcome,
            } if cycle == self.cycle => self.on_confirmed(requested, outcome),
            Msg::Terminated { target, lost } => self.on_terminated(target, lost),
            Msg::RetryTimerFired { cycle } if cycle == self.cycle => self.on_retry_fired(),
            _ => {}
        }
    }

    fn try_resolve(&mut self) {
        if !matches!(self.session, Session::Unresolved { pending: None }) {
            return;
        }

        self.resolve_attempts += 1;
        let bound = self.spec.resolve_timeout();
        self.publish(
            Event::new(EventKind::ResolveAttempt)
                .with_attempt(self.resolve_attempts)
                .with_timeout(bound),
        );

        let substrate = self.substrate.clone();
        let locator = self.spec.locator().clone();
        let cycle = self.cycle;
        let (token, guard) = self.pending_token();

        Pipe::new(async move {
            let res = time::timeout(bound, substrate.resolve(&locator, bound)).await;
            res.unwrap_or(Err(WatchError::ResolveTimeout {
                locator,
                timeout: bound,
            }))
        })
        .cancel_on(token)
        .to_with(
            &self.inbox,
            move |target| Msg::Resolved {
                cycle,
                outcome: Ok(target),
            },
            move |e: PipeError<WatchError>| Msg::Resolved {
                cycle,
                outcome: Err(e.into()),
            },
        );

        self.session = Session::Unresolved {
            pending: Some(guard),
        };
    }

    fn on_resolved(&mut self, outcome: Result<TargetRef, WatchError>) {
        if !matches!(self.session, Session::Unresolved { pending: Some(_) }) {
            return;
        }
        match outcome {
            Ok(target) => {
                self.session = Session::AwaitingConfirmation {
                    target: target.clone(),
                    pending: None,
                };
                self.set_phase(Phase::AwaitingConfirmation(target.clone()));
                self.tell(Msg::ConfirmAlive {
                    cycle: self.cycle,
                    target,
                });
            }
            Err(e) => {
                self.publish(
                    Event::new(EventKind::ResolveFailed)
                        .with_attempt(self.resolve_attempts)
                        .with_reason(e.to_string()),
                );
                self.schedule_retry(RetryReason::Resolution, &e);
            }
        }
    }

    fn confirm_alive(&mut self, target: TargetRef) {
        match &self.session {
            Session::AwaitingConfirmation { target: t, pending: None } if *t == target => {}
            _ => return,
        }

        let bound = self.spec.confirm_timeout();
        self.publish(
            Event::new(EventKind::ConfirmAttempt)
                .with_target(target.clone())
                .with_timeout(bound),
        );

        let substrate = self.substrate.clone();
        let cycle = self.cycle;
        let requested = target.clone();
        let requested_err = target.clone();
        let (token, guard) = self.pending_token();

        Pipe::new(async move {
            let res = time::timeout(bound, substrate.ask(&target, Ping, bound)).await;
            res.unwrap_or(Err(WatchError::ConfirmTimeout {
                target,
                timeout: bound,
            }))
        })
        .cancel_on(token)
        .to_with(
            &self.inbox,
            move |pong| Msg::Confirmed {
                cycle,
                requested,
                outcome: Ok(pong),
            },
            move |e: PipeError<WatchError>| Msg::Confirmed {
                cycle,
                requested: requested_err,
                outcome: Err(e.into()),
            },
        );

        if let Session::AwaitingConfirmation { pending, .. } = &mut self.session {
            *pending = Some(guard);
        }
    }

    fn on_confirmed(&mut self, requested: TargetRef, outcome: Result<Pong, WatchError>) {
        match &self.session {
            Session::AwaitingConfirmation {
                target,
                pending: Some(_),
            } if *target == requested => {}
            _ => return,
        }

        let outcome = outcome.and_then(|pong| {
            if pong.from.locator() == requested.locator() {
                Ok(pong.from)
            } else {
                Err(WatchError::Mismatched {
                    requested: requested.clone(),
                    replied: pong.from,
                })
            }
        });

        match outcome {
            Ok(confirmed) => self.establish_watch(confirmed),
            Err(e) => {
                self.publish(
                    Event::new(EventKind::ConfirmFailed)
                        .with_target(requested)
                        .with_reason(e.to_string()),
                );
                self.schedule_retry(RetryReason::Confirmation, &e);
            }
        }
    }

    /// Entry action of `Watching`: subscribe to the confirmed reference.
    fn establish_watch(&mut self, target: TargetRef) {
        let subscription = self.substrate.watch(&target);
        let id = subscription.id;
        let watched = target.clone();
        let (token, guard) = self.pending_token();

        Pipe::new(subscription.terminated)
            .cancel_on(token)
            .to_with(
                &self.inbox,
                |target| Msg::Terminated {
                    target,
                    lost: false,
                },
                move |e| match e {
                    PipeError::Cancelled => Msg::Released,
                    _ => Msg::Terminated {
                        target: watched,
                        lost: true,
                    },
                },
            );

        self.failures = 0;
        self.session = Session::Watching {
            target: target.clone(),
            subscription: id,
            _forward: guard,
        };
        self.publish(Event::new(EventKind::WatchEstablished).with_target(target.clone()));
        self.set_phase(Phase::Watching(target));
    }

    fn on_terminated(&mut self, target: TargetRef, lost: bool) {
        let subscription = match &self.session {
            Session::Watching {
                target: current,
                subscription,
                ..
            } if *current == target => *subscription,
            _ => {
                self.publish(Event::new(EventKind::StaleNotification).with_target(target));
                return;
            }
        };

        self.substrate.unwatch(subscription);
        let mut ev = Event::new(EventKind::TerminationObserved).with_target(target.clone());
        if lost {
            ev = ev.with_reason("subscription lost");
        }
        self.publish(ev);

        let why = if lost {
            format!("subscription to {target} lost")
        } else {
            format!("{target} terminated")
        };
        self.enter_retry(RetryReason::Termination, why);
    }

    fn schedule_retry(&mut self, reason: RetryReason, err: &WatchError) {
        self.enter_retry(reason, err.to_string());
    }

    fn enter_retry(&mut self, reason: RetryReason, why: String) {
        self.failures = self.failures.saturating_add(1);
        let delay = self.spec.backoff().next(self.failures - 1);
        let deadline = retry_deadline(delay);
        self.cycle += 1;

        let cycle = self.cycle;
        let inbox = self.inbox.clone();
        let (token, guard) = self.pending_token();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = time::sleep_until(deadline) => {
                    let _ = inbox.send(Msg::RetryTimerFired { cycle });
                }
            }
        });

        self.session = Session::RetryScheduled { _timer: guard };
        self.publish(
            Event::new(EventKind::RetryScheduled)
                .with_retry(reason)
                .with_attempt(self.failures)
                .with_delay(delay)
                .with_reason(why),
        );
        self.set_phase(Phase::RetryScheduled { reason, deadline });
    }

    fn on_retry_fired(&mut self) {
        if !matches!(self.session, Session::RetryScheduled { .. }) {
            return;
        }
        self.session = Session::Unresolved { pending: None };
        self.publish(Event::new(EventKind::RetryFired));
        self.set_phase(Phase::Unresolved);
        self.tell(Msg::TryResolve);
    }

    fn stop(&mut self) {
        if let Session::Watching { subscription, .. } = &self.session {
            self.substrate.unwatch(*subscription);
        }
        self.session = Session::Stopped;
        self.publish(Event::new(EventKind::WatcherStopped));
        self.set_phase(Phase::Stopped);
    }

    /// Child token for one pending step plus the guard that cancels it.
    fn pending_token(&self) -> (CancellationToken, DropGuard) {
        let token = self.token.child_token();
        (token.clone(), token.drop_guard())
    }

    fn tell(&self, msg: Msg) {
        let _ = self.inbox.send(msg);
    }

    fn publish(&self, ev: Event) {
        self.bus.publish(ev.with_watcher(self.name.as_str()));
    }

    fn set_phase(&self, phase: Phase) {
        self.phase.send_replace(phase);
    }
}

/// Deadline `delay` from now, pushed to a far-future instant when the
/// addition overflows.
fn retry_deadline(delay: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(delay)
        .unwrap_or_else(|| now + Duration::from_secs(86_400 * 365 * 30))
}
