//! # Pipe: deliver the outcome of an async operation into an inbox.
//!
//! [`Pipe`] spawns an operation and posts **exactly one** message to an
//! inbox when it completes, instead of letting the operation mutate shared
//! state. Watchers use it for every resolution, confirmation and termination
//! wait, so all state changes happen inside their own message loop.
//!
//! ## Delivery rules
//! ```text
//! op → Ok(v)                 → success(v)                     (default: Status::Success(v))
//! op → Err(e)                → failure(PipeError::Failed(e))  (default: Status::Failure(..))
//! op panics                  → failure(PipeError::Panicked(..))
//! cancel_on(token) fires     → failure(PipeError::Cancelled)
//! op never completes         → nothing
//! pipe task aborted          → nothing
//! inbox closed at delivery   → message dropped silently
//! ```
//!
//! ## Example
//! ```rust
//! use tokio::sync::mpsc;
//! use watchvisor::{Pipe, Status};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let (tx, mut rx) = mpsc::unbounded_channel();
//! Pipe::new(async { Ok::<_, std::io::Error>(42) }).to(&tx);
//!
//! match rx.recv().await {
//!     Some(Status::Success(v)) => assert_eq!(v, 42),
//!     _ => unreachable!(),
//! }
//! # }
//! ```

use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::PipeError;
use crate::subscribers::panic_message;

/// Default message shape delivered by [`Pipe::to`].
#[derive(Debug)]
pub enum Status<T, E> {
    /// The operation produced a value.
    Success(T),
    /// The operation failed, panicked, or was cancelled.
    Failure(PipeError<E>),
}

impl<T, E> Status<T, E> {
    /// True for [`Status::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, Status::Success(_))
    }
}

/// A pending operation waiting to be piped into an inbox.
#[must_use = "a pipe does nothing until `to` or `to_with` is called"]
pub struct Pipe<Fut> {
    op: Fut,
    cancel: Option<CancellationToken>,
}

impl<Fut, T, E> Pipe<Fut>
where
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    /// Wraps an operation.
    pub fn new(op: Fut) -> Self {
        Self { op, cancel: None }
    }

    /// Abandons the operation when `token` is cancelled, delivering
    /// [`PipeError::Cancelled`] instead of its result.
    pub fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Delivers the outcome wrapped in [`Status`].
    pub fn to(self, inbox: &mpsc::UnboundedSender<Status<T, E>>) -> JoinHandle<()> {
        self.to_with(inbox, Status::Success, Status::Failure)
    }

    /// Delivers `success(value)` or `failure(error)`.
    pub fn to_with<M, S, F>(
        self,
        inbox: &mpsc::UnboundedSender<M>,
        success: S,
        failure: F,
    ) -> JoinHandle<()>
    where
        M: Send + 'static,
        S: FnOnce(T) -> M + Send + 'static,
        F: FnOnce(PipeError<E>) -> M + Send + 'static,
    {
        let inbox = inbox.clone();
        let Pipe { op, cancel } = self;

        tokio::spawn(async move {
            let guarded = async {
                match AssertUnwindSafe(op).catch_unwind().await {
                    Ok(Ok(v)) => Ok(v),
                    Ok(Err(e)) => Err(PipeError::Failed(e)),
                    Err(panic) => Err(PipeError::Panicked(panic_message(panic.as_ref()))),
                }
            };

            let outcome = match cancel {
                Some(token) => tokio::select! {
                    biased;
                    _ = token.cancelled() => Err(PipeError::Cancelled),
                    res = guarded => res,
                },
                None => guarded.await,
            };

            let msg = match outcome {
                Ok(v) => success(v),
                Err(e) => failure(e),
            };
            let _ = inbox.send(msg);
        })
    }
}

/// Shorthand for `Pipe::new(op).to(inbox)`.
pub fn pipe_to<Fut, T, E>(op: Fut, inbox: &mpsc::UnboundedSender<Status<T, E>>) -> JoinHandle<()>
where
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    Pipe::new(op).to(inbox)
}
