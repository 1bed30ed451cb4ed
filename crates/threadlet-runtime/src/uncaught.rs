//! Process-wide channel for errors nobody on the worker side handled.
//!
//! A supervisor holds the [`UncaughtErrorReceiver`] and decides what to do with
//! a worker that reported a fatal error (respawn it, retire it, shut down).
//! Workers only ever see the cloneable [`UncaughtErrorSender`].

use std::fmt;

use tokio::sync::mpsc;

use crate::WorkerId;

/// One error surfaced by a worker on the uncaught-error channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UncaughtError<E> {
    pub worker: WorkerId,
    pub error: E,
}

pub struct UncaughtErrorSender<E> {
    tx: mpsc::UnboundedSender<UncaughtError<E>>,
}

impl<E> Clone for UncaughtErrorSender<E> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<E: fmt::Display> UncaughtErrorSender<E> {
    /// Publishes `error` for `worker`. Returns `false` when no supervisor is
    /// listening anymore; the error is then only logged.
    pub fn report(&self, worker: WorkerId, error: E) -> bool {
        match self.tx.send(UncaughtError { worker, error }) {
            Ok(()) => true,
            Err(mpsc::error::SendError(lost)) => {
                tracing::error!(
                    worker = %lost.worker,
                    error = %lost.error,
                    "uncaught worker error with no supervisor listening"
                );
                false
            },
        }
    }
}

pub struct UncaughtErrorReceiver<E> {
    rx: mpsc::UnboundedReceiver<UncaughtError<E>>,
}

impl<E> UncaughtErrorReceiver<E> {
    /// Waits for the next uncaught error. `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<UncaughtError<E>> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<UncaughtError<E>> {
        self.rx.try_recv().ok()
    }
}

pub fn channel<E>() -> (UncaughtErrorSender<E>, UncaughtErrorReceiver<E>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (UncaughtErrorSender { tx }, UncaughtErrorReceiver { rx })
}
