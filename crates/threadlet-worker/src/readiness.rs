use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use futures_util::FutureExt;
use futures_util::future::{LocalBoxFuture, Shared};

use crate::error::LoadError;

pub type ReadinessOutput<E> = Result<Rc<E>, LoadError>;

/// Single-resolution handle over a worker's initialization outcome.
///
/// Every clone observes the same result. Once settled it never changes, so a
/// failed initialization stays failed for the rest of the worker's life.
pub struct ReadinessFuture<E> {
    inner: Shared<LocalBoxFuture<'static, ReadinessOutput<E>>>,
}

impl<E> Clone for ReadinessFuture<E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<E: 'static> ReadinessFuture<E> {
    /// Wraps the loader future. A loader panic settles as [`LoadError::Panicked`].
    pub(crate) fn new<F>(load: F) -> Self
    where
        F: Future<Output = Result<E, LoadError>> + 'static,
    {
        let inner = AssertUnwindSafe(load)
            .catch_unwind()
            .map(|outcome| match outcome {
                Ok(Ok(exports)) => Ok(Rc::new(exports)),
                Ok(Err(error)) => Err(error),
                Err(_) => Err(LoadError::Panicked),
            })
            .boxed_local()
            .shared();
        Self { inner }
    }
}

impl<E> Future for ReadinessFuture<E> {
    type Output = ReadinessOutput<E>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.poll_unpin(cx)
    }
}
