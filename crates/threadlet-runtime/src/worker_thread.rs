use std::panic::{AssertUnwindSafe, catch_unwind};
use std::thread::{self, JoinHandle};

use thiserror::Error;
use tokio::runtime::Builder;
use tokio::sync::mpsc;
use tokio::task::LocalSet;

/// Receives the messages posted to a worker thread, one call per message, in
/// post order.
///
/// Handlers run on the worker's single event loop inside a [`LocalSet`], so
/// they may hand follow-up work to `tokio::task::spawn_local`.
pub trait MessageHandler<M>: 'static {
    fn on_message(&mut self, message: M);
}

impl<M, F> MessageHandler<M> for F
where
    F: FnMut(M) + 'static,
{
    fn on_message(&mut self, message: M) {
        self(message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PostError {
    #[error("worker mailbox closed")]
    MailboxClosed,
}

/// Sending half of a worker's inbound channel.
pub struct WorkerPort<M> {
    tx: mpsc::UnboundedSender<M>,
}

impl<M> Clone for WorkerPort<M> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<M: Send + 'static> WorkerPort<M> {
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    pub fn post(&self, message: M) -> Result<(), PostError> {
        self.tx.send(message).map_err(|_| PostError::MailboxClosed)
    }
}

/// Spawns a named OS thread running a current-thread tokio runtime and a
/// [`LocalSet`]. `make_handler` runs on the new thread, inside the event loop.
///
/// The loop exits once every [`WorkerPort`] is dropped, after the tasks the
/// handler spawned have run to completion.
pub fn spawn_worker_thread_named<M, H, F>(
    make_handler: F,
    thread_name: impl Into<String>,
    stack_size: Option<usize>,
) -> std::io::Result<(WorkerPort<M>, JoinHandle<()>)>
where
    M: Send + 'static,
    H: MessageHandler<M>,
    F: FnOnce() -> H + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel::<M>();
    let port = WorkerPort { tx };
    let mut builder = thread::Builder::new().name(thread_name.into());
    if let Some(stack_size) = stack_size {
        builder = builder.stack_size(stack_size);
    }
    let join = builder.spawn(move || run_event_loop(make_handler, rx))?;
    Ok((port, join))
}

fn run_event_loop<M, H, F>(make_handler: F, mut rx: mpsc::UnboundedReceiver<M>)
where
    H: MessageHandler<M>,
    F: FnOnce() -> H,
{
    let runtime = match Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            tracing::error!(%error, "failed to build worker event loop");
            return;
        },
    };
    let local = LocalSet::new();
    local.block_on(&runtime, async move {
        let mut handler = make_handler();
        while let Some(message) = rx.recv().await {
            let result = catch_unwind(AssertUnwindSafe(|| handler.on_message(message)));
            if result.is_err() {
                tracing::error!("worker message handler panicked, stopping event loop");
                break;
            }
        }
    });
    // Drain tasks spawned before the mailbox closed.
    runtime.block_on(local);
}
