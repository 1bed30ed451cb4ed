//! Per-worker handshake and entry-point dispatch.
//!
//! A worker's first inbound message carries its init payload; the dispatcher
//! hands it to the [`ModuleLoader`] and keeps the resulting
//! [`ReadinessFuture`]. Every later message waits on that same future before
//! it is forwarded to the [`EntryPointTable`], so requests that arrive while
//! the module is still loading queue up behind it and are forwarded in
//! arrival order once it is ready.
//!
//! A load failure is kept in the readiness future, which turns every pending
//! and future request into a no-op for the table, and is published once to
//! the uncaught-error channel so a supervisor can react.

use std::cell::Cell;
use std::panic::AssertUnwindSafe;
use std::rc::Rc;

use futures_util::FutureExt;
use threadlet_runtime::WorkerId;
use threadlet_runtime::uncaught::UncaughtErrorSender;
use threadlet_runtime::worker_thread::MessageHandler;
use tokio::task::{self, JoinHandle};
use tracing::{debug, warn};

use crate::capabilities::{EntryPointTable, ModuleLoader};
use crate::error::{DispatchError, InvokeError, LoadError};
use crate::readiness::ReadinessFuture;
use crate::types::{WorkerMessage, WorkerState};

/// Local task resolving to the outcome of one handled message.
pub type DispatchTask = JoinHandle<Result<(), DispatchError>>;

pub type InboundMessage<L, T> =
    WorkerMessage<<L as ModuleLoader>::Payload, <T as EntryPointTable>::Request>;

pub struct WorkerEntryDispatcher<L, T>
where
    L: ModuleLoader,
    T: EntryPointTable<Exports = L::Exports>,
{
    worker: WorkerId,
    loader: Rc<L>,
    table: Rc<T>,
    errors: UncaughtErrorSender<LoadError>,
    state: Rc<Cell<WorkerState>>,
    readiness: Option<ReadinessFuture<L::Exports>>,
}

impl<L, T> WorkerEntryDispatcher<L, T>
where
    L: ModuleLoader,
    T: EntryPointTable<Exports = L::Exports>,
{
    pub fn new(
        worker: WorkerId,
        loader: L,
        table: T,
        errors: UncaughtErrorSender<LoadError>,
    ) -> Self {
        Self {
            worker,
            loader: Rc::new(loader),
            table: Rc::new(table),
            errors,
            state: Rc::new(Cell::new(WorkerState::Uninitialized)),
            readiness: None,
        }
    }

    pub fn worker(&self) -> WorkerId {
        self.worker
    }

    pub fn state(&self) -> WorkerState {
        self.state.get()
    }

    /// `None` until the init payload has been received.
    pub fn readiness(&self) -> Option<ReadinessFuture<L::Exports>> {
        self.readiness.clone()
    }

    /// Handles one inbound message and returns the task carrying its outcome.
    ///
    /// Must be called from inside a [`tokio::task::LocalSet`]. Calls must
    /// follow the order in which messages were received.
    pub fn handle(&mut self, message: InboundMessage<L, T>) -> DispatchTask {
        if self.state.get() == WorkerState::Uninitialized {
            return match message {
                WorkerMessage::Init(payload) => self.on_first_message(payload),
                WorkerMessage::Invoke(_) => {
                    warn!(worker = %self.worker, "entry-point request before init payload, dropped");
                    settled(Err(DispatchError::NotInitialized))
                },
            };
        }
        match message {
            WorkerMessage::Invoke(request) => self.on_subsequent_message(request),
            WorkerMessage::Init(_) => {
                warn!(
                    worker = %self.worker,
                    state = %self.state.get(),
                    "duplicate init payload rejected"
                );
                settled(Err(DispatchError::AlreadyInitialized))
            },
        }
    }

    fn on_first_message(&mut self, payload: L::Payload) -> DispatchTask {
        self.state.set(WorkerState::Initializing);
        debug!(worker = %self.worker, "worker initialization started");

        let loader = Rc::clone(&self.loader);
        let readiness = ReadinessFuture::new(async move { loader.initialize(payload).await });
        self.readiness = Some(readiness.clone());

        let worker = self.worker;
        let state = Rc::clone(&self.state);
        let errors = self.errors.clone();
        // Spawned before any request handler, so it is the first to observe
        // the outcome and settles `state` before requests resume.
        task::spawn_local(drive_initialization(worker, readiness, state, errors))
    }

    fn on_subsequent_message(&self, request: T::Request) -> DispatchTask {
        let Some(readiness) = self.readiness.clone() else {
            return settled(Err(DispatchError::NotInitialized));
        };
        let table = Rc::clone(&self.table);
        task::spawn_local(async move {
            let exports = readiness.await.map_err(DispatchError::InitFailed)?;
            AssertUnwindSafe(table.invoke(&exports, request))
                .catch_unwind()
                .await
                .unwrap_or(Err(InvokeError::Panicked))?;
            Ok(())
        })
    }
}

impl<L, T> MessageHandler<InboundMessage<L, T>> for WorkerEntryDispatcher<L, T>
where
    L: ModuleLoader,
    T: EntryPointTable<Exports = L::Exports>,
{
    fn on_message(&mut self, message: InboundMessage<L, T>) {
        let worker = self.worker;
        let kind = message.kind();
        let task = self.handle(message);
        task::spawn_local(async move {
            match task.await.unwrap_or(Err(DispatchError::Aborted)) {
                Ok(()) => {},
                // Already published once by the initialization driver.
                Err(DispatchError::InitFailed(error)) if kind == "invoke" => {
                    debug!(worker = %worker, %error, "request dropped, worker failed to initialize");
                },
                Err(DispatchError::InitFailed(_)) => {},
                Err(error) => {
                    warn!(worker = %worker, kind, %error, "worker message failed");
                },
            }
        });
    }
}

/// Settles `state` from the loader outcome. A failure is published one tick
/// after it is observed, so requests already waiting on the same readiness
/// are released before any supervisor hears about it.
async fn drive_initialization<E>(
    worker: WorkerId,
    readiness: ReadinessFuture<E>,
    state: Rc<Cell<WorkerState>>,
    errors: UncaughtErrorSender<LoadError>,
) -> Result<(), DispatchError> {
    match readiness.await {
        Ok(_) => {
            state.set(WorkerState::Ready);
            debug!(worker = %worker, "worker ready");
            Ok(())
        },
        Err(error) => {
            state.set(WorkerState::Failed);
            warn!(worker = %worker, %error, "worker initialization failed");
            task::yield_now().await;
            errors.report(worker, error.clone());
            Err(DispatchError::InitFailed(error))
        },
    }
}

fn settled(result: Result<(), DispatchError>) -> DispatchTask {
    task::spawn_local(async move { result })
}
