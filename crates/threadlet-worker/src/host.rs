use std::thread::JoinHandle;

use threadlet_runtime::WorkerId;
use threadlet_runtime::uncaught::UncaughtErrorSender;
use threadlet_runtime::worker_thread::{WorkerPort, spawn_worker_thread_named};

use crate::capabilities::{EntryPointTable, ModuleLoader};
use crate::config::WorkerConfig;
use crate::dispatcher::WorkerEntryDispatcher;
use crate::error::{LoadError, PoolError};
use crate::types::WorkerMessage;

/// Coordinator-side handle of one worker thread.
pub struct WorkerHandle<P, R> {
    id: WorkerId,
    port: WorkerPort<WorkerMessage<P, R>>,
    join: JoinHandle<()>,
}

impl<P, R> WorkerHandle<P, R>
where
    P: Send + 'static,
    R: Send + 'static,
{
    pub fn id(&self) -> WorkerId {
        self.id
    }

    pub fn is_closed(&self) -> bool {
        self.port.is_closed()
    }

    pub fn post(&self, message: WorkerMessage<P, R>) -> Result<(), PoolError> {
        self.port
            .post(message)
            .map_err(|_| PoolError::WorkerGone { worker: self.id })
    }

    pub fn init(&self, payload: P) -> Result<(), PoolError> {
        self.post(WorkerMessage::Init(payload))
    }

    pub fn invoke(&self, request: R) -> Result<(), PoolError> {
        self.post(WorkerMessage::Invoke(request))
    }

    /// Closes the worker's mailbox without waiting for the thread.
    pub(crate) fn retire(self) -> (WorkerId, JoinHandle<()>) {
        (self.id, self.join)
    }

    /// Closes the mailbox and waits until the worker has finished every
    /// request it already received.
    pub fn shutdown(self) -> Result<(), PoolError> {
        let (id, join) = self.retire();
        join.join().map_err(|_| PoolError::WorkerPanicked { worker: id })
    }
}

/// Spawns a worker thread whose event loop is driven by a
/// [`WorkerEntryDispatcher`] built from `loader` and `table`.
///
/// The thread starts uninitialized; the first message posted to it must be
/// the init payload.
pub fn spawn_worker<L, T>(
    id: WorkerId,
    config: &WorkerConfig,
    loader: L,
    table: T,
    errors: UncaughtErrorSender<LoadError>,
) -> Result<WorkerHandle<L::Payload, T::Request>, PoolError>
where
    L: ModuleLoader + Send,
    T: EntryPointTable<Exports = L::Exports> + Send,
    L::Payload: Send,
    T::Request: Send,
{
    let (port, join) = spawn_worker_thread_named(
        move || WorkerEntryDispatcher::new(id, loader, table, errors),
        config.thread_name(id),
        config.thread_stack_size,
    )
    .map_err(|source| PoolError::Spawn { worker: id, source })?;
    tracing::debug!(worker = %id, "worker thread spawned");
    Ok(WorkerHandle { id, port, join })
}
