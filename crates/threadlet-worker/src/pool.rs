//! A supervising pool of dispatcher-driven workers.
//!
//! The pool owns the receiving side of the uncaught-error channel. A worker
//! whose module fails to load reports there exactly once; the pool then stops
//! routing requests to it and, if configured, replaces it with a fresh worker
//! carrying a new id and a fresh init payload.

use std::collections::HashSet;
use std::sync::Arc;
use std::thread::JoinHandle;

use threadlet_runtime::WorkerId;
use threadlet_runtime::uncaught::{
    self, UncaughtError, UncaughtErrorReceiver, UncaughtErrorSender,
};
use tracing::{info, warn};

use crate::capabilities::{EntryPointTable, ModuleLoader};
use crate::config::WorkerConfig;
use crate::error::{LoadError, PoolError};
use crate::host::{WorkerHandle, spawn_worker};

/// Builds the init payload for a worker, given its id.
pub type PayloadFactory<P> = Arc<dyn Fn(WorkerId) -> P + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorEvent {
    Respawned {
        failed: WorkerId,
        replacement: WorkerId,
        error: LoadError,
    },
    Retired {
        failed: WorkerId,
        error: LoadError,
    },
}

pub struct WorkerPool<L, T>
where
    L: ModuleLoader + Send + Sync,
    T: EntryPointTable<Exports = L::Exports> + Send + Sync,
    L::Payload: Send,
    T::Request: Send,
{
    config: WorkerConfig,
    loader: Arc<L>,
    table: Arc<T>,
    payloads: PayloadFactory<L::Payload>,
    workers: Vec<WorkerHandle<L::Payload, T::Request>>,
    failed: HashSet<WorkerId>,
    retired: Vec<(WorkerId, JoinHandle<()>)>,
    errors_tx: UncaughtErrorSender<LoadError>,
    errors_rx: UncaughtErrorReceiver<LoadError>,
    next_id: u32,
    cursor: usize,
    respawns: u32,
}

impl<L, T> WorkerPool<L, T>
where
    L: ModuleLoader + Send + Sync,
    T: EntryPointTable<Exports = L::Exports> + Send + Sync,
    L::Payload: Send,
    T::Request: Send,
{
    /// Spawns `config.pool_size` workers and posts each its init payload.
    pub fn start<F>(config: WorkerConfig, loader: L, table: T, payloads: F) -> Result<Self, PoolError>
    where
        F: Fn(WorkerId) -> L::Payload + Send + Sync + 'static,
    {
        if config.pool_size == 0 {
            return Err(PoolError::NoLiveWorkers);
        }
        let (errors_tx, errors_rx) = uncaught::channel();
        let mut pool = Self {
            workers: Vec::with_capacity(config.pool_size),
            config,
            loader: Arc::new(loader),
            table: Arc::new(table),
            payloads: Arc::new(payloads),
            failed: HashSet::new(),
            retired: Vec::new(),
            errors_tx,
            errors_rx,
            next_id: 0,
            cursor: 0,
            respawns: 0,
        };
        for _ in 0..pool.config.pool_size {
            let worker = pool.spawn_initialized()?;
            pool.workers.push(worker);
        }
        info!(workers = pool.workers.len(), "worker pool started");
        Ok(pool)
    }

    fn spawn_initialized(&mut self) -> Result<WorkerHandle<L::Payload, T::Request>, PoolError> {
        let id = WorkerId(self.next_id);
        self.next_id += 1;
        let worker = spawn_worker(
            id,
            &self.config,
            Arc::clone(&self.loader),
            Arc::clone(&self.table),
            self.errors_tx.clone(),
        )?;
        worker.init((self.payloads)(id))?;
        Ok(worker)
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    pub fn worker_ids(&self) -> Vec<WorkerId> {
        self.workers.iter().map(WorkerHandle::id).collect()
    }

    pub fn respawns(&self) -> u32 {
        self.respawns
    }

    /// Sends `request` to the next live worker, round-robin. Workers that
    /// reported a load failure are skipped.
    pub fn dispatch(&mut self, request: T::Request) -> Result<WorkerId, PoolError> {
        let count = self.workers.len();
        for offset in 0..count {
            let index = (self.cursor + offset) % count;
            let worker = &self.workers[index];
            if self.failed.contains(&worker.id()) || worker.is_closed() {
                continue;
            }
            self.cursor = (index + 1) % count;
            worker.invoke(request)?;
            return Ok(worker.id());
        }
        Err(PoolError::NoLiveWorkers)
    }

    pub fn dispatch_to(&self, id: WorkerId, request: T::Request) -> Result<(), PoolError> {
        let worker = self
            .workers
            .iter()
            .find(|worker| worker.id() == id)
            .ok_or(PoolError::UnknownWorker { worker: id })?;
        worker.invoke(request)
    }

    /// Waits for the next worker to report an initialization failure.
    pub async fn next_failure(&mut self) -> Option<UncaughtError<LoadError>> {
        let failure = self.errors_rx.recv().await?;
        warn!(worker = %failure.worker, error = %failure.error, "worker reported load failure");
        self.failed.insert(failure.worker);
        Some(failure)
    }

    /// Replaces failed worker `id` with a freshly initialized one and returns
    /// the replacement's id. The old worker finishes its queued requests and
    /// exits. Healthy workers are left alone.
    pub fn respawn(&mut self, id: WorkerId) -> Result<WorkerId, PoolError> {
        let index = self
            .workers
            .iter()
            .position(|worker| worker.id() == id)
            .ok_or(PoolError::UnknownWorker { worker: id })?;
        if !self.failed.contains(&id) {
            return Err(PoolError::NotFailed { worker: id });
        }
        if self.respawns >= self.config.max_respawns {
            return Err(PoolError::RespawnLimit {
                limit: self.config.max_respawns,
            });
        }
        let replacement = self.spawn_initialized()?;
        let replacement_id = replacement.id();
        let old = std::mem::replace(&mut self.workers[index], replacement);
        self.retired.push(old.retire());
        self.failed.remove(&id);
        self.respawns += 1;
        info!(failed = %id, replacement = %replacement_id, respawns = self.respawns, "worker respawned");
        Ok(replacement_id)
    }

    /// Waits for one failure and applies the configured policy to it.
    pub async fn supervise_next(&mut self) -> Result<SupervisorEvent, PoolError> {
        // The pool keeps a sender alive, so the channel never closes here.
        let Some(failure) = self.next_failure().await else {
            return Err(PoolError::NoLiveWorkers);
        };
        if !self.config.respawn_on_failure {
            return Ok(SupervisorEvent::Retired {
                failed: failure.worker,
                error: failure.error,
            });
        }
        let replacement = self.respawn(failure.worker)?;
        Ok(SupervisorEvent::Respawned {
            failed: failure.worker,
            replacement,
            error: failure.error,
        })
    }

    /// Closes every mailbox and joins all worker threads, including retired ones.
    pub fn shutdown(self) -> Result<(), PoolError> {
        let mut first_error = None;
        let retired = self
            .workers
            .into_iter()
            .map(WorkerHandle::retire)
            .chain(self.retired);
        for (id, join) in retired {
            if join.join().is_err() && first_error.is_none() {
                first_error = Some(PoolError::WorkerPanicked { worker: id });
            }
        }
        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}
