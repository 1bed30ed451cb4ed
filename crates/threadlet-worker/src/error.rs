//! Typed errors for worker initialization, dispatch and supervision.
//!
//! [`LoadError`] is fatal for the worker that hit it and is replayed to every
//! request that waits on the worker's readiness. [`InvokeError`] stays scoped
//! to the single request that produced it. Both are `Clone` because the
//! readiness future hands the same outcome to every waiter.

use std::path::PathBuf;

use thiserror::Error;
use threadlet_runtime::WorkerId;

/// The module loader could not produce an export table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// The shared module was rejected (malformed, wrong imports, ...).
    #[error("invalid module: {message}")]
    InvalidModule { message: String },
    /// The shared linear memory could not be attached.
    #[error("shared memory unavailable: {message}")]
    Memory { message: String },
    /// Any other loader failure.
    #[error("module loader failed: {message}")]
    Loader { message: String },
    /// The loader panicked while initializing.
    #[error("module loader panicked")]
    Panicked,
}

impl LoadError {
    pub fn invalid_module(message: impl Into<String>) -> Self {
        Self::InvalidModule {
            message: message.into(),
        }
    }

    pub fn memory(message: impl Into<String>) -> Self {
        Self::Memory {
            message: message.into(),
        }
    }

    pub fn loader(message: impl Into<String>) -> Self {
        Self::Loader {
            message: message.into(),
        }
    }
}

/// A single entry-point invocation failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvokeError {
    #[error("unknown entry point `{name}`")]
    UnknownEntryPoint { name: String },
    #[error("entry point failed: {details}")]
    Failed { details: String },
    #[error("entry point panicked")]
    Panicked,
}

impl InvokeError {
    pub fn unknown_entry_point(name: impl Into<String>) -> Self {
        Self::UnknownEntryPoint { name: name.into() }
    }

    pub fn failed(details: impl Into<String>) -> Self {
        Self::Failed {
            details: details.into(),
        }
    }
}

/// Outcome of handling one inbound worker message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// Initialization failed; the request was never forwarded.
    #[error("worker initialization failed: {0}")]
    InitFailed(LoadError),
    #[error(transparent)]
    Invoke(#[from] InvokeError),
    /// A second init payload arrived after the first one.
    #[error("worker already received its init payload")]
    AlreadyInitialized,
    /// A request arrived before any init payload.
    #[error("worker has not received its init payload")]
    NotInitialized,
    /// The dispatch task was dropped before it produced an outcome.
    #[error("dispatch task did not complete")]
    Aborted,
}

/// Errors produced by worker hosting and the supervising pool.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("failed to spawn {worker}: {source}")]
    Spawn {
        worker: WorkerId,
        #[source]
        source: std::io::Error,
    },
    #[error("{worker} is gone")]
    WorkerGone { worker: WorkerId },
    #[error("{worker} is not part of this pool")]
    UnknownWorker { worker: WorkerId },
    /// Only workers that reported a load failure may be replaced.
    #[error("{worker} has not reported a failure")]
    NotFailed { worker: WorkerId },
    #[error("no live workers")]
    NoLiveWorkers,
    #[error("respawn limit of {limit} reached")]
    RespawnLimit { limit: u32 },
    #[error("{worker} thread panicked")]
    WorkerPanicked { worker: WorkerId },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io failed at `{path}`: {source}")]
    IoAt {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("json failed at `{path}`: {source}")]
    JsonAt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
