#![deny(clippy::wildcard_imports)]

//! Bootstrap and dispatch for worker threads that share one loaded module.
//!
//! Each worker receives an init payload as its first message, loads the module
//! through a [`ModuleLoader`], and then forwards every later message to an
//! [`EntryPointTable`] in receipt order. Requests that arrive while loading is
//! still in progress wait for it; a failed load is reported once on the
//! uncaught-error channel and silences the worker for good.

pub mod capabilities;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod host;
pub mod logging;
pub mod pool;
pub mod readiness;
pub mod types;

pub use capabilities::{EntryPointTable, ModuleLoader};
pub use config::WorkerConfig;
pub use dispatcher::{DispatchTask, WorkerEntryDispatcher};
pub use error::{ConfigError, DispatchError, InvokeError, LoadError, PoolError};
pub use host::{WorkerHandle, spawn_worker};
pub use pool::{PayloadFactory, SupervisorEvent, WorkerPool};
pub use readiness::ReadinessFuture;
pub use threadlet_runtime::WorkerId;
pub use threadlet_runtime::uncaught::{UncaughtError, UncaughtErrorReceiver, UncaughtErrorSender};
pub use types::{WorkerMessage, WorkerState};
