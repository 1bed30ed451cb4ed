#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use threadlet_worker::{EntryPointTable, InvokeError, LoadError, ModuleLoader, WorkerId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub worker: WorkerId,
    pub module: String,
    pub memory: String,
}

impl Payload {
    pub fn good(worker: WorkerId) -> Self {
        Self {
            worker,
            module: "m1".to_string(),
            memory: "mem1".to_string(),
        }
    }

    pub fn bad(worker: WorkerId) -> Self {
        Self {
            worker,
            module: "bad".to_string(),
            memory: "mem1".to_string(),
        }
    }
}

pub struct Exports {
    worker: WorkerId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub worker: WorkerId,
    pub function: String,
    pub thread: Option<String>,
}

/// Loader that takes a few milliseconds, so requests posted right after the
/// init payload queue up behind it.
#[derive(Default)]
pub struct SlowLoader {
    pub loads: Arc<Mutex<Vec<Payload>>>,
}

#[async_trait(?Send)]
impl ModuleLoader for SlowLoader {
    type Payload = Payload;
    type Exports = Exports;

    async fn initialize(&self, payload: Payload) -> Result<Exports, LoadError> {
        self.loads.lock().expect("loads lock").push(payload.clone());
        tokio::time::sleep(Duration::from_millis(10)).await;
        if payload.module != "m1" {
            return Err(LoadError::invalid_module("bad module"));
        }
        Ok(Exports {
            worker: payload.worker,
        })
    }
}

#[derive(Default)]
pub struct RecordingTable {
    pub calls: Arc<Mutex<Vec<Call>>>,
}

#[async_trait(?Send)]
impl EntryPointTable for RecordingTable {
    type Exports = Exports;
    type Request = String;

    async fn invoke(&self, exports: &Exports, request: String) -> Result<(), InvokeError> {
        self.calls.lock().expect("calls lock").push(Call {
            worker: exports.worker,
            function: request,
            thread: std::thread::current().name().map(str::to_string),
        });
        Ok(())
    }
}

pub fn functions(calls: &[Call]) -> Vec<&str> {
    calls.iter().map(|call| call.function.as_str()).collect()
}
