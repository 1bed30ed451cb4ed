use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkerState {
    #[default]
    Uninitialized,
    Initializing,
    Ready,
    Failed,
}

impl WorkerState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inbound message posted by the coordinator to a worker.
///
/// The first message a worker receives must be `Init`; every later message
/// is expected to be `Invoke`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerMessage<P, R> {
    Init(P),
    Invoke(R),
}

impl<P, R> WorkerMessage<P, R> {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Init(_) => "init",
            Self::Invoke(_) => "invoke",
        }
    }
}
