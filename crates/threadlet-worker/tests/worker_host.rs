mod common;

use std::sync::Arc;

use common::{Payload, RecordingTable, SlowLoader, functions};
use threadlet_worker::logging::init_tracing;
use threadlet_worker::{LoadError, WorkerConfig, WorkerId, WorkerMessage, spawn_worker};

#[test]
fn worker_serves_requests_queued_behind_its_init_payload() -> anyhow::Result<()> {
    init_tracing();
    let loader = SlowLoader::default();
    let table = RecordingTable::default();
    let loads = Arc::clone(&loader.loads);
    let calls = Arc::clone(&table.calls);
    let (errors_tx, mut errors) = threadlet_runtime::uncaught::channel();
    let config = WorkerConfig {
        thread_name_prefix: "host-test".to_string(),
        ..WorkerConfig::default()
    };

    let worker = spawn_worker(WorkerId(4), &config, loader, table, errors_tx)?;
    assert_eq!(worker.id(), WorkerId(4));
    worker.init(Payload::good(WorkerId(4)))?;
    for function in ["a", "b", "c"] {
        worker.invoke(function.to_string())?;
    }
    worker.post(WorkerMessage::Invoke("d".to_string()))?;
    worker.shutdown()?;

    let calls = calls.lock().expect("calls lock");
    assert_eq!(functions(&calls), vec!["a", "b", "c", "d"]);
    assert!(calls.iter().all(|call| call.worker == WorkerId(4)));
    assert!(
        calls
            .iter()
            .all(|call| call.thread.as_deref() == Some("host-test-4"))
    );
    assert_eq!(loads.lock().expect("loads lock").len(), 1);
    assert!(errors.try_recv().is_none());
    Ok(())
}

#[test]
fn failed_load_is_reported_once_and_serves_nothing() -> anyhow::Result<()> {
    let loader = SlowLoader::default();
    let table = RecordingTable::default();
    let calls = Arc::clone(&table.calls);
    let (errors_tx, mut errors) = threadlet_runtime::uncaught::channel();

    let worker = spawn_worker(WorkerId(2), &WorkerConfig::default(), loader, table, errors_tx)?;
    worker.init(Payload::bad(WorkerId(2)))?;
    worker.invoke("f".to_string())?;
    worker.invoke("g".to_string())?;
    worker.shutdown()?;

    let failure = errors.try_recv().expect("load failure reported");
    assert_eq!(failure.worker, WorkerId(2));
    assert_eq!(failure.error, LoadError::invalid_module("bad module"));
    assert!(errors.try_recv().is_none());
    assert!(calls.lock().expect("calls lock").is_empty());
    Ok(())
}

#[test]
fn init_only_worker_loads_once_and_stays_quiet() -> anyhow::Result<()> {
    let loader = SlowLoader::default();
    let loads = Arc::clone(&loader.loads);
    let table = RecordingTable::default();
    let calls = Arc::clone(&table.calls);
    let (errors_tx, mut errors) = threadlet_runtime::uncaught::channel();

    let worker = spawn_worker(WorkerId(0), &WorkerConfig::default(), loader, table, errors_tx)?;
    assert!(!worker.is_closed());
    worker.init(Payload::good(WorkerId(0)))?;
    worker.shutdown()?;

    assert_eq!(*loads.lock().expect("loads lock"), vec![Payload::good(WorkerId(0))]);
    assert!(calls.lock().expect("calls lock").is_empty());
    assert!(errors.try_recv().is_none());
    Ok(())
}

#[test]
fn request_before_init_is_dropped_without_blocking_the_worker() -> anyhow::Result<()> {
    let table = RecordingTable::default();
    let calls = Arc::clone(&table.calls);
    let (errors_tx, mut errors) = threadlet_runtime::uncaught::channel();

    let worker = spawn_worker(
        WorkerId(1),
        &WorkerConfig::default(),
        SlowLoader::default(),
        table,
        errors_tx,
    )?;
    worker.invoke("early".to_string())?;
    worker.init(Payload::good(WorkerId(1)))?;
    worker.invoke("late".to_string())?;
    worker.shutdown()?;

    assert_eq!(functions(&calls.lock().expect("calls lock")), vec!["late"]);
    assert!(errors.try_recv().is_none());
    Ok(())
}
