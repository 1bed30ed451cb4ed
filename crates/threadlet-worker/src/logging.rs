use std::sync::OnceLock;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::LocalTime;

/// Installs the global `tracing` subscriber once per process.
///
/// `RUST_LOG` wins when set; otherwise debug builds log the threadlet crates
/// at `debug` and release builds log at `info`.
pub fn init_tracing() {
    static INIT: OnceLock<()> = OnceLock::new();
    INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            if cfg!(debug_assertions) {
                EnvFilter::new("warn,threadlet_runtime=debug,threadlet_worker=debug")
            } else {
                EnvFilter::new("info")
            }
        });
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_timer(LocalTime::rfc_3339())
            .with_target(true)
            .with_thread_names(true)
            .with_thread_ids(true)
            .try_init();
    });
}
