use std::num::NonZeroUsize;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Worker threads are named `{thread_name_prefix}-{id}`.
    pub thread_name_prefix: String,
    pub thread_stack_size: Option<usize>,
    pub pool_size: usize,
    /// Replace a worker once it reports an initialization failure.
    pub respawn_on_failure: bool,
    /// Respawns allowed over the lifetime of a pool.
    pub max_respawns: u32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            thread_name_prefix: "threadlet-worker".to_string(),
            thread_stack_size: None,
            pool_size: std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(4),
            respawn_on_failure: true,
            max_respawns: 8,
        }
    }
}

impl WorkerConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::IoAt {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ConfigError::JsonAt {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn thread_name(&self, worker: threadlet_runtime::WorkerId) -> String {
        format!("{}-{}", self.thread_name_prefix, worker.0)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use threadlet_runtime::WorkerId;

    use super::WorkerConfig;
    use crate::error::ConfigError;

    fn temp_config_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("threadlet-{}-{name}.json", std::process::id()))
    }

    #[test]
    fn default_config_is_usable() {
        let config = WorkerConfig::default();
        assert!(config.pool_size >= 1);
        assert!(config.respawn_on_failure);
        assert_eq!(config.thread_name(WorkerId(3)), "threadlet-worker-3");
    }

    #[test]
    fn load_fills_missing_fields_with_defaults() {
        let path = temp_config_path("partial");
        std::fs::write(&path, r#"{ "pool_size": 2, "thread_name_prefix": "engine" }"#)
            .expect("write config");
        let config = WorkerConfig::load(&path).expect("load config");
        let _ = std::fs::remove_file(&path);

        assert_eq!(config.pool_size, 2);
        assert_eq!(config.thread_name_prefix, "engine");
        assert_eq!(config.max_respawns, WorkerConfig::default().max_respawns);
        assert_eq!(config.thread_stack_size, None);
    }

    #[test]
    fn load_reports_the_offending_path() {
        let path = temp_config_path("broken");
        std::fs::write(&path, "{ not json").expect("write config");
        let err = WorkerConfig::load(&path).expect_err("invalid json");
        let _ = std::fs::remove_file(&path);
        assert!(matches!(err, ConfigError::JsonAt { path: ref p, .. } if *p == path));

        let missing = temp_config_path("missing");
        let err = WorkerConfig::load(&missing).expect_err("missing file");
        assert!(matches!(err, ConfigError::IoAt { .. }));
    }
}
