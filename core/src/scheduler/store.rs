use fathom_common::models::{DiscoveryRun, LogLevel, RunLog, RunStatus};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("corrupt run record: {0}")]
    Decode(String),
    #[error("run {0} does not exist")]
    NotFound(i64),
    #[error("run {id} is {status}, not running")]
    NotRunning { id: i64, status: RunStatus },
    #[error("{0} is not a terminal status")]
    InvalidTransition(RunStatus),
    #[error("store lock poisoned")]
    Poisoned,
    #[error("store task failed: {0}")]
    Task(String),
}

/// Persistence for discovery runs and their logs.
///
/// Implementations must make [`claim_next`](RunStore::claim_next) atomic
/// across every process sharing the backing store.
pub trait RunStore: Send + Sync {
    /// Inserts a new run in `queued`.
    fn create(&self, scope: &Value) -> Result<DiscoveryRun, StoreError>;

    /// Moves the oldest queued run to `running` and returns it, or `None`
    /// when nothing is queued. `stats` is merged into the run's stats.
    fn claim_next(&self, stats: Option<&Value>) -> Result<Option<DiscoveryRun>, StoreError>;

    /// Finishes a running run.
    fn complete(
        &self,
        id: i64,
        status: RunStatus,
        stats: Option<&Value>,
        error: Option<&str>,
    ) -> Result<DiscoveryRun, StoreError>;

    fn append_log(&self, id: i64, level: LogLevel, message: &str) -> Result<(), StoreError>;

    fn get(&self, id: i64) -> Result<DiscoveryRun, StoreError>;

    fn logs(&self, id: i64) -> Result<Vec<RunLog>, StoreError>;
}

/// Shallow merge: top-level keys of `patch` replace those in `base`.
/// A non-object `base` is replaced outright.
pub fn merge_stats(base: &mut Value, patch: &Value) {
    match (base.as_object_mut(), patch.as_object()) {
        (Some(base), Some(patch)) => {
            for (key, value) in patch {
                base.insert(key.clone(), value.clone());
            }
        }
        _ => *base = patch.clone(),
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
