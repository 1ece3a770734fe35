//! SQLite-backed run store.
//!
//! Claims run inside `BEGIN IMMEDIATE`, which takes SQLite's single writer
//! lock up front. Two workers can never both see the same row as queued.
//! A claimer that cannot get the lock within [`CLAIM_WAIT`] skips the
//! round and reports nothing available; it polls again later.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use fathom_common::debug;
use fathom_common::models::{DiscoveryRun, LogLevel, RunLog, RunStatus};
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, TransactionBehavior, params};
use serde_json::Value;

use super::store::{RunStore, StoreError, merge_stats};

pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// How long a claim waits for another writer before giving up the round.
pub const CLAIM_WAIT: Duration = Duration::from_millis(250);

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS discovery_runs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        status TEXT NOT NULL,
        scope TEXT NOT NULL,
        stats TEXT NOT NULL DEFAULT '{}',
        started_at TEXT NOT NULL,
        completed_at TEXT,
        last_error TEXT
    );
    CREATE INDEX IF NOT EXISTS idx_runs_queue ON discovery_runs(status, started_at, id);
    CREATE TABLE IF NOT EXISTS discovery_run_logs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        run_id INTEGER NOT NULL REFERENCES discovery_runs(id),
        level TEXT NOT NULL,
        message TEXT NOT NULL,
        created_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_run_logs_run ON discovery_run_logs(run_id, id);
";

const RUN_COLUMNS: &str = "id, status, scope, stats, started_at, completed_at, last_error";

/// Run store on a single SQLite connection.
///
/// The connection sits behind a mutex since `rusqlite::Connection` is not
/// `Sync`. Several stores may open the same file; exclusivity between them
/// comes from SQLite's locking.
pub struct SqliteRunStore {
    conn: Mutex<Connection>,
}

impl SqliteRunStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::init(Connection::open(path)?)
    }

    /// A private in-memory database. Nothing else can claim from it.
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl RunStore for SqliteRunStore {
    fn create(&self, scope: &Value) -> Result<DiscoveryRun, StoreError> {
        let conn = self.lock()?;
        let row = conn.query_row(
            &format!(
                "INSERT INTO discovery_runs (status, scope, stats, started_at)
                 VALUES (?1, ?2, '{{}}', ?3)
                 RETURNING {RUN_COLUMNS}"
            ),
            params![RunStatus::Queued.as_str(), scope.to_string(), timestamp(Utc::now())],
            RawRun::from_row,
        )?;
        row.decode()
    }

    fn claim_next(&self, stats: Option<&Value>) -> Result<Option<DiscoveryRun>, StoreError> {
        let mut conn = self.lock()?;
        conn.busy_timeout(CLAIM_WAIT)?;
        let err = 'claim: {
            let tx = match conn.transaction_with_behavior(TransactionBehavior::Immediate) {
                Ok(tx) => tx,
                Err(err) => break 'claim err,
            };
            tx.busy_timeout(BUSY_TIMEOUT)?;

            let claimed = tx
                .query_row(
                    &format!(
                        "UPDATE discovery_runs
                     SET status = 'running', completed_at = NULL, last_error = NULL
                     WHERE id = (
                         SELECT id FROM discovery_runs
                         WHERE status = 'queued'
                         ORDER BY started_at, id
                         LIMIT 1
                     ) AND status = 'queued'
                     RETURNING {RUN_COLUMNS}"
                    ),
                    [],
                    RawRun::from_row,
                )
                .optional()?;

            let Some(raw) = claimed else {
                tx.commit()?;
                return Ok(None);
            };
            let mut run = raw.decode()?;

            if let Some(patch) = stats {
                merge_stats(&mut run.stats, patch);
                tx.execute(
                    "UPDATE discovery_runs SET stats = ?1 WHERE id = ?2",
                    params![run.stats.to_string(), run.id],
                )?;
            }

            tx.commit()?;
            return Ok(Some(run));
        };
        conn.busy_timeout(BUSY_TIMEOUT)?;
        if is_contended(&err) {
            debug!("run queue is locked by another writer, skipping claim");
            return Ok(None);
        }
        Err(err.into())
    }

    fn complete(
        &self,
        id: i64,
        status: RunStatus,
        stats: Option<&Value>,
        error: Option<&str>,
    ) -> Result<DiscoveryRun, StoreError> {
        if !status.is_terminal() {
            return Err(StoreError::InvalidTransition(status));
        }

        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut run = load(&tx, id)?;
        if !run.status.can_transition_to(status) {
            return Err(StoreError::NotRunning {
                id,
                status: run.status,
            });
        }

        if let Some(patch) = stats {
            merge_stats(&mut run.stats, patch);
        }
        tx.execute(
            "UPDATE discovery_runs
             SET status = ?1, stats = ?2, completed_at = ?3, last_error = ?4
             WHERE id = ?5 AND status = 'running'",
            params![
                status.as_str(),
                run.stats.to_string(),
                timestamp(Utc::now()),
                error,
                id
            ],
        )?;
        let done = load(&tx, id)?;
        tx.commit()?;
        Ok(done)
    }

    fn append_log(&self, id: i64, level: LogLevel, message: &str) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO discovery_run_logs (run_id, level, message, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![id, level.as_str(), message, timestamp(Utc::now())],
        )?;
        Ok(())
    }

    fn get(&self, id: i64) -> Result<DiscoveryRun, StoreError> {
        let conn = self.lock()?;
        load(&conn, id)
    }

    fn logs(&self, id: i64) -> Result<Vec<RunLog>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT run_id, level, message, created_at
             FROM discovery_run_logs
             WHERE run_id = ?1
             ORDER BY id",
        )?;
        let rows = stmt
            .query_map([id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(run_id, level, message, created_at)| {
                Ok(RunLog {
                    run_id,
                    level: level.parse().map_err(|e| StoreError::Decode(format!("{e}")))?,
                    message,
                    created_at: parse_timestamp(&created_at)?,
                })
            })
            .collect()
    }
}

fn load(conn: &Connection, id: i64) -> Result<DiscoveryRun, StoreError> {
    conn.query_row(
        &format!("SELECT {RUN_COLUMNS} FROM discovery_runs WHERE id = ?1"),
        [id],
        RawRun::from_row,
    )
    .optional()?
    .ok_or(StoreError::NotFound(id))?
    .decode()
}

/// A run row as SQLite hands it back, before any parsing.
struct RawRun {
    id: i64,
    status: String,
    scope: String,
    stats: String,
    started_at: String,
    completed_at: Option<String>,
    last_error: Option<String>,
}

impl RawRun {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            status: row.get(1)?,
            scope: row.get(2)?,
            stats: row.get(3)?,
            started_at: row.get(4)?,
            completed_at: row.get(5)?,
            last_error: row.get(6)?,
        })
    }

    fn decode(self) -> Result<DiscoveryRun, StoreError> {
        let json = |text: &str| {
            serde_json::from_str::<Value>(text)
                .map_err(|e| StoreError::Decode(format!("run {}: {e}", self.id)))
        };
        Ok(DiscoveryRun {
            id: self.id,
            status: self
                .status
                .parse()
                .map_err(|e| StoreError::Decode(format!("run {}: {e}", self.id)))?,
            scope: json(&self.scope)?,
            stats: json(&self.stats)?,
            started_at: parse_timestamp(&self.started_at)?,
            completed_at: self.completed_at.as_deref().map(parse_timestamp).transpose()?,
            last_error: self.last_error.clone(),
        })
    }
}

/// Fixed-width UTC timestamps sort the same as text and as time.
fn is_contended(err: &rusqlite::Error) -> bool {
    matches!(
        err.sqlite_error_code(),
        Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    )
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(text)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| StoreError::Decode(format!("timestamp '{text}': {e}")))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
