use std::sync::Arc;
use std::time::Duration;

use fathom_common::models::{DiscoveryRun, LogLevel, RunScope, RunStatus};
use fathom_common::{debug, error, info, success, warn};
use serde_json::{Value, json};
use tokio::time::{Instant, sleep, sleep_until};
use tokio_util::sync::CancellationToken;

use super::executor::{Executor, summarize};
use super::store::{RunStore, StoreError};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Claims queued runs from a [`RunStore`] and executes them.
///
/// Any number of workers, in this process or others, may share one store.
pub struct Worker {
    id: String,
    store: Arc<dyn RunStore>,
    executor: Executor,
    poll_interval: Duration,
    run_timeout: Option<Duration>,
}

impl Worker {
    pub fn new(store: Arc<dyn RunStore>, executor: Executor) -> Self {
        Self {
            id: format!("worker-{}", std::process::id()),
            store,
            executor,
            poll_interval: DEFAULT_POLL_INTERVAL,
            run_timeout: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Fails any run still executing after `timeout`.
    pub fn with_run_timeout(mut self, timeout: Duration) -> Self {
        self.run_timeout = Some(timeout);
        self
    }

    /// Claims and executes at most one run.
    ///
    /// Returns the finished run, or `None` when nothing was queued or `cancel`
    /// had already fired, in which case nothing is claimed. A claimed
    /// run is always completed: `succeeded` with stats when the targets were
    /// inspected (whatever their individual failures), `failed` on
    /// cancellation, deadline or an unreadable scope.
    pub async fn run_once(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Option<DiscoveryRun>, StoreError> {
        if cancel.is_cancelled() {
            debug!("{} is stopping, not claiming", self.id);
            return Ok(None);
        }

        let claim = json!({ "worker": self.id });
        let Some(run) = self
            .with_store(move |store| store.claim_next(Some(&claim)))
            .await?
        else {
            debug!("{} found no queued run", self.id);
            return Ok(None);
        };

        info!("{} claimed run {}", self.id, run.id);
        self.log(run.id, LogLevel::Info, format!("claimed by {}", self.id)).await;

        let scope: RunScope = match serde_json::from_value(run.scope.clone()) {
            Ok(scope) => scope,
            Err(err) => {
                let reason = format!("invalid scope: {err}");
                self.log(run.id, LogLevel::Error, reason.clone()).await;
                return self.finish(run.id, RunStatus::Failed, None, Some(reason)).await.map(Some);
            }
        };

        let deadline = self.run_timeout.map(|timeout| Instant::now() + timeout);
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err("cancelled"),
            _ = expires(deadline) => Err("deadline exceeded"),
            facts = self.executor.execute(&scope, deadline) => Ok(facts),
        };

        match outcome {
            Ok(facts) => {
                for device in &facts {
                    self.log(run.id, LogLevel::Info, device.summary()).await;
                    for failure in &device.errors {
                        let line = format!("{}: {failure}", device.address);
                        self.log(run.id, LogLevel::Warn, line).await;
                    }
                }
                let stats = serde_json::to_value(summarize(&facts))
                    .map_err(|e| StoreError::Decode(e.to_string()))?;
                success!("run {} finished with {} targets", run.id, facts.len());
                self.finish(run.id, RunStatus::Succeeded, Some(stats), None).await.map(Some)
            }
            Err(reason) => {
                warn!("run {} aborted: {reason}", run.id);
                self.log(run.id, LogLevel::Error, reason.to_string()).await;
                self.finish(run.id, RunStatus::Failed, None, Some(reason.to_string()))
                    .await
                    .map(Some)
            }
        }
    }

    /// Polls until `cancel` fires. Store failures are logged and retried
    /// after the poll interval.
    pub async fn run_forever(&self, cancel: &CancellationToken) {
        while !cancel.is_cancelled() {
            let idle = match self.run_once(cancel).await {
                Ok(Some(_)) => false,
                Ok(None) => true,
                Err(err) => {
                    error!("{} could not process a run: {err}", self.id);
                    true
                }
            };
            if idle {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = sleep(self.poll_interval) => {}
                }
            }
        }
        info!("{} stopped", self.id);
    }

    async fn finish(
        &self,
        id: i64,
        status: RunStatus,
        stats: Option<Value>,
        error: Option<String>,
    ) -> Result<DiscoveryRun, StoreError> {
        self.with_store(move |store| store.complete(id, status, stats.as_ref(), error.as_deref()))
            .await
    }

    /// Run-log writes are best-effort.
    async fn log(&self, id: i64, level: LogLevel, message: String) {
        let written = self
            .with_store(move |store| store.append_log(id, level, &message))
            .await;
        if let Err(err) = written {
            warn!("could not write log for run {id}: {err}");
        }
    }

    async fn with_store<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn RunStore) -> Result<T, StoreError> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || op(store.as_ref()))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

async fn expires(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::NameResolver;
    use crate::scheduler::SqliteRunStore;
    use crate::snmp::memory::MemoryAgent;
    use crate::snmp::{IF_NAME, SYS_NAME, SnmpClient, oid};
    use fathom_common::config::{Config, SnmpConfig};
    use fathom_common::models::RunStats;
    use fathom_protocols::snmp::SnmpValue;
    use std::net::{IpAddr, Ipv4Addr};

    const SWITCH: IpAddr = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2));

    fn offline_resolver() -> NameResolver {
        NameResolver::from_config(&Config {
            no_dns: true,
            no_mdns: true,
            no_netbios: true,
            ..Default::default()
        })
    }

    fn worker(agent: MemoryAgent) -> (Arc<SqliteRunStore>, Worker) {
        let store = Arc::new(SqliteRunStore::in_memory().unwrap());
        let snmp = SnmpClient::with_connector(&SnmpConfig::default(), Arc::new(agent)).unwrap();
        let executor = Executor::new(offline_resolver(), snmp);
        let worker = Worker::new(store.clone(), executor).with_id("test-worker");
        (store, worker)
    }

    fn switch_agent() -> MemoryAgent {
        MemoryAgent::new()
            .with(oid(SYS_NAME), SnmpValue::OctetString(b"core-switch-1".to_vec()))
            .with(oid(IF_NAME).child(1), SnmpValue::OctetString(b"Gi1/0/1".to_vec()))
            .with(oid(IF_NAME).child(2), SnmpValue::OctetString(b"Gi1/0/2".to_vec()))
    }

    fn enqueue(store: &SqliteRunStore, targets: Vec<IpAddr>) -> DiscoveryRun {
        let scope = serde_json::to_value(RunScope::new(targets)).unwrap();
        store.create(&scope).unwrap()
    }

    #[tokio::test]
    async fn idle_worker_returns_none() {
        let (_, worker) = worker(MemoryAgent::new());
        let cancel = CancellationToken::new();
        assert!(worker.run_once(&cancel).await.unwrap().is_none());
        assert!(worker.run_once(&cancel).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn run_succeeds_and_records_stats() {
        let (store, worker) = worker(switch_agent());
        let queued = enqueue(&store, vec![SWITCH]);

        let done = worker
            .run_once(&CancellationToken::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(done.id, queued.id);
        assert_eq!(done.status, RunStatus::Succeeded);
        assert_eq!(done.last_error, None);

        let stats: RunStats = serde_json::from_value(done.stats.clone()).unwrap();
        assert_eq!(stats.targets, 1);
        assert_eq!(stats.snmp_responders, 1);
        assert_eq!(stats.names_resolved, 1);
        assert_eq!(stats.interfaces, 2);
        assert_eq!(stats.errors, 0);
        assert_eq!(done.stats["worker"], "test-worker");

        let logs = store.logs(done.id).unwrap();
        assert_eq!(logs[0].message, "claimed by test-worker");
        assert!(logs.iter().any(|l| l.message.contains("name=core-switch-1")));
    }

    #[tokio::test]
    async fn silent_targets_still_complete_the_run() {
        let agent = MemoryAgent::new().failing(oid(&[1, 3, 6, 1, 2, 1]));
        let (store, worker) = worker(agent);
        let other = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 3));
        enqueue(&store, vec![SWITCH, other]);

        let done = worker
            .run_once(&CancellationToken::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(done.status, RunStatus::Succeeded);

        let stats: RunStats = serde_json::from_value(done.stats).unwrap();
        assert_eq!(stats.targets, 2);
        assert_eq!(stats.snmp_responders, 0);
        assert_eq!(stats.errors, 4);

        let warnings = store
            .logs(done.id)
            .unwrap()
            .into_iter()
            .filter(|l| l.level == LogLevel::Warn)
            .count();
        assert_eq!(warnings, 4);
    }

    #[tokio::test]
    async fn cancellation_fails_the_run_in_flight() {
        let agent = switch_agent().stalled(oid(&[1, 3, 6, 1, 2, 1]));
        let (store, worker) = worker(agent);
        let queued = enqueue(&store, vec![SWITCH]);

        let cancel = CancellationToken::new();
        let stopper = cancel.clone();
        let watched = store.clone();
        tokio::spawn(async move {
            while !watched
                .get(queued.id)
                .is_ok_and(|run| run.status == RunStatus::Running)
            {
                sleep(Duration::from_millis(5)).await;
            }
            stopper.cancel();
        });

        let done = tokio::time::timeout(Duration::from_secs(5), worker.run_once(&cancel))
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(done.id, queued.id);
        assert_eq!(done.status, RunStatus::Failed);
        assert_eq!(done.last_error.as_deref(), Some("cancelled"));
        assert!(done.completed_at.is_some());
        assert_eq!(done.stats["worker"], "test-worker");
    }

    #[tokio::test]
    async fn stopped_worker_leaves_queued_runs_alone() {
        let (store, worker) = worker(switch_agent());
        let queued = enqueue(&store, vec![SWITCH]);

        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(worker.run_once(&cancel).await.unwrap().is_none());

        let untouched = store.get(queued.id).unwrap();
        assert_eq!(untouched.status, RunStatus::Queued);
        assert_eq!(untouched.last_error, None);
        assert!(store.logs(queued.id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn expired_deadline_fails_the_run() {
        let (store, worker) = worker(switch_agent());
        let worker = worker.with_run_timeout(Duration::ZERO);
        enqueue(&store, vec![SWITCH]);

        let done = worker
            .run_once(&CancellationToken::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(done.status, RunStatus::Failed);
        assert_eq!(done.last_error.as_deref(), Some("deadline exceeded"));
    }

    #[tokio::test]
    async fn unreadable_scope_fails_the_run() {
        let (store, worker) = worker(switch_agent());
        store.create(&json!({ "targets": "everything" })).unwrap();

        let done = worker
            .run_once(&CancellationToken::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(done.status, RunStatus::Failed);
        assert!(done.last_error.unwrap().starts_with("invalid scope"));
    }

    #[tokio::test]
    async fn run_forever_drains_the_queue_and_stops_on_cancel() {
        let (store, worker) = worker(switch_agent());
        let worker = worker.with_poll_interval(Duration::from_millis(10));
        let first = enqueue(&store, vec![SWITCH]);
        let second = enqueue(&store, vec![SWITCH]);

        let cancel = CancellationToken::new();
        let stopper = cancel.clone();
        let watched = store.clone();
        tokio::spawn(async move {
            loop {
                let finished = [first.id, second.id]
                    .iter()
                    .all(|id| watched.get(*id).is_ok_and(|run| run.status.is_terminal()));
                if finished {
                    stopper.cancel();
                    break;
                }
                sleep(Duration::from_millis(5)).await;
            }
        });

        tokio::time::timeout(Duration::from_secs(5), worker.run_forever(&cancel))
            .await
            .unwrap();
        assert_eq!(store.get(first.id).unwrap().status, RunStatus::Succeeded);
        assert_eq!(store.get(second.id).unwrap().status, RunStatus::Succeeded);
    }
}
