use std::collections::BTreeSet;
use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;
use std::sync::{Arc, Barrier};
use std::thread;

use fathom_common::config::{Config, SnmpConfig};
use fathom_common::models::{RunScope, RunStats, RunStatus};
use fathom_core::resolver::NameResolver;
use fathom_core::scheduler::{Executor, RunStore, SqliteRunStore, Worker};
use fathom_core::snmp::memory::MemoryAgent;
use fathom_core::snmp::{SnmpClient, IF_NAME, SYS_NAME};
use fathom_protocols::snmp::{ObjectId, SnmpValue};
use serde_json::json;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

const CLAIMERS: usize = 8;

fn shared_db() -> (TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("runs.db");
    SqliteRunStore::open(&path).unwrap();
    (dir, path)
}

/// Every claimer opens its own connection and claims once, all at the same time.
fn claim_concurrently(path: &Path, claimers: usize) -> Vec<Option<i64>> {
    let barrier = Arc::new(Barrier::new(claimers));
    let handles: Vec<_> = (0..claimers)
        .map(|_| {
            let barrier = Arc::clone(&barrier);
            let path = path.to_path_buf();
            thread::spawn(move || {
                let store = SqliteRunStore::open(&path).unwrap();
                barrier.wait();
                store.claim_next(None).unwrap().map(|run| run.id)
            })
        })
        .collect();
    handles.into_iter().map(|h| h.join().unwrap()).collect()
}

#[test]
fn one_queued_run_is_claimed_exactly_once() {
    let (_dir, path) = shared_db();
    let run = SqliteRunStore::open(&path)
        .unwrap()
        .create(&json!({ "targets": [] }))
        .unwrap();

    let claims = claim_concurrently(&path, CLAIMERS);

    let winners: Vec<i64> = claims.iter().flatten().copied().collect();
    assert_eq!(winners, vec![run.id]);
    assert_eq!(claims.iter().filter(|c| c.is_none()).count(), CLAIMERS - 1);

    let stored = SqliteRunStore::open(&path).unwrap().get(run.id).unwrap();
    assert_eq!(stored.status, RunStatus::Running);
}

#[test]
fn many_queued_runs_are_spread_without_duplicates() {
    let (_dir, path) = shared_db();
    let store = SqliteRunStore::open(&path).unwrap();
    let queued: BTreeSet<i64> = (0..5)
        .map(|_| store.create(&json!({ "targets": [] })).unwrap().id)
        .collect();

    let claims = claim_concurrently(&path, CLAIMERS);

    let mut claimed: Vec<i64> = claims.iter().flatten().copied().collect();
    assert!(!claimed.is_empty());
    // A claimer that lost the lock skipped its round; sweep up what is left.
    while let Some(run) = store.claim_next(None).unwrap() {
        claimed.push(run.id);
    }
    let unique: BTreeSet<i64> = claimed.iter().copied().collect();
    assert_eq!(claimed.len(), unique.len());
    assert_eq!(unique, queued);
}

#[test]
fn empty_queue_claims_nothing_twice() {
    let (_dir, path) = shared_db();
    let store = SqliteRunStore::open(&path).unwrap();
    assert!(store.claim_next(None).unwrap().is_none());
    assert!(store.claim_next(None).unwrap().is_none());
    assert!(store.get(1).is_err());
}

fn switch_agent() -> MemoryAgent {
    let oid = |arcs: &[u64]| ObjectId::from(arcs);
    MemoryAgent::new()
        .with(oid(SYS_NAME), SnmpValue::OctetString(b"access-sw-7".to_vec()))
        .with(oid(IF_NAME).child(1), SnmpValue::OctetString(b"ge-0/0/1".to_vec()))
}

fn worker(path: &Path, id: &str, agent: &MemoryAgent) -> Worker {
    let store = Arc::new(SqliteRunStore::open(path).unwrap());
    let resolver = NameResolver::from_config(&Config {
        no_dns: true,
        no_mdns: true,
        no_netbios: true,
        ..Default::default()
    });
    let snmp = SnmpClient::with_connector(&SnmpConfig::default(), Arc::new(agent.clone())).unwrap();
    Worker::new(store, Executor::new(resolver, snmp)).with_id(id)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn competing_workers_each_finish_a_different_run() {
    let (_dir, path) = shared_db();
    let store = SqliteRunStore::open(&path).unwrap();
    let target = IpAddr::V4(Ipv4Addr::new(192, 0, 2, 7));
    for _ in 0..2 {
        let scope = serde_json::to_value(RunScope::new(vec![target])).unwrap();
        store.create(&scope).unwrap();
    }

    let agent = switch_agent();
    let first = worker(&path, "w1", &agent);
    let second = worker(&path, "w2", &agent);
    let cancel = CancellationToken::new();

    let (a, b) = tokio::join!(first.run_once(&cancel), second.run_once(&cancel));
    let a = a.unwrap().unwrap();
    let b = b.unwrap().unwrap();

    assert_ne!(a.id, b.id);
    for run in [&a, &b] {
        assert_eq!(run.status, RunStatus::Succeeded);
        let stats: RunStats = serde_json::from_value(run.stats.clone()).unwrap();
        assert_eq!(stats.names_resolved, 1);
        assert_eq!(stats.interfaces, 1);
    }
    assert_eq!(a.stats["worker"], "w1");
    assert_eq!(b.stats["worker"], "w2");
    assert!(store.claim_next(None).unwrap().is_none());
}
