use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use colored::*;
use fathom_common::config::Config;
use fathom_common::models::{LogLevel, RunScope, RunStatus};
use fathom_common::{info, success, warn};
use fathom_core::resolver::NameResolver;
use fathom_core::scheduler::{Executor, RunStore, SqliteRunStore, Worker};
use fathom_core::snmp::SnmpClient;
use tokio_util::sync::CancellationToken;

use crate::commands::RunCommands;
use crate::terminal::{colors, print};

pub async fn run(command: RunCommands, db: &Path, cfg: &Config) -> anyhow::Result<()> {
    let store = SqliteRunStore::open(db)
        .with_context(|| format!("could not open run database {}", db.display()))?;

    match command {
        RunCommands::Enqueue {
            targets,
            no_names,
            no_snmp,
            vlans,
            neighbors,
        } => {
            let scope = RunScope {
                resolve_names: !no_names,
                snmp: !no_snmp,
                vlans,
                neighbors,
                ..RunScope::new(targets)
            };
            let run = store.create(&serde_json::to_value(&scope)?)?;
            success!("queued run {} with {} targets", run.id, scope.targets.len());
            Ok(())
        }
        RunCommands::Worker {
            once,
            concurrency,
            poll,
            timeout,
        } => {
            let executor = Executor::new(NameResolver::from_config(cfg), SnmpClient::new(&cfg.snmp)?)
                .with_concurrency(concurrency);
            let mut worker = Worker::new(Arc::new(store), executor)
                .with_poll_interval(Duration::from_secs(poll));
            if let Some(secs) = timeout {
                worker = worker.with_run_timeout(Duration::from_secs(secs));
            }

            let cancel = CancellationToken::new();
            let on_signal = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("interrupt received, cancelling");
                    on_signal.cancel();
                }
            });

            if once {
                match worker.run_once(&cancel).await? {
                    Some(run) => info!("run {} finished as {}", run.id, run.status),
                    None => info!("no queued run"),
                }
            } else {
                worker.run_forever(&cancel).await;
            }
            Ok(())
        }
        RunCommands::Show { id } => show(&store, id, cfg),
    }
}

fn show(store: &SqliteRunStore, id: i64, cfg: &Config) -> anyhow::Result<()> {
    let run = store.get(id)?;
    let logs = store.logs(id)?;

    print::header(&format!("run {id}"), cfg.quiet);
    let status = match run.status {
        RunStatus::Succeeded => run.status.to_string().green(),
        RunStatus::Failed => run.status.to_string().red(),
        _ => run.status.to_string().yellow(),
    };
    let mut rows = vec![
        ("status", status),
        ("started", run.started_at.to_rfc3339().normal()),
    ];
    if let Some(completed) = run.completed_at {
        rows.push(("completed", completed.to_rfc3339().normal()));
    }
    if let Some(error) = &run.last_error {
        rows.push(("error", error.color(colors::REJECTED)));
    }
    rows.push(("scope", run.scope.to_string().normal()));
    rows.push(("stats", run.stats.to_string().normal()));
    print::key_values(&rows);

    if !logs.is_empty() {
        print::header("log", cfg.quiet);
        for line in logs {
            let level = match line.level {
                LogLevel::Error => line.level.to_string().red(),
                LogLevel::Warn => line.level.to_string().yellow(),
                _ => line.level.to_string().color(colors::MUTED),
            };
            print::print(&format!(
                "{} {} {:>5} {}",
                ">".color(colors::SEPARATOR),
                line.created_at.format("%H:%M:%S").to_string().color(colors::MUTED),
                level,
                line.message
            ));
        }
    }
    print::rule();
    Ok(())
}
