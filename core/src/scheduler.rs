//! # Discovery run scheduler
//!
//! Runs move `queued -> running -> {succeeded, failed}`. The only way into
//! `running` is [`RunStore::claim_next`], which the backing store makes
//! atomic, so no in-process locking is needed between workers.

mod executor;
mod sqlite;
mod store;
mod worker;

pub use executor::{DEFAULT_CONCURRENCY, DeviceFacts, Executor, summarize};
pub use sqlite::{BUSY_TIMEOUT, CLAIM_WAIT, SqliteRunStore};
pub use store::{RunStore, StoreError, merge_stats};
pub use worker::{DEFAULT_POLL_INTERVAL, Worker};
