//! Discovery run records.
//!
//! A run moves `queued -> running -> {succeeded, failed}` and never goes
//! back. Scope and stats are opaque JSON owned by whoever created the run;
//! [`RunScope`] and [`RunStats`] are the shapes fathom itself reads and
//! writes.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::Running => "running",
            RunStatus::Succeeded => "succeeded",
            RunStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Succeeded | RunStatus::Failed)
    }

    /// Whether the state machine allows moving from `self` to `next`.
    pub fn can_transition_to(&self, next: RunStatus) -> bool {
        matches!(
            (self, next),
            (RunStatus::Queued, RunStatus::Running)
                | (RunStatus::Running, RunStatus::Succeeded)
                | (RunStatus::Running, RunStatus::Failed)
        )
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown run status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for RunStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(RunStatus::Queued),
            "running" => Ok(RunStatus::Running),
            "succeeded" => Ok(RunStatus::Succeeded),
            "failed" => Ok(RunStatus::Failed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryRun {
    pub id: i64,
    pub status: RunStatus,
    pub scope: Value,
    pub stats: Value,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown log level: {0}")]
pub struct UnknownLevel(pub String);

impl FromStr for LogLevel {
    type Err = UnknownLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(UnknownLevel(other.to_string())),
        }
    }
}

/// An append-only operator line attached to a run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunLog {
    pub run_id: i64,
    pub level: LogLevel,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// What a run should look at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunScope {
    pub targets: Vec<IpAddr>,
    #[serde(default = "enabled")]
    pub resolve_names: bool,
    #[serde(default = "enabled")]
    pub snmp: bool,
    #[serde(default)]
    pub vlans: bool,
    #[serde(default)]
    pub neighbors: bool,
}

fn enabled() -> bool {
    true
}

impl RunScope {
    pub fn new(targets: Vec<IpAddr>) -> Self {
        Self {
            targets,
            resolve_names: true,
            snmp: true,
            vlans: false,
            neighbors: false,
        }
    }
}

/// Counters a run reports when it finishes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub targets: usize,
    pub names_resolved: usize,
    pub snmp_responders: usize,
    pub interfaces: usize,
    pub vlan_mappings: usize,
    pub neighbors: usize,
    pub errors: usize,
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
