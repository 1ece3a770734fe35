//! # SNMP enrichment client
//!
//! A thin wrapper over an SNMP session that knows how to fetch the system
//! group, walk integer tables and assemble the interface table. Every call
//! opens its own session and drops it on return; nothing is pooled.
//!
//! The transport sits behind the [`Connector`]/[`SnmpSession`] pair so the
//! table logic can run against an in-memory agent (`memory`, built for tests
//! and with the `testing` feature) as well as a real agent through
//! [`session::Snmp2Connector`].

use std::collections::BTreeMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use fathom_common::config::SnmpConfig;
use fathom_protocols::snmp::{ObjectId, SnmpValue, VarBind};
use thiserror::Error;

mod interfaces;
#[cfg(any(test, feature = "testing"))]
pub mod memory;
pub mod session;
mod system;

pub use interfaces::{
    IF_ADMIN_STATUS, IF_ALIAS, IF_DESCR, IF_HIGH_SPEED, IF_MTU, IF_NAME, IF_OPER_STATUS,
    IF_PHYS_ADDRESS, IF_SPEED,
};
pub use session::{Connector, Snmp2Connector, SnmpSession};
pub use system::{SYS_CONTACT, SYS_DESCR, SYS_LOCATION, SYS_NAME, SYS_OBJECT_ID};

/// Error-status value an SNMPv1 agent returns past the end of its MIB.
pub const NO_SUCH_NAME: u32 = 2;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SnmpError {
    #[error("unsupported SNMP version '{0}' (expected 1 or 2c)")]
    UnsupportedVersion(String),
    #[error("no response within {0:?}")]
    Timeout(Duration),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("agent returned error status {status} at index {index}")]
    Agent { status: u32, index: u32 },
    #[error("cannot encode object identifier {0}")]
    InvalidOid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnmpVersion {
    V1,
    V2c,
}

impl FromStr for SnmpVersion {
    type Err = SnmpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "v1" => Ok(SnmpVersion::V1),
            "2c" | "v2c" => Ok(SnmpVersion::V2c),
            other => Err(SnmpError::UnsupportedVersion(other.to_string())),
        }
    }
}

/// Parameters handed to a [`Connector`] when a session is opened.
#[derive(Debug, Clone)]
pub struct SessionParams {
    pub target: SocketAddr,
    pub version: SnmpVersion,
    pub community: String,
    pub timeout: Duration,
}

pub struct SnmpClient {
    community: String,
    version: SnmpVersion,
    port: u16,
    timeout: Duration,
    max_repetitions: u32,
    connector: Arc<dyn Connector>,
}

impl SnmpClient {
    /// Builds a client that talks to real agents.
    ///
    /// Fails immediately on an unsupported version.
    pub fn new(cfg: &SnmpConfig) -> Result<Self, SnmpError> {
        Self::with_connector(cfg, Arc::new(Snmp2Connector))
    }

    pub fn with_connector(
        cfg: &SnmpConfig,
        connector: Arc<dyn Connector>,
    ) -> Result<Self, SnmpError> {
        Ok(Self {
            community: cfg.community.clone(),
            version: cfg.version.parse()?,
            port: cfg.port,
            timeout: cfg.timeout,
            max_repetitions: cfg.max_repetitions.max(1),
            connector,
        })
    }

    pub fn version(&self) -> SnmpVersion {
        self.version
    }

    async fn open(&self, target: IpAddr) -> Result<Box<dyn SnmpSession>, SnmpError> {
        let params = SessionParams {
            target: SocketAddr::new(target, self.port),
            version: self.version,
            community: self.community.clone(),
            timeout: self.timeout,
        };
        self.connector.connect(&params).await
    }

    /// One batched GET.
    pub async fn get(&self, target: IpAddr, oids: &[ObjectId]) -> Result<Vec<VarBind>, SnmpError> {
        let mut session = self.open(target).await?;
        session.get(oids).await
    }

    /// Walks the subtree under `base`.
    ///
    /// Uses GETBULK on v2c and GETNEXT on v1. The walk stops at the first
    /// OID outside the subtree, at end-of-MIB, or if the agent hands back an
    /// OID that does not advance.
    pub async fn walk(&self, target: IpAddr, base: &ObjectId) -> Result<Vec<VarBind>, SnmpError> {
        let mut session = self.open(target).await?;
        let mut rows: Vec<VarBind> = Vec::new();
        let mut cursor = base.clone();

        loop {
            let batch = match self.version {
                SnmpVersion::V2c => session.get_bulk(&cursor, self.max_repetitions).await,
                SnmpVersion::V1 => session.get_next(&cursor).await,
            };
            let batch = match batch {
                Ok(batch) => batch,
                Err(SnmpError::Agent { status: NO_SUCH_NAME, .. })
                    if self.version == SnmpVersion::V1 =>
                {
                    break;
                }
                Err(err) => return Err(err),
            };
            if batch.is_empty() {
                break;
            }

            let mut finished = false;
            for varbind in batch {
                if varbind.value.is_exception()
                    || !varbind.oid.is_under(base)
                    || varbind.oid <= cursor
                {
                    finished = true;
                    break;
                }
                cursor = varbind.oid.clone();
                rows.push(varbind);
            }
            if finished {
                break;
            }
        }

        Ok(rows)
    }

    /// Walks a column and keys it by the last arc of each OID.
    pub async fn walk_column(
        &self,
        target: IpAddr,
        base: &ObjectId,
    ) -> Result<BTreeMap<u32, SnmpValue>, SnmpError> {
        let rows = self.walk(target, base).await?;
        Ok(rows
            .into_iter()
            .filter_map(|vb| Some((vb.oid.last_index()?, vb.value)))
            .collect())
    }

    /// Walks an integer column: `row index -> value`. Rows whose value is
    /// not an integer-family encoding are left out.
    pub async fn walk_int_table(
        &self,
        target: IpAddr,
        base: &ObjectId,
    ) -> Result<BTreeMap<u32, i64>, SnmpError> {
        let column = self.walk_column(target, base).await?;
        Ok(column
            .into_iter()
            .filter_map(|(index, value)| Some((index, value.as_int()?)))
            .collect())
    }

    /// Walks a column of a table indexed by two trailing arcs.
    pub async fn walk_indexed(
        &self,
        target: IpAddr,
        base: &ObjectId,
    ) -> Result<BTreeMap<(u32, u32), SnmpValue>, SnmpError> {
        let rows = self.walk(target, base).await?;
        Ok(rows
            .into_iter()
            .filter_map(|vb| Some((vb.oid.last_two_indices()?, vb.value)))
            .collect())
    }
}

/// Builds an [`ObjectId`] from a constant arc list.
pub(crate) fn oid(arcs: &[u64]) -> ObjectId {
    ObjectId::from(arcs)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
