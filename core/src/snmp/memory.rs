//! An in-memory SNMP agent.
//!
//! Serves a fixed MIB view from a sorted map, which makes table walks and
//! partial failures reproducible without a device on the network. Sessions
//! opened as SNMPv1 answer a GET for a missing object with noSuchName, like
//! a real v1 agent; v2c sessions return a `NoSuchObject` value instead.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use fathom_protocols::snmp::{ObjectId, SnmpValue, VarBind};

use super::session::{Connector, SnmpSession};
use super::{NO_SUCH_NAME, SessionParams, SnmpError, SnmpVersion};

#[derive(Debug, Default)]
struct AgentState {
    rows: BTreeMap<ObjectId, SnmpValue>,
    failing: Vec<ObjectId>,
    stalled: Vec<ObjectId>,
    connections: AtomicUsize,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryAgent {
    state: Arc<AgentState>,
}

impl MemoryAgent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one object instance.
    pub fn with(self, oid: ObjectId, value: SnmpValue) -> Self {
        self.update(|state| {
            state.rows.insert(oid, value);
        })
    }

    /// Makes every request at or below `base` time out.
    pub fn failing(self, base: ObjectId) -> Self {
        self.update(|state| state.failing.push(base))
    }

    /// Makes every request at or below `base` wait forever.
    pub fn stalled(self, base: ObjectId) -> Self {
        self.update(|state| state.stalled.push(base))
    }

    /// Number of sessions opened so far.
    pub fn connections(&self) -> usize {
        self.state.connections.load(Ordering::Relaxed)
    }

    fn update(self, apply: impl FnOnce(&mut AgentState)) -> Self {
        let mut state = AgentState {
            rows: self.state.rows.clone(),
            failing: self.state.failing.clone(),
            stalled: self.state.stalled.clone(),
            connections: AtomicUsize::new(self.connections()),
        };
        apply(&mut state);
        Self {
            state: Arc::new(state),
        }
    }
}

#[async_trait]
impl Connector for MemoryAgent {
    async fn connect(&self, params: &SessionParams) -> Result<Box<dyn SnmpSession>, SnmpError> {
        self.state.connections.fetch_add(1, Ordering::Relaxed);
        Ok(Box::new(MemorySession {
            state: Arc::clone(&self.state),
            version: params.version,
            timeout: params.timeout,
        }))
    }
}

struct MemorySession {
    state: Arc<AgentState>,
    version: SnmpVersion,
    timeout: Duration,
}

impl MemorySession {
    async fn check(&self, oid: &ObjectId) -> Result<(), SnmpError> {
        let covers = |base: &ObjectId| oid == base || oid.is_under(base);
        if self.state.stalled.iter().any(covers) {
            std::future::pending::<()>().await;
        }
        if self.state.failing.iter().any(covers) {
            return Err(SnmpError::Timeout(self.timeout));
        }
        Ok(())
    }

    fn after(&self, oid: &ObjectId) -> impl Iterator<Item = VarBind> + '_ {
        self.state
            .rows
            .range((Bound::Excluded(oid.clone()), Bound::Unbounded))
            .map(|(oid, value)| VarBind::new(oid.clone(), value.clone()))
    }
}

#[async_trait]
impl SnmpSession for MemorySession {
    async fn get(&mut self, oids: &[ObjectId]) -> Result<Vec<VarBind>, SnmpError> {
        let mut rows = Vec::with_capacity(oids.len());
        for (position, oid) in oids.iter().enumerate() {
            self.check(oid).await?;
            let value = match self.state.rows.get(oid) {
                Some(value) => value.clone(),
                None if self.version == SnmpVersion::V1 => {
                    return Err(SnmpError::Agent {
                        status: NO_SUCH_NAME,
                        index: position as u32 + 1,
                    });
                }
                None => SnmpValue::NoSuchObject,
            };
            rows.push(VarBind::new(oid.clone(), value));
        }
        Ok(rows)
    }

    async fn get_next(&mut self, oid: &ObjectId) -> Result<Vec<VarBind>, SnmpError> {
        self.check(oid).await?;
        match self.after(oid).next() {
            Some(varbind) => Ok(vec![varbind]),
            None => Err(SnmpError::Agent {
                status: NO_SUCH_NAME,
                index: 1,
            }),
        }
    }

    async fn get_bulk(
        &mut self,
        oid: &ObjectId,
        max_repetitions: u32,
    ) -> Result<Vec<VarBind>, SnmpError> {
        self.check(oid).await?;
        Ok(self.after(oid).take(max_repetitions as usize).collect())
    }
}
