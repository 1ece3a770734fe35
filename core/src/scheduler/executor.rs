use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::Arc;

use fathom_common::models::{
    InterfaceInfo, NameCandidate, NameSource, Neighbor, RunScope, RunStats, SystemInfo,
    VlanMapping,
};
use fathom_common::warn;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::naming::{self, RankedCandidate};
use crate::neighbors::NeighborCorrelator;
use crate::resolver::NameResolver;
use crate::snmp::SnmpClient;
use crate::vlan::VlanCollector;

pub const DEFAULT_CONCURRENCY: usize = 16;

/// Everything one run learned about one address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceFacts {
    pub address: IpAddr,
    pub display_name: Option<String>,
    pub candidates: Vec<RankedCandidate>,
    pub system: Option<SystemInfo>,
    pub interfaces: Vec<InterfaceInfo>,
    pub vlans: Vec<VlanMapping>,
    pub neighbors: Vec<Neighbor>,
    /// Enrichment steps that failed, as `"step: error"`.
    pub errors: Vec<String>,
}

impl DeviceFacts {
    pub fn new(address: IpAddr) -> Self {
        Self {
            address,
            display_name: None,
            candidates: Vec::new(),
            system: None,
            interfaces: Vec::new(),
            vlans: Vec::new(),
            neighbors: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// One line for the run log.
    pub fn summary(&self) -> String {
        format!(
            "{}: name={}, {} candidates, {} interfaces, {} vlans, {} neighbors",
            self.address,
            self.display_name.as_deref().unwrap_or("-"),
            self.candidates.len(),
            self.interfaces.len(),
            self.vlans.len(),
            self.neighbors.len(),
        )
    }
}

/// Collects facts for the targets of one run.
#[derive(Clone)]
pub struct Executor {
    resolver: Arc<NameResolver>,
    snmp: Arc<SnmpClient>,
    vlans: Arc<VlanCollector>,
    neighbors: Arc<NeighborCorrelator>,
    concurrency: usize,
}

impl Executor {
    pub fn new(resolver: NameResolver, snmp: SnmpClient) -> Self {
        let snmp = Arc::new(snmp);
        Self {
            resolver: Arc::new(resolver),
            vlans: Arc::new(VlanCollector::new(Arc::clone(&snmp))),
            neighbors: Arc::new(NeighborCorrelator::new(Arc::clone(&snmp))),
            snmp,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Caps how many targets are inspected at once.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Inspects every target, returning facts in target order.
    ///
    /// Dropping the returned future aborts every in-flight inspection.
    pub async fn execute(&self, scope: &RunScope, deadline: Option<Instant>) -> Vec<DeviceFacts> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let scope = Arc::new(scope.clone());
        let mut tasks = JoinSet::new();

        for (position, &address) in scope.targets.iter().enumerate() {
            let this = self.clone();
            let scope = Arc::clone(&scope);
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                (position, this.inspect(address, &scope, deadline).await)
            });
        }

        let mut found = BTreeMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((position, facts)) => {
                    found.insert(position, facts);
                }
                Err(err) => warn!("target task failed: {err}"),
            }
        }
        found.into_values().collect()
    }

    /// Gathers whatever the scope asks for about one address. Failures are
    /// recorded on the facts, never returned.
    pub async fn inspect(
        &self,
        address: IpAddr,
        scope: &RunScope,
        deadline: Option<Instant>,
    ) -> DeviceFacts {
        let device_id = address.to_string();
        let (names, system, interfaces, vlans, neighbors) = tokio::join!(
            async {
                if scope.resolve_names {
                    Some(
                        self.resolver
                            .lookup_addr_until(&device_id, address, deadline)
                            .await,
                    )
                } else {
                    None
                }
            },
            async {
                if scope.snmp {
                    Some(self.snmp.get_system(address).await)
                } else {
                    None
                }
            },
            async {
                if scope.snmp {
                    Some(self.snmp.walk_interfaces(address).await)
                } else {
                    None
                }
            },
            async {
                if scope.vlans {
                    Some(self.vlans.collect(address).await)
                } else {
                    None
                }
            },
            async {
                if scope.neighbors {
                    Some(self.neighbors.collect_neighbors(address).await)
                } else {
                    None
                }
            },
        );

        let mut facts = DeviceFacts::new(address);
        let mut candidates: Vec<NameCandidate> = Vec::new();

        match names {
            Some(Ok(found)) => candidates.extend(found),
            Some(Err(err)) => facts.errors.push(format!("names: {err}")),
            None => {}
        }
        match system {
            Some(Ok(system)) => {
                if let Some(sys_name) = &system.sys_name {
                    candidates.push(
                        NameCandidate::new(sys_name.clone(), NameSource::Snmp)
                            .for_device(device_id.clone())
                            .with_address(address),
                    );
                }
                facts.system = Some(system);
            }
            Some(Err(err)) => facts.errors.push(format!("system: {err}")),
            None => {}
        }
        match interfaces {
            Some(Ok(table)) => facts.interfaces = table.into_values().collect(),
            Some(Err(err)) => facts.errors.push(format!("interfaces: {err}")),
            None => {}
        }
        match vlans {
            Some(Ok(vlans)) => facts.vlans = vlans,
            Some(Err(err)) => facts.errors.push(format!("vlans: {err}")),
            None => {}
        }
        match neighbors {
            Some(Ok(neighbors)) => facts.neighbors = neighbors,
            Some(Err(err)) => facts.errors.push(format!("neighbors: {err}")),
            None => {}
        }

        facts.display_name = naming::choose_best(&candidates).ok().map(|best| best.display);
        facts.candidates = naming::rank(&candidates);
        facts
    }
}

pub fn summarize(facts: &[DeviceFacts]) -> RunStats {
    RunStats {
        targets: facts.len(),
        names_resolved: facts.iter().filter(|f| f.display_name.is_some()).count(),
        snmp_responders: facts.iter().filter(|f| f.system.is_some()).count(),
        interfaces: facts.iter().map(|f| f.interfaces.len()).sum(),
        vlan_mappings: facts.iter().map(|f| f.vlans.len()).sum(),
        neighbors: facts.iter().map(|f| f.neighbors.len()).sum(),
        errors: facts.iter().map(|f| f.errors.len()).sum(),
    }
}
