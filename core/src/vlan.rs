//! Port VLAN membership from the bridge MIBs.
//!
//! Only the untagged PVID of each port is reported; tagged membership is
//! not collected.

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::Arc;

use fathom_common::models::VlanMapping;

use crate::snmp::{SnmpClient, SnmpError, oid};

/// dot1dBasePortIfIndex: bridge port -> ifIndex.
pub const DOT1D_BASE_PORT_IF_INDEX: &[u64] = &[1, 3, 6, 1, 2, 1, 17, 1, 4, 1, 2];
/// dot1qPvid: bridge port -> PVID.
pub const DOT1Q_PVID: &[u64] = &[1, 3, 6, 1, 2, 1, 17, 7, 1, 4, 5, 1, 1];

pub struct VlanCollector {
    client: Arc<SnmpClient>,
}

impl VlanCollector {
    pub fn new(client: Arc<SnmpClient>) -> Self {
        Self { client }
    }

    /// Maps ifIndex to PVID. Both walks are required.
    pub async fn collect_pvid_by_if_index(
        &self,
        target: IpAddr,
    ) -> Result<BTreeMap<u32, u32>, SnmpError> {
        let (port_oid, pvid_oid) = (oid(DOT1D_BASE_PORT_IF_INDEX), oid(DOT1Q_PVID));
        let (ports, pvids) = tokio::join!(
            self.client.walk_int_table(target, &port_oid),
            self.client.walk_int_table(target, &pvid_oid),
        );
        Ok(join_pvids(&ports?, &pvids?))
    }

    pub async fn collect(&self, switch: IpAddr) -> Result<Vec<VlanMapping>, SnmpError> {
        let pvids = self.collect_pvid_by_if_index(switch).await?;
        Ok(pvids
            .into_iter()
            .map(|(if_index, vlan)| VlanMapping::new(switch, if_index, vlan))
            .collect())
    }
}

fn join_pvids(ports: &BTreeMap<u32, i64>, pvids: &BTreeMap<u32, i64>) -> BTreeMap<u32, u32> {
    ports
        .iter()
        .filter_map(|(base_port, if_index)| {
            let if_index = u32::try_from(*if_index).ok()?;
            let vlan = u32::try_from(*pvids.get(base_port)?).ok()?;
            (vlan > 0).then_some((if_index, vlan))
        })
        .collect()
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
