//! # LLDP/CDP neighbor correlation
//!
//! Both neighbor tables are read over SNMP. Every column is walked on its
//! own and the rows are stitched back together on the two trailing index
//! arcs `(local port, remote entry)`.

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::Arc;

use fathom_common::debug;
use fathom_common::models::{Neighbor, NeighborProtocol};
use fathom_common::network::mac;
use fathom_protocols::snmp::{SnmpValue, parse_cdp_address};

use crate::snmp::{SnmpClient, SnmpError, oid};

pub const LLDP_REM_CHASSIS_ID: &[u64] = &[1, 0, 8802, 1, 1, 2, 1, 4, 1, 1, 5];
pub const LLDP_REM_PORT_ID: &[u64] = &[1, 0, 8802, 1, 1, 2, 1, 4, 1, 1, 7];
pub const LLDP_REM_PORT_DESC: &[u64] = &[1, 0, 8802, 1, 1, 2, 1, 4, 1, 1, 8];
pub const LLDP_REM_SYS_NAME: &[u64] = &[1, 0, 8802, 1, 1, 2, 1, 4, 1, 1, 9];

pub const CDP_CACHE_ADDRESS: &[u64] = &[1, 3, 6, 1, 4, 1, 9, 9, 23, 1, 2, 1, 1, 4];
pub const CDP_CACHE_DEVICE_ID: &[u64] = &[1, 3, 6, 1, 4, 1, 9, 9, 23, 1, 2, 1, 1, 6];
pub const CDP_CACHE_DEVICE_PORT: &[u64] = &[1, 3, 6, 1, 4, 1, 9, 9, 23, 1, 2, 1, 1, 7];

type Key = (u32, u32);
type Column = Result<BTreeMap<Key, SnmpValue>, SnmpError>;

pub struct NeighborCorrelator {
    client: Arc<SnmpClient>,
}

impl NeighborCorrelator {
    pub fn new(client: Arc<SnmpClient>) -> Self {
        Self { client }
    }

    /// LLDP remote systems seen by `target`.
    ///
    /// Fails only when every column walk fails.
    pub async fn lldp(&self, target: IpAddr) -> Result<Vec<Neighbor>, SnmpError> {
        let (name_oid, desc_oid, port_id_oid, chassis_oid) = (
            oid(LLDP_REM_SYS_NAME),
            oid(LLDP_REM_PORT_DESC),
            oid(LLDP_REM_PORT_ID),
            oid(LLDP_REM_CHASSIS_ID),
        );
        let (names, descs, port_ids, chassis) = tokio::join!(
            self.client.walk_indexed(target, &name_oid),
            self.client.walk_indexed(target, &desc_oid),
            self.client.walk_indexed(target, &port_id_oid),
            self.client.walk_indexed(target, &chassis_oid),
        );
        let [names, descs, port_ids, chassis] =
            usable(target, NeighborProtocol::Lldp, [names, descs, port_ids, chassis])?;

        let mut rows: BTreeMap<Key, Neighbor> = BTreeMap::new();
        fill(&mut rows, NeighborProtocol::Lldp, names, |n, v| {
            n.remote_device_name = v.as_text();
        });
        fill(&mut rows, NeighborProtocol::Lldp, descs, |n, v| {
            n.remote_port_name = v.as_text();
        });
        fill(&mut rows, NeighborProtocol::Lldp, port_ids, |n, v| {
            if n.remote_port_name.is_none() {
                n.remote_port_name = v.as_text();
            }
        });
        fill(&mut rows, NeighborProtocol::Lldp, chassis, |n, v| {
            n.remote_chassis_mac = v.as_bytes().and_then(mac::from_bytes);
        });

        Ok(rows
            .into_values()
            .filter(|n| {
                n.local_if_index.is_some()
                    || n.remote_device_name.is_some()
                    || n.remote_chassis_mac.is_some()
            })
            .collect())
    }

    /// CDP cache entries on `target`.
    ///
    /// Fails only when every column walk fails.
    pub async fn cdp(&self, target: IpAddr) -> Result<Vec<Neighbor>, SnmpError> {
        let (device_id_oid, port_oid, address_oid) = (
            oid(CDP_CACHE_DEVICE_ID),
            oid(CDP_CACHE_DEVICE_PORT),
            oid(CDP_CACHE_ADDRESS),
        );
        let (device_ids, ports, addresses) = tokio::join!(
            self.client.walk_indexed(target, &device_id_oid),
            self.client.walk_indexed(target, &port_oid),
            self.client.walk_indexed(target, &address_oid),
        );
        let [device_ids, ports, addresses] =
            usable(target, NeighborProtocol::Cdp, [device_ids, ports, addresses])?;

        let mut rows: BTreeMap<Key, Neighbor> = BTreeMap::new();
        fill(&mut rows, NeighborProtocol::Cdp, device_ids, |n, v| {
            n.remote_device_name = v.as_text();
        });
        fill(&mut rows, NeighborProtocol::Cdp, ports, |n, v| {
            n.remote_port_name = v.as_text();
        });
        fill(&mut rows, NeighborProtocol::Cdp, addresses, |n, v| {
            n.remote_mgmt_ip = v.as_bytes().and_then(parse_cdp_address);
        });

        Ok(rows
            .into_values()
            .filter(|n| n.remote_device_name.is_some() || n.remote_mgmt_ip.is_some())
            .collect())
    }

    /// LLDP neighbors followed by CDP neighbors. One protocol failing does
    /// not hide the other's results.
    pub async fn collect_neighbors(&self, target: IpAddr) -> Result<Vec<Neighbor>, SnmpError> {
        let (lldp, cdp) = tokio::join!(self.lldp(target), self.cdp(target));
        match (lldp, cdp) {
            (Err(err), Err(_)) => Err(err),
            (lldp, cdp) => {
                let mut neighbors = Vec::new();
                for found in [lldp, cdp] {
                    match found {
                        Ok(found) => neighbors.extend(found),
                        Err(err) => debug!("neighbor walk on {target} failed: {err}"),
                    }
                }
                Ok(neighbors)
            }
        }
    }
}

/// Drops failed columns, logging each. Errors out only if every walk failed.
fn usable<const N: usize>(
    target: IpAddr,
    protocol: NeighborProtocol,
    columns: [Column; N],
) -> Result<[BTreeMap<Key, SnmpValue>; N], SnmpError> {
    let mut failures = 0;
    let mut last_err = None;
    let columns = columns.map(|column| {
        column.unwrap_or_else(|err| {
            debug!("{protocol} column walk on {target} failed: {err}");
            failures += 1;
            last_err = Some(err);
            BTreeMap::new()
        })
    });
    match last_err {
        Some(err) if failures == N => Err(err),
        _ => Ok(columns),
    }
}

fn fill(
    rows: &mut BTreeMap<Key, Neighbor>,
    protocol: NeighborProtocol,
    column: BTreeMap<Key, SnmpValue>,
    mut apply: impl FnMut(&mut Neighbor, &SnmpValue),
) {
    for ((local, remote), value) in column {
        let row = rows.entry((local, remote)).or_insert_with(|| Neighbor {
            local_if_index: (local != 0).then_some(local),
            ..Neighbor::new(protocol)
        });
        apply(row, &value);
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
