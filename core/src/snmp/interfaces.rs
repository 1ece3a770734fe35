use std::collections::BTreeMap;
use std::net::IpAddr;

use fathom_common::debug;
use fathom_common::models::InterfaceInfo;
use fathom_common::network::mac;
use fathom_protocols::snmp::SnmpValue;

use super::{SnmpClient, SnmpError, oid};

pub const IF_DESCR: &[u64] = &[1, 3, 6, 1, 2, 1, 2, 2, 1, 2];
pub const IF_MTU: &[u64] = &[1, 3, 6, 1, 2, 1, 2, 2, 1, 4];
pub const IF_SPEED: &[u64] = &[1, 3, 6, 1, 2, 1, 2, 2, 1, 5];
pub const IF_PHYS_ADDRESS: &[u64] = &[1, 3, 6, 1, 2, 1, 2, 2, 1, 6];
pub const IF_ADMIN_STATUS: &[u64] = &[1, 3, 6, 1, 2, 1, 2, 2, 1, 7];
pub const IF_OPER_STATUS: &[u64] = &[1, 3, 6, 1, 2, 1, 2, 2, 1, 8];
pub const IF_NAME: &[u64] = &[1, 3, 6, 1, 2, 1, 31, 1, 1, 1, 1];
pub const IF_HIGH_SPEED: &[u64] = &[1, 3, 6, 1, 2, 1, 31, 1, 1, 1, 15];
pub const IF_ALIAS: &[u64] = &[1, 3, 6, 1, 2, 1, 31, 1, 1, 1, 18];

type Column = Result<BTreeMap<u32, SnmpValue>, SnmpError>;

impl SnmpClient {
    /// Assembles the interface table keyed by ifIndex.
    ///
    /// The ifName walk must succeed. Every other column is best-effort: a
    /// failed walk leaves that field unset on every row.
    pub async fn walk_interfaces(
        &self,
        target: IpAddr,
    ) -> Result<BTreeMap<u32, InterfaceInfo>, SnmpError> {
        let if_name = oid(IF_NAME);
        let if_descr = oid(IF_DESCR);
        let if_alias = oid(IF_ALIAS);
        let if_phys_address = oid(IF_PHYS_ADDRESS);
        let if_admin_status = oid(IF_ADMIN_STATUS);
        let if_oper_status = oid(IF_OPER_STATUS);
        let if_mtu = oid(IF_MTU);
        let if_speed = oid(IF_SPEED);
        let if_high_speed = oid(IF_HIGH_SPEED);
        let (names, descrs, aliases, macs, admin, oper, mtus, speeds, high_speeds) = tokio::join!(
            self.walk_column(target, &if_name),
            self.walk_column(target, &if_descr),
            self.walk_column(target, &if_alias),
            self.walk_column(target, &if_phys_address),
            self.walk_column(target, &if_admin_status),
            self.walk_column(target, &if_oper_status),
            self.walk_column(target, &if_mtu),
            self.walk_column(target, &if_speed),
            self.walk_column(target, &if_high_speed),
        );

        let mut table: BTreeMap<u32, InterfaceInfo> = BTreeMap::new();
        for (index, value) in names? {
            table.entry(index).or_insert_with(|| InterfaceInfo::new(index)).name = value.as_text();
        }

        merge(&mut table, target, "ifDescr", descrs, |row, v| row.descr = v.as_text());
        merge(&mut table, target, "ifAlias", aliases, |row, v| row.alias = v.as_text());
        merge(&mut table, target, "ifPhysAddress", macs, |row, v| {
            row.mac = v.as_bytes().and_then(mac::from_bytes);
        });
        merge(&mut table, target, "ifAdminStatus", admin, |row, v| row.admin_status = v.as_int());
        merge(&mut table, target, "ifOperStatus", oper, |row, v| row.oper_status = v.as_int());
        merge(&mut table, target, "ifMtu", mtus, |row, v| row.mtu = v.as_int());
        merge(&mut table, target, "ifSpeed", speeds, |row, v| {
            row.speed_bps = v.as_int().and_then(|bps| u64::try_from(bps).ok());
        });
        // Applied last so it wins over ifSpeed. Links under 0.5 Mb/s report
        // an ifHighSpeed of 0 and keep their exact ifSpeed.
        merge(&mut table, target, "ifHighSpeed", high_speeds, |row, v| {
            let mbps = v.as_int().and_then(|mbps| u64::try_from(mbps).ok());
            let bps = mbps.filter(|&mbps| mbps > 0).and_then(|mbps| mbps.checked_mul(1_000_000));
            if bps.is_some() {
                row.speed_bps = bps;
            }
        });

        Ok(table)
    }
}

fn merge(
    table: &mut BTreeMap<u32, InterfaceInfo>,
    target: IpAddr,
    column: &str,
    walked: Column,
    mut apply: impl FnMut(&mut InterfaceInfo, &SnmpValue),
) {
    match walked {
        Ok(values) => {
            for (index, value) in values {
                let row = table.entry(index).or_insert_with(|| InterfaceInfo::new(index));
                apply(row, &value);
            }
        }
        Err(err) => debug!("{column} walk on {target} failed: {err}"),
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
    use crate::snmp::memory::MemoryAgent;
    use fathom_common::config::SnmpConfig;
    use pnet::util::MacAddr;
    use std::net::Ipv4Addr;
    use std::sync::Arc;

    const TARGET: IpAddr = IpAddr::V4(Ipv4Addr::new(10, 1, 1, 1));

    fn client(agent: MemoryAgent) -> SnmpClient {
        SnmpClient::with_connector(&SnmpConfig::default(), Arc::new(agent)).unwrap()
    }

    fn text(s: &str) -> SnmpValue {
        SnmpValue::OctetString(s.as_bytes().to_vec())
    }

    fn with_names(agent: MemoryAgent) -> MemoryAgent {
        agent
            .with(oid(IF_NAME).child(1), text("Gi1/0/1"))
            .with(oid(IF_NAME).child(2), text("Gi1/0/2"))
    }

    #[tokio::test]
    async fn only_if_name_succeeding_still_yields_named_rows() {
        let mut agent = with_names(MemoryAgent::new());
        for column in [
            IF_DESCR,
            IF_ALIAS,
            IF_PHYS_ADDRESS,
            IF_ADMIN_STATUS,
            IF_OPER_STATUS,
            IF_MTU,
            IF_SPEED,
            IF_HIGH_SPEED,
        ] {
            agent = agent.failing(oid(column));
        }

        let table = client(agent).walk_interfaces(TARGET).await.unwrap();
        assert_eq!(table.len(), 2);
        for row in table.values() {
            assert!(row.name.is_some());
            assert_eq!(
                *row,
                InterfaceInfo {
                    name: row.name.clone(),
                    ..InterfaceInfo::new(row.if_index)
                }
            );
        }
    }

    #[tokio::test]
    async fn if_name_failure_aborts() {
        let agent = with_names(MemoryAgent::new()).failing(oid(IF_NAME));
        assert!(client(agent).walk_interfaces(TARGET).await.is_err());
    }

    #[tokio::test]
    async fn high_speed_overrides_if_speed() {
        let agent = with_names(MemoryAgent::new())
            .with(oid(IF_SPEED).child(1), SnmpValue::Counter32(100_000_000))
            .with(oid(IF_HIGH_SPEED).child(1), SnmpValue::Counter32(1000))
            .with(oid(IF_SPEED).child(2), SnmpValue::Counter32(10_000_000));

        let table = client(agent).walk_interfaces(TARGET).await.unwrap();
        assert_eq!(table[&1].speed_bps, Some(1_000_000_000));
        assert_eq!(table[&2].speed_bps, Some(10_000_000));
    }

    #[tokio::test]
    async fn zero_high_speed_keeps_slow_if_speed() {
        let agent = with_names(MemoryAgent::new())
            .with(oid(IF_SPEED).child(1), SnmpValue::Unsigned32(64_000))
            .with(oid(IF_HIGH_SPEED).child(1), SnmpValue::Unsigned32(0))
            .with(oid(IF_HIGH_SPEED).child(2), SnmpValue::Unsigned32(0));

        let table = client(agent).walk_interfaces(TARGET).await.unwrap();
        assert_eq!(table[&1].speed_bps, Some(64_000));
        assert_eq!(table[&2].speed_bps, None);
    }

    #[tokio::test]
    async fn columns_merge_by_if_index() {
        let agent = with_names(MemoryAgent::new())
            .with(oid(IF_DESCR).child(1), text("GigabitEthernet1/0/1"))
            .with(oid(IF_ALIAS).child(1), text("uplink"))
            .with(
                oid(IF_PHYS_ADDRESS).child(1),
                SnmpValue::OctetString(vec![0x00, 0x1b, 0x54, 0xaa, 0xbb, 0xcc]),
            )
            .with(oid(IF_PHYS_ADDRESS).child(2), SnmpValue::OctetString(vec![0; 6]))
            .with(oid(IF_ADMIN_STATUS).child(1), SnmpValue::Integer(1))
            .with(oid(IF_OPER_STATUS).child(1), SnmpValue::Integer(2))
            .with(oid(IF_MTU).child(1), SnmpValue::Integer(1500))
            .with(oid(IF_MTU).child(3), SnmpValue::Integer(9000));

        let table = client(agent).walk_interfaces(TARGET).await.unwrap();
        let uplink = &table[&1];
        assert_eq!(uplink.descr.as_deref(), Some("GigabitEthernet1/0/1"));
        assert_eq!(uplink.alias.as_deref(), Some("uplink"));
        assert_eq!(uplink.mac, Some(MacAddr::new(0x00, 0x1b, 0x54, 0xaa, 0xbb, 0xcc)));
        assert_eq!(uplink.admin_status, Some(1));
        assert_eq!(uplink.oper_status, Some(2));
        assert_eq!(uplink.mtu, Some(1500));

        assert_eq!(table[&2].mac, None);
        assert_eq!(table[&3].name, None);
        assert_eq!(table[&3].mtu, Some(9000));
    }
}
