use std::net::IpAddr;
use std::sync::Arc;

use anyhow::Context;
use colored::*;
use fathom_common::config::Config;
use fathom_common::models::{InterfaceInfo, Neighbor};
use fathom_common::network::mac;
use fathom_common::success;
use fathom_core::neighbors::NeighborCorrelator;
use fathom_core::snmp::SnmpClient;
use fathom_core::vlan::VlanCollector;

use crate::terminal::{colors, print, spinner};

fn client(cfg: &Config) -> anyhow::Result<SnmpClient> {
    SnmpClient::new(&cfg.snmp).context("invalid SNMP configuration")
}

pub async fn system(target: IpAddr, cfg: &Config) -> anyhow::Result<()> {
    let client = client(cfg)?;
    let info = spinner::spin(
        &format!("reading the system group of {target}"),
        client.get_system(target),
    )
    .await
    .with_context(|| format!("{target} did not answer the system GET"))?;

    print::header(&format!("system {target}"), cfg.quiet);
    if info.is_empty() {
        print::nothing_found("system objects");
        return Ok(());
    }

    let rows = [
        ("sysName", &info.sys_name),
        ("sysDescr", &info.sys_descr),
        ("sysObjectID", &info.sys_object_id),
        ("sysContact", &info.sys_contact),
        ("sysLocation", &info.sys_location),
    ];
    let rows = rows.map(|(key, value)| match value {
        Some(value) => (key, value.normal()),
        None => (key, "-".color(colors::MUTED)),
    });
    print::key_values(&rows);
    print::rule();
    Ok(())
}

pub async fn interfaces(target: IpAddr, cfg: &Config) -> anyhow::Result<()> {
    let client = client(cfg)?;
    let table = spinner::spin(
        &format!("walking the interface table of {target}"),
        client.walk_interfaces(target),
    )
    .await
    .with_context(|| format!("ifName walk on {target} failed"))?;

    print::header(&format!("interfaces {target}"), cfg.quiet);
    if table.is_empty() {
        print::nothing_found("interfaces");
        return Ok(());
    }

    for (idx, row) in table.values().enumerate() {
        print::tree_head(idx, &row.label());
        print::tree(interface_details(row));
        if idx + 1 != table.len() {
            print::blank();
        }
    }
    print::rule();
    success!("{} interfaces on {target}", table.len());
    Ok(())
}

fn interface_details(row: &InterfaceInfo) -> Vec<(String, ColoredString)> {
    let mut details = vec![("ifIndex".to_string(), row.if_index.to_string().color(colors::ACCENT))];
    if let Some(descr) = &row.descr {
        details.push(("descr".to_string(), descr.color(colors::TEXT_DEFAULT)));
    }
    if let Some(alias) = &row.alias {
        details.push(("alias".to_string(), alias.color(colors::NAME)));
    }
    if let Some(mac) = row.mac {
        let vendor = mac::get_vendor(mac).map(|v| format!(" ({v})")).unwrap_or_default();
        details.push(("mac".to_string(), format!("{mac}{vendor}").color(colors::MAC_ADDR)));
    }
    if let (Some(admin), Some(oper)) = (row.admin_status, row.oper_status) {
        let state = format!("{}/{}", status_label(admin), status_label(oper));
        let state = if oper == 1 { state.green() } else { state.red() };
        details.push(("status".to_string(), state));
    }
    if let Some(mtu) = row.mtu {
        details.push(("mtu".to_string(), mtu.to_string().color(colors::TEXT_DEFAULT)));
    }
    if let Some(bps) = row.speed_bps {
        details.push(("speed".to_string(), human_speed(bps).color(colors::TEXT_DEFAULT)));
    }
    details
}

/// ifAdminStatus / ifOperStatus labels.
fn status_label(status: i64) -> &'static str {
    match status {
        1 => "up",
        2 => "down",
        3 => "testing",
        5 => "dormant",
        6 => "notPresent",
        7 => "lowerLayerDown",
        _ => "unknown",
    }
}

fn human_speed(bps: u64) -> String {
    match bps {
        b if b >= 1_000_000_000 && b % 1_000_000_000 == 0 => format!("{} Gbps", b / 1_000_000_000),
        b if b >= 1_000_000 => format!("{} Mbps", b / 1_000_000),
        b if b >= 1_000 => format!("{} kbps", b / 1_000),
        b => format!("{b} bps"),
    }
}

pub async fn vlans(switch: IpAddr, cfg: &Config) -> anyhow::Result<()> {
    let collector = VlanCollector::new(Arc::new(client(cfg)?));
    let mappings = spinner::spin(
        &format!("joining bridge ports to PVIDs on {switch}"),
        collector.collect(switch),
    )
    .await
    .with_context(|| format!("bridge tables on {switch} could not be walked"))?;

    print::header(&format!("port vlans {switch}"), cfg.quiet);
    if mappings.is_empty() {
        print::nothing_found("port VLANs");
        return Ok(());
    }

    let rows: Vec<(&str, ColoredString)> = mappings
        .iter()
        .map(|m| (m.port.as_str(), m.vlan.to_string().color(colors::ACCENT)))
        .collect();
    print::key_values(&rows);
    print::rule();
    Ok(())
}

pub async fn neighbors(target: IpAddr, cfg: &Config) -> anyhow::Result<()> {
    let correlator = NeighborCorrelator::new(Arc::new(client(cfg)?));
    let found = spinner::spin(
        &format!("reading LLDP and CDP tables of {target}"),
        correlator.collect_neighbors(target),
    )
    .await
    .with_context(|| format!("neither LLDP nor CDP could be read from {target}"))?;

    print::header(&format!("neighbors {target}"), cfg.quiet);
    if found.is_empty() {
        print::nothing_found("neighbors");
        return Ok(());
    }

    for (idx, neighbor) in found.iter().enumerate() {
        let title = neighbor.remote_device_name.as_deref().unwrap_or("(unnamed)");
        print::tree_head(idx, title);
        print::tree(neighbor_details(neighbor));
        if idx + 1 != found.len() {
            print::blank();
        }
    }
    print::rule();
    success!("{} neighbors of {target}", found.len());
    Ok(())
}

fn neighbor_details(neighbor: &Neighbor) -> Vec<(String, ColoredString)> {
    let mut details = vec![(
        "via".to_string(),
        neighbor.source.to_string().color(colors::ACCENT),
    )];
    if let Some(local) = neighbor.local_if_index {
        details.push(("local".to_string(), format!("ifIndex:{local}").color(colors::TEXT_DEFAULT)));
    }
    if let Some(port) = &neighbor.remote_port_name {
        details.push(("port".to_string(), port.color(colors::NAME)));
    }
    if let Some(mac) = neighbor.remote_chassis_mac {
        details.push(("chassis".to_string(), mac.to_string().color(colors::MAC_ADDR)));
    }
    if let Some(ip) = neighbor.remote_mgmt_ip {
        details.push(("mgmt".to_string(), ip.to_string().color(colors::IP_ADDR)));
    }
    details
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
