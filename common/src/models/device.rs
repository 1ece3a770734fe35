//! Facts gathered from a device over SNMP.

use std::fmt;
use std::net::IpAddr;

use pnet::util::MacAddr;

/// The SNMP system group. A field is `None` when the agent did not answer
/// that object or answered with an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SystemInfo {
    pub sys_name: Option<String>,
    pub sys_descr: Option<String>,
    pub sys_object_id: Option<String>,
    pub sys_contact: Option<String>,
    pub sys_location: Option<String>,
}

impl SystemInfo {
    pub fn is_empty(&self) -> bool {
        self.sys_name.is_none()
            && self.sys_descr.is_none()
            && self.sys_object_id.is_none()
            && self.sys_contact.is_none()
            && self.sys_location.is_none()
    }
}

/// One row of the interface table. Every column is optional because the
/// columns arrive from independent walks and any of them may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterfaceInfo {
    pub if_index: u32,
    pub name: Option<String>,
    pub descr: Option<String>,
    pub alias: Option<String>,
    pub mac: Option<MacAddr>,
    pub admin_status: Option<i64>,
    pub oper_status: Option<i64>,
    pub mtu: Option<i64>,
    pub speed_bps: Option<u64>,
}

impl InterfaceInfo {
    pub fn new(if_index: u32) -> Self {
        Self {
            if_index,
            ..Default::default()
        }
    }

    /// The best human label for this interface.
    pub fn label(&self) -> String {
        self.name
            .as_deref()
            .or(self.descr.as_deref())
            .map(str::to_string)
            .unwrap_or_else(|| format!("ifIndex:{}", self.if_index))
    }
}

/// A port's untagged VLAN on a switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VlanMapping {
    pub switch: IpAddr,
    pub port: String,
    pub vlan: u32,
}

impl VlanMapping {
    pub fn new(switch: IpAddr, if_index: u32, vlan: u32) -> Self {
        Self {
            switch,
            port: format!("ifIndex:{if_index}"),
            vlan,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NeighborProtocol {
    Lldp,
    Cdp,
}

impl fmt::Display for NeighborProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NeighborProtocol::Lldp => f.write_str("lldp"),
            NeighborProtocol::Cdp => f.write_str("cdp"),
        }
    }
}

/// An adjacency reported by a device's LLDP or CDP neighbor table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Neighbor {
    pub local_if_index: Option<u32>,
    pub remote_device_name: Option<String>,
    pub remote_port_name: Option<String>,
    pub remote_chassis_mac: Option<MacAddr>,
    pub remote_mgmt_ip: Option<IpAddr>,
    pub source: NeighborProtocol,
}

impl Neighbor {
    pub fn new(source: NeighborProtocol) -> Self {
        Self {
            local_if_index: None,
            remote_device_name: None,
            remote_port_name: None,
            remote_chassis_mac: None,
            remote_mgmt_ip: None,
            source,
        }
    }
}
