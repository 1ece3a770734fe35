use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Where a name observation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameSource {
    ReverseDns,
    Mdns,
    Netbios,
    Manual,
    Dhcp,
    Snmp,
    Lldp,
    Cdp,
    /// Anything the orchestrator fed in under a label we do not know.
    #[serde(other)]
    Unknown,
}

impl NameSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            NameSource::ReverseDns => "reverse_dns",
            NameSource::Mdns => "mdns",
            NameSource::Netbios => "netbios",
            NameSource::Manual => "manual",
            NameSource::Dhcp => "dhcp",
            NameSource::Snmp => "snmp",
            NameSource::Lldp => "lldp",
            NameSource::Cdp => "cdp",
            NameSource::Unknown => "unknown",
        }
    }
}

impl fmt::Display for NameSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NameSource {
    type Err = std::convert::Infallible;

    /// Unrecognised labels map to [`NameSource::Unknown`] rather than failing,
    /// so they still take part in naming with the lowest base score.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let source = match s.trim().to_ascii_lowercase().as_str() {
            "reverse_dns" | "dns" | "ptr" => NameSource::ReverseDns,
            "mdns" => NameSource::Mdns,
            "netbios" => NameSource::Netbios,
            "manual" => NameSource::Manual,
            "dhcp" => NameSource::Dhcp,
            "snmp" => NameSource::Snmp,
            "lldp" => NameSource::Lldp,
            "cdp" => NameSource::Cdp,
            _ => NameSource::Unknown,
        };
        Ok(source)
    }
}

/// A raw, source-tagged name observation for one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameCandidate {
    pub device_id: String,
    pub name: String,
    pub address: Option<IpAddr>,
    pub source: NameSource,
}

impl NameCandidate {
    pub fn new(name: impl Into<String>, source: NameSource) -> Self {
        Self {
            device_id: String::new(),
            name: name.into(),
            address: None,
            source,
        }
    }

    pub fn for_device(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = device_id.into();
        self
    }

    pub fn with_address(mut self, address: IpAddr) -> Self {
        self.address = Some(address);
        self
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
