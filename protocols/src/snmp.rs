//! Owned SNMP values and the decoders fathom applies to them.
//!
//! Agents disagree on which integer encoding they use for the same column,
//! so values are carried as a sum type and every accessor returns `Option`.
//! Anything unexpected decodes to "absent" instead of failing the walk.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use thiserror::Error;

/// An object identifier as a sequence of arcs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(Vec<u64>);

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid object identifier: {0}")]
pub struct InvalidOid(pub String);

impl ObjectId {
    pub fn new(arcs: impl Into<Vec<u64>>) -> Self {
        Self(arcs.into())
    }

    pub fn arcs(&self) -> &[u64] {
        &self.0
    }

    /// `self` is strictly inside the subtree rooted at `base`.
    pub fn is_under(&self, base: &ObjectId) -> bool {
        self.0.len() > base.0.len() && self.0.starts_with(&base.0)
    }

    /// Appends one arc, e.g. to address a column instance.
    pub fn child(&self, arc: u64) -> ObjectId {
        let mut arcs = self.0.clone();
        arcs.push(arc);
        ObjectId(arcs)
    }

    /// The last arc, used as the row index of single-index tables.
    pub fn last_index(&self) -> Option<u32> {
        self.0.last().and_then(|arc| u32::try_from(*arc).ok())
    }

    /// The trailing two arcs, used as the composite row index of the
    /// LLDP and CDP neighbor tables.
    pub fn last_two_indices(&self) -> Option<(u32, u32)> {
        let [.., first, second] = self.0.as_slice() else {
            return None;
        };
        Some((u32::try_from(*first).ok()?, u32::try_from(*second).ok()?))
    }
}

impl From<&[u64]> for ObjectId {
    fn from(arcs: &[u64]) -> Self {
        ObjectId(arcs.to_vec())
    }
}

impl FromStr for ObjectId {
    type Err = InvalidOid;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches('.');
        if trimmed.is_empty() {
            return Err(InvalidOid(s.to_string()));
        }
        trimmed
            .split('.')
            .map(|arc| arc.parse::<u64>())
            .collect::<Result<Vec<u64>, _>>()
            .map(ObjectId)
            .map_err(|_| InvalidOid(s.to_string()))
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for arc in &self.0 {
            if !first {
                f.write_str(".")?;
            }
            write!(f, "{arc}")?;
            first = false;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnmpValue {
    Integer(i64),
    Counter32(u32),
    Unsigned32(u32),
    Timeticks(u32),
    Counter64(u64),
    OctetString(Vec<u8>),
    ObjectIdentifier(ObjectId),
    IpAddress([u8; 4]),
    Null,
    NoSuchObject,
    NoSuchInstance,
    EndOfMibView,
    /// Any encoding fathom does not interpret.
    Other,
}

impl SnmpValue {
    /// Any member of the integer family, widened to `i64`.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            SnmpValue::Integer(v) => Some(*v),
            SnmpValue::Counter32(v) | SnmpValue::Unsigned32(v) | SnmpValue::Timeticks(v) => {
                Some(i64::from(*v))
            }
            SnmpValue::Counter64(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            SnmpValue::OctetString(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// The value as trimmed text; empty text is absent.
    pub fn as_text(&self) -> Option<String> {
        let text = match self {
            SnmpValue::OctetString(bytes) => String::from_utf8_lossy(bytes).into_owned(),
            SnmpValue::ObjectIdentifier(oid) => oid.to_string(),
            SnmpValue::IpAddress(octets) => Ipv4Addr::from(*octets).to_string(),
            _ => return None,
        };
        let text = text.trim_matches(|c: char| c.is_whitespace() || c == '\0');
        (!text.is_empty()).then(|| text.to_string())
    }

    /// True for the markers an agent uses instead of a value.
    pub fn is_exception(&self) -> bool {
        matches!(
            self,
            SnmpValue::NoSuchObject | SnmpValue::NoSuchInstance | SnmpValue::EndOfMibView
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarBind {
    pub oid: ObjectId,
    pub value: SnmpValue,
}

impl VarBind {
    pub fn new(oid: ObjectId, value: SnmpValue) -> Self {
        Self { oid, value }
    }
}

/// Decodes a CDP cache address.
///
/// Agents report either the raw address (4 or 16 bytes) or a short
/// type/length/value form where type 1 carries IPv4 and type 2 carries IPv6.
/// Anything else is not understood.
pub fn parse_cdp_address(bytes: &[u8]) -> Option<IpAddr> {
    match bytes.len() {
        4 => return Some(IpAddr::V4(ipv4(bytes)?)),
        16 => return Some(IpAddr::V6(ipv6(bytes)?)),
        _ => {}
    }

    let [kind, len, payload @ ..] = bytes else {
        return None;
    };
    let payload = payload.get(..*len as usize)?;
    match (kind, payload.len()) {
        (1, 4) => Some(IpAddr::V4(ipv4(payload)?)),
        (2, 16) => Some(IpAddr::V6(ipv6(payload)?)),
        _ => None,
    }
}

fn ipv4(bytes: &[u8]) -> Option<Ipv4Addr> {
    let octets: [u8; 4] = bytes.try_into().ok()?;
    Some(Ipv4Addr::from(octets))
}

fn ipv6(bytes: &[u8]) -> Option<Ipv6Addr> {
    let octets: [u8; 16] = bytes.try_into().ok()?;
    Some(Ipv6Addr::from(octets))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
