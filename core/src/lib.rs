//! # Fathom Core
//!
//! Agentless fact discovery for networked devices.
//!
//! * **[`resolver`]**: name candidates from reverse DNS, mDNS and NetBIOS.
//! * **[`snmp`]**: system group, integer tables and the interface table.
//! * **[`vlan`]**: PVID per port from the bridge MIBs.
//! * **[`neighbors`]**: LLDP and CDP adjacencies read over SNMP.
//! * **[`naming`]**: picks one display name out of many candidates.
//! * **[`scheduler`]**: claims discovery runs and executes them.

pub mod naming;
pub mod neighbors;
pub mod resolver;
pub mod scheduler;
pub mod snmp;
pub mod vlan;
