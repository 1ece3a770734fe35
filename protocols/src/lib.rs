//! Wire codecs for the protocols fathom speaks.
//!
//! Everything here is pure: bytes in, values out. Sockets, timeouts and
//! retries belong to `fathom-core`.

pub mod dns;
pub mod mdns;
pub mod netbios;
pub mod snmp;
