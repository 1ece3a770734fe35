use std::time::Duration;

pub const DEFAULT_COMMUNITY: &str = "public";
pub const DEFAULT_SNMP_VERSION: &str = "2c";
pub const DEFAULT_SNMP_PORT: u16 = 161;
pub const DEFAULT_SNMP_TIMEOUT: Duration = Duration::from_millis(900);
pub const DEFAULT_MAX_REPETITIONS: u32 = 10;

pub const DEFAULT_MDNS_TIMEOUT: Duration = Duration::from_millis(400);
pub const DEFAULT_NETBIOS_TIMEOUT: Duration = Duration::from_millis(500);
pub const DEFAULT_DNS_TIMEOUT: Duration = Duration::from_secs(1);
pub const DEFAULT_NETBIOS_PORT: u16 = 137;
pub const DEFAULT_MDNS_PORT: u16 = 5353;

#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Disables the reverse DNS sub-lookup.
    pub no_dns: bool,
    /// Disables the mDNS sub-lookup.
    pub no_mdns: bool,
    /// Disables the NetBIOS node status sub-lookup.
    pub no_netbios: bool,
    pub quiet: u8,
    pub snmp: SnmpConfig,
    pub resolver: ResolverConfig,
}

/// Session parameters for SNMP polling.
///
/// The version is kept as the raw operator string and validated when a
/// client is built, so an unsupported value surfaces as a configuration
/// error at the call site instead of at parse time.
#[derive(Debug, Clone)]
pub struct SnmpConfig {
    pub community: String,
    pub version: String,
    pub port: u16,
    pub timeout: Duration,
    pub max_repetitions: u32,
}

impl Default for SnmpConfig {
    fn default() -> Self {
        Self {
            community: DEFAULT_COMMUNITY.to_string(),
            version: DEFAULT_SNMP_VERSION.to_string(),
            port: DEFAULT_SNMP_PORT,
            timeout: DEFAULT_SNMP_TIMEOUT,
            max_repetitions: DEFAULT_MAX_REPETITIONS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolverConfig {
    pub dns_timeout: Duration,
    pub mdns_timeout: Duration,
    pub netbios_timeout: Duration,
    pub mdns_port: u16,
    pub netbios_port: u16,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            dns_timeout: DEFAULT_DNS_TIMEOUT,
            mdns_timeout: DEFAULT_MDNS_TIMEOUT,
            netbios_timeout: DEFAULT_NETBIOS_TIMEOUT,
            mdns_port: DEFAULT_MDNS_PORT,
            netbios_port: DEFAULT_NETBIOS_PORT,
        }
    }
}
