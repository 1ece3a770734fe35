//! # Name Candidate Resolver
//!
//! Asks three independent protocols what a single address is called:
//! reverse DNS, multicast DNS and NetBIOS node status. The sub-lookups run
//! concurrently and never abort each other; their answers are merged into a
//! single source-tagged candidate list for the naming heuristic.

use std::net::IpAddr;
use std::time::Duration;

use fathom_common::config::{Config, ResolverConfig};
use fathom_common::debug;
use fathom_common::models::{NameCandidate, NameSource};
use fathom_protocols::dns;
use fathom_protocols::mdns::MdnsError;
use fathom_protocols::netbios::NetbiosError;
use thiserror::Error;
use tokio::time::Instant;

mod mdns;
mod netbios;
mod reverse;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),
    #[error("netbios: {0}")]
    Netbios(#[from] NetbiosError),
    #[error("mdns: {0}")]
    Mdns(#[from] MdnsError),
    #[error("lookup task failed: {0}")]
    Task(String),
    #[error("{}", join_errors(.0))]
    Joined(Vec<(NameSource, ResolveError)>),
}

fn join_errors(errors: &[(NameSource, ResolveError)]) -> String {
    errors
        .iter()
        .map(|(source, err)| format!("{source}: {err}"))
        .collect::<Vec<String>>()
        .join("; ")
}

/// Looks up name candidates for addresses.
///
/// Holds no sockets between calls; every lookup opens and closes its own.
#[derive(Debug, Clone)]
pub struct NameResolver {
    cfg: ResolverConfig,
    reverse_dns: bool,
    mdns: bool,
    netbios: bool,
}

impl NameResolver {
    pub fn new(cfg: ResolverConfig) -> Self {
        Self {
            cfg,
            reverse_dns: true,
            mdns: true,
            netbios: true,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            cfg: config.resolver.clone(),
            reverse_dns: !config.no_dns,
            mdns: !config.no_mdns,
            netbios: !config.no_netbios,
        }
    }

    /// Returns the deduplicated candidates for `address`.
    ///
    /// Candidates keep the order reverse DNS, mDNS, NetBIOS; a name seen twice
    /// (ignoring case) keeps its first occurrence. The call only fails when
    /// nothing was found and at least one sub-lookup failed.
    pub async fn lookup_addr(
        &self,
        device_id: &str,
        address: IpAddr,
    ) -> Result<Vec<NameCandidate>, ResolveError> {
        self.lookup_addr_until(device_id, address, None).await
    }

    /// Same as [`lookup_addr`](Self::lookup_addr), but no sub-lookup waits
    /// past `deadline`.
    pub async fn lookup_addr_until(
        &self,
        device_id: &str,
        address: IpAddr,
        deadline: Option<Instant>,
    ) -> Result<Vec<NameCandidate>, ResolveError> {
        let (by_dns, by_mdns, by_netbios) = tokio::join!(
            self.reverse_dns(address, deadline),
            self.mdns(address, deadline),
            self.netbios(address, deadline),
        );

        aggregate(
            device_id,
            address,
            vec![
                (NameSource::ReverseDns, by_dns),
                (NameSource::Mdns, by_mdns),
                (NameSource::Netbios, by_netbios),
            ],
        )
    }

    async fn reverse_dns(
        &self,
        address: IpAddr,
        deadline: Option<Instant>,
    ) -> Result<Vec<String>, ResolveError> {
        if !self.reverse_dns {
            return Ok(Vec::new());
        }
        reverse::lookup(address, capped(self.cfg.dns_timeout, deadline)).await
    }

    async fn mdns(
        &self,
        address: IpAddr,
        deadline: Option<Instant>,
    ) -> Result<Vec<String>, ResolveError> {
        if !self.mdns {
            return Ok(Vec::new());
        }
        let wait = capped(self.cfg.mdns_timeout, deadline);
        mdns::lookup(address, self.cfg.mdns_port, wait).await
    }

    async fn netbios(
        &self,
        address: IpAddr,
        deadline: Option<Instant>,
    ) -> Result<Vec<String>, ResolveError> {
        if !self.netbios {
            return Ok(Vec::new());
        }
        let own = Instant::now() + self.cfg.netbios_timeout;
        let deadline = deadline.map_or(own, |deadline| deadline.min(own));
        netbios::node_status(address, self.cfg.netbios_port, deadline).await
    }
}

/// The configured wait, shortened to whatever is left before `deadline`.
fn capped(wait: Duration, deadline: Option<Instant>) -> Duration {
    match deadline {
        Some(deadline) => wait.min(deadline.saturating_duration_since(Instant::now())),
        None => wait,
    }
}

fn aggregate(
    device_id: &str,
    address: IpAddr,
    results: Vec<(NameSource, Result<Vec<String>, ResolveError>)>,
) -> Result<Vec<NameCandidate>, ResolveError> {
    let mut candidates: Vec<NameCandidate> = Vec::new();
    let mut failures: Vec<(NameSource, ResolveError)> = Vec::new();

    for (source, result) in results {
        match result {
            Ok(names) => {
                for name in names.iter().map(|n| dns::trim_name(n)) {
                    let seen = candidates.iter().any(|c| c.name.eq_ignore_ascii_case(&name));
                    if name.is_empty() || seen {
                        continue;
                    }
                    candidates.push(
                        NameCandidate::new(name, source)
                            .for_device(device_id)
                            .with_address(address),
                    );
                }
            }
            Err(err) => {
                debug!("{source} lookup for {address} failed: {err}");
                failures.push((source, err));
            }
        }
    }

    if candidates.is_empty() && !failures.is_empty() {
        return Err(ResolveError::Joined(failures));
    }
    Ok(candidates)
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
    use std::net::Ipv4Addr;

    const ADDR: IpAddr = IpAddr::V4(Ipv4Addr::new(192, 168, 1, 40));

    fn names(list: &[&str]) -> Result<Vec<String>, ResolveError> {
        Ok(list.iter().map(|n| n.to_string()).collect())
    }

    #[test]
    fn first_occurrence_wins_across_sources() {
        let result = aggregate(
            "dev-1",
            ADDR,
            vec![
                (NameSource::ReverseDns, names(&["nas.lan."])),
                (NameSource::Mdns, names(&["NAS.lan", "nas.local"])),
                (NameSource::Netbios, names(&["NAS", "nas.local"])),
            ],
        )
        .unwrap();

        let got: Vec<(&str, NameSource)> =
            result.iter().map(|c| (c.name.as_str(), c.source)).collect();
        assert_eq!(
            got,
            vec![
                ("nas.lan", NameSource::ReverseDns),
                ("nas.local", NameSource::Mdns),
                ("NAS", NameSource::Netbios),
            ]
        );
        assert!(result.iter().all(|c| c.device_id == "dev-1"));
        assert!(result.iter().all(|c| c.address == Some(ADDR)));
    }

    #[test]
    fn one_failure_does_not_hide_other_answers() {
        let result = aggregate(
            "dev-1",
            ADDR,
            vec![
                (NameSource::ReverseDns, Err(ResolveError::Timeout(Duration::from_secs(1)))),
                (NameSource::Mdns, Err(MdnsError::NoRecords.into())),
                (NameSource::Netbios, names(&["DESKTOP-1"])),
            ],
        )
        .unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].source, NameSource::Netbios);
    }

    #[test]
    fn nothing_found_with_failures_is_a_joined_error() {
        let result = aggregate(
            "dev-1",
            ADDR,
            vec![
                (NameSource::ReverseDns, names(&[])),
                (NameSource::Mdns, Err(MdnsError::NoRecords.into())),
                (NameSource::Netbios, Err(NetbiosError::NoNames.into())),
            ],
        );
        match result {
            Err(ResolveError::Joined(errors)) => {
                assert_eq!(errors.len(), 2);
                assert_eq!(errors[0].0, NameSource::Mdns);
                assert_eq!(errors[1].0, NameSource::Netbios);
            }
            other => panic!("expected joined error, got {other:?}"),
        }
    }

    #[test]
    fn joined_error_mentions_every_source() {
        let err = ResolveError::Joined(vec![
            (NameSource::Mdns, MdnsError::NoRecords.into()),
            (NameSource::Netbios, NetbiosError::NoNames.into()),
        ]);
        let text = err.to_string();
        assert!(text.contains("mdns: "));
        assert!(text.contains("netbios: "));
    }

    #[test]
    fn nothing_found_without_failures_is_empty_success() {
        let result = aggregate(
            "dev-1",
            ADDR,
            vec![
                (NameSource::ReverseDns, names(&[])),
                (NameSource::Mdns, names(&[])),
                (NameSource::Netbios, names(&[" . "])),
            ],
        );
        assert!(result.unwrap().is_empty());
    }

    #[tokio::test]
    async fn disabled_sub_lookups_are_empty() {
        let config = Config {
            no_dns: true,
            no_mdns: true,
            no_netbios: true,
            ..Default::default()
        };
        let resolver = NameResolver::from_config(&config);
        let result = resolver.lookup_addr("dev", ADDR).await.unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn capped_waits_never_exceed_the_deadline() {
        let wait = Duration::from_millis(400);
        assert_eq!(capped(wait, None), wait);
        let soon = Instant::now() + Duration::from_millis(50);
        assert!(capped(wait, Some(soon)) <= Duration::from_millis(50));
        let past = Instant::now() - Duration::from_millis(5);
        assert_eq!(capped(wait, Some(past)), Duration::ZERO);
    }
}
