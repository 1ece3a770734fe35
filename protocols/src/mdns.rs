//! Reverse lookups over multicast DNS.
//!
//! Queries go out as one-shot "legacy unicast" questions: the socket is bound
//! to an ephemeral port, so responders answer us directly rather than on the
//! multicast group.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use dns_parser::{Builder, Packet, QueryClass, QueryType, RData};
use thiserror::Error;

use crate::dns;

pub const MDNS_PORT: u16 = 5353;
pub const MDNS_IPV4_GROUP: Ipv4Addr = Ipv4Addr::new(224, 0, 0, 251);
pub const MDNS_IPV6_GROUP: Ipv6Addr = Ipv6Addr::new(0xff02, 0, 0, 0, 0, 0, 0, 0xfb);

#[derive(Debug, Error)]
pub enum MdnsError {
    #[error("failed to build mDNS query")]
    Build,
    #[error("failed to parse mDNS packet: {0}")]
    Parse(#[from] dns_parser::Error),
    #[error("no PTR or CNAME records in answer")]
    NoRecords,
}

/// The multicast rendezvous endpoint matching the target's address family.
pub fn multicast_endpoint(target: &IpAddr, port: u16) -> SocketAddr {
    match target {
        IpAddr::V4(_) => SocketAddr::new(IpAddr::V4(MDNS_IPV4_GROUP), port),
        IpAddr::V6(_) => SocketAddr::new(IpAddr::V6(MDNS_IPV6_GROUP), port),
    }
}

/// Builds a non-recursive PTR question for the reverse name of `target`.
pub fn create_ptr_query(target: &IpAddr, id: u16) -> Result<Vec<u8>, MdnsError> {
    let qname = dns::reverse_address_to_ptr(target);
    let mut builder = Builder::new_query(id, false);
    builder.add_question(&qname, false, QueryType::PTR, QueryClass::IN);
    builder.build().map_err(|_| MdnsError::Build)
}

/// Extracts names from the PTR and CNAME answers of a response.
///
/// A response without either record type is [`MdnsError::NoRecords`], not an
/// empty success.
pub fn extract_names(data: &[u8]) -> Result<Vec<String>, MdnsError> {
    let packet = Packet::parse(data)?;
    let names: Vec<String> = packet
        .answers
        .iter()
        .filter_map(|record| match &record.data {
            RData::PTR(ptr) => Some(ptr.0.to_string()),
            RData::CNAME(cname) => Some(cname.0.to_string()),
            _ => None,
        })
        .map(|name| dns::trim_name(&name))
        .filter(|name| !name.is_empty())
        .collect();

    if names.is_empty() {
        return Err(MdnsError::NoRecords);
    }
    Ok(names)
}

/// Reads the transaction id of a DNS message without parsing the rest.
pub fn transaction_id(data: &[u8]) -> Option<u16> {
    let bytes: [u8; 2] = data.get(0..2)?.try_into().ok()?;
    Some(u16::from_be_bytes(bytes))
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

    /// Hand-assembles a response with one answer record pointing at `target`.
    fn answer_packet(id: u16, rtype: u16, owner: &str, target: &str) -> Vec<u8> {
        let mut pkt = Vec::new();
        pkt.extend_from_slice(&id.to_be_bytes());
        pkt.extend_from_slice(&[0x84, 0x00]); // response, authoritative
        pkt.extend_from_slice(&[0, 0, 0, 1, 0, 0, 0, 0]);
        pkt.extend_from_slice(&dns::encode_dns_name(owner));
        pkt.extend_from_slice(&rtype.to_be_bytes());
        pkt.extend_from_slice(&[0x00, 0x01]);
        pkt.extend_from_slice(&120u32.to_be_bytes());
        let rdata = dns::encode_dns_name(target);
        pkt.extend_from_slice(&(rdata.len() as u16).to_be_bytes());
        pkt.extend_from_slice(&rdata);
        pkt
    }

    #[test]
    fn query_is_a_single_non_recursive_ptr_question() {
        let ip: IpAddr = "192.168.1.20".parse().unwrap();
        let bytes = create_ptr_query(&ip, 0x1234).unwrap();
        assert_eq!(&bytes[0..2], &[0x12, 0x34]);
        assert_eq!(bytes[2] & 0x01, 0, "recursion desired must be cleared");

        let packet = Packet::parse(&bytes).unwrap();
        assert_eq!(packet.questions.len(), 1);
        assert_eq!(
            packet.questions[0].qname.to_string(),
            "20.1.168.192.in-addr.arpa"
        );
        assert_eq!(packet.questions[0].qtype, QueryType::PTR);
    }

    #[test]
    fn endpoints_follow_address_family() {
        let v4: IpAddr = "10.0.0.1".parse().unwrap();
        let v6: IpAddr = "fe80::1".parse().unwrap();
        assert_eq!(multicast_endpoint(&v4, MDNS_PORT).to_string(), "224.0.0.251:5353");
        assert_eq!(multicast_endpoint(&v6, MDNS_PORT).to_string(), "[ff02::fb]:5353");
    }

    #[test]
    fn ptr_and_cname_answers_are_names() {
        let ptr = answer_packet(7, 12, "1.0.0.10.in-addr.arpa", "printer.local");
        assert_eq!(extract_names(&ptr).unwrap(), vec!["printer.local"]);

        let cname = answer_packet(7, 5, "1.0.0.10.in-addr.arpa", "alias.local");
        assert_eq!(extract_names(&cname).unwrap(), vec!["alias.local"]);
    }

    #[test]
    fn unrelated_answers_are_no_records() {
        let mut pkt = Vec::new();
        pkt.extend_from_slice(&[0, 7, 0x84, 0, 0, 0, 0, 1, 0, 0, 0, 0]);
        pkt.extend_from_slice(&dns::encode_dns_name("printer.local"));
        pkt.extend_from_slice(&[0, 1, 0, 1, 0, 0, 0, 120, 0, 4, 10, 0, 0, 1]);
        assert!(matches!(extract_names(&pkt), Err(MdnsError::NoRecords)));
    }

    #[test]
    fn garbage_is_a_parse_error() {
        assert!(matches!(extract_names(&[1, 2, 3]), Err(MdnsError::Parse(_))));
    }
}
