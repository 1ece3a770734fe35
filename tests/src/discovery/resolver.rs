use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use fathom_common::config::{Config, ResolverConfig};
use fathom_common::models::NameSource;
use fathom_core::naming;
use fathom_core::resolver::{NameResolver, ResolveError};
use fathom_protocols::netbios::encode_name;
use tokio::net::UdpSocket;

const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

fn nbstat_reply(id: u16, entries: &[(&str, u8, u16)]) -> Vec<u8> {
    let mut pkt = id.to_be_bytes().to_vec();
    pkt.extend_from_slice(&[0x84, 0x00, 0, 0, 0, 1, 0, 0, 0, 0, 0x20]);
    pkt.extend_from_slice(&encode_name("*"));
    pkt.extend_from_slice(&[0, 0x00, 0x21, 0x00, 0x01, 0, 0, 0, 0]);
    let mut rdata = vec![entries.len() as u8];
    for (name, suffix, flags) in entries {
        rdata.extend_from_slice(format!("{name:<15}").as_bytes());
        rdata.push(*suffix);
        rdata.extend_from_slice(&flags.to_be_bytes());
    }
    pkt.extend_from_slice(&(rdata.len() as u16).to_be_bytes());
    pkt.extend_from_slice(&rdata);
    pkt
}

/// Answers one NBSTAT request with the given entries.
async fn netbios_responder(entries: Vec<(&'static str, u8, u16)>) -> u16 {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let port = socket.local_addr().unwrap().port();
    tokio::spawn(async move {
        let mut buf = [0u8; 512];
        let (len, peer) = socket.recv_from(&mut buf).await.unwrap();
        assert_eq!(len, 50);
        let id = u16::from_be_bytes([buf[0], buf[1]]);
        socket
            .send_to(&nbstat_reply(id, &entries), peer)
            .await
            .unwrap();
    });
    port
}

fn netbios_only(port: u16) -> NameResolver {
    NameResolver::from_config(&Config {
        no_dns: true,
        no_mdns: true,
        resolver: ResolverConfig {
            netbios_port: port,
            ..Default::default()
        },
        ..Default::default()
    })
}

#[tokio::test]
async fn netbios_names_feed_the_naming_heuristic() {
    let port = netbios_responder(vec![
        ("WORKGROUP", 0x00, 0x8000),
        ("OFFICE-PC", 0x00, 0x0400),
        ("OFFICE-PC", 0x20, 0x0400),
    ])
    .await;

    let candidates = netbios_only(port)
        .lookup_addr("dev-1", LOCALHOST)
        .await
        .unwrap();
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].name, "OFFICE-PC");
    assert_eq!(candidates[0].source, NameSource::Netbios);
    assert_eq!(candidates[0].device_id, "dev-1");

    let best = naming::choose_best(&candidates).unwrap();
    assert_eq!(best.display, "OFFICE-PC");
}

#[tokio::test]
async fn silent_netbios_peer_fails_the_lookup() {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let port = socket.local_addr().unwrap().port();
    let resolver = NameResolver::from_config(&Config {
        no_dns: true,
        no_mdns: true,
        resolver: ResolverConfig {
            netbios_port: port,
            netbios_timeout: Duration::from_millis(50),
            ..Default::default()
        },
        ..Default::default()
    });

    let outcome = resolver.lookup_addr("dev-1", LOCALHOST).await;
    assert!(matches!(outcome, Err(ResolveError::Joined(_))));
    drop(socket);
}

#[tokio::test]
async fn all_lookups_disabled_is_an_empty_success() {
    let resolver = NameResolver::from_config(&Config {
        no_dns: true,
        no_mdns: true,
        no_netbios: true,
        ..Default::default()
    });
    assert!(resolver.lookup_addr("dev-1", LOCALHOST).await.unwrap().is_empty());
}
