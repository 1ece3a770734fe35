use std::net::{IpAddr, SocketAddr};

use fathom_protocols::netbios;
use tokio::net::UdpSocket;
use tokio::time::Instant;

use super::ResolveError;

const MAX_DATAGRAM: usize = 1_500;

/// Sends a single NBSTAT request to `address:port` and parses the reply.
///
/// The reply must carry the transaction id we sent; anything else fails the
/// lookup rather than being skipped.
pub(super) async fn node_status(
    address: IpAddr,
    port: u16,
    deadline: Instant,
) -> Result<Vec<String>, ResolveError> {
    let bind_addr = if address.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
    let socket = UdpSocket::bind(bind_addr).await?;
    socket.connect(SocketAddr::new(address, port)).await?;

    let id: u16 = rand::random();
    socket.send(&netbios::create_nbstat_request(id)).await?;

    let started = Instant::now();
    let mut buffer = [0u8; MAX_DATAGRAM];
    let len = match tokio::time::timeout_at(deadline, socket.recv(&mut buffer)).await {
        Ok(received) => received?,
        Err(_elapsed) => return Err(ResolveError::Timeout(started.elapsed())),
    };

    Ok(netbios::parse_nbstat_response(&buffer[..len], id)?)
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
    use fathom_protocols::netbios::{NetbiosError, encode_name};
    use std::net::Ipv4Addr;
    use std::time::Duration;

    fn response(id: u16, entries: &[(&str, u8, u16)]) -> Vec<u8> {
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

    async fn responder(id_offset: u16, entries: Vec<(&'static str, u8, u16)>) -> u16 {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = socket.local_addr().unwrap().port();
        tokio::spawn(async move {
            let mut buf = [0u8; 64];
            let (len, from) = socket.recv_from(&mut buf).await.unwrap();
            assert_eq!(len, netbios::NBSTAT_REQUEST_LEN);
            let id = u16::from_be_bytes([buf[0], buf[1]]).wrapping_add(id_offset);
            socket.send_to(&response(id, &entries), from).await.unwrap();
        });
        port
    }

    fn deadline() -> Instant {
        Instant::now() + Duration::from_millis(500)
    }

    #[tokio::test]
    async fn preferred_name_survives_group_filter() {
        let port = responder(0, vec![("WORKSTATION7", 0x20, 0x0400), ("CORP", 0x00, 0x8400)]).await;
        let names = node_status(IpAddr::V4(Ipv4Addr::LOCALHOST), port, deadline())
            .await
            .unwrap();
        assert_eq!(names, vec!["WORKSTATION7"]);
    }

    #[tokio::test]
    async fn wrong_transaction_id_fails() {
        let port = responder(1, vec![("HOST", 0x20, 0)]).await;
        let result = node_status(IpAddr::V4(Ipv4Addr::LOCALHOST), port, deadline()).await;
        assert!(matches!(
            result,
            Err(ResolveError::Netbios(NetbiosError::TransactionMismatch { .. }))
        ));
    }

    #[tokio::test]
    async fn silent_host_times_out() {
        let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = silent.local_addr().unwrap().port();
        let soon = Instant::now() + Duration::from_millis(50);
        let result = node_status(IpAddr::V4(Ipv4Addr::LOCALHOST), port, soon).await;
        assert!(matches!(result, Err(ResolveError::Timeout(_))));
    }
}
