use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use fathom_protocols::mdns;
use tokio::net::UdpSocket;
use tokio::time::Instant;

use super::ResolveError;

const MAX_DATAGRAM: usize = 9_000;

pub(super) async fn lookup(
    address: IpAddr,
    port: u16,
    wait: Duration,
) -> Result<Vec<String>, ResolveError> {
    let endpoint = mdns::multicast_endpoint(&address, port);
    query(endpoint, &address, wait).await
}

/// Sends one PTR question to `endpoint` and waits for the first answer that
/// carries our transaction id.
pub(super) async fn query(
    endpoint: SocketAddr,
    address: &IpAddr,
    wait: Duration,
) -> Result<Vec<String>, ResolveError> {
    let bind_addr = if endpoint.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
    let socket = UdpSocket::bind(bind_addr).await?;

    let id: u16 = rand::random();
    let packet = mdns::create_ptr_query(address, id)?;
    socket.send_to(&packet, endpoint).await?;

    let deadline = Instant::now() + wait;
    let mut buffer = vec![0u8; MAX_DATAGRAM];
    loop {
        let (len, _from) =
            match tokio::time::timeout_at(deadline, socket.recv_from(&mut buffer)).await {
                Ok(received) => received?,
                Err(_elapsed) => return Err(ResolveError::Timeout(wait)),
            };

        let response = &buffer[..len];
        if mdns::transaction_id(response) != Some(id) {
            continue;
        }
        return Ok(mdns::extract_names(response)?);
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
