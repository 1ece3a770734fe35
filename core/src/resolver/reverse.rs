use std::net::IpAddr;
use std::time::Duration;

use fathom_protocols::dns;

use super::ResolveError;

/// Standard PTR lookup through the system resolver.
///
/// The system call blocks, so it runs on the blocking pool and is abandoned
/// when `wait` elapses. A resolver that answers with the numeric address
/// means there is no PTR record, which is an empty answer and not an error.
pub(super) async fn lookup(address: IpAddr, wait: Duration) -> Result<Vec<String>, ResolveError> {
    let task = tokio::task::spawn_blocking(move || dns_lookup::lookup_addr(&address));

    let hostname = match tokio::time::timeout(wait, task).await {
        Err(_elapsed) => return Err(ResolveError::Timeout(wait)),
        Ok(Err(join_err)) => return Err(ResolveError::Task(join_err.to_string())),
        Ok(Ok(result)) => result?,
    };

    let name = dns::trim_name(&hostname);
    if name.is_empty() || name.parse::<IpAddr>().is_ok() {
        return Ok(Vec::new());
    }
    Ok(vec![name])
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

    #[tokio::test]
    #[ignore]
    async fn loopback_has_a_name() {
        let names = lookup(IpAddr::V4(Ipv4Addr::LOCALHOST), Duration::from_secs(2))
            .await
            .unwrap();
        assert!(!names.is_empty());
    }

    #[tokio::test]
    async fn zero_wait_times_out() {
        let result = lookup(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)), Duration::ZERO).await;
        assert!(matches!(result, Err(ResolveError::Timeout(_))));
    }
}
