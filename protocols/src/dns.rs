use std::fmt::Write;
use std::net::IpAddr;

/// Builds the reverse-lookup owner name for an address, e.g.
/// `4.3.2.1.in-addr.arpa` for `1.2.3.4` or the nibble form under `ip6.arpa`.
pub fn reverse_address_to_ptr(ip_addr: &IpAddr) -> String {
    match ip_addr {
        IpAddr::V4(v4) => {
            let [a, b, c, d] = v4.octets();
            format!("{d}.{c}.{b}.{a}.in-addr.arpa")
        }
        IpAddr::V6(v6) => {
            let mut name = String::with_capacity(72);
            for byte in v6.octets().iter().rev() {
                let _ = write!(name, "{:x}.{:x}.", byte & 0x0f, byte >> 4);
            }
            name.push_str("ip6.arpa");
            name
        }
    }
}

/// Trims surrounding whitespace and a single trailing root delimiter.
pub fn trim_name(name: &str) -> String {
    let trimmed = name.trim();
    let trimmed = trimmed.strip_suffix('.').unwrap_or(trimmed);
    trimmed.trim().to_string()
}

/// Encodes a dotted name as a length-prefixed label chain.
pub fn encode_dns_name(name: &str) -> Vec<u8> {
    let mut encoded: Vec<u8> = Vec::new();
    for label in name.split('.') {
        if label.is_empty() {
            continue;
        }
        encoded.push(label.len() as u8);
        encoded.extend_from_slice(label.as_bytes());
    }
    encoded.push(0);
    encoded
}

/// Returns the offset just past the domain name starting at `cursor`.
///
/// The name is either a label chain terminated by a zero byte or ends in a
/// two byte compression pointer. Returns `None` if the buffer ends first.
pub fn skip_dns_name(data: &[u8], mut cursor: usize) -> Option<usize> {
    loop {
        let len = *data.get(cursor)?;
        match len {
            0 => return Some(cursor + 1),
            l if l & 0xc0 == 0xc0 => {
                data.get(cursor + 1)?;
                return Some(cursor + 2);
            }
            l => {
                cursor += 1 + l as usize;
                if cursor > data.len() {
                    return None;
                }
            }
        }
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
