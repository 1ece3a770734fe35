use std::sync::OnceLock;

use mac_oui::Oui;
use pnet::util::MacAddr;

static OUI_DB: OnceLock<Option<Oui>> = OnceLock::new();

/// Retrieves or initializes the **Organizationally unique identifier** database.
fn get_oui_db() -> Option<&'static Oui> {
    OUI_DB.get_or_init(|| Oui::default().ok()).as_ref()
}

/// Identify the vendor of a MAC address.
pub fn get_vendor(mac: MacAddr) -> Option<String> {
    let db = get_oui_db()?;
    match db.lookup_by_mac(&mac.to_string()) {
        Ok(Some(entry)) => Some(entry.company_name.clone()),
        _ => None,
    }
}

/// Builds a MAC address from a six byte value, treating all zeroes as absent.
pub fn from_bytes(bytes: &[u8]) -> Option<MacAddr> {
    let octets: [u8; 6] = bytes.try_into().ok()?;
    if octets == [0; 6] {
        return None;
    }
    let [a, b, c, d, e, f] = octets;
    Some(MacAddr::new(a, b, c, d, e, f))
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

    #[test]
    fn zero_mac_is_absent() {
        assert_eq!(from_bytes(&[0; 6]), None);
    }

    #[test]
    fn wrong_length_is_absent() {
        assert_eq!(from_bytes(&[0xaa, 0xbb, 0xcc]), None);
        assert_eq!(from_bytes(&[1; 8]), None);
    }

    #[test]
    fn six_bytes_make_a_mac() {
        let mac = from_bytes(&[0xa8, 0xa1, 0x59, 0x13, 0x41, 0x46]).unwrap();
        assert_eq!(mac, MacAddr::new(0xa8, 0xa1, 0x59, 0x13, 0x41, 0x46));
    }
}
