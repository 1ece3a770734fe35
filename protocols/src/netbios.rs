//! NetBIOS Name Service node status (NBSTAT) codec.

use thiserror::Error;

use crate::dns;

pub const NETBIOS_NS_PORT: u16 = 137;
pub const NBSTAT_REQUEST_LEN: usize = 50;
pub const TYPE_NBSTAT: u16 = 0x0021;
pub const CLASS_IN: u16 = 0x0001;

const HEADER_LEN: usize = 12;
const RR_HEADER_LEN: usize = 10;
const ENTRY_LEN: usize = 18;
const NAME_LEN: usize = 15;
const GROUP_FLAG: u16 = 0x8000;

const SUFFIX_WORKSTATION: u8 = 0x20;
const SUFFIX_COMPUTER: u8 = 0x00;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NetbiosError {
    #[error("transaction id mismatch: expected {expected:#06x}, got {actual:#06x}")]
    TransactionMismatch { expected: u16, actual: u16 },
    #[error("truncated NBSTAT response")]
    Truncated,
    #[error("unexpected record type {0:#06x}")]
    UnexpectedRecordType(u16),
    #[error("no names in node status response")]
    NoNames,
}

/// One row of the node status name table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NbstatEntry {
    pub name: String,
    pub suffix: u8,
    pub flags: u16,
}

impl NbstatEntry {
    pub fn is_group(&self) -> bool {
        self.flags & GROUP_FLAG != 0
    }
}

/// Half-ASCII ("first level") encoding of a NetBIOS name: the name is
/// upper-cased, space padded to 16 bytes and every nibble becomes `'A' + n`.
pub fn encode_name(name: &str) -> [u8; 32] {
    let mut padded = [b' '; 16];
    for (slot, byte) in padded.iter_mut().zip(name.to_ascii_uppercase().bytes()) {
        *slot = byte;
    }

    let mut encoded = [0u8; 32];
    for (idx, byte) in padded.iter().enumerate() {
        encoded[idx * 2] = b'A' + (byte >> 4);
        encoded[idx * 2 + 1] = b'A' + (byte & 0x0f);
    }
    encoded
}

/// Builds the 50 byte wildcard node status request.
pub fn create_nbstat_request(transaction_id: u16) -> [u8; NBSTAT_REQUEST_LEN] {
    let mut buffer = [0u8; NBSTAT_REQUEST_LEN];
    buffer[0..2].copy_from_slice(&transaction_id.to_be_bytes());
    buffer[4..6].copy_from_slice(&1u16.to_be_bytes());
    buffer[12] = 0x20;
    buffer[13..45].copy_from_slice(&encode_name("*"));
    buffer[45] = 0;
    buffer[46..48].copy_from_slice(&TYPE_NBSTAT.to_be_bytes());
    buffer[48..50].copy_from_slice(&CLASS_IN.to_be_bytes());
    buffer
}

/// Parses a node status response into its raw name table.
///
/// The question echo (if the responder included one) and the record name are
/// skipped, then the record must be of type NBSTAT.
pub fn parse_nbstat_entries(
    data: &[u8],
    expected_id: u16,
) -> Result<Vec<NbstatEntry>, NetbiosError> {
    if data.len() < HEADER_LEN {
        return Err(NetbiosError::Truncated);
    }
    let actual = read_u16(data, 0)?;
    if actual != expected_id {
        return Err(NetbiosError::TransactionMismatch {
            expected: expected_id,
            actual,
        });
    }

    let question_count = read_u16(data, 4)?;
    let mut cursor = HEADER_LEN;
    if question_count > 0 {
        cursor = dns::skip_dns_name(data, cursor).ok_or(NetbiosError::Truncated)?;
        cursor += 4;
    }
    cursor = dns::skip_dns_name(data, cursor).ok_or(NetbiosError::Truncated)?;

    if data.len() < cursor + RR_HEADER_LEN {
        return Err(NetbiosError::Truncated);
    }
    let rtype = read_u16(data, cursor)?;
    if rtype != TYPE_NBSTAT {
        return Err(NetbiosError::UnexpectedRecordType(rtype));
    }
    let rdlength = read_u16(data, cursor + 8)? as usize;
    cursor += RR_HEADER_LEN;

    let rdata_end = (cursor + rdlength).min(data.len());
    let rdata = data.get(cursor..rdata_end).ok_or(NetbiosError::Truncated)?;
    let (&count, table) = rdata.split_first().ok_or(NetbiosError::Truncated)?;

    let count = count as usize;
    if table.len() < count * ENTRY_LEN {
        return Err(NetbiosError::Truncated);
    }

    let entries = table
        .chunks_exact(ENTRY_LEN)
        .take(count)
        .map(|chunk| NbstatEntry {
            name: decode_entry_name(&chunk[..NAME_LEN]),
            suffix: chunk[NAME_LEN],
            flags: u16::from_be_bytes([chunk[NAME_LEN + 1], chunk[NAME_LEN + 2]]),
        })
        .collect();

    Ok(entries)
}

/// Parses a node status response and returns the usable unique names,
/// workstation names (suffix 0x20) first, then computer names (suffix 0x00).
pub fn parse_nbstat_response(data: &[u8], expected_id: u16) -> Result<Vec<String>, NetbiosError> {
    let entries = parse_nbstat_entries(data, expected_id)?;

    let mut preferred: Vec<String> = Vec::new();
    let mut fallback: Vec<String> = Vec::new();
    for entry in entries.into_iter().filter(|e| !e.is_group() && !e.name.is_empty()) {
        match entry.suffix {
            SUFFIX_WORKSTATION => preferred.push(entry.name),
            SUFFIX_COMPUTER => fallback.push(entry.name),
            _ => {}
        }
    }

    let mut names: Vec<String> = Vec::new();
    for name in preferred.into_iter().chain(fallback) {
        if !names.iter().any(|seen| seen.eq_ignore_ascii_case(&name)) {
            names.push(name);
        }
    }

    if names.is_empty() {
        return Err(NetbiosError::NoNames);
    }
    Ok(names)
}

fn decode_entry_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .trim_end_matches([' ', '\0'])
        .trim()
        .to_string()
}

fn read_u16(data: &[u8], offset: usize) -> Result<u16, NetbiosError> {
    let bytes: [u8; 2] = data
        .get(offset..offset + 2)
        .and_then(|b| b.try_into().ok())
        .ok_or(NetbiosError::Truncated)?;
    Ok(u16::from_be_bytes(bytes))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
