//! # Display name selection
//!
//! Devices collect names from many places: reverse DNS, mDNS, NetBIOS,
//! DHCP leases, SNMP `sysName`, LLDP/CDP advertisements and operators. Most
//! of them are noisy. This module normalizes each observation, scores it and
//! picks a single display name, or none when nothing is trustworthy.
//!
//! Everything here is pure and deterministic.

use std::cmp::Ordering;

use fathom_common::models::{NameCandidate, NameSource};
use thiserror::Error;

/// Minimum score a name needs to be picked automatically.
pub const ACCEPT_THRESHOLD: i32 = 70;

/// Score given to names that must never be used.
pub const REJECTED_SCORE: i32 = -100;

const REJECTED_FRAGMENTS: &[&str] = &["in-addr.arpa", "ip6.arpa"];
const REJECTED_NAMES: &[&str] = &[
    "workgroup",
    "mshome",
    "__msbrowse__",
    "localdomain",
    "localhost",
];
const LOCAL_SUFFIXES: &[&str] = &[".local", ".localdomain"];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NameError {
    #[error("name is empty")]
    Empty,
    #[error("'{0}' is not a usable host name")]
    Rejected(String),
    #[error("no candidate scored at least {ACCEPT_THRESHOLD}")]
    NoAcceptableCandidate,
}

/// A candidate after trimming and case folding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedName {
    /// The full cleaned name, lower-cased for DNS derived sources.
    pub stored: String,
    /// The short form shown to operators.
    pub display: String,
    pub source: NameSource,
    pub score: i32,
}

/// Cleans one raw name observation.
///
/// Fails on names that are empty once trimmed and on names that are known
/// placeholders (reverse-lookup owners, default workgroups, localhost).
pub fn normalize(source: NameSource, raw: &str) -> Result<NormalizedName, NameError> {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_suffix('.').unwrap_or(trimmed).trim();
    if trimmed.is_empty() {
        return Err(NameError::Empty);
    }

    let stored = match source {
        NameSource::ReverseDns | NameSource::Mdns => trimmed.to_lowercase(),
        _ => trimmed.to_string(),
    };

    let display = match stored.split_once('.') {
        Some((first, _)) if !stored.contains(char::is_whitespace) => first.to_string(),
        _ => stored.clone(),
    };

    if is_rejected(&stored) || is_rejected(&display) {
        return Err(NameError::Rejected(stored));
    }

    let score = score(source, &stored, &display);
    Ok(NormalizedName {
        stored,
        display,
        source,
        score,
    })
}

/// Base trust per source.
pub fn base_score(source: NameSource) -> i32 {
    match source {
        NameSource::Dhcp => 95,
        NameSource::ReverseDns => 90,
        NameSource::Snmp => 88,
        NameSource::Lldp | NameSource::Cdp => 86,
        NameSource::Mdns => 80,
        NameSource::Netbios => 78,
        NameSource::Manual => 70,
        NameSource::Unknown => 50,
    }
}

/// Scores a normalized name. Placeholder names get [`REJECTED_SCORE`].
pub fn score(source: NameSource, stored: &str, display: &str) -> i32 {
    if is_rejected(stored) || is_rejected(display) {
        return REJECTED_SCORE;
    }

    let mut score = base_score(source);
    if display.chars().count() < 2 {
        score -= 50;
    }
    if display.contains(char::is_whitespace) {
        score -= 25;
    }
    if display
        .chars()
        .any(|c| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'))
    {
        score -= 20;
    }
    let lower = stored.to_ascii_lowercase();
    if LOCAL_SUFFIXES.iter().any(|suffix| lower.ends_with(suffix)) {
        score -= 5;
    }
    score
}

fn is_rejected(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    REJECTED_FRAGMENTS.iter().any(|frag| lower.contains(frag))
        || REJECTED_NAMES.iter().any(|placeholder| lower == *placeholder)
}

/// Picks the display name for a device.
///
/// Only candidates scoring at least [`ACCEPT_THRESHOLD`] are considered. Ties
/// go to the shorter display name, then the alphabetically smaller display
/// name, then the smaller stored name.
pub fn choose_best(candidates: &[NameCandidate]) -> Result<NormalizedName, NameError> {
    candidates
        .iter()
        .filter_map(|candidate| normalize(candidate.source, &candidate.name).ok())
        .filter(|name| name.score >= ACCEPT_THRESHOLD)
        .min_by(selection_order)
        .filter(|name| !name.display.trim().is_empty())
        .ok_or(NameError::NoAcceptableCandidate)
}

fn selection_order(a: &NormalizedName, b: &NormalizedName) -> Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| a.display.chars().count().cmp(&b.display.chars().count()))
        .then_with(|| a.display.cmp(&b.display))
        .then_with(|| a.stored.cmp(&b.stored))
}

/// A candidate together with the outcome of normalizing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedCandidate {
    pub candidate: NameCandidate,
    pub normalized: Result<NormalizedName, NameError>,
}

impl RankedCandidate {
    pub fn score(&self) -> Option<i32> {
        self.normalized.as_ref().ok().map(|n| n.score)
    }

    pub fn is_acceptable(&self) -> bool {
        self.score().is_some_and(|s| s >= ACCEPT_THRESHOLD)
    }
}

/// Orders every candidate for presentation, including the unusable ones:
/// normalized names first, then by score, display name and stored name.
/// The sort is stable, so equal candidates keep their input order.
pub fn rank(candidates: &[NameCandidate]) -> Vec<RankedCandidate> {
    let mut ranked: Vec<RankedCandidate> = candidates
        .iter()
        .map(|candidate| RankedCandidate {
            candidate: candidate.clone(),
            normalized: normalize(candidate.source, &candidate.name),
        })
        .collect();

    ranked.sort_by(|a, b| match (&a.normalized, &b.normalized) {
        (Ok(x), Ok(y)) => y
            .score
            .cmp(&x.score)
            .then_with(|| x.display.cmp(&y.display))
            .then_with(|| x.stored.cmp(&y.stored)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => Ordering::Equal,
    });
    ranked
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
