use fathom_common::models::{NameCandidate, NameSource};
use fathom_core::naming::{self, NameError, ACCEPT_THRESHOLD};

fn candidate(name: &str, source: NameSource) -> NameCandidate {
    NameCandidate::new(name, source)
}

#[test]
fn placeholders_are_rejected_from_every_source() {
    let placeholders = [
        "4.3.2.1.in-addr.arpa",
        "b.a.9.8.ip6.arpa",
        "WORKGROUP",
        "MSHOME",
        "__MSBROWSE__",
        "localdomain",
        "LocalHost",
    ];
    let sources = [
        NameSource::ReverseDns,
        NameSource::Mdns,
        NameSource::Netbios,
        NameSource::Dhcp,
        NameSource::Snmp,
        NameSource::Manual,
    ];
    for raw in placeholders {
        for source in sources {
            assert!(
                matches!(naming::normalize(source, raw), Err(NameError::Rejected(_))),
                "{raw} from {source} was accepted"
            );
        }
    }
}

#[test]
fn reverse_dns_name_is_folded_and_shortened() {
    let normalized = naming::normalize(NameSource::ReverseDns, "Router.Home.ARPA.").unwrap();
    assert_eq!(normalized.stored, "router.home.arpa");
    assert_eq!(normalized.display, "router");
    assert!(normalized.score >= ACCEPT_THRESHOLD);
}

#[test]
fn snmp_name_beats_mdns_name() {
    let best = naming::choose_best(&[
        candidate("router.local", NameSource::Mdns),
        candidate("core-switch-1", NameSource::Snmp),
    ])
    .unwrap();
    assert_eq!(best.display, "core-switch-1");
}

#[test]
fn only_placeholders_select_nothing() {
    let outcome = naming::choose_best(&[
        candidate("4.3.2.1.in-addr.arpa", NameSource::ReverseDns),
        candidate("__MSBROWSE__", NameSource::Netbios),
    ]);
    assert_eq!(outcome, Err(NameError::NoAcceptableCandidate));
}

#[test]
fn ranking_keeps_rejected_candidates_last() {
    let ranked = naming::rank(&[
        candidate("localhost", NameSource::Dhcp),
        candidate("nas", NameSource::Netbios),
        candidate("nas.lan", NameSource::Dhcp),
    ]);
    let names: Vec<&str> = ranked.iter().map(|r| r.candidate.name.as_str()).collect();
    assert_eq!(names, vec!["nas.lan", "nas", "localhost"]);
    assert!(ranked[2].normalized.is_err());
}
