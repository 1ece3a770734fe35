use std::net::IpAddr;

use anyhow::{Context, bail};
use colored::*;
use fathom_common::config::Config;
use fathom_common::models::{NameCandidate, NameSource};
use fathom_common::{success, warn};
use fathom_core::naming::{self, RankedCandidate};
use fathom_core::resolver::NameResolver;

use crate::terminal::{colors, print, spinner};

pub async fn resolve(address: IpAddr, cfg: &Config) -> anyhow::Result<()> {
    let resolver = NameResolver::from_config(cfg);
    let candidates = spinner::spin(
        &format!("asking DNS, mDNS and NetBIOS about {address}"),
        resolver.lookup_addr(&address.to_string(), address),
    )
    .await
    .with_context(|| format!("no name could be resolved for {address}"))?;

    if candidates.is_empty() {
        print::header(&format!("names for {address}"), cfg.quiet);
        print::nothing_found("names");
        return Ok(());
    }

    print::header(&format!("names for {address}"), cfg.quiet);
    show_ranking(&candidates);
    Ok(())
}

/// Ranks candidates given on the command line as `NAME:SOURCE`.
pub fn name(raw: &[String], cfg: &Config) -> anyhow::Result<()> {
    let candidates = raw
        .iter()
        .map(|arg| parse_candidate(arg))
        .collect::<anyhow::Result<Vec<NameCandidate>>>()?;

    print::header("name ranking", cfg.quiet);
    show_ranking(&candidates);
    Ok(())
}

fn parse_candidate(arg: &str) -> anyhow::Result<NameCandidate> {
    let Some((name, source)) = arg.rsplit_once(':') else {
        bail!("'{arg}' is not NAME:SOURCE");
    };
    let source: NameSource = match source.parse() {
        Ok(source) => source,
        Err(never) => match never {},
    };
    Ok(NameCandidate::new(name, source))
}

fn show_ranking(candidates: &[NameCandidate]) {
    let ranked = naming::rank(candidates);
    for (idx, entry) in ranked.iter().enumerate() {
        print::tree_head(idx, &entry.candidate.name);
        print::tree(details(entry));
    }
    print::rule();

    match naming::choose_best(candidates) {
        Ok(best) => success!("display name: {} ({}, score {})", best.display, best.source, best.score),
        Err(err) => warn!("no display name chosen: {err}"),
    }
}

fn details(entry: &RankedCandidate) -> Vec<(String, ColoredString)> {
    let mut details = vec![(
        "source".to_string(),
        entry.candidate.source.to_string().color(colors::ACCENT),
    )];
    match &entry.normalized {
        Ok(normalized) => {
            details.push(("display".to_string(), normalized.display.color(colors::NAME)));
            details.push(("stored".to_string(), normalized.stored.color(colors::TEXT_DEFAULT)));
            let score = normalized.score.to_string();
            let score = if entry.is_acceptable() {
                score.green()
            } else {
                score.yellow()
            };
            details.push(("score".to_string(), score));
        }
        Err(err) => details.push(("rejected".to_string(), err.to_string().color(colors::REJECTED))),
    }
    details
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
