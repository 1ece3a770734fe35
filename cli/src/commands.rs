pub mod resolve;
pub mod run;
pub mod snmp;

use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use fathom_common::config::{
    Config, DEFAULT_COMMUNITY, DEFAULT_MAX_REPETITIONS, DEFAULT_SNMP_PORT, DEFAULT_SNMP_VERSION,
    ResolverConfig, SnmpConfig,
};

#[derive(Parser)]
#[command(name = "fathom")]
#[command(about = "Agentless fact discovery for networked devices.")]
#[command(version)]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Commands,

    /// Raise log verbosity (repeatable)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Reduce output (repeatable)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub quiet: u8,

    /// Skip the reverse DNS lookup
    #[arg(long, global = true)]
    pub no_dns: bool,

    /// Skip the mDNS lookup
    #[arg(long, global = true)]
    pub no_mdns: bool,

    /// Skip the NetBIOS node status lookup
    #[arg(long, global = true)]
    pub no_netbios: bool,

    #[command(flatten)]
    pub snmp: SnmpArgs,

    /// SQLite database holding discovery runs
    #[arg(long, global = true, default_value = "fathom.db")]
    pub db: PathBuf,
}

#[derive(Args)]
pub struct SnmpArgs {
    /// SNMP community string
    #[arg(short, long, global = true, default_value = DEFAULT_COMMUNITY)]
    pub community: String,

    /// SNMP version (1 or 2c)
    #[arg(long = "snmp-version", global = true, default_value = DEFAULT_SNMP_VERSION)]
    pub version: String,

    /// SNMP agent port
    #[arg(long = "snmp-port", global = true, default_value_t = DEFAULT_SNMP_PORT)]
    pub port: u16,

    /// Per-request SNMP timeout in milliseconds
    #[arg(long = "snmp-timeout", global = true, default_value_t = 900)]
    pub timeout_ms: u64,

    /// GETBULK max-repetitions
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_REPETITIONS)]
    pub max_repetitions: u32,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Collect name candidates for an address
    #[command(alias = "r")]
    Resolve { address: IpAddr },
    /// Fetch the SNMP system group
    System { target: IpAddr },
    /// Walk the SNMP interface table
    #[command(alias = "if")]
    Interfaces { target: IpAddr },
    /// Map switch ports to their PVID
    Vlans { switch: IpAddr },
    /// List LLDP and CDP neighbors
    #[command(alias = "n")]
    Neighbors { target: IpAddr },
    /// Rank name candidates given as NAME:SOURCE
    Name {
        #[arg(required = true)]
        candidates: Vec<String>,
    },
    /// Manage discovery runs
    #[command(subcommand)]
    Run(RunCommands),
}

#[derive(Subcommand)]
pub enum RunCommands {
    /// Queue a run over the given targets
    Enqueue {
        #[arg(required = true)]
        targets: Vec<IpAddr>,
        /// Do not resolve names
        #[arg(long)]
        no_names: bool,
        /// Do not poll SNMP system and interfaces
        #[arg(long)]
        no_snmp: bool,
        /// Collect port VLANs
        #[arg(long)]
        vlans: bool,
        /// Collect LLDP/CDP neighbors
        #[arg(long)]
        neighbors: bool,
    },
    /// Claim and execute queued runs
    Worker {
        /// Execute at most one run, then exit
        #[arg(long)]
        once: bool,
        /// Targets inspected at the same time
        #[arg(long, default_value_t = fathom_core::scheduler::DEFAULT_CONCURRENCY)]
        concurrency: usize,
        /// Seconds between polls when idle
        #[arg(long, default_value_t = 5)]
        poll: u64,
        /// Fail a run that takes longer than this many seconds
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// Show a run and its log
    Show { id: i64 },
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn config(&self) -> Config {
        Config {
            no_dns: self.no_dns,
            no_mdns: self.no_mdns,
            no_netbios: self.no_netbios,
            quiet: self.quiet,
            snmp: SnmpConfig {
                community: self.snmp.community.clone(),
                version: self.snmp.version.clone(),
                port: self.snmp.port,
                timeout: Duration::from_millis(self.snmp.timeout_ms),
                max_repetitions: self.snmp.max_repetitions,
            },
            resolver: ResolverConfig::default(),
        }
    }
}
