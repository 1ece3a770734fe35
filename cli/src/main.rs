mod commands;
mod terminal;

use commands::{CommandLine, Commands, resolve, run, snmp};
use terminal::{logging, print};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let commands = CommandLine::parse_args();

    logging::init_logging(commands.verbose, commands.quiet);
    print::banner(commands.quiet);

    let cfg = commands.config();

    match commands.command {
        Commands::Resolve { address } => resolve::resolve(address, &cfg).await,
        Commands::System { target } => snmp::system(target, &cfg).await,
        Commands::Interfaces { target } => snmp::interfaces(target, &cfg).await,
        Commands::Vlans { switch } => snmp::vlans(switch, &cfg).await,
        Commands::Neighbors { target } => snmp::neighbors(target, &cfg).await,
        Commands::Name { candidates } => resolve::name(&candidates, &cfg),
        Commands::Run(command) => run::run(command, &commands.db, &cfg).await,
    }
}
