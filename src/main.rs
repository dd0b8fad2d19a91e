use clap::Parser;
use miette::Result;
use tracing_subscriber::EnvFilter;

use calcert::cli::commands;
use calcert::cli::{Cli, Commands};

/// Environment variable holding the log filter (e.g. `CALCERT_LOG=debug`)
const LOG_ENV: &str = "CALCERT_LOG";

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("calcert=debug"),
        _ => EnvFilter::new("calcert=trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    // Install miette's fancy error handler for beautiful diagnostics
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    init_logging(cli.global.verbose);

    let global = &cli.global;
    match cli.command {
        Commands::Init(args) => commands::init::run(args),
        Commands::Cust(cmd) => commands::cust::run(cmd, global),
        Commands::Eqp(cmd) => commands::eqp::run(cmd, global),
        Commands::Tool(cmd) => commands::tool::run(cmd, global),
        Commands::Cert(cmd) => commands::cert::run(cmd, global),
        Commands::Calc(args) => commands::calc::run(args, global),
    }
}
