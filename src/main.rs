use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use kiosk_cli::{cli, commands, logging};

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    logging::init_subscriber(args.verbose, args.command.log_name());
    let log = Arc::new(logging::Logger::new(args.command.log_name()));

    match args.command {
        cli::Command::Install(opts) => commands::install::run(&args.global, &opts, &log),
        cli::Command::Supervise => {
            let code = commands::supervise::run(&args.global, &log)?;
            std::process::exit(code);
        }
        cli::Command::Version => {
            commands::version::run();
            Ok(())
        }
    }
}
