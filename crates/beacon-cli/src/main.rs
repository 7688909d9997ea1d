//! Beacon CLI entry point.
//!
//! Parses arguments, initializes logging, and dispatches to the
//! selected command.

use clap::Parser;
use miette::Result;

use beacon_cli::{cli, commands, error, logger};

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    logger::init_logger(args.verbose, args.quiet, args.no_color);

    let result = match args.command {
        cli::Command::Start(start_args) => commands::start::run(start_args).await,
        cli::Command::Build(build_args) => commands::build::run(build_args).await,
    };

    result.map_err(error::cli_error_to_miette)
}
